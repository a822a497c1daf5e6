//! Receiver-side bitrate estimator tying the stages together.

use std::collections::HashMap;

use log::trace;

use crate::detector::OveruseDetector;
use crate::estimator::OveruseEstimator;
use crate::inter_arrival::InterArrival;
use crate::rate_control::AimdRateControl;
use crate::rate_counter::RateCounter;

const INTER_ARRIVAL_SHIFT: u32 = 26;
const TIMESTAMP_GROUP_LENGTH_MS: u32 = 5;
const TIMESTAMP_TO_MS: f64 = 1000.0 / (1u64 << INTER_ARRIVAL_SHIFT) as f64;

/// Streams unseen for this long fall out of the estimate.
const SSRC_TIMEOUT_MS: i64 = 10_000;

/// Delay-based bandwidth estimate over all inbound streams of a transport.
///
/// Fed with the 24-bit abs-send-time of every received packet; returns the
/// current target bitrate and the contributing synchronization sources.
#[derive(Debug)]
pub struct RemoteBitrateEstimator {
    detector: OveruseDetector,
    estimator: OveruseEstimator,
    incoming_bitrate: RateCounter,
    inter_arrival: InterArrival,
    rate_control: AimdRateControl,
    ssrcs: HashMap<u32, i64>,
}

impl Default for RemoteBitrateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteBitrateEstimator {
    pub fn new() -> Self {
        Self {
            detector: OveruseDetector::new(),
            estimator: OveruseEstimator::new(),
            incoming_bitrate: RateCounter::new(1000, 8000),
            inter_arrival: InterArrival::new(
                (TIMESTAMP_GROUP_LENGTH_MS << INTER_ARRIVAL_SHIFT) / 1000,
                TIMESTAMP_TO_MS,
            ),
            rate_control: AimdRateControl::new(),
            ssrcs: HashMap::new(),
        }
    }

    /// Feeds one received packet and returns the updated target bitrate with
    /// the streams it covers.
    pub fn incoming(
        &mut self,
        abs_send_time: u32,
        arrival_time_ms: i64,
        payload_size: usize,
        ssrc: u32,
    ) -> (u64, Vec<u32>) {
        let timestamp = abs_send_time << 8;

        // note the SSRC and drop timed-out ones
        self.ssrcs.insert(ssrc, arrival_time_ms);
        self.ssrcs
            .retain(|_, last_seen| arrival_time_ms - *last_seen < SSRC_TIMEOUT_MS);

        self.incoming_bitrate.add(payload_size as u64, arrival_time_ms);

        if let Some(deltas) =
            self.inter_arrival
                .compute_deltas(timestamp, arrival_time_ms, payload_size)
        {
            let ts_delta_ms = f64::from(deltas.timestamp) * TIMESTAMP_TO_MS;
            self.estimator.update(
                deltas.arrival_time,
                ts_delta_ms,
                deltas.size,
                self.detector.state(),
                arrival_time_ms,
            );
            self.detector.detect(
                self.estimator.offset(),
                ts_delta_ms,
                self.estimator.num_of_deltas(),
                arrival_time_ms,
            );
        }

        let estimated_throughput = self.incoming_bitrate.rate(arrival_time_ms);
        let target_bitrate =
            self.rate_control
                .update(self.detector.state(), estimated_throughput, arrival_time_ms);
        trace!(
            "remote bitrate estimate {} bps over {} stream(s)",
            target_bitrate,
            self.ssrcs.len()
        );

        let mut ssrcs: Vec<u32> = self.ssrcs.keys().copied().collect();
        ssrcs.sort_unstable();
        (target_bitrate, ssrcs)
    }

    /// Current target bitrate in bits per second.
    pub fn bitrate(&self) -> u64 {
        self.rate_control.bitrate()
    }

    /// Seeds the controller, e.g. from a configured start bitrate.
    pub fn set_estimate(&mut self, bitrate: u64, now_ms: i64) {
        self.rate_control.set_estimate(bitrate, now_ms);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tracks_ssrcs() {
        let mut estimator = RemoteBitrateEstimator::new();
        let (_, ssrcs) = estimator.incoming(0x00aa_bb00, 0, 1200, 0x1234);
        assert_eq!(ssrcs, vec![0x1234]);
        let (_, ssrcs) = estimator.incoming(0x00aa_bb40, 5, 1200, 0x5678);
        assert_eq!(ssrcs, vec![0x1234, 0x5678]);

        // first stream times out
        let (_, ssrcs) = estimator.incoming(0x00ab_0000, 20_000, 1200, 0x5678);
        assert_eq!(ssrcs, vec![0x5678]);
    }

    #[test]
    fn test_steady_stream_keeps_estimate_bounded() {
        let mut estimator = RemoteBitrateEstimator::new();
        estimator.set_estimate(300_000, 0);

        // ~1 Mbps across 20 ms frames: the acked-throughput ceiling caps
        // the multiplicative growth
        let mut abs_send_time: u32 = 0;
        let mut now_ms: i64 = 0;
        for _ in 0..500 {
            let (bitrate, _) = estimator.incoming(abs_send_time, now_ms, 2500, 42);
            assert!(bitrate >= 5000);
            now_ms += 20;
            // 20 ms in 6.18 fixed point
            abs_send_time = (abs_send_time + ((20 << 18) / 1000)) & 0x00FF_FFFF;
        }

        let acked = 2500u64 * 8 * 1000 / 20;
        assert!(estimator.bitrate() <= acked * 3 / 2 + 10_000);
    }
}

//! Overuse detector with an adaptive threshold.

use crate::BandwidthUsage;

const MAX_ADAPT_OFFSET_MS: f64 = 15.0;
const OVER_USING_TIME_THRESHOLD_MS: f64 = 10.0;
const MIN_NUM_DELTAS: usize = 60;

/// Turns the estimated delay offset into a bandwidth-usage hypothesis.
///
/// Overuse is only signaled after the scaled offset has stayed above the
/// threshold for a sustained time over more than one sample, and the
/// threshold itself adapts towards the observed offsets with separate up and
/// down gains.
#[derive(Debug, Clone)]
pub struct OveruseDetector {
    hypothesis: BandwidthUsage,
    k_down: f64,
    k_up: f64,
    last_update_ms: Option<i64>,
    overuse_counter: usize,
    prev_offset: f64,
    threshold: f64,
    time_over_using: f64,
}

impl Default for OveruseDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl OveruseDetector {
    pub fn new() -> Self {
        Self {
            hypothesis: BandwidthUsage::Normal,
            k_down: 0.039,
            k_up: 0.0087,
            last_update_ms: None,
            overuse_counter: 0,
            prev_offset: 0.0,
            threshold: 12.5,
            time_over_using: -1.0,
        }
    }

    /// Current hypothesis.
    pub fn state(&self) -> BandwidthUsage {
        self.hypothesis
    }

    /// Evaluates one offset sample.
    pub fn detect(
        &mut self,
        offset: f64,
        ts_delta: f64,
        num_of_deltas: usize,
        now_ms: i64,
    ) -> BandwidthUsage {
        if num_of_deltas < 2 {
            return BandwidthUsage::Normal;
        }

        let t = num_of_deltas.min(MIN_NUM_DELTAS) as f64 * offset;
        if t > self.threshold {
            if self.time_over_using == -1.0 {
                // initialize the timer, assuming overuse for half of the
                // time since the previous sample
                self.time_over_using = ts_delta / 2.0;
            } else {
                self.time_over_using += ts_delta;
            }
            self.overuse_counter += 1;
            if self.time_over_using > OVER_USING_TIME_THRESHOLD_MS
                && self.overuse_counter > 1
                && offset >= self.prev_offset
            {
                self.time_over_using = 0.0;
                self.overuse_counter = 0;
                self.hypothesis = BandwidthUsage::Overusing;
            }
        } else if t < -self.threshold {
            self.time_over_using = -1.0;
            self.overuse_counter = 0;
            self.hypothesis = BandwidthUsage::Underusing;
        } else {
            self.time_over_using = -1.0;
            self.overuse_counter = 0;
            self.hypothesis = BandwidthUsage::Normal;
        }

        self.prev_offset = offset;
        self.update_threshold(t, now_ms);

        self.hypothesis
    }

    fn update_threshold(&mut self, modified_offset: f64, now_ms: i64) {
        let last_update_ms = self.last_update_ms.get_or_insert(now_ms);

        if modified_offset.abs() > self.threshold + MAX_ADAPT_OFFSET_MS {
            // do not adapt the threshold to big latency spikes
            *last_update_ms = now_ms;
            return;
        }

        let k = if modified_offset.abs() < self.threshold {
            self.k_down
        } else {
            self.k_up
        };
        let time_delta_ms = (now_ms - *last_update_ms).min(100) as f64;
        self.threshold += k * (modified_offset.abs() - self.threshold) * time_delta_ms;
        self.threshold = self.threshold.clamp(6.0, 600.0);
        *last_update_ms = now_ms;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::estimator::OveruseEstimator;
    use crate::inter_arrival::InterArrival;

    /// End-to-end fixture over grouper, estimator and detector, fed with a
    /// 90 kHz RTP clock.
    struct Fixture {
        detector: OveruseDetector,
        estimator: OveruseEstimator,
        inter_arrival: InterArrival,
        packet_size: usize,
        now_ms: i64,
        receive_time_ms: i64,
        rtp_timestamp: u32,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                detector: OveruseDetector::new(),
                estimator: OveruseEstimator::new(),
                inter_arrival: InterArrival::new(5 * 90, 1.0 / 9.0),
                packet_size: 1200,
                now_ms: 0,
                receive_time_ms: 0,
                rtp_timestamp: 900,
            }
        }

        fn update_detector(&mut self, timestamp: u32, receive_time_ms: i64) {
            if let Some(deltas) =
                self.inter_arrival
                    .compute_deltas(timestamp, receive_time_ms, self.packet_size)
            {
                let timestamp_delta_ms = f64::from(deltas.timestamp) / 90.0;
                self.estimator.update(
                    deltas.arrival_time,
                    timestamp_delta_ms,
                    deltas.size,
                    self.detector.state(),
                    receive_time_ms,
                );
                self.detector.detect(
                    self.estimator.offset(),
                    timestamp_delta_ms,
                    self.estimator.num_of_deltas(),
                    receive_time_ms,
                );
            }
        }

        /// Sends steady traffic; counts distinct overuse onsets.
        fn run_100000_samples(&mut self, packets_per_frame: usize, mean_ms: i64) -> usize {
            let mut unique_overuse = 0;
            let mut last_overuse: i64 = -1;

            for i in 0..100_000i64 {
                for _ in 0..packets_per_frame {
                    self.update_detector(self.rtp_timestamp, self.receive_time_ms);
                }
                self.rtp_timestamp += (mean_ms * 90) as u32;
                self.now_ms += mean_ms;
                self.receive_time_ms = self.receive_time_ms.max(self.now_ms);

                if self.detector.state() == BandwidthUsage::Overusing {
                    if last_overuse + 1 != i {
                        unique_overuse += 1;
                    }
                    last_overuse = i;
                }
            }

            unique_overuse
        }

        /// Drifts the receive clock until overuse fires.
        fn run_until_overuse(
            &mut self,
            packets_per_frame: usize,
            mean_ms: i64,
            drift_per_frame_ms: i64,
        ) -> i64 {
            for i in 0..100_000i64 {
                for _ in 0..packets_per_frame {
                    self.update_detector(self.rtp_timestamp, self.receive_time_ms);
                }
                self.rtp_timestamp += (mean_ms * 90) as u32;
                self.now_ms += mean_ms + drift_per_frame_ms;
                self.receive_time_ms = self.receive_time_ms.max(self.now_ms);

                if self.detector.state() == BandwidthUsage::Overusing {
                    return i + 1;
                }
            }
            -1
        }
    }

    #[test]
    fn test_simple_non_overuse_30fps() {
        let mut f = Fixture::new();
        let frame_duration_ms = 33;

        for _ in 0..1000 {
            f.update_detector(f.rtp_timestamp, f.now_ms);
            f.now_ms += frame_duration_ms;
            f.rtp_timestamp += (frame_duration_ms * 90) as u32;
        }
        assert_eq!(f.detector.state(), BandwidthUsage::Normal);
    }

    #[test]
    fn test_simple_non_overuse_with_receive_variance() {
        let mut f = Fixture::new();
        let frame_duration_ms = 10;

        for i in 0..1000 {
            f.update_detector(f.rtp_timestamp, f.now_ms);
            f.rtp_timestamp += (frame_duration_ms * 90) as u32;
            if i % 2 == 1 {
                f.now_ms += frame_duration_ms - 5;
            } else {
                f.now_ms += frame_duration_ms + 5;
            }
            assert_eq!(f.detector.state(), BandwidthUsage::Normal);
        }
    }

    #[test]
    fn test_simple_non_overuse_with_rtp_timestamp_variance() {
        let mut f = Fixture::new();
        let frame_duration_ms = 10;

        for i in 0..1000 {
            f.update_detector(f.rtp_timestamp, f.now_ms);
            f.now_ms += frame_duration_ms;
            if i % 2 == 1 {
                f.rtp_timestamp += ((frame_duration_ms - 5) * 90) as u32;
            } else {
                f.rtp_timestamp += ((frame_duration_ms + 5) * 90) as u32;
            }
            assert_eq!(f.detector.state(), BandwidthUsage::Normal);
        }
    }

    #[test]
    fn test_simple_overuse_2000kbit_30fps() {
        let mut f = Fixture::new();
        let packets_per_frame = 6;
        let frame_duration_ms = 33;
        let drift_per_frame_ms = 1;

        let unique_overuse = f.run_100000_samples(packets_per_frame, frame_duration_ms);
        assert_eq!(unique_overuse, 0);

        let frames_until_overuse =
            f.run_until_overuse(packets_per_frame, frame_duration_ms, drift_per_frame_ms);
        assert_eq!(frames_until_overuse, 7);
    }

    #[test]
    fn test_simple_overuse_100kbit_10fps() {
        let mut f = Fixture::new();
        let packets_per_frame = 1;
        let frame_duration_ms = 100;
        let drift_per_frame_ms = 1;

        let unique_overuse = f.run_100000_samples(packets_per_frame, frame_duration_ms);
        assert_eq!(unique_overuse, 0);

        let frames_until_overuse =
            f.run_until_overuse(packets_per_frame, frame_duration_ms, drift_per_frame_ms);
        assert_eq!(frames_until_overuse, 7);
    }

    #[test]
    fn test_overuse_with_low_variance_2000kbit_30fps() {
        let mut f = Fixture::new();
        let frame_duration_ms: i64 = 33;
        let drift_per_frame_ms: i64 = 6;
        f.rtp_timestamp = (frame_duration_ms * 90) as u32;

        // 1000 frames to reach steady state
        for _ in 0..1000 {
            for _ in 0..6 {
                f.update_detector(f.rtp_timestamp, f.now_ms);
            }
            f.rtp_timestamp += (frame_duration_ms * 90) as u32;
            f.now_ms += frame_duration_ms;
            assert_eq!(f.detector.state(), BandwidthUsage::Normal);
        }

        // simulate a send pace that is a little too high
        for _ in 0..3 {
            for _ in 0..6 {
                f.update_detector(f.rtp_timestamp, f.now_ms);
            }
            f.now_ms += frame_duration_ms + drift_per_frame_ms;
            f.rtp_timestamp += (frame_duration_ms * 90) as u32;
            assert_eq!(f.detector.state(), BandwidthUsage::Normal);
        }

        f.update_detector(f.rtp_timestamp, f.now_ms);
        assert_eq!(f.detector.state(), BandwidthUsage::Overusing);
    }
}

//! AIMD rate controller.

use crate::BandwidthUsage;

const BETA: f64 = 0.85;
const DEFAULT_RTT_MS: i64 = 200;
const MIN_BITRATE: u64 = 5000;
const START_BITRATE: u64 = 30_000_000;

/// Additive-increase/multiplicative-decrease control of the target bitrate.
///
/// While the link is near its capacity estimate the rate grows additively by
/// about one packet per response time; otherwise it grows by 8% per second.
/// On overuse the rate drops to 0.85 of the observed throughput and the
/// observation is folded into an exponentially-weighted max-throughput
/// window that later snaps repeat decreases.
#[derive(Debug, Clone)]
pub struct AimdRateControl {
    avg_max_bitrate_kbps: Option<f64>,
    var_max_bitrate_kbps: f64,
    current_bitrate: u64,
    latest_estimated_throughput: u64,
    near_max: bool,
    rtt: i64,
    state: RateControlState,
    time_first_throughput_estimate: Option<i64>,
    time_last_bitrate_change: Option<i64>,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RateControlState {
    #[default]
    Hold,
    Increase,
    Decrease,
}

impl Default for AimdRateControl {
    fn default() -> Self {
        Self::new()
    }
}

impl AimdRateControl {
    pub fn new() -> Self {
        Self {
            avg_max_bitrate_kbps: None,
            var_max_bitrate_kbps: 0.4,
            current_bitrate: START_BITRATE,
            latest_estimated_throughput: START_BITRATE,
            near_max: false,
            rtt: DEFAULT_RTT_MS,
            state: RateControlState::Hold,
            time_first_throughput_estimate: None,
            time_last_bitrate_change: None,
        }
    }

    pub fn state(&self) -> RateControlState {
        self.state
    }

    pub fn bitrate(&self) -> u64 {
        self.current_bitrate
    }

    /// Forces the estimate, e.g. from a configured start bitrate.
    pub fn set_estimate(&mut self, bitrate: u64, now_ms: i64) {
        self.current_bitrate = self.clamp_bitrate(bitrate, bitrate);
        self.time_last_bitrate_change = Some(now_ms);
    }

    /// Applies one bandwidth-usage observation and returns the new target.
    ///
    /// `estimated_throughput` is the acknowledged incoming rate in bits per
    /// second, when known.
    pub fn update(
        &mut self,
        bandwidth_usage: BandwidthUsage,
        estimated_throughput: Option<u64>,
        now_ms: i64,
    ) -> u64 {
        // update state
        if bandwidth_usage == BandwidthUsage::Overusing {
            if self.state != RateControlState::Decrease {
                self.state = RateControlState::Decrease;
            }
        } else if bandwidth_usage == BandwidthUsage::Underusing {
            self.state = RateControlState::Hold;
        } else if self.state == RateControlState::Hold {
            self.time_last_bitrate_change = Some(now_ms);
            self.state = RateControlState::Increase;
        }

        // helper variables
        let estimated_throughput = match estimated_throughput {
            Some(throughput) => {
                self.latest_estimated_throughput = throughput;
                if self.time_first_throughput_estimate.is_none() {
                    self.time_first_throughput_estimate = Some(now_ms);
                }
                throughput
            }
            None => self.latest_estimated_throughput,
        };
        let estimated_throughput_kbps = estimated_throughput as f64 / 1000.0;

        match self.state {
            RateControlState::Increase => {
                // a throughput significantly above the averaged maximum means
                // the link capacity changed; forget the old maximum
                if let Some(avg_max) = self.avg_max_bitrate_kbps {
                    let sigma_kbps = (self.var_max_bitrate_kbps * avg_max).sqrt();
                    if estimated_throughput_kbps >= avg_max + 3.0 * sigma_kbps {
                        self.avg_max_bitrate_kbps = None;
                        self.near_max = false;
                    }
                }

                let new_bitrate = if self.near_max {
                    // additive increase
                    self.current_bitrate + self.additive_rate_increase(now_ms)
                } else {
                    // multiplicative increase
                    self.current_bitrate + self.multiplicative_rate_increase(now_ms)
                };
                self.current_bitrate = self.clamp_bitrate(new_bitrate, estimated_throughput);
                self.time_last_bitrate_change = Some(now_ms);
            }
            RateControlState::Decrease => {
                // slightly below the measured throughput, to drain the
                // self-inflicted queue
                let mut new_bitrate = (BETA * estimated_throughput as f64).round() as u64;
                if new_bitrate > self.current_bitrate {
                    // avoid increasing the rate while over-using
                    if let Some(avg_max) = self.avg_max_bitrate_kbps {
                        new_bitrate = (BETA * avg_max * 1000.0).round() as u64;
                    }
                    new_bitrate = new_bitrate.min(self.current_bitrate);
                }

                if let Some(avg_max) = self.avg_max_bitrate_kbps {
                    let sigma_kbps = (self.var_max_bitrate_kbps * avg_max).sqrt();
                    if estimated_throughput_kbps < avg_max - 3.0 * sigma_kbps {
                        self.avg_max_bitrate_kbps = None;
                    }
                }

                self.near_max = true;
                self.update_max_throughput_estimate(estimated_throughput_kbps);

                // stay on hold until the estimate has come down to a level
                // the link sustains
                self.state = RateControlState::Hold;
                self.current_bitrate = self.clamp_bitrate(new_bitrate, estimated_throughput);
                self.time_last_bitrate_change = Some(now_ms);
            }
            RateControlState::Hold => {}
        }

        self.current_bitrate
    }

    fn additive_rate_increase(&self, now_ms: i64) -> u64 {
        let time_delta_ms = now_ms - self.time_last_bitrate_change.unwrap_or(now_ms);

        // grow by roughly one average packet per response time
        let bits_per_frame = self.current_bitrate as f64 / 30.0;
        let packets_per_frame = (bits_per_frame / (1200.0 * 8.0)).ceil();
        let avg_packet_size_bits = bits_per_frame / packets_per_frame;
        let response_time_ms = (self.rtt + 100) as f64;
        let increase_rate_bps_per_second = (1000.0 * avg_packet_size_bits / response_time_ms).max(4000.0);

        (time_delta_ms as f64 * increase_rate_bps_per_second / 1000.0) as u64
    }

    fn multiplicative_rate_increase(&self, now_ms: i64) -> u64 {
        let alpha: f64 = match self.time_last_bitrate_change {
            Some(last_ms) => {
                let time_since_last_update_ms = (now_ms - last_ms).min(1000);
                1.08f64.powf(time_since_last_update_ms as f64 / 1000.0)
            }
            None => 1.08,
        };
        ((self.current_bitrate as f64 * (alpha - 1.0)).max(1000.0)) as u64
    }

    fn clamp_bitrate(&self, mut new_bitrate: u64, estimated_throughput: u64) -> u64 {
        // the estimate may not race ahead of what is actually acknowledged
        let max_bitrate = (1.5 * estimated_throughput as f64).round() as u64 + 10000;
        if new_bitrate > self.current_bitrate && new_bitrate > max_bitrate {
            new_bitrate = self.current_bitrate.max(max_bitrate);
        }
        new_bitrate.max(MIN_BITRATE)
    }

    fn update_max_throughput_estimate(&mut self, estimated_throughput_kbps: f64) {
        let alpha = 0.05;
        let avg_max = match self.avg_max_bitrate_kbps {
            None => estimated_throughput_kbps,
            Some(avg_max) => (1.0 - alpha) * avg_max + alpha * estimated_throughput_kbps,
        };
        self.avg_max_bitrate_kbps = Some(avg_max);

        // variance normalized by the average, so the snap window scales with
        // the bitrate
        let norm = avg_max.max(1.0);
        let var = (1.0 - alpha) * self.var_max_bitrate_kbps
            + alpha * (avg_max - estimated_throughput_kbps).powi(2) / norm;
        // 0.4 ~= 14 kbit/s at 500 kbit/s, 2.5 ~= 35 kbit/s at 500 kbit/s
        self.var_max_bitrate_kbps = var.clamp(0.4, 2.5);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_update_normal() {
        let mut rate_control = AimdRateControl::new();
        let bitrate = 300_000;
        rate_control.set_estimate(bitrate, 0);
        let estimate = rate_control.update(BandwidthUsage::Normal, Some(bitrate), 0);
        assert_eq!(estimate, 301_000);

        assert_eq!(rate_control.state, RateControlState::Increase);
        assert_eq!(rate_control.avg_max_bitrate_kbps, None);
        assert_eq!(rate_control.var_max_bitrate_kbps, 0.4);
    }

    #[test]
    fn test_update_normal_no_estimated_throughput() {
        let mut rate_control = AimdRateControl::new();
        rate_control.set_estimate(300_000, 0);
        let estimate = rate_control.update(BandwidthUsage::Normal, None, 0);
        assert_eq!(estimate, 301_000);
    }

    #[test]
    fn test_update_overuse() {
        let mut rate_control = AimdRateControl::new();
        let bitrate = 300_000;
        rate_control.set_estimate(bitrate, 0);
        let estimate = rate_control.update(BandwidthUsage::Overusing, Some(bitrate), 0);
        assert_eq!(estimate, 255_000);

        assert_eq!(rate_control.state, RateControlState::Hold);
        assert_eq!(rate_control.avg_max_bitrate_kbps, Some(300.0));
        assert_eq!(rate_control.var_max_bitrate_kbps, 0.4);
    }

    #[test]
    fn test_update_underuse() {
        let mut rate_control = AimdRateControl::new();
        let bitrate = 300_000;
        rate_control.set_estimate(bitrate, 0);
        let estimate = rate_control.update(BandwidthUsage::Underusing, Some(bitrate), 0);
        assert_eq!(estimate, 300_000);

        assert_eq!(rate_control.state, RateControlState::Hold);
        assert_eq!(rate_control.avg_max_bitrate_kbps, None);
        assert_eq!(rate_control.var_max_bitrate_kbps, 0.4);
    }

    #[test]
    fn test_additive_rate_increase() {
        let mut rate_control = AimdRateControl::new();
        let acked_bitrate = 100_000;
        rate_control.set_estimate(acked_bitrate, 0);

        let mut estimate = 0;
        let mut now_ms = 0;
        while now_ms < 20_000 {
            estimate = rate_control.update(BandwidthUsage::Normal, Some(acked_bitrate), now_ms);
            now_ms += 100;
        }
        now_ms -= 100;
        assert_eq!(estimate, 160_000);
        assert!(!rate_control.near_max);

        // overuse -> hold
        let estimate = rate_control.update(BandwidthUsage::Overusing, Some(acked_bitrate), now_ms);
        assert_eq!(estimate, 85_000);
        assert!(rate_control.near_max);
        now_ms += 1000;

        // back to normal, but the bitrate change clock restarts
        let estimate = rate_control.update(BandwidthUsage::Normal, Some(acked_bitrate), now_ms);
        assert_eq!(estimate, 85_000);
        assert!(rate_control.near_max);
        now_ms += 1000;

        // still normal -> additive increase
        let estimate = rate_control.update(BandwidthUsage::Normal, Some(acked_bitrate), now_ms);
        assert_eq!(estimate, 94_444);
        assert!(rate_control.near_max);
        now_ms += 1000;

        // overuse -> hold
        let estimate = rate_control.update(BandwidthUsage::Overusing, Some(acked_bitrate), now_ms);
        assert_eq!(estimate, 85_000);
        assert!(rate_control.near_max);
    }

    #[test]
    fn test_clear_max_throughput() {
        let mut rate_control = AimdRateControl::new();
        let normal_bitrate = 100_000;
        let high_bitrate = 150_000;
        let mut now_ms = 0;
        rate_control.set_estimate(normal_bitrate, now_ms);
        rate_control.update(BandwidthUsage::Normal, Some(normal_bitrate), now_ms);
        now_ms += 1000;

        // overuse
        rate_control.update(BandwidthUsage::Overusing, Some(normal_bitrate), now_ms);
        assert_eq!(rate_control.avg_max_bitrate_kbps, Some(100.0));
        now_ms += 1000;

        // stable
        rate_control.update(BandwidthUsage::Normal, Some(normal_bitrate), now_ms);
        assert_eq!(rate_control.avg_max_bitrate_kbps, Some(100.0));
        now_ms += 1000;

        // large increase in throughput clears the window
        rate_control.update(BandwidthUsage::Normal, Some(high_bitrate), now_ms);
        assert_eq!(rate_control.avg_max_bitrate_kbps, None);
        now_ms += 1000;

        // overuse
        rate_control.update(BandwidthUsage::Overusing, Some(high_bitrate), now_ms);
        assert_eq!(rate_control.avg_max_bitrate_kbps, Some(150.0));
        now_ms += 1000;

        // overuse together with a large decrease in throughput
        rate_control.update(BandwidthUsage::Overusing, Some(normal_bitrate), now_ms);
        assert_eq!(rate_control.avg_max_bitrate_kbps, Some(100.0));
    }

    #[test]
    fn test_bwe_limited_by_acked_bitrate() {
        let mut rate_control = AimdRateControl::new();
        let acked_bitrate = 10_000;
        rate_control.set_estimate(acked_bitrate, 0);

        let mut estimate = 0;
        let mut now_ms = 0;
        while now_ms < 20_000 {
            estimate = rate_control.update(BandwidthUsage::Normal, Some(acked_bitrate), now_ms);
            now_ms += 100;
        }
        assert_eq!(estimate, 25_000);
    }

    #[test]
    fn test_bwe_not_limited_by_decreasing_acked_bitrate() {
        let mut rate_control = AimdRateControl::new();
        let acked_bitrate = 100_000;
        rate_control.set_estimate(acked_bitrate, 0);

        let mut estimate = 0;
        let mut now_ms = 0;
        while now_ms < 20_000 {
            estimate = rate_control.update(BandwidthUsage::Normal, Some(acked_bitrate), now_ms);
            now_ms += 100;
        }
        now_ms -= 100;
        assert_eq!(estimate, 160_000);

        // a drop in acked throughput does not pull the estimate down
        let estimate = rate_control.update(BandwidthUsage::Normal, Some(acked_bitrate / 2), now_ms);
        assert_eq!(estimate, 160_000);
    }

    #[test]
    fn test_floor() {
        let mut rate_control = AimdRateControl::new();
        rate_control.set_estimate(6000, 0);
        let estimate = rate_control.update(BandwidthUsage::Overusing, Some(1000), 0);
        assert_eq!(estimate, MIN_BITRATE);
    }
}

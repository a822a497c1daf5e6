//! Kalman filter estimating the network queueing-delay offset.

use crate::BandwidthUsage;

const DELTA_COUNTER_MAX: usize = 1000;
const MIN_FRAME_PERIOD_HISTORY_LENGTH: usize = 60;

/// Estimates the one-way queueing delay trend from inter-group deltas.
#[derive(Debug, Clone)]
pub struct OveruseEstimator {
    avg_noise: f64,
    e: [[f64; 2]; 2],
    num_of_deltas: usize,
    offset: f64,
    prev_offset: f64,
    process_noise: [f64; 2],
    slope: f64,
    ts_delta_hist: Vec<f64>,
    var_noise: f64,
}

impl Default for OveruseEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl OveruseEstimator {
    pub fn new() -> Self {
        Self {
            avg_noise: 0.0,
            e: [[100.0, 0.0], [0.0, 1e-1]],
            num_of_deltas: 0,
            offset: 0.0,
            prev_offset: 0.0,
            process_noise: [1e-13, 1e-3],
            slope: 8.0 / 512.0,
            ts_delta_hist: Vec::new(),
            var_noise: 50.0,
        }
    }

    /// Estimated queueing-delay offset in milliseconds.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Number of deltas seen, saturating at 1000.
    pub fn num_of_deltas(&self) -> usize {
        self.num_of_deltas
    }

    /// Feeds one `(arrival delta, timestamp delta in ms, size delta)` tuple.
    pub fn update(
        &mut self,
        t_delta: i64,
        ts_delta: f64,
        size_delta: i64,
        current_hypothesis: BandwidthUsage,
        _now_ms: i64,
    ) {
        let min_frame_period = self.update_min_frame_period(ts_delta);
        let t_ts_delta = t_delta as f64 - ts_delta;
        let fs_delta = size_delta as f64;

        self.num_of_deltas += 1;
        if self.num_of_deltas > DELTA_COUNTER_MAX {
            self.num_of_deltas = DELTA_COUNTER_MAX;
        }

        // update the Kalman filter
        self.e[0][0] += self.process_noise[0];
        self.e[1][1] += self.process_noise[1];
        if (current_hypothesis == BandwidthUsage::Overusing && self.offset < self.prev_offset)
            || (current_hypothesis == BandwidthUsage::Underusing && self.offset > self.prev_offset)
        {
            self.e[1][1] += 10.0 * self.process_noise[1];
        }

        let h = [fs_delta, 1.0];
        let eh = [
            self.e[0][0] * h[0] + self.e[0][1] * h[1],
            self.e[1][0] * h[0] + self.e[1][1] * h[1],
        ];
        let residual = t_ts_delta - self.slope * h[0] - self.offset;

        let in_stable_state = current_hypothesis == BandwidthUsage::Normal;
        let max_residual = 3.0 * self.var_noise.sqrt();

        // filter out very late frames; periodic key frames do not fit the
        // Gaussian model well
        if residual.abs() < max_residual {
            self.update_noise_estimate(residual, min_frame_period, in_stable_state);
        } else {
            let clamped = if residual < 0.0 {
                -max_residual
            } else {
                max_residual
            };
            self.update_noise_estimate(clamped, min_frame_period, in_stable_state);
        }

        let denom = self.var_noise + h[0] * eh[0] + h[1] * eh[1];
        let k = [eh[0] / denom, eh[1] / denom];
        let ikh = [
            [1.0 - k[0] * h[0], -k[0] * h[1]],
            [-k[1] * h[0], 1.0 - k[1] * h[1]],
        ];
        let e00 = self.e[0][0];
        let e01 = self.e[0][1];

        self.e[0][0] = e00 * ikh[0][0] + self.e[1][0] * ikh[0][1];
        self.e[0][1] = e01 * ikh[0][0] + self.e[1][1] * ikh[0][1];
        self.e[1][0] = e00 * ikh[1][0] + self.e[1][0] * ikh[1][1];
        self.e[1][1] = e01 * ikh[1][0] + self.e[1][1] * ikh[1][1];

        // the covariance matrix must stay positive semi-definite
        debug_assert!(
            self.e[0][0] + self.e[1][1] >= 0.0
                && self.e[0][0] * self.e[1][1] - self.e[0][1] * self.e[1][0] >= 0.0
                && self.e[0][0] >= 0.0
        );

        self.slope += k[0] * residual;
        self.prev_offset = self.offset;
        self.offset += k[1] * residual;
    }

    fn update_min_frame_period(&mut self, ts_delta: f64) -> f64 {
        let mut min_frame_period = ts_delta;
        if self.ts_delta_hist.len() >= MIN_FRAME_PERIOD_HISTORY_LENGTH {
            self.ts_delta_hist.remove(0);
        }
        for old_ts_delta in &self.ts_delta_hist {
            min_frame_period = min_frame_period.min(*old_ts_delta);
        }
        self.ts_delta_hist.push(ts_delta);
        min_frame_period
    }

    fn update_noise_estimate(&mut self, residual: f64, ts_delta: f64, stable_state: bool) {
        if !stable_state {
            return;
        }

        // faster filter during startup to adapt to the jitter level of the
        // network sooner; alpha is tuned for 30 frames per second and scaled
        // by ts_delta
        let alpha: f64 = if self.num_of_deltas > 10 * 30 {
            0.002
        } else {
            0.01
        };
        let beta = (1.0 - alpha).powf(ts_delta * 30.0 / 1000.0);
        self.avg_noise = beta * self.avg_noise + (1.0 - beta) * residual;
        self.var_noise =
            beta * self.var_noise + (1.0 - beta) * (self.avg_noise - residual).powi(2);
        if self.var_noise < 1.0 {
            self.var_noise = 1.0;
        }
    }
}

#![warn(rust_2018_idioms)]

//! Delay-based bandwidth estimation on the receiving side.
//!
//! Packet arrivals are bucketed into timestamp groups, cross-group delay
//! variations feed a Kalman filter, an adaptive-threshold detector turns the
//! filtered queueing-delay offset into a bandwidth-usage signal, and an AIMD
//! controller turns that signal into a target bitrate.
//!
//! Adapted from the webrtc.org remote bitrate estimator.

pub mod detector;
pub mod estimator;
pub mod inter_arrival;
pub mod rate_control;
pub mod rate_counter;
pub mod remote;

pub use detector::OveruseDetector;
pub use estimator::OveruseEstimator;
pub use inter_arrival::{InterArrival, InterArrivalDelta};
pub use rate_control::{AimdRateControl, RateControlState};
pub use rate_counter::{RateBucket, RateCounter};
pub use remote::RemoteBitrateEstimator;

/// Bandwidth usage as seen by the overuse detector.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum BandwidthUsage {
    #[default]
    Normal,
    Underusing,
    Overusing,
}

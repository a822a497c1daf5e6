//! Inter-arrival time and size filter.
//!
//! Packets whose send timestamps lie close together are merged into groups;
//! deltas are only reported between completed groups, so a group is never
//! emitted until its successor has started.

use shared::serial::{uint32_gt, uint32_sub};

/// Packets arriving this close together are treated as one burst.
pub const BURST_DELTA_THRESHOLD_MS: i64 = 5;

#[derive(Debug, Clone)]
struct TimestampGroup {
    arrival_time: i64,
    first_timestamp: u32,
    last_timestamp: u32,
    size: i64,
}

impl TimestampGroup {
    fn new(timestamp: u32) -> Self {
        Self {
            arrival_time: 0,
            first_timestamp: timestamp,
            last_timestamp: timestamp,
            size: 0,
        }
    }
}

/// Deltas between the two most recently completed timestamp groups.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InterArrivalDelta {
    /// Send-timestamp delta in timestamp units, 32-bit wrapping
    pub timestamp: u32,
    /// Arrival-time delta in milliseconds
    pub arrival_time: i64,
    /// Accumulated size delta in bytes, may be negative
    pub size: i64,
}

/// Groups packet arrivals and computes cross-group deltas.
#[derive(Debug, Clone)]
pub struct InterArrival {
    group_length: u32,
    timestamp_to_ms: f64,
    current_group: Option<TimestampGroup>,
    previous_group: Option<TimestampGroup>,
}

impl InterArrival {
    /// `group_length` is the group span in timestamp units and
    /// `timestamp_to_ms` the scale from those units to milliseconds.
    pub fn new(group_length: u32, timestamp_to_ms: f64) -> Self {
        Self {
            group_length,
            timestamp_to_ms,
            current_group: None,
            previous_group: None,
        }
    }

    /// Feeds one packet arrival; returns deltas when the packet starts a new
    /// group and a completed pair exists.
    pub fn compute_deltas(
        &mut self,
        timestamp: u32,
        arrival_time: i64,
        packet_size: usize,
    ) -> Option<InterArrivalDelta> {
        let mut deltas = None;

        if self.current_group.is_none() {
            self.current_group = Some(TimestampGroup::new(timestamp));
        } else if self.packet_out_of_order(timestamp) {
            return None;
        } else if self.new_timestamp_group(timestamp, arrival_time) {
            if let (Some(current), Some(previous)) = (&self.current_group, &self.previous_group) {
                deltas = Some(InterArrivalDelta {
                    timestamp: uint32_sub(current.last_timestamp, previous.last_timestamp),
                    arrival_time: current.arrival_time - previous.arrival_time,
                    size: current.size - previous.size,
                });
            }

            // shift groups
            self.previous_group = self.current_group.take();
            self.current_group = Some(TimestampGroup::new(timestamp));
        } else {
            let current = self.current_group.as_mut().unwrap();
            if uint32_gt(timestamp, current.last_timestamp) {
                current.last_timestamp = timestamp;
            }
        }

        let current = self.current_group.as_mut().unwrap();
        current.size += packet_size as i64;
        current.arrival_time = arrival_time;

        deltas
    }

    fn belongs_to_burst(&self, timestamp: u32, arrival_time: i64) -> bool {
        let current = self.current_group.as_ref().unwrap();
        let timestamp_delta = uint32_sub(timestamp, current.last_timestamp);
        let timestamp_delta_ms = (self.timestamp_to_ms * timestamp_delta as f64).round() as i64;
        let arrival_time_delta = arrival_time - current.arrival_time;
        timestamp_delta_ms == 0
            || (arrival_time_delta - timestamp_delta_ms < 0
                && arrival_time_delta <= BURST_DELTA_THRESHOLD_MS)
    }

    fn new_timestamp_group(&self, timestamp: u32, arrival_time: i64) -> bool {
        if self.belongs_to_burst(timestamp, arrival_time) {
            false
        } else {
            let current = self.current_group.as_ref().unwrap();
            uint32_sub(timestamp, current.first_timestamp) > self.group_length
        }
    }

    fn packet_out_of_order(&self, timestamp: u32) -> bool {
        let current = self.current_group.as_ref().unwrap();
        uint32_sub(timestamp, current.first_timestamp) >= 0x8000_0000
    }
}

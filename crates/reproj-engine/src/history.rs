//! Bounded history of submitted pose samples.

use std::collections::VecDeque;

use reproj_core::PoseInfo;

/// FIFO of the most recent submitted [`PoseInfo`]s, oldest first.
///
/// Only the timestamps are used, to estimate the application's frame
/// interval.
#[derive(Clone, Debug)]
pub struct PoseHistory<D = ()> {
    entries: VecDeque<PoseInfo<D>>,
    capacity: usize,
}

impl<D> PoseHistory<D> {
    /// Create an empty history holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest ones past capacity.
    pub fn push(&mut self, info: PoseInfo<D>) {
        self.entries.push_back(info);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been submitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&PoseInfo<D>> {
        self.entries.back()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &PoseInfo<D>> {
        self.entries.iter()
    }

    /// Mean interval between consecutive entries, if there are at least two.
    #[must_use]
    pub fn mean_interval(&self) -> Option<f64> {
        if self.entries.len() < 2 {
            return None;
        }
        let total: f64 = self
            .entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .map(|(older, newer)| newer.time - older.time)
            .sum();
        Some(total / (self.entries.len() - 1) as f64)
    }

    /// Estimated display time of the next submitted frame.
    ///
    /// With fewer than two entries there is no interval to average and
    /// `default_interval` itself is returned.
    #[must_use]
    pub fn predicted_display_time(&self, default_interval: f64) -> f64 {
        match (self.latest(), self.mean_interval()) {
            (Some(latest), Some(interval)) => latest.time + interval,
            _ => default_interval,
        }
    }
}

/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sum of measurements for one aggregate key
///
/// `count` is the number of folded measurement instances,
/// `histogram` maps each bucket label to its summed count.
/// Sums saturate at `u64::MAX`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    count: u64,
    histogram: BTreeMap<u64, u64>,
}

impl Accumulator {
    /// All-zero accumulator over the full bucket label set
    pub fn with_labels(labels: &[u64]) -> Self {
        Self {
            count: 0,
            histogram: labels.iter().map(|&label| (label, 0)).collect(),
        }
    }

    /// Number of folded measurement instances
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Summed count per bucket label
    pub fn histogram(&self) -> &BTreeMap<u64, u64> {
        &self.histogram
    }

    /// Summed count of a bucket, zero when the label is absent
    pub fn bucket(&self, label: u64) -> u64 {
        self.histogram.get(&label).copied().unwrap_or_default()
    }

    /// Adds value to the bucket of a label
    pub fn add(&mut self, label: u64, value: u64) {
        let bucket = self.histogram.entry(label).or_default();
        *bucket = bucket.saturating_add(value);
    }

    /// Adds number of folded measurement instances
    pub fn add_count(&mut self, value: u64) {
        self.count = self.count.saturating_add(value);
    }

    /// Combines two accumulators of the same key
    ///
    /// Counts and buckets are added elementwise, a label present on one side only
    /// is taken as zero on the other
    pub fn merge(self, other: Self) -> Self {
        let (mut target, source) = if self.histogram.len() >= other.histogram.len() {
            (self, other)
        } else {
            (other, self)
        };

        target.add_count(source.count);
        for (label, value) in source.histogram {
            target.add(label, value);
        }

        target
    }
}

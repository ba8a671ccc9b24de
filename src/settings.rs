/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::num::NonZeroUsize;
use std::thread::available_parallelism;

use serde::Deserialize;

/// Settings of the aggregation driver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    partitions: usize,
}

impl AggregationSettings {
    /// Changes number of partitions pings are split into
    ///
    /// # Arguments
    ///
    /// * `partitions`: number of shards folded in parallel, at least one is used
    pub fn with_partitions(self, partitions: usize) -> Self {
        Self {
            partitions: partitions.max(1),
        }
    }

    /// Returns number of partitions
    pub fn partitions(&self) -> usize {
        self.partitions.max(1)
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            partitions: available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
pub use accumulator::*;
pub use storage::*;

mod accumulator;
mod storage;

/// Storage for aggregation of accumulators
///
/// Merge has to be associative and commutative, so partial storages
/// built on any partition of pings can be combined in any order
pub trait AggregateStorage: Default + Send {
    type Key;

    /// Folds contribution into accumulator stored under the key
    ///
    /// # Arguments
    ///
    /// * `key`: aggregate the contribution belongs to
    /// * `contribution`: accumulator produced for a single ping
    fn record(&mut self, key: Self::Key, contribution: Accumulator);

    /// Creates a new storage by merging together both storages
    ///
    /// # Arguments
    ///
    /// * `other`: other storage of the same type
    fn merge(self, other: Self) -> Self;
}

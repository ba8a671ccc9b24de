/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::sync::Arc;

pub use memory::*;
pub use writer::*;

use crate::aggregate::Accumulator;
use crate::dimension::{AggregateKey, DimensionKey, Granularity, MetricId};
use crate::error::StoreError;

mod memory;
mod writer;

/// Persisted aggregate rows
///
/// Written only by [`StoreWriter`], read by the query surface
#[allow(async_fn_in_trait)]
#[trait_variant::make(AggregateStore: Send)]
pub trait LocalAggregateStore {
    /// Replaces rows of a dimension key atomically
    ///
    /// Every listed row is overwritten, rows of the dimension that are not
    /// listed stay as they are
    ///
    /// # Arguments
    ///
    /// * `dimension`: dimension key all rows belong to
    /// * `rows`: accumulators per metric id to store
    async fn replace(
        &self,
        dimension: &DimensionKey,
        rows: Vec<(MetricId, Accumulator)>,
    ) -> Result<(), StoreError>;

    /// Reads a single row
    async fn get(&self, key: &AggregateKey) -> Result<Option<Accumulator>, StoreError>;

    /// Reads all rows of a granularity, optionally limited to one channel
    async fn scan(
        &self,
        granularity: Granularity,
        channel: Option<&str>,
    ) -> Result<Vec<(AggregateKey, Accumulator)>, StoreError>;
}

impl<S> AggregateStore for Arc<S>
where
    S: AggregateStore + Send + Sync,
{
    async fn replace(
        &self,
        dimension: &DimensionKey,
        rows: Vec<(MetricId, Accumulator)>,
    ) -> Result<(), StoreError> {
        self.as_ref().replace(dimension, rows).await
    }

    async fn get(&self, key: &AggregateKey) -> Result<Option<Accumulator>, StoreError> {
        self.as_ref().get(key).await
    }

    async fn scan(
        &self,
        granularity: Granularity,
        channel: Option<&str>,
    ) -> Result<Vec<(AggregateKey, Accumulator)>, StoreError> {
        self.as_ref().scan(granularity, channel).await
    }
}

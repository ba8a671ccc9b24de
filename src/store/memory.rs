/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::aggregate::Accumulator;
use crate::dimension::{AggregateKey, DimensionKey, Granularity, MetricId};
use crate::error::StoreError;
use crate::store::AggregateStore;

/// In-memory aggregate store
///
/// Keeps every row JSON encoded, the same way a database column would
#[derive(Debug, Default)]
pub struct MemoryAggregateStore {
    rows: RwLock<FxHashMap<AggregateKey, Vec<u8>>>,
}

impl MemoryAggregateStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` when no row is stored
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn decode(value: &[u8]) -> Result<Accumulator, StoreError> {
    serde_json::from_slice(value).map_err(StoreError::Decode)
}

impl AggregateStore for MemoryAggregateStore {
    async fn replace(
        &self,
        dimension: &DimensionKey,
        rows: Vec<(MetricId, Accumulator)>,
    ) -> Result<(), StoreError> {
        let encoded = rows
            .into_iter()
            .map(|(metric, accumulator)| {
                let value = serde_json::to_vec(&accumulator).map_err(StoreError::Encode)?;
                Ok((AggregateKey::new(dimension.clone(), metric), value))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        self.rows.write().await.extend(encoded);
        Ok(())
    }

    async fn get(&self, key: &AggregateKey) -> Result<Option<Accumulator>, StoreError> {
        self.rows
            .read()
            .await
            .get(key)
            .map(|value| decode(value))
            .transpose()
    }

    async fn scan(
        &self,
        granularity: Granularity,
        channel: Option<&str>,
    ) -> Result<Vec<(AggregateKey, Accumulator)>, StoreError> {
        let rows = self.rows.read().await;

        let mut result = rows
            .iter()
            .filter(|(key, _)| key.granularity() == granularity)
            .filter(|(key, _)| channel.map_or(true, |channel| key.dimension.channel() == channel))
            .map(|(key, value)| Ok((key.clone(), decode(value)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;

        result.sort_by(|(left, _), (right, _)| left.cmp(right));
        Ok(result)
    }
}

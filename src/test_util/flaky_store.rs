/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::aggregate::Accumulator;
use crate::dimension::{AggregateKey, DimensionKey, Granularity, MetricId};
use crate::error::StoreError;
use crate::store::{AggregateStore, MemoryAggregateStore};

/// Store that rejects writes once a number of replacements went through
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryAggregateStore,
    fail_after: usize,
    failing: AtomicBool,
    replaced: AtomicUsize,
}

impl FlakyStore {
    /// Store rejecting every write after the first `replacements` ones
    pub fn failing_after(replacements: usize) -> Self {
        Self {
            fail_after: replacements,
            failing: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Number of successful replacements
    pub fn replaced(&self) -> usize {
        self.replaced.load(Ordering::SeqCst)
    }

    /// Accepts all following writes
    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Store holding successfully written rows
    pub fn inner(&self) -> &MemoryAggregateStore {
        &self.inner
    }
}

impl AggregateStore for FlakyStore {
    async fn replace(
        &self,
        dimension: &DimensionKey,
        rows: Vec<(MetricId, Accumulator)>,
    ) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) && self.replaced() >= self.fail_after {
            return Err(StoreError::Unavailable(format!(
                "write of {dimension} rejected"
            )));
        }

        self.inner.replace(dimension, rows).await?;
        self.replaced.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &AggregateKey) -> Result<Option<Accumulator>, StoreError> {
        self.inner.get(key).await
    }

    async fn scan(
        &self,
        granularity: Granularity,
        channel: Option<&str>,
    ) -> Result<Vec<(AggregateKey, Accumulator)>, StoreError> {
        self.inner.scan(granularity, channel).await
    }
}

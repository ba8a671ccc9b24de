/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use tracing::{debug, info};

use crate::aggregate::{AccumulatorStorage, Aggregates};
use crate::dimension::{AggregateKey, Granularity};
use crate::error::SubmitError;
use crate::store::AggregateStore;

/// Number of dimension keys written by a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitSummary {
    /// Distinct build level dimension keys
    pub build_id_count: usize,
    /// Distinct submission date level dimension keys
    pub submission_date_count: usize,
}

/// Idempotent store writer
///
/// Every row of a batch replaces the stored one, so submitting the same
/// aggregates again leaves the store unchanged
#[derive(Debug)]
pub struct StoreWriter<S> {
    store: S,
}

impl<S> StoreWriter<S>
where
    S: AggregateStore,
{
    /// Writer on top of a store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Store rows are written to
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists aggregates of both granularities
    ///
    /// Each dimension key is written in its own transaction. On failure the
    /// error names the dimension that was not written, the whole batch can be
    /// submitted again.
    #[tracing::instrument(skip_all, err)]
    pub async fn submit(&self, aggregates: &Aggregates) -> Result<SubmitSummary, SubmitError> {
        let summary = SubmitSummary {
            build_id_count: self
                .write(aggregates.storage(Granularity::BuildId))
                .await?,
            submission_date_count: self
                .write(aggregates.storage(Granularity::SubmissionDate))
                .await?,
        };

        info!(
            build_id_count = summary.build_id_count,
            submission_date_count = summary.submission_date_count,
            "Submitted aggregates"
        );

        Ok(summary)
    }

    async fn write(
        &self,
        storage: &AccumulatorStorage<AggregateKey>,
    ) -> Result<usize, SubmitError> {
        let mut groups = storage.by_dimension().into_iter().collect::<Vec<_>>();
        groups.sort_by(|(left, _), (right, _)| left.cmp(right));

        for (dimension, rows) in groups.iter() {
            let rows = rows
                .iter()
                .map(|(key, accumulator)| (key.metric.clone(), (*accumulator).clone()))
                .collect();

            self.store
                .replace(dimension, rows)
                .await
                .map_err(|source| SubmitError::Store {
                    dimension: (*dimension).clone(),
                    source,
                })?;

            debug!(dimension = %dimension, "Replaced aggregates");
        }

        Ok(groups.len())
    }
}

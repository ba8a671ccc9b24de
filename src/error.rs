/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use thiserror::Error;
use tokio::task::JoinError;

use crate::dimension::DimensionKey;
use crate::resolver::HistogramKind;

/// Reasons a metric cannot be mapped to a bucket layout
///
/// Never returned from extraction, the metric is dropped instead
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// No histogram definition is registered under the name
    #[error("Histogram definition for {0} is not known")]
    UnknownMetric(String),

    /// Client reported a type code outside of the known kinds
    #[error("Histogram type code {0} is not supported")]
    UnknownHistogramType(u8),

    /// Reported type code contradicts the registered definition
    #[error("Histogram {metric} is defined as {expected:?} but reported as {declared:?}")]
    KindMismatch {
        /// Histogram name
        metric: String,
        /// Kind from the registry
        expected: HistogramKind,
        /// Kind derived from the reported type code
        declared: HistogramKind,
    },
}

/// Failure to load histogram definitions
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Definitions are not valid JSON of the expected shape
    #[error("Failed to parse histogram definitions")]
    Json(#[from] serde_json::Error),

    /// Definition parameters cannot produce a bucket layout
    #[error("Histogram definition {metric} is invalid: {reason}")]
    InvalidDefinition {
        /// Histogram name
        metric: String,
        /// Violated constraint
        reason: &'static str,
    },
}

/// Failure of an aggregate store operation
#[derive(Error, Debug)]
pub enum StoreError {
    /// Accumulator could not be serialized
    #[error("Failed to encode aggregate row")]
    Encode(#[source] serde_json::Error),

    /// Stored row is not a valid accumulator
    #[error("Failed to decode aggregate row")]
    Decode(#[source] serde_json::Error),

    /// Backend refused or lost the operation
    #[error("Aggregate store is not available: {0}")]
    Unavailable(String),
}

/// Fatal batch failure
///
/// Rows written before the failure stay in place, re-running the whole batch is safe
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Rows of a dimension key were not replaced
    #[error("Failed to replace aggregates for {dimension}")]
    Store {
        /// Dimension key that was not written
        dimension: DimensionKey,
        /// Store failure
        #[source]
        source: StoreError,
    },
}

/// Failure of a parallel aggregation run, nothing is written
#[derive(Error, Debug)]
pub enum AggregationError {
    /// Partition worker panicked or was cancelled
    #[error("Partition worker did not complete")]
    Partition(#[from] JoinError),
}

/// Rejected query
///
/// Unknown channels, dates or metrics are not errors
#[derive(Error, Debug)]
pub enum QueryError {
    /// Selector is not `<version>_<YYYYMMDD>`
    #[error("Expected <version>_<date> selector, got {0:?}")]
    MalformedVersionDate(String),

    /// Granularity name is neither `build_id` nor `submission_date`
    #[error("Unknown aggregate granularity {0:?}")]
    UnknownGranularity(String),

    /// Store failed while reading
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_kind_mismatch() {
        let error = ResolveError::KindMismatch {
            metric: "GC_MS".into(),
            expected: HistogramKind::Exponential,
            declared: HistogramKind::Linear,
        };

        assert_eq!(
            error.to_string(),
            "Histogram GC_MS is defined as Exponential but reported as Linear"
        );
    }

    #[test]
    fn can_be_created_from_store_error() {
        let error: QueryError = StoreError::Unavailable("connection reset".into()).into();

        assert_eq!(
            error.to_string(),
            "Aggregate store is not available: connection reset"
        );
    }
}

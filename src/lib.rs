/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
//! Aggregation of telemetry pings into per dimension histograms
//!
//! Pings are decomposed into weighted histogram contributions, combined in
//! parallel into build and submission date level aggregates and written to an
//! [`AggregateStore`](store::AggregateStore) so that repeated submission of the
//! same batch leaves stored data unchanged.
#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]

/// Accumulators and their keyed storage
pub mod aggregate;
/// Dimension, metric and aggregate keys
pub mod dimension;
/// Parallel aggregation of ping batches
pub mod driver;
/// Error types
pub mod error;
/// Decomposition of pings into weighted contributions
pub mod extract;
/// Submission record model
pub mod ping;
/// Read side over stored aggregates
pub mod query;
/// Histogram definitions by metric name
pub mod registry;
/// Bucket layouts and contribution resolution
pub mod resolver;
/// Driver configuration
pub mod settings;
/// Persistence of aggregates with replace per dimension key
pub mod store;

#[cfg(any(test, feature = "test_util"))]
pub mod test_util;

/// Commonly used types
pub mod prelude {
    pub use crate::aggregate::{Accumulator, AccumulatorStorage, AggregateStorage, Aggregates};
    pub use crate::dimension::{AggregateKey, DimensionKey, Granularity, MetricId};
    pub use crate::driver::Aggregator;
    pub use crate::error::{
        AggregationError, QueryError, RegistryError, ResolveError, StoreError, SubmitError,
    };
    pub use crate::extract::extract;
    pub use crate::ping::{HistogramValue, MeasurementValue, Payload, Ping};
    pub use crate::query::{AggregateResponse, DateVersion, QueryService};
    pub use crate::registry::{HistogramDefinition, HistogramRegistry};
    pub use crate::resolver::{BucketLayout, BucketResolver, HistogramKind};
    pub use crate::settings::AggregationSettings;
    pub use crate::store::{AggregateStore, MemoryAggregateStore, StoreWriter, SubmitSummary};
}

/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::Accumulator;
use crate::error::ResolveError;
use crate::ping::HistogramValue;

/// Upper bound of the bucket layout used for simple measurements
pub const SCALAR_HIGH: u64 = u32::MAX as u64;

/// Number of buckets in the simple measurement layout
pub const SCALAR_BUCKETS: usize = 50;

/// Numeric semantics of a histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramKind {
    /// Exponentially growing bucket widths
    Exponential,
    /// Equal bucket widths
    Linear,
    /// Two values, flag histograms included
    #[serde(alias = "flag")]
    Boolean,
    /// One bucket per value
    Enumerated,
    /// Counter, every report counts once
    Count,
    /// Simple measurement layout
    Scalar,
}

impl HistogramKind {
    /// Maps type code reported by clients, flag histograms are treated as boolean
    pub fn from_type_code(code: u8) -> Result<Self, ResolveError> {
        match code {
            0 => Ok(Self::Exponential),
            1 => Ok(Self::Linear),
            2 | 3 => Ok(Self::Boolean),
            4 => Ok(Self::Count),
            5 => Ok(Self::Enumerated),
            code => Err(ResolveError::UnknownHistogramType(code)),
        }
    }
}

/// Ordered bucket labels of a histogram together with its kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLayout {
    kind: HistogramKind,
    labels: Arc<[u64]>,
}

/// Lookup of bucket layouts for metrics
///
/// Implementations are deterministic and side effect free
pub trait BucketResolver: Send + Sync {
    /// Resolves layout of a histogram or keyed histogram value
    fn resolve(&self, metric: &str, value: &HistogramValue)
        -> Result<BucketLayout, ResolveError>;

    /// Resolves layout of a simple measurement
    fn resolve_scalar(&self, _metric: &str) -> Result<BucketLayout, ResolveError> {
        Ok(BucketLayout::scalar())
    }
}

impl BucketLayout {
    /// Layout of given kind over sorted labels
    pub fn new(kind: HistogramKind, labels: impl Into<Arc<[u64]>>) -> Self {
        Self {
            kind,
            labels: labels.into(),
        }
    }

    /// Exponential layout of `bucket_count` labels between `low` and `high`
    pub fn exponential(low: u64, high: u64, bucket_count: usize) -> Self {
        Self::new(
            HistogramKind::Exponential,
            exponential_labels(low, high, bucket_count),
        )
    }

    /// Linear layout of `bucket_count` labels between `low` and `high`
    pub fn linear(low: u64, high: u64, bucket_count: usize) -> Self {
        Self::new(HistogramKind::Linear, linear_labels(low, high, bucket_count))
    }

    /// Labels `0, 1, 2`
    pub fn boolean() -> Self {
        Self::new(HistogramKind::Boolean, linear_labels(1, 2, 3))
    }

    /// Labels `0, 1, 2`, only the first receives values
    pub fn count() -> Self {
        Self::new(HistogramKind::Count, linear_labels(1, 2, 3))
    }

    /// Labels `0..=max`
    pub fn enumerated(max: u64) -> Self {
        Self::new(
            HistogramKind::Enumerated,
            linear_labels(1, max, max as usize + 1),
        )
    }

    /// Layout of simple measurements
    pub fn scalar() -> Self {
        Self::new(
            HistogramKind::Scalar,
            exponential_labels(1, SCALAR_HIGH, SCALAR_BUCKETS),
        )
    }

    /// Kind the layout was built for
    pub fn kind(&self) -> HistogramKind {
        self.kind
    }

    /// Canonical bucket labels in ascending order
    pub fn labels(&self) -> &[u64] {
        &self.labels
    }

    /// Canonical bucket a reported label falls into
    ///
    /// Greatest canonical label not exceeding the reported one
    pub fn bucket_for(&self, label: u64) -> Option<u64> {
        match self.labels.binary_search(&label) {
            Ok(_) => Some(label),
            Err(0) => None,
            Err(position) => Some(self.labels[position - 1]),
        }
    }

    /// Contribution of a reported histogram observed `weight` times
    ///
    /// `None` when weighted bucket values do not fit into `u64`
    pub fn histogram_contribution(
        &self,
        value: &HistogramValue,
        weight: u64,
    ) -> Option<Accumulator> {
        let mut accumulator = Accumulator::with_labels(self.labels());

        match self.kind {
            HistogramKind::Count => {
                if let Some(&first) = self.labels.first() {
                    accumulator.add(first, weight);
                }
            }
            HistogramKind::Exponential
            | HistogramKind::Linear
            | HistogramKind::Boolean
            | HistogramKind::Enumerated
            | HistogramKind::Scalar => {
                let mut total: u64 = 0;
                for (&label, &count) in value.values.iter() {
                    let Some(bucket) = self.bucket_for(label) else {
                        continue;
                    };

                    let weighted = count.checked_mul(weight)?;
                    total = total.checked_add(weighted)?;
                    accumulator.add(bucket, weighted);
                }
            }
        }

        accumulator.add_count(weight);
        Some(accumulator)
    }

    /// Contribution of a single integer measurement
    pub fn scalar_contribution(&self, value: u64, weight: u64) -> Accumulator {
        let mut accumulator = Accumulator::with_labels(self.labels());

        if let Some(bucket) = self.bucket_for(value) {
            accumulator.add(bucket, weight);
        }

        accumulator.add_count(weight);
        accumulator
    }
}

fn exponential_labels(low: u64, high: u64, bucket_count: usize) -> Vec<u64> {
    let mut labels = vec![0; bucket_count];
    if bucket_count < 2 {
        return labels;
    }

    let log_max = (high as f64).ln();
    let mut current = low;
    labels[1] = current;

    for index in 2..bucket_count {
        let log_current = (current as f64).ln();
        let log_ratio = (log_max - log_current) / (bucket_count - index) as f64;
        let next = ((log_current + log_ratio).exp() + 0.5).floor() as u64;
        current = if next > current { next } else { current + 1 };
        labels[index] = current;
    }

    labels
}

fn linear_labels(low: u64, high: u64, bucket_count: usize) -> Vec<u64> {
    if bucket_count < 3 {
        return vec![0; bucket_count];
    }

    let (low, high) = (low as f64, high as f64);
    let steps = (bucket_count - 2) as f64;

    (0..bucket_count)
        .map(|index| match index {
            0 => 0,
            index => {
                let value = (low * (bucket_count - 1 - index) as f64
                    + high * (index - 1) as f64)
                    / steps;
                (value + 0.5) as u64
            }
        })
        .collect()
}

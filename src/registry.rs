/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{RegistryError, ResolveError};
use crate::ping::HistogramValue;
use crate::resolver::{BucketLayout, BucketResolver, HistogramKind};

/// Largest number of buckets a histogram definition may declare
pub const MAX_BUCKETS: u32 = 10_000;

/// Bucket parameters of a single histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HistogramDefinition {
    /// Numeric semantics
    pub kind: HistogramKind,
    /// Lowest non-zero bucket label
    #[serde(default = "default_low")]
    pub low: u64,
    /// Highest bucket label, the largest value for enumerated histograms
    #[serde(default)]
    pub high: u64,
    /// Number of buckets including the zero bucket
    #[serde(default)]
    pub n_buckets: u32,
}

/// Registry of histogram definitions
///
/// Layouts are computed once on load and only read afterwards
#[derive(Debug, Clone)]
pub struct HistogramRegistry {
    layouts: FxHashMap<String, BucketLayout>,
    scalar: BucketLayout,
}

fn default_low() -> u64 {
    1
}

impl HistogramDefinition {
    /// Exponential histogram definition
    pub fn exponential(low: u64, high: u64, n_buckets: u32) -> Self {
        Self {
            kind: HistogramKind::Exponential,
            low,
            high,
            n_buckets,
        }
    }

    /// Linear histogram definition
    pub fn linear(low: u64, high: u64, n_buckets: u32) -> Self {
        Self {
            kind: HistogramKind::Linear,
            low,
            high,
            n_buckets,
        }
    }

    /// Enumerated histogram of values `0..=n_values`
    pub fn enumerated(n_values: u32) -> Self {
        Self {
            kind: HistogramKind::Enumerated,
            low: 1,
            high: u64::from(n_values),
            n_buckets: n_values.saturating_add(1),
        }
    }

    /// Boolean histogram definition
    pub fn boolean() -> Self {
        Self::fixed(HistogramKind::Boolean)
    }

    /// Count histogram definition
    pub fn count() -> Self {
        Self::fixed(HistogramKind::Count)
    }

    fn fixed(kind: HistogramKind) -> Self {
        Self {
            kind,
            low: 1,
            high: 2,
            n_buckets: 3,
        }
    }

    fn layout(&self, metric: &str) -> Result<BucketLayout, RegistryError> {
        let invalid = |reason| RegistryError::InvalidDefinition {
            metric: metric.to_string(),
            reason,
        };

        match self.kind {
            HistogramKind::Exponential | HistogramKind::Linear => {
                if self.low < 1 {
                    return Err(invalid("low bound must be at least 1"));
                }
                if self.high <= self.low {
                    return Err(invalid("high bound must exceed low bound"));
                }
                if self.n_buckets < 3 {
                    return Err(invalid("at least 3 buckets are required"));
                }
                if self.n_buckets > MAX_BUCKETS {
                    return Err(invalid("number of buckets exceeds the limit"));
                }

                let bucket_count = self.n_buckets as usize;
                Ok(match self.kind {
                    HistogramKind::Exponential => {
                        BucketLayout::exponential(self.low, self.high, bucket_count)
                    }
                    _ => BucketLayout::linear(self.low, self.high, bucket_count),
                })
            }
            HistogramKind::Enumerated => match self.high {
                0 => Err(invalid("enumerated histogram requires at least one value")),
                high if high >= u64::from(MAX_BUCKETS) => {
                    Err(invalid("number of buckets exceeds the limit"))
                }
                high => Ok(BucketLayout::enumerated(high)),
            },
            HistogramKind::Boolean => Ok(BucketLayout::boolean()),
            HistogramKind::Count => Ok(BucketLayout::count()),
            HistogramKind::Scalar => Ok(BucketLayout::scalar()),
        }
    }
}

impl Default for HistogramRegistry {
    fn default() -> Self {
        Self {
            layouts: FxHashMap::default(),
            scalar: BucketLayout::scalar(),
        }
    }
}

impl HistogramRegistry {
    /// Builds layouts of all definitions, failing on the first invalid one
    pub fn from_definitions<I, N>(definitions: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (N, HistogramDefinition)>,
        N: Into<String>,
    {
        let layouts = definitions
            .into_iter()
            .map(|(metric, definition)| {
                let metric = metric.into();
                let layout = definition.layout(&metric)?;
                Ok((metric, layout))
            })
            .collect::<Result<_, RegistryError>>()?;

        Ok(Self {
            layouts,
            ..Self::default()
        })
    }

    /// Loads definitions from JSON object keyed by metric name
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let definitions: BTreeMap<String, HistogramDefinition> = serde_json::from_str(json)?;
        Self::from_definitions(definitions)
    }

    /// Layout registered for a metric
    pub fn layout(&self, metric: &str) -> Option<&BucketLayout> {
        self.layouts.get(metric)
    }

    /// Number of registered histograms
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Returns `true` when no histogram is registered
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

impl BucketResolver for HistogramRegistry {
    fn resolve(
        &self,
        metric: &str,
        value: &HistogramValue,
    ) -> Result<BucketLayout, ResolveError> {
        let layout = self
            .layouts
            .get(metric)
            .ok_or_else(|| ResolveError::UnknownMetric(metric.to_string()))?;

        let declared = HistogramKind::from_type_code(value.histogram_type)?;
        if declared != layout.kind() {
            return Err(ResolveError::KindMismatch {
                metric: metric.to_string(),
                expected: layout.kind(),
                declared,
            });
        }

        Ok(layout.clone())
    }

    fn resolve_scalar(&self, _metric: &str) -> Result<BucketLayout, ResolveError> {
        Ok(self.scalar.clone())
    }
}

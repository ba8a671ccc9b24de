/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::ping::Ping;

/// Format of dates used in query selectors and build date prefixes
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Shape of the dimension key an aggregate is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Build date level, addressed by `build_id`
    BuildId,
    /// Submission date level, addressed by `submission_date`
    SubmissionDate,
}

/// Group a ping contributes to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DimensionKey {
    /// Build level key
    Build {
        /// Date the ping was received on
        submission_date: NaiveDate,
        /// Release channel
        channel: String,
        /// Major version
        version: String,
        /// `YYYYMMDD` prefix of the build id
        build_date: String,
    },
    /// Submission date level key
    Date {
        /// Date the ping was received on
        submission_date: NaiveDate,
        /// Release channel
        channel: String,
        /// Major version
        version: String,
    },
}

/// Metric name with an optional keyed histogram label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    name: String,
    label: Option<String>,
}

/// Address of one persisted aggregate row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateKey {
    /// Group the row belongs to
    pub dimension: DimensionKey,
    /// Measured metric
    pub metric: MetricId,
}

impl Granularity {
    /// Name used in queries and store keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildId => "build_id",
            Self::SubmissionDate => "submission_date",
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "build_id" => Ok(Self::BuildId),
            "submission_date" => Ok(Self::SubmissionDate),
            other => Err(QueryError::UnknownGranularity(other.to_string())),
        }
    }
}

impl DimensionKey {
    /// Build level key of a ping, `None` when build id carries no date
    pub fn build(ping: &Ping) -> Option<Self> {
        Some(Self::Build {
            submission_date: ping.submission_date,
            channel: ping.channel.clone(),
            version: ping.major_version().to_string(),
            build_date: ping.build_date()?.to_string(),
        })
    }

    /// Submission date level key of a ping
    pub fn date(ping: &Ping) -> Self {
        Self::Date {
            submission_date: ping.submission_date,
            channel: ping.channel.clone(),
            version: ping.major_version().to_string(),
        }
    }

    /// Granularity of the key
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Build { .. } => Granularity::BuildId,
            Self::Date { .. } => Granularity::SubmissionDate,
        }
    }

    /// Release channel
    pub fn channel(&self) -> &str {
        match self {
            Self::Build { channel, .. } | Self::Date { channel, .. } => channel,
        }
    }

    /// Major version
    pub fn version(&self) -> &str {
        match self {
            Self::Build { version, .. } | Self::Date { version, .. } => version,
        }
    }

    /// Date the query surface addresses this key by
    ///
    /// Build date for build level keys, submission date otherwise
    pub fn query_date(&self) -> String {
        match self {
            Self::Build { build_date, .. } => build_date.clone(),
            Self::Date {
                submission_date, ..
            } => submission_date.format(DATE_FORMAT).to_string(),
        }
    }
}

impl Display for DimensionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build {
                submission_date,
                channel,
                version,
                build_date,
            } => write!(
                f,
                "build_id/{}/{channel}/{version}/{build_date}",
                submission_date.format(DATE_FORMAT)
            ),
            Self::Date {
                submission_date,
                channel,
                version,
            } => write!(
                f,
                "submission_date/{}/{channel}/{version}",
                submission_date.format(DATE_FORMAT)
            ),
        }
    }
}

impl MetricId {
    /// Metric without label
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }

    /// Label of a keyed histogram metric
    pub fn keyed(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: Some(label.into()),
        }
    }

    /// Histogram or simple measurement name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label of a keyed histogram, `None` otherwise
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl AggregateKey {
    /// Key of a metric within a dimension
    pub fn new(dimension: DimensionKey, metric: MetricId) -> Self {
        Self { dimension, metric }
    }

    /// Granularity of the dimension key
    pub fn granularity(&self) -> Granularity {
        self.dimension.granularity()
    }
}

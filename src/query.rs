/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::Serialize;

use crate::aggregate::Accumulator;
use crate::dimension::Granularity;
use crate::error::QueryError;
use crate::store::AggregateStore;

/// Date and major version pair available for a channel
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DateVersion {
    /// `YYYYMMDD` build or submission date
    pub date: String,
    /// Major version
    pub version: String,
}

/// Aggregate as served to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResponse {
    /// Label of a keyed histogram
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Number of folded measurement instances
    pub count: u64,
    /// Summed count per bucket label
    pub histogram: BTreeMap<u64, u64>,
}

/// `<version>_<date>` selector used to address aggregates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDate {
    /// Major version
    pub version: String,
    /// `YYYYMMDD` date
    pub date: String,
}

/// Read side of persisted aggregates
///
/// Unknown channels, dates, metrics and labels produce empty results
#[derive(Debug)]
pub struct QueryService<S> {
    store: S,
}

impl FromStr for VersionDate {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || QueryError::MalformedVersionDate(value.to_string());
        let (version, date) = value.split_once('_').ok_or_else(malformed)?;

        if version.is_empty() || date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        Ok(Self {
            version: version.to_string(),
            date: date.to_string(),
        })
    }
}

impl AggregateResponse {
    fn new(label: Option<String>, accumulator: Accumulator) -> Self {
        Self {
            label,
            count: accumulator.count(),
            histogram: accumulator.histogram().clone(),
        }
    }
}

impl<S> QueryService<S>
where
    S: AggregateStore,
{
    /// Query service reading from a store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Channels with stored aggregates of a granularity
    pub async fn channels(&self, granularity: Granularity) -> Result<Vec<String>, QueryError> {
        let channels = self
            .store
            .scan(granularity, None)
            .await?
            .into_iter()
            .map(|(key, _)| key.dimension.channel().to_string())
            .collect::<BTreeSet<_>>();

        Ok(channels.into_iter().collect())
    }

    /// Distinct date and version pairs of a channel
    pub async fn dates(
        &self,
        granularity: Granularity,
        channel: &str,
    ) -> Result<Vec<DateVersion>, QueryError> {
        let dates = self
            .store
            .scan(granularity, Some(channel))
            .await?
            .into_iter()
            .map(|(key, _)| DateVersion {
                date: key.dimension.query_date(),
                version: key.dimension.version().to_string(),
            })
            .collect::<BTreeSet<_>>();

        Ok(dates.into_iter().collect())
    }

    /// Aggregate of a metric for `<version>_<date>` selector
    ///
    /// Build level rows of the same build date are combined across submission
    /// dates. Without a label every label of a keyed metric is returned separately.
    pub async fn aggregate(
        &self,
        granularity: Granularity,
        channel: &str,
        selector: &str,
        metric: &str,
        label: Option<&str>,
    ) -> Result<Vec<AggregateResponse>, QueryError> {
        let selector: VersionDate = selector.parse()?;
        let mut combined: BTreeMap<Option<String>, Accumulator> = BTreeMap::new();

        for (key, accumulator) in self.store.scan(granularity, Some(channel)).await? {
            if key.dimension.version() != selector.version
                || key.dimension.query_date() != selector.date
                || key.metric.name() != metric
                || label.is_some_and(|label| key.metric.label() != Some(label))
            {
                continue;
            }

            let entry = combined
                .entry(key.metric.label().map(str::to_string))
                .or_default();
            *entry = std::mem::take(entry).merge(accumulator);
        }

        Ok(combined
            .into_iter()
            .map(|(label, accumulator)| AggregateResponse::new(label, accumulator))
            .collect())
    }
}

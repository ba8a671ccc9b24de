/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::aggregate::{AggregateStorage, Aggregates};
use crate::error::AggregationError;
use crate::extract::extract_into;
use crate::ping::Ping;
use crate::resolver::BucketResolver;
use crate::settings::AggregationSettings;

/// Aggregation driver
///
/// Splits pings into partitions, folds every partition on its own blocking
/// worker and reduces partial results pairwise into one set of aggregates
#[derive(Debug)]
pub struct Aggregator<R> {
    resolver: Arc<R>,
    settings: AggregationSettings,
}

impl<R> Aggregator<R>
where
    R: BucketResolver + 'static,
{
    /// Driver with default settings
    pub fn new(resolver: impl Into<Arc<R>>) -> Self {
        Self::with_settings(resolver, AggregationSettings::default())
    }

    /// Driver with explicit settings
    pub fn with_settings(resolver: impl Into<Arc<R>>, settings: AggregationSettings) -> Self {
        Self {
            resolver: resolver.into(),
            settings,
        }
    }

    /// Folds pings of a single partition sequentially
    pub fn aggregate_partition(&self, pings: &[Ping]) -> Aggregates {
        fold_partition(self.resolver.as_ref(), pings)
    }

    /// Aggregates pings across all configured partitions
    ///
    /// Nothing is shared between partitions until the final reduction,
    /// dropping the returned future abandons all partial results
    #[tracing::instrument(skip_all, err)]
    pub async fn aggregate(
        &self,
        pings: impl IntoIterator<Item = Ping>,
    ) -> Result<Aggregates, AggregationError> {
        let partitions = split_into_partitions(pings, self.settings.partitions());
        let mut workers = JoinSet::new();

        for partition in partitions.into_iter().filter(|pings| !pings.is_empty()) {
            let resolver = self.resolver.clone();
            workers.spawn_blocking(move || fold_partition(resolver.as_ref(), &partition));
        }

        let mut partials = Vec::with_capacity(workers.len());
        while let Some(partial) = workers.join_next().await {
            partials.push(partial?);
        }

        debug!(partials = partials.len(), "Reducing partition aggregates");
        let aggregates = reduce(partials);

        info!(
            build_keys = aggregates.build_key_count(),
            date_keys = aggregates.date_key_count(),
            "Aggregated pings"
        );

        Ok(aggregates)
    }
}

/// Reduces storages pairwise until one remains
///
/// Empty input produces an empty storage
pub fn reduce<S>(partials: Vec<S>) -> S
where
    S: AggregateStorage,
{
    let mut level = partials;

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut storages = level.into_iter();

        while let Some(left) = storages.next() {
            next.push(match storages.next() {
                Some(right) => left.merge(right),
                None => left,
            });
        }

        level = next;
    }

    level.pop().unwrap_or_default()
}

fn fold_partition<R>(resolver: &R, pings: &[Ping]) -> Aggregates
where
    R: BucketResolver,
{
    pings.iter().fold(Aggregates::default(), |mut aggregates, ping| {
        extract_into(ping, resolver, &mut aggregates);
        aggregates
    })
}

fn split_into_partitions(pings: impl IntoIterator<Item = Ping>, count: usize) -> Vec<Vec<Ping>> {
    let count = count.max(1);
    let mut partitions: Vec<Vec<Ping>> = (0..count).map(|_| Vec::new()).collect();

    for (index, ping) in pings.into_iter().enumerate() {
        partitions[index % count].push(ping);
    }

    partitions
}

#[cfg(test)]
mod tests {
    use crate::aggregate::AccumulatorStorage;
    use crate::dimension::{AggregateKey, DimensionKey, Granularity, MetricId};
    use crate::registry::HistogramRegistry;
    use crate::test_util::{self, NUM_CHILDREN_PER_PING};

    use super::*;

    fn aggregator(partitions: usize) -> Aggregator<HistogramRegistry> {
        Aggregator::with_settings(
            test_util::registry(),
            AggregationSettings::default().with_partitions(partitions),
        )
    }

    #[test]
    fn splits_pings_round_robin() {
        let pings = test_util::generate_pings().take(7).collect::<Vec<_>>();

        let partitions = split_into_partitions(pings, 3);

        assert_eq!(
            partitions.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![3, 2, 2]
        );
    }

    #[test]
    fn reduces_any_number_of_partials() {
        let partials = (1..=5u64)
            .map(|count| {
                let mut storage = AccumulatorStorage::default();
                let mut contribution = crate::aggregate::Accumulator::with_labels(&[0]);
                contribution.add(0, count);
                contribution.add_count(count);
                storage.record("metric", contribution);
                storage
            })
            .collect::<Vec<_>>();

        let reduced = reduce(partials);

        assert_eq!(reduced.value(&"metric").unwrap().count(), 15);
        assert!(reduce(Vec::<AccumulatorStorage<&str>>::new()).is_empty());
    }

    #[tokio::test]
    async fn partition_count_does_not_change_result() {
        let single = aggregator(1)
            .aggregate(test_util::generate_pings())
            .await
            .unwrap();
        let several = aggregator(4)
            .aggregate(test_util::generate_pings())
            .await
            .unwrap();
        let uneven = aggregator(7)
            .aggregate(test_util::generate_pings().collect::<Vec<_>>().into_iter().rev())
            .await
            .unwrap();

        assert_eq!(single, several);
        assert_eq!(single, uneven);
    }

    #[tokio::test]
    async fn matches_sequential_fold_of_all_pings() {
        let aggregator = aggregator(3);
        let pings = test_util::generate_pings().collect::<Vec<_>>();

        let parallel = aggregator.aggregate(pings.clone()).await.unwrap();

        assert_eq!(parallel, aggregator.aggregate_partition(&pings));
    }

    #[tokio::test]
    async fn reports_distinct_keys_per_granularity() {
        let aggregates = aggregator(4)
            .aggregate(test_util::generate_pings())
            .await
            .unwrap();

        assert_eq!(
            aggregates.build_key_count(),
            test_util::SUBMISSION_DATES.len()
                * test_util::CHANNELS.len()
                * test_util::VERSIONS.len()
                * test_util::BUILD_IDS.len()
        );
        assert_eq!(
            aggregates.date_key_count(),
            test_util::SUBMISSION_DATES.len()
                * test_util::CHANNELS.len()
                * test_util::VERSIONS.len()
        );
    }

    #[tokio::test]
    async fn scales_histogram_count_by_reporting_processes() {
        let pings = test_util::generate_pings().collect::<Vec<_>>();
        let first = &pings[0];
        let expected_pings = pings
            .iter()
            .filter(|ping| DimensionKey::date(ping) == DimensionKey::date(first))
            .count() as u64;

        let aggregates = aggregator(2).aggregate(pings.clone()).await.unwrap();

        let histogram = aggregates
            .value(&AggregateKey::new(
                DimensionKey::date(first),
                MetricId::new(test_util::EXPONENTIAL_METRIC),
            ))
            .unwrap();
        assert_eq!(
            histogram.count(),
            expected_pings * (1 + u64::from(NUM_CHILDREN_PER_PING))
        );

        let simple = aggregates
            .value(&AggregateKey::new(
                DimensionKey::date(first),
                MetricId::new("SIMPLE_MEASURES_UPTIME"),
            ))
            .unwrap();
        assert_eq!(simple.count(), expected_pings);
        assert_eq!(
            aggregates.storage(Granularity::SubmissionDate).len(),
            aggregates.date_key_count() * test_util::metric_ids().len()
        );
    }

    #[tokio::test]
    async fn aggregates_nothing_from_empty_source() {
        let aggregates = aggregator(4).aggregate(Vec::new()).await.unwrap();

        assert_eq!(aggregates, Aggregates::default());
    }
}

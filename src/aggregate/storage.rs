/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::collections::hash_map::Entry;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::aggregate::{Accumulator, AggregateStorage};
use crate::dimension::{AggregateKey, DimensionKey, Granularity};

/// Accumulators stored per key
#[derive(Debug, Clone)]
pub struct AccumulatorStorage<K> {
    inner: FxHashMap<K, Accumulator>,
}

/// Finalized accumulators of both granularities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregates {
    build_id: AccumulatorStorage<AggregateKey>,
    submission_date: AccumulatorStorage<AggregateKey>,
}

impl<K> Default for AccumulatorStorage<K> {
    fn default() -> Self {
        Self {
            inner: FxHashMap::default(),
        }
    }
}

impl<K> PartialEq for AccumulatorStorage<K>
where
    K: Hash + Eq,
{
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<K> Eq for AccumulatorStorage<K> where K: Hash + Eq {}

impl<K> AccumulatorStorage<K>
where
    K: Hash + Eq,
{
    /// Accumulator stored under the key
    pub fn value(&self, key: &K) -> Option<&Accumulator> {
        self.inner.get(key)
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates stored accumulators in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Accumulator)> {
        self.inner.iter()
    }
}

impl AccumulatorStorage<AggregateKey> {
    /// Number of distinct dimension keys touched
    pub fn dimension_count(&self) -> usize {
        self.inner
            .keys()
            .map(|key| &key.dimension)
            .collect::<FxHashSet<_>>()
            .len()
    }

    /// Groups accumulators by dimension key
    pub fn by_dimension(&self) -> FxHashMap<&DimensionKey, Vec<(&AggregateKey, &Accumulator)>> {
        let mut groups: FxHashMap<_, Vec<_>> = FxHashMap::default();
        for (key, accumulator) in self.inner.iter() {
            groups
                .entry(&key.dimension)
                .or_default()
                .push((key, accumulator));
        }
        groups
    }
}

impl<K> AggregateStorage for AccumulatorStorage<K>
where
    K: Hash + Eq + Send,
{
    type Key = K;

    #[inline]
    fn record(&mut self, key: Self::Key, contribution: Accumulator) {
        match self.inner.entry(key) {
            Entry::Occupied(mut entry) => {
                let current = std::mem::take(entry.get_mut());
                *entry.get_mut() = current.merge(contribution);
            }
            Entry::Vacant(entry) => {
                entry.insert(contribution);
            }
        }
    }

    fn merge(self, other: Self) -> Self {
        let (mut target, source) = if self.inner.len() >= other.inner.len() {
            (self, other)
        } else {
            (other, self)
        };

        for (key, accumulator) in source.inner.into_iter() {
            target.record(key, accumulator);
        }

        target
    }
}

impl Aggregates {
    /// Accumulators of one granularity
    pub fn storage(&self, granularity: Granularity) -> &AccumulatorStorage<AggregateKey> {
        match granularity {
            Granularity::BuildId => &self.build_id,
            Granularity::SubmissionDate => &self.submission_date,
        }
    }

    /// Accumulator of an aggregate key
    pub fn value(&self, key: &AggregateKey) -> Option<&Accumulator> {
        self.storage(key.granularity()).value(key)
    }

    /// Distinct build level dimension keys touched
    pub fn build_key_count(&self) -> usize {
        self.build_id.dimension_count()
    }

    /// Distinct submission date level dimension keys touched
    pub fn date_key_count(&self) -> usize {
        self.submission_date.dimension_count()
    }
}

impl AggregateStorage for Aggregates {
    type Key = AggregateKey;

    #[inline]
    fn record(&mut self, key: Self::Key, contribution: Accumulator) {
        match key.granularity() {
            Granularity::BuildId => self.build_id.record(key, contribution),
            Granularity::SubmissionDate => self.submission_date.record(key, contribution),
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            build_id: self.build_id.merge(other.build_id),
            submission_date: self.submission_date.merge(other.submission_date),
        }
    }
}

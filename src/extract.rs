/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use tracing::{debug, warn};

use crate::aggregate::{Accumulator, AggregateStorage};
use crate::dimension::{AggregateKey, DimensionKey, MetricId};
use crate::ping::Ping;
use crate::resolver::BucketResolver;

/// Prefix of metric ids synthesized from simple measurements
pub const SIMPLE_MEASURES_PREFIX: &str = "SIMPLE_MEASURES_";

/// Metric id of a simple measurement, `uptime` becomes `SIMPLE_MEASURES_UPTIME`
pub fn simple_measure_metric(name: &str) -> String {
    format!("{SIMPLE_MEASURES_PREFIX}{}", name.to_uppercase())
}

/// Extracts measurements of a single ping
///
/// Every measurement is emitted once per granularity. Metrics that cannot be
/// resolved are dropped without affecting the rest of the ping.
pub fn extract(ping: &Ping, resolver: &impl BucketResolver) -> Vec<(AggregateKey, Accumulator)> {
    let Some(build_key) = DimensionKey::build(ping) else {
        warn!(build_id = %ping.build_id, "Dropping ping without build date");
        return Vec::new();
    };
    let date_key = DimensionKey::date(ping);

    measurements(ping, resolver)
        .into_iter()
        .flat_map(|(metric, accumulator)| {
            [
                (
                    AggregateKey::new(build_key.clone(), metric.clone()),
                    accumulator.clone(),
                ),
                (AggregateKey::new(date_key.clone(), metric), accumulator),
            ]
        })
        .collect()
}

/// Folds measurements of a ping into storage
pub fn extract_into<S>(ping: &Ping, resolver: &impl BucketResolver, storage: &mut S)
where
    S: AggregateStorage<Key = AggregateKey>,
{
    for (key, contribution) in extract(ping, resolver) {
        storage.record(key, contribution);
    }
}

fn measurements(ping: &Ping, resolver: &impl BucketResolver) -> Vec<(MetricId, Accumulator)> {
    let weight = ping.histogram_weight();
    let payload = &ping.payload;
    let mut result = Vec::with_capacity(
        payload.histograms.len()
            + payload.keyed_histograms.len()
            + payload.simple_measurements.len(),
    );

    for (name, value) in payload.histograms.iter() {
        match resolver.resolve(name, value) {
            Ok(layout) => match layout.histogram_contribution(value, weight) {
                Some(contribution) => result.push((MetricId::new(name.as_str()), contribution)),
                None => debug!(metric = %name, "Dropping histogram exceeding u64 range"),
            },
            Err(error) => debug!(metric = %name, error = %error, "Dropping histogram"),
        }
    }

    for (name, values) in payload.keyed_histograms.iter() {
        for (label, value) in values.iter() {
            match resolver.resolve(name, value) {
                Ok(layout) => match layout.histogram_contribution(value, weight) {
                    Some(contribution) => result.push((
                        MetricId::keyed(name.as_str(), label.as_str()),
                        contribution,
                    )),
                    None => debug!(
                        metric = %name,
                        label = %label,
                        "Dropping keyed histogram exceeding u64 range"
                    ),
                },
                Err(error) => {
                    debug!(metric = %name, label = %label, error = %error, "Dropping keyed histogram")
                }
            }
        }
    }

    for (name, value) in payload.simple_measurements.iter() {
        let Some(value) = value.as_scalar() else {
            debug!(measurement = %name, "Dropping non-integer simple measurement");
            continue;
        };

        let metric = simple_measure_metric(name);
        match resolver.resolve_scalar(&metric) {
            Ok(layout) => result.push((
                MetricId::new(metric),
                layout.scalar_contribution(value, 1),
            )),
            Err(error) => debug!(metric = %metric, error = %error, "Dropping simple measurement"),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::aggregate::Aggregates;
    use crate::dimension::Granularity;
    use crate::ping::{HistogramValue, MeasurementValue, Payload};
    use crate::registry::{HistogramDefinition, HistogramRegistry};

    use super::*;

    fn registry() -> HistogramRegistry {
        HistogramRegistry::from_definitions([
            ("GC_MS", HistogramDefinition::exponential(1, 100, 10)),
            ("DEVTOOLS_TOOLBOX_OPENED_COUNT", HistogramDefinition::count()),
            ("JS_FEATURES", HistogramDefinition::boolean()),
        ])
        .unwrap()
    }

    fn ping(payload: Payload) -> Ping {
        Ping {
            channel: "release".into(),
            version: "45.0".into(),
            build_id: "20150101000000".into(),
            submission_date: NaiveDate::from_ymd_opt(2015, 7, 1).unwrap(),
            process_count: 1,
            payload,
        }
    }

    fn find<'a>(
        extracted: &'a [(AggregateKey, Accumulator)],
        granularity: Granularity,
        metric: &MetricId,
    ) -> Option<&'a Accumulator> {
        extracted
            .iter()
            .find(|(key, _)| key.granularity() == granularity && &key.metric == metric)
            .map(|(_, accumulator)| accumulator)
    }

    #[test]
    fn emits_each_histogram_for_both_granularities() {
        let mut payload = Payload::default();
        payload
            .histograms
            .insert("GC_MS".into(), HistogramValue::new(0, [(5, 1)]));

        let extracted = extract(&ping(payload), &registry());

        assert_eq!(extracted.len(), 2);
        for granularity in [Granularity::BuildId, Granularity::SubmissionDate] {
            let accumulator = find(&extracted, granularity, &MetricId::new("GC_MS")).unwrap();
            assert_eq!(accumulator.count(), 2);
            assert_eq!(accumulator.bucket(5), 2);
        }
    }

    #[test]
    fn weights_keyed_histograms_per_label() {
        let mut payload = Payload::default();
        payload.keyed_histograms.insert(
            "JS_FEATURES".into(),
            [
                ("arrow".to_string(), HistogramValue::new(2, [(1, 1)])),
                ("spread".to_string(), HistogramValue::new(2, [(0, 1)])),
            ]
            .into(),
        );

        let extracted = extract(&ping(payload), &registry());

        let arrow = find(
            &extracted,
            Granularity::BuildId,
            &MetricId::keyed("JS_FEATURES", "arrow"),
        )
        .unwrap();
        assert_eq!(arrow.count(), 2);
        assert_eq!(arrow.bucket(1), 2);
        assert_eq!(arrow.bucket(0), 0);
        assert_eq!(extracted.len(), 4);
    }

    #[test]
    fn does_not_weight_simple_measurements_by_processes() {
        let mut payload = Payload::default();
        payload
            .simple_measurements
            .insert("uptime".into(), MeasurementValue::Integer(42));

        let extracted = extract(&ping(payload), &registry());

        let uptime = find(
            &extracted,
            Granularity::SubmissionDate,
            &MetricId::new("SIMPLE_MEASURES_UPTIME"),
        )
        .unwrap();
        assert_eq!(uptime.count(), 1);
        assert_eq!(uptime.bucket(33), 1);
    }

    #[test]
    fn drops_unresolvable_metrics_but_keeps_the_rest_of_ping() {
        let mut payload = Payload::default();
        payload
            .histograms
            .insert("UNKNOWN_METRIC".into(), HistogramValue::new(0, [(1, 1)]));
        payload
            .histograms
            .insert("GC_MS".into(), HistogramValue::new(1, [(1, 1)]));
        payload.histograms.insert(
            "DEVTOOLS_TOOLBOX_OPENED_COUNT".into(),
            HistogramValue::new(4, [(0, 1)]),
        );
        payload
            .simple_measurements
            .insert("firstPaint".into(), MeasurementValue::Float(1.5));
        payload.simple_measurements.insert(
            "addonManager".into(),
            MeasurementValue::Other(serde_json::json!({"startup": 1})),
        );

        let extracted = extract(&ping(payload), &registry());

        assert_eq!(extracted.len(), 2);
        assert!(extracted
            .iter()
            .all(|(key, _)| key.metric.name() == "DEVTOOLS_TOOLBOX_OPENED_COUNT"));
    }

    #[test]
    fn drops_histogram_exceeding_u64_but_keeps_sibling_metrics() {
        let mut payload = Payload::default();
        payload
            .histograms
            .insert("GC_MS".into(), HistogramValue::new(0, [(3, u64::MAX / 2 + 1)]));
        payload.histograms.insert(
            "DEVTOOLS_TOOLBOX_OPENED_COUNT".into(),
            HistogramValue::new(4, [(0, 1)]),
        );
        payload.keyed_histograms.insert(
            "JS_FEATURES".into(),
            [
                ("arrow".to_string(), HistogramValue::new(2, [(1, u64::MAX)])),
                ("spread".to_string(), HistogramValue::new(2, [(1, 1)])),
            ]
            .into(),
        );

        let extracted = extract(&ping(payload), &registry());

        assert_eq!(find(&extracted, Granularity::BuildId, &MetricId::new("GC_MS")), None);
        assert_eq!(
            find(
                &extracted,
                Granularity::BuildId,
                &MetricId::keyed("JS_FEATURES", "arrow")
            ),
            None
        );
        let spread = find(
            &extracted,
            Granularity::BuildId,
            &MetricId::keyed("JS_FEATURES", "spread"),
        )
        .unwrap();
        assert_eq!(spread.bucket(1), 2);
        let count = find(
            &extracted,
            Granularity::SubmissionDate,
            &MetricId::new("DEVTOOLS_TOOLBOX_OPENED_COUNT"),
        )
        .unwrap();
        assert_eq!(count.count(), 2);
        assert_eq!(extracted.len(), 4);
    }

    #[test]
    fn aggregates_unsigned_and_boolean_simple_measurements() {
        let mut payload = Payload::default();
        payload
            .simple_measurements
            .insert("savedPings".into(), MeasurementValue::Unsigned(u64::MAX));
        payload
            .simple_measurements
            .insert("debuggerAttached".into(), MeasurementValue::Boolean(true));

        let extracted = extract(&ping(payload), &registry());

        let saved = find(
            &extracted,
            Granularity::BuildId,
            &MetricId::new("SIMPLE_MEASURES_SAVEDPINGS"),
        )
        .unwrap();
        assert_eq!(saved.bucket(crate::resolver::SCALAR_HIGH), 1);
        let debugger = find(
            &extracted,
            Granularity::BuildId,
            &MetricId::new("SIMPLE_MEASURES_DEBUGGERATTACHED"),
        )
        .unwrap();
        assert_eq!(debugger.bucket(1), 1);
        assert_eq!(debugger.count(), 1);
    }

    #[test]
    fn drops_ping_without_build_date() {
        let mut ping = ping(Payload::default());
        ping.build_id = "2015".into();
        ping.payload
            .histograms
            .insert("GC_MS".into(), HistogramValue::new(0, [(5, 1)]));

        assert!(extract(&ping, &registry()).is_empty());
    }

    #[test]
    fn folds_extracted_measurements_into_storage() {
        let mut payload = Payload::default();
        payload.histograms.insert(
            "DEVTOOLS_TOOLBOX_OPENED_COUNT".into(),
            HistogramValue::new(4, [(0, 1)]),
        );
        let ping = ping(payload);
        let registry = registry();

        let mut aggregates = Aggregates::default();
        for _ in 0..10 {
            extract_into(&ping, &registry, &mut aggregates);
        }

        let key = AggregateKey::new(
            DimensionKey::build(&ping).unwrap(),
            MetricId::new("DEVTOOLS_TOOLBOX_OPENED_COUNT"),
        );
        let accumulator = aggregates.value(&key).unwrap();
        assert_eq!(accumulator.count(), 20);
        assert_eq!(accumulator.bucket(0), 20);
        assert_eq!(accumulator.bucket(1), 0);
        assert_eq!(accumulator.bucket(2), 0);
    }

    #[test]
    fn builds_simple_measure_metric_names() {
        assert_eq!(simple_measure_metric("firstPaint"), "SIMPLE_MEASURES_FIRSTPAINT");
    }
}

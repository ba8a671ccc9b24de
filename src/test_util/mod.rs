/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
//! Deterministic ping dataset and store doubles shared by tests and benchmarks
mod flaky_store;

use chrono::NaiveDate;

pub use flaky_store::*;

use crate::dimension::{MetricId, DATE_FORMAT};
use crate::extract::simple_measure_metric;
use crate::ping::{HistogramValue, MeasurementValue, Payload, Ping};
use crate::registry::{HistogramDefinition, HistogramRegistry};

/// Channels of generated pings
pub const CHANNELS: [&str; 2] = ["nightly", "beta"];
/// Full versions of generated pings
pub const VERSIONS: [&str; 2] = ["41.0", "42.0.1"];
/// Build ids of generated pings
pub const BUILD_IDS: [&str; 2] = ["20150601000000", "20150602000000"];
/// `YYYYMMDD` submission dates
pub const SUBMISSION_DATES: [&str; 2] = ["20150610", "20150611"];

/// Pings generated per combination of dimensions
pub const NUM_PINGS_PER_DIMENSIONS: usize = 3;
/// Child processes reported by every ping
pub const NUM_CHILDREN_PER_PING: u32 = 2;

/// Exponential histogram in every ping
pub const EXPONENTIAL_METRIC: &str = "GC_MS";
/// Linear histogram in every ping
pub const LINEAR_METRIC: &str = "GC_MAX_PAUSE_MS";
/// Boolean histogram in every ping
pub const BOOLEAN_METRIC: &str = "E10S_WINDOW";
/// Enumerated histogram in every ping
pub const ENUMERATED_METRIC: &str = "SSL_HANDSHAKE_VERSION";
/// Count histogram in every ping
pub const COUNT_METRIC: &str = "DEVTOOLS_TOOLBOX_OPENED_COUNT";
/// Keyed exponential histogram in every ping
pub const KEYED_METRIC: &str = "BLOCKED_ON_PLUGIN_MODULE_INIT_MS";
/// Labels of the keyed histogram
pub const KEYED_LABELS: [&str; 2] = ["foo", "bar"];

/// Integer simple measurement in every ping
pub const SIMPLE_MEASURE: &str = "uptime";
/// Value of the integer simple measurement
pub const SIMPLE_MEASURE_VALUE: i64 = 42;
/// Reported as a float, never aggregated
pub const DROPPED_SIMPLE_MEASURE: &str = "firstPaint";

/// Definitions of every histogram in generated pings
pub fn registry() -> HistogramRegistry {
    HistogramRegistry::from_definitions([
        (
            EXPONENTIAL_METRIC,
            HistogramDefinition::exponential(1, 10000, 50),
        ),
        (LINEAR_METRIC, HistogramDefinition::linear(1, 100, 12)),
        (BOOLEAN_METRIC, HistogramDefinition::boolean()),
        (ENUMERATED_METRIC, HistogramDefinition::enumerated(10)),
        (COUNT_METRIC, HistogramDefinition::count()),
        (KEYED_METRIC, HistogramDefinition::exponential(1, 10000, 50)),
    ])
    .expect("test registry definitions are valid")
}

/// Histogram reported for a metric in every generated ping
pub fn histogram(metric: &str) -> HistogramValue {
    match metric {
        EXPONENTIAL_METRIC | KEYED_METRIC => HistogramValue::new(0, [(0, 1), (1, 4), (2, 2)]),
        LINEAR_METRIC => HistogramValue::new(1, [(1, 3), (21, 1)]),
        BOOLEAN_METRIC => HistogramValue::new(2, [(0, 2), (1, 1)]),
        ENUMERATED_METRIC => HistogramValue::new(5, [(3, 1), (7, 2)]),
        _ => HistogramValue::new(4, [(0, 1)]),
    }
}

/// Payload carried by every generated ping
pub fn payload() -> Payload {
    let mut payload = Payload::default();

    for metric in [
        EXPONENTIAL_METRIC,
        LINEAR_METRIC,
        BOOLEAN_METRIC,
        ENUMERATED_METRIC,
        COUNT_METRIC,
    ] {
        payload
            .histograms
            .insert(metric.to_string(), histogram(metric));
    }

    payload.keyed_histograms.insert(
        KEYED_METRIC.to_string(),
        KEYED_LABELS
            .iter()
            .map(|label| (label.to_string(), histogram(KEYED_METRIC)))
            .collect(),
    );

    payload.simple_measurements.insert(
        SIMPLE_MEASURE.to_string(),
        MeasurementValue::Integer(SIMPLE_MEASURE_VALUE),
    );
    payload.simple_measurements.insert(
        DROPPED_SIMPLE_MEASURE.to_string(),
        MeasurementValue::Float(12.5),
    );

    payload
}

/// Parses a `YYYYMMDD` submission date
pub fn submission_date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, DATE_FORMAT).expect("test submission date is valid")
}

/// Pings for every combination of submission date, channel, version and build id
pub fn generate_pings() -> impl Iterator<Item = Ping> {
    let mut pings = Vec::with_capacity(
        SUBMISSION_DATES.len()
            * CHANNELS.len()
            * VERSIONS.len()
            * BUILD_IDS.len()
            * NUM_PINGS_PER_DIMENSIONS,
    );

    for date in SUBMISSION_DATES {
        for channel in CHANNELS {
            for version in VERSIONS {
                for build_id in BUILD_IDS {
                    for _ in 0..NUM_PINGS_PER_DIMENSIONS {
                        pings.push(Ping {
                            channel: channel.to_string(),
                            version: version.to_string(),
                            build_id: build_id.to_string(),
                            submission_date: submission_date(date),
                            process_count: NUM_CHILDREN_PER_PING,
                            payload: payload(),
                        });
                    }
                }
            }
        }
    }

    pings.into_iter()
}

/// Metric ids present in every dimension key of generated data
pub fn metric_ids() -> Vec<MetricId> {
    let mut metrics = [
        EXPONENTIAL_METRIC,
        LINEAR_METRIC,
        BOOLEAN_METRIC,
        ENUMERATED_METRIC,
        COUNT_METRIC,
    ]
    .into_iter()
    .map(MetricId::new)
    .collect::<Vec<_>>();

    metrics.extend(
        KEYED_LABELS
            .iter()
            .map(|label| MetricId::keyed(KEYED_METRIC, *label)),
    );
    metrics.push(MetricId::new(simple_measure_metric(SIMPLE_MEASURE)));
    metrics
}

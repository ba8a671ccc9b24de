/*
 * Copyright © 2024. EcomDev B.V.
 * All rights reserved.
 * See LICENSE for license details.
 */
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Single client telemetry submission
///
/// Carries dimensions used for grouping and a payload of measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    /// Release channel, e.g. `nightly`
    pub channel: String,
    /// Full application version, e.g. `45.0.1`
    pub version: String,
    /// Build identifier starting with the `YYYYMMDD` build date
    pub build_id: String,
    /// Date the ping was received on
    pub submission_date: NaiveDate,
    /// Number of child processes reporting alongside the parent
    #[serde(default)]
    pub process_count: u32,
    /// Measurements carried by the ping
    #[serde(default)]
    pub payload: Payload,
}

/// Measurements of a ping keyed by metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Plain histograms
    #[serde(default)]
    pub histograms: BTreeMap<String, HistogramValue>,
    /// Histograms reported per label
    #[serde(default)]
    pub keyed_histograms: BTreeMap<String, BTreeMap<String, HistogramValue>>,
    /// Scalar values reported as is, only integers are aggregated
    #[serde(default)]
    pub simple_measurements: BTreeMap<String, MeasurementValue>,
}

/// Histogram as reported by a client
///
/// `values` maps bucket label to the number of samples in that bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramValue {
    /// Client type code, see [`HistogramKind::from_type_code`](crate::resolver::HistogramKind::from_type_code)
    pub histogram_type: u8,
    /// Declared `[low, high]` range
    #[serde(default)]
    pub range: Option<[u64; 2]>,
    /// Declared number of buckets
    #[serde(default)]
    pub bucket_count: Option<u32>,
    /// Sum of all samples, not aggregated
    #[serde(default)]
    pub sum: u64,
    /// Samples per bucket label
    pub values: BTreeMap<u64, u64>,
}

/// Simple measurement value as found in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    /// Integer within `i64` range
    Integer(i64),
    /// Integer above `i64::MAX`
    Unsigned(u64),
    /// Booleans count as `0` or `1`
    Boolean(bool),
    /// Never aggregated
    Float(f64),
    /// Strings, arrays and objects, never aggregated
    Other(serde_json::Value),
}

impl Ping {
    /// Leading dot component of the version, `45.0.1` becomes `45`
    pub fn major_version(&self) -> &str {
        self.version.split('.').next().unwrap_or(&self.version)
    }

    /// Date portion of the build id, `None` when the build id is too short
    pub fn build_date(&self) -> Option<&str> {
        self.build_id.get(..8)
    }

    /// Number of independent observations each histogram in the payload represents
    pub fn histogram_weight(&self) -> u64 {
        1 + u64::from(self.process_count)
    }
}

impl HistogramValue {
    /// Histogram of a type code with samples per bucket label
    pub fn new(histogram_type: u8, values: impl IntoIterator<Item = (u64, u64)>) -> Self {
        Self {
            histogram_type,
            values: values.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl From<i64> for MeasurementValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl MeasurementValue {
    /// Value placed into the scalar layout
    ///
    /// Negative integers become `0`, non-integer values give `None`
    pub fn as_scalar(&self) -> Option<u64> {
        match self {
            Self::Integer(value) => Some(u64::try_from(*value).unwrap_or(0)),
            Self::Unsigned(value) => Some(*value),
            Self::Boolean(value) => Some(u64::from(*value)),
            Self::Float(_) | Self::Other(_) => None,
        }
    }
}

impl From<u64> for MeasurementValue {
    fn from(value: u64) -> Self {
        Self::Unsigned(value)
    }
}

impl From<bool> for MeasurementValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for MeasurementValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(version: &str, build_id: &str) -> Ping {
        Ping {
            channel: "release".into(),
            version: version.into(),
            build_id: build_id.into(),
            submission_date: NaiveDate::from_ymd_opt(2015, 7, 1).unwrap(),
            process_count: 2,
            payload: Payload::default(),
        }
    }

    #[test]
    fn takes_leading_component_as_major_version() {
        assert_eq!(ping("45.0.1", "20150101000000").major_version(), "45");
        assert_eq!(ping("nightly", "20150101000000").major_version(), "nightly");
    }

    #[test]
    fn takes_date_prefix_of_build_id() {
        assert_eq!(ping("45.0", "20150101000000").build_date(), Some("20150101"));
        assert_eq!(ping("45.0", "2015").build_date(), None);
    }

    #[test]
    fn weights_histograms_by_reporting_processes() {
        assert_eq!(ping("45.0", "20150101000000").histogram_weight(), 3);
    }

    #[test]
    fn deserializes_ping_from_json() {
        let ping: Ping = serde_json::from_str(
            r#"{
                "channel": "nightly",
                "version": "46.0a1",
                "build_id": "20150102000000",
                "submission_date": "2015-07-02",
                "process_count": 1,
                "payload": {
                    "histograms": {
                        "GC_MS": {"histogram_type": 0, "range": [1, 10000], "bucket_count": 50, "sum": 30, "values": {"0": 1, "12": 3}}
                    },
                    "keyed_histograms": {
                        "DEVTOOLS_PERFTOOLS_RECORDING_FEATURES_USED": {
                            "withMarkers": {"histogram_type": 2, "values": {"1": 1}}
                        }
                    },
                    "simple_measurements": {"uptime": 42, "firstPaint": 1.5, "addonManager": {"x": 1}}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(ping.payload.histograms["GC_MS"].values[&12], 3);
        assert_eq!(ping.payload.histograms["GC_MS"].range, Some([1, 10000]));
        assert_eq!(
            ping.payload.keyed_histograms["DEVTOOLS_PERFTOOLS_RECORDING_FEATURES_USED"]
                ["withMarkers"]
                .values[&1],
            1
        );
        assert_eq!(
            ping.payload.simple_measurements["uptime"],
            MeasurementValue::Integer(42)
        );
        assert_eq!(
            ping.payload.simple_measurements["firstPaint"],
            MeasurementValue::Float(1.5)
        );
        assert!(matches!(
            ping.payload.simple_measurements["addonManager"],
            MeasurementValue::Other(_)
        ));
    }

    #[test]
    fn keeps_large_integers_and_booleans_as_integer_measurements() {
        let measurements: BTreeMap<String, MeasurementValue> = serde_json::from_str(
            r#"{"huge": 18446744073709551615, "negative": -3, "flag": true, "ratio": 0.5, "name": "x"}"#,
        )
        .unwrap();

        assert_eq!(measurements["huge"], MeasurementValue::Unsigned(u64::MAX));
        assert_eq!(measurements["huge"].as_scalar(), Some(u64::MAX));
        assert_eq!(measurements["negative"].as_scalar(), Some(0));
        assert_eq!(measurements["flag"], MeasurementValue::Boolean(true));
        assert_eq!(measurements["flag"].as_scalar(), Some(1));
        assert_eq!(measurements["ratio"].as_scalar(), None);
        assert_eq!(measurements["name"].as_scalar(), None);
    }
}

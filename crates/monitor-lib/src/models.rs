//! Core data models for the bearing monitor

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Telemetry fields in persistence order, as produced by the motor controller
pub const TELEMETRY_FIELDS: [&str; 21] = [
    "voltage",
    "current",
    "power",
    "energy",
    "frequency",
    "pf",
    "voltage_alert",
    "pf_alert",
    "motor_temp",
    "ambient_temp",
    "temp_alert",
    "hotspot",
    "bearing_temp",
    "delta_temp",
    "dust",
    "dust_alert",
    "soiling_loss",
    "vibration_rms_mm_s",
    "vibration_alert",
    "unbalance",
    "bearing_health",
];

/// Field that feeds the reading window unless configured otherwise
pub const DEFAULT_CHANNEL: &str = "vibration_rms_mm_s";

/// One decoded telemetry frame.
///
/// Every field is optional: a field absent from the frame (or sent as `null`)
/// is kept as `None` rather than defaulted, so downstream consumers can tell
/// "not reported" apart from a real zero reading. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<f64>,
    pub energy: Option<f64>,
    pub frequency: Option<f64>,
    pub pf: Option<f64>,
    #[serde(default, deserialize_with = "alert_flag")]
    pub voltage_alert: Option<f64>,
    #[serde(default, deserialize_with = "alert_flag")]
    pub pf_alert: Option<f64>,
    pub motor_temp: Option<f64>,
    pub ambient_temp: Option<f64>,
    #[serde(default, deserialize_with = "alert_flag")]
    pub temp_alert: Option<f64>,
    #[serde(default, deserialize_with = "alert_flag")]
    pub hotspot: Option<f64>,
    pub bearing_temp: Option<f64>,
    pub delta_temp: Option<f64>,
    pub dust: Option<f64>,
    #[serde(default, deserialize_with = "alert_flag")]
    pub dust_alert: Option<f64>,
    pub soiling_loss: Option<f64>,
    pub vibration_rms_mm_s: Option<f64>,
    #[serde(default, deserialize_with = "alert_flag")]
    pub vibration_alert: Option<f64>,
    pub unbalance: Option<f64>,
    pub bearing_health: Option<f64>,
}

impl TelemetryRecord {
    /// Look up a field by its wire name
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "voltage" => self.voltage,
            "current" => self.current,
            "power" => self.power,
            "energy" => self.energy,
            "frequency" => self.frequency,
            "pf" => self.pf,
            "voltage_alert" => self.voltage_alert,
            "pf_alert" => self.pf_alert,
            "motor_temp" => self.motor_temp,
            "ambient_temp" => self.ambient_temp,
            "temp_alert" => self.temp_alert,
            "hotspot" => self.hotspot,
            "bearing_temp" => self.bearing_temp,
            "delta_temp" => self.delta_temp,
            "dust" => self.dust,
            "dust_alert" => self.dust_alert,
            "soiling_loss" => self.soiling_loss,
            "vibration_rms_mm_s" => self.vibration_rms_mm_s,
            "vibration_alert" => self.vibration_alert,
            "unbalance" => self.unbalance,
            "bearing_health" => self.bearing_health,
            _ => None,
        }
    }

    /// Field values in [`TELEMETRY_FIELDS`] order
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        TELEMETRY_FIELDS.iter().map(|name| self.field(name))
    }

    /// Number of fields the producer actually reported
    pub fn reported_fields(&self) -> usize {
        self.values().filter(Option::is_some).count()
    }
}

/// Alert flags arrive as either 0/1 or true/false depending on firmware
fn alert_flag<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(Option::<Flag>::deserialize(deserializer)?.map(|flag| match flag {
        Flag::Bool(true) => 1.0,
        Flag::Bool(false) => 0.0,
        Flag::Number(n) => n,
    }))
}

/// Engineered features for one timestep, in a fixed name order
///
/// Names are shared between all vectors produced by one transform call.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build a vector; `names` and `values` must have the same length
    pub fn new(names: Arc<[String]>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    /// Build a vector from name/value pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<f64>) =
            pairs.into_iter().map(|(n, v)| (n.into(), v)).unzip();
        Self::new(names.into(), values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// A single vibration reading submitted for prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(alias = "vibration_rms")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Reading {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            timestamp: None,
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

/// Confidence tier derived from a failure probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Status tier derived from minutes-to-failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStatus {
    Critical,
    Warning,
    Normal,
}

/// Classification outcome: will the bearing fail within the threshold?
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub will_fail_soon: bool,
    pub failure_probability: f64,
    pub confidence: Confidence,
    pub threshold_minutes: u32,
}

/// Regression outcome: how long until the bearing fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub minutes_to_failure: f64,
    pub hours_to_failure: f64,
    pub status: FailureStatus,
}

/// Both outcomes computed from the same feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualPrediction {
    pub classification: Classification,
    pub regression: Regression,
    pub timestamp: String,
    pub readings_used: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup_matches_field_list() {
        let record: TelemetryRecord = serde_json::from_str(
            r#"{"voltage": 220.5, "vibration_rms_mm_s": 1.7, "bearing_health": 93}"#,
        )
        .unwrap();

        assert_eq!(record.field("voltage"), Some(220.5));
        assert_eq!(record.field("vibration_rms_mm_s"), Some(1.7));
        assert_eq!(record.field("bearing_health"), Some(93.0));
        assert_eq!(record.field("current"), None);
        assert_eq!(record.field("no_such_field"), None);
        assert_eq!(record.values().count(), TELEMETRY_FIELDS.len());
        assert_eq!(record.reported_fields(), 3);
    }

    #[test]
    fn test_alert_flags_accept_bool_and_number() {
        let record: TelemetryRecord =
            serde_json::from_str(r#"{"voltage_alert": true, "pf_alert": 0, "dust_alert": false}"#)
                .unwrap();

        assert_eq!(record.voltage_alert, Some(1.0));
        assert_eq!(record.pf_alert, Some(0.0));
        assert_eq!(record.dust_alert, Some(0.0));
        assert_eq!(record.temp_alert, None);
    }

    #[test]
    fn test_reading_accepts_legacy_field_name() {
        let reading: Reading = serde_json::from_str(r#"{"vibration_rms": 2.5}"#).unwrap();
        assert_eq!(reading.value, 2.5);
        assert_eq!(reading.timestamp, None);

        let reading: Reading =
            serde_json::from_str(r#"{"value": 1.0, "timestamp": 1700000000000}"#).unwrap();
        assert_eq!(reading.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_feature_vector_lookup_and_order() {
        let fv = FeatureVector::from_pairs([("b", 2.0), ("a", 1.0)]);
        assert_eq!(fv.get("a"), Some(1.0));
        assert_eq!(fv.get("c"), None);
        assert_eq!(fv.names(), ["b".to_string(), "a".to_string()]);
        // Serialized map keeps feature order
        assert_eq!(serde_json::to_string(&fv).unwrap(), r#"{"b":2.0,"a":1.0}"#);
    }

    #[test]
    fn test_tiers_serialize_as_labels() {
        assert_eq!(serde_json::to_string(&Confidence::High).unwrap(), "\"High\"");
        assert_eq!(
            serde_json::to_string(&FailureStatus::Critical).unwrap(),
            "\"Critical\""
        );
    }
}

use crate::domain::IngestionError;
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const TASMOTA_TIME_KEY: &str = "Time";

/// A single sensor value as found in a payload
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    Numeric(f64),
    Text(String),
    Boolean(bool),
}

/// Sensor values decoded from one message
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReading {
    /// Always normalized to UTC
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, ReadingValue>,
    /// Fields present in the payload whose value could not be decoded
    pub undecodable: Vec<String>,
}

impl DecodedReading {
    pub fn get(&self, field: &str) -> Option<&ReadingValue> {
        self.values.get(field)
    }
}

/// How a topic's payload is turned into a reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadDecoder {
    /// Tasmota telemetry: `{"Time": "...", "<sensor>": {"<field>": <value>, ...}}`
    Tasmota { sensor: String },
}

impl PayloadDecoder {
    pub fn decode(
        &self,
        payload: &[u8],
        device_tz: Tz,
    ) -> Result<DecodedReading, IngestionError> {
        match self {
            PayloadDecoder::Tasmota { sensor } => decode_tasmota(sensor, payload, device_tz),
        }
    }
}

fn decode_tasmota(
    sensor: &str,
    payload: &[u8],
    device_tz: Tz,
) -> Result<DecodedReading, IngestionError> {
    let document: Value = serde_json::from_slice(payload)
        .map_err(|e| IngestionError::Decode(format!("invalid JSON: {}", e)))?;

    let object = document
        .as_object()
        .ok_or_else(|| IngestionError::Decode("payload is not a JSON object".to_string()))?;

    let time = object
        .get(TASMOTA_TIME_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| IngestionError::Decode(format!("missing '{}' field", TASMOTA_TIME_KEY)))?;
    let timestamp = parse_timestamp(time, device_tz)?;

    let mut values = BTreeMap::new();
    let mut undecodable = Vec::new();

    match object.get(sensor) {
        // Sensor absent: nothing to record
        None => {}
        Some(Value::Object(fields)) => {
            for (name, raw) in fields {
                match decode_value(raw) {
                    Some(value) => {
                        values.insert(name.clone(), value);
                    }
                    None => undecodable.push(name.clone()),
                }
            }
        }
        Some(other) => {
            return Err(IngestionError::Decode(format!(
                "sensor '{}' is not an object: {}",
                sensor, other
            )));
        }
    }

    Ok(DecodedReading {
        timestamp,
        values,
        undecodable,
    })
}

fn decode_value(raw: &Value) -> Option<ReadingValue> {
    match raw {
        Value::Number(n) => n.as_f64().map(ReadingValue::Numeric),
        Value::String(s) => Some(ReadingValue::Text(s.clone())),
        Value::Bool(b) => Some(ReadingValue::Boolean(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse an ISO-8601 timestamp and normalize it to UTC.
///
/// An explicit offset in the string wins. Naive timestamps are wall-clock
/// time in `device_tz`: a repeated hour resolves to its first occurrence and
/// a skipped hour is read with the offset in force before the jump.
pub fn parse_timestamp(raw: &str, device_tz: Tz) -> Result<DateTime<Utc>, IngestionError> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| IngestionError::Decode(format!("invalid timestamp '{}': {}", raw, e)))?;

    Ok(local_to_utc(naive, device_tz))
}

fn local_to_utc(naive: NaiveDateTime, device_tz: Tz) -> DateTime<Utc> {
    match device_tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => local.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Transitions are at most a few hours wide, a day back is safely before it
            let before = device_tz
                .offset_from_utc_datetime(&(naive - Duration::days(1)))
                .fix();
            let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    }
}

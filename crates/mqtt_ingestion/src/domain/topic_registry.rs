use crate::domain::{IngestionError, PayloadDecoder};
use common::domain::ResultType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::{uuid, Uuid};

fn default_result_type() -> ResultType {
    ResultType::Float
}

/// One reading field bound to the datastream its observations belong to.
///
/// `result_type` must match the datastream's declared type; values that do
/// not fit it are never mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBinding {
    pub field: String,
    pub datastream_id: Uuid,
    #[serde(default = "default_result_type")]
    pub result_type: ResultType,
}

impl FieldBinding {
    /// Numeric field feeding a FLOAT datastream
    pub fn new(field: impl Into<String>, datastream_id: Uuid) -> Self {
        Self {
            field: field.into(),
            datastream_id,
            result_type: default_result_type(),
        }
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }
}

/// Topic pattern → decoder → field table.
///
/// `topic` may use MQTT wildcards (`+` for one level, trailing `#` for the rest).
/// Field order is the order drafts are emitted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicBinding {
    pub topic: String,
    pub decoder: PayloadDecoder,
    #[serde(default)]
    pub fields: Vec<FieldBinding>,
}

/// Static table of the topics the ingestion subscribes to
#[derive(Debug, Clone, PartialEq)]
pub struct TopicRegistry {
    bindings: Vec<TopicBinding>,
}

impl TopicRegistry {
    pub fn new(bindings: Vec<TopicBinding>) -> Result<Self, IngestionError> {
        let mut seen = HashSet::new();
        for binding in &bindings {
            validate_pattern(&binding.topic)?;
            if !seen.insert(binding.topic.as_str()) {
                return Err(IngestionError::Configuration(format!(
                    "topic bound twice: {}",
                    binding.topic
                )));
            }
        }
        Ok(Self { bindings })
    }

    /// Devices of the home deployment
    pub fn builtin() -> Self {
        Self {
            bindings: vec![
                TopicBinding {
                    topic: "tele/IoTorero_6057F8/SENSOR".to_string(),
                    decoder: PayloadDecoder::Tasmota {
                        sensor: "SHT4X".to_string(),
                    },
                    fields: vec![
                        FieldBinding::new(
                            "Temperature",
                            uuid!("388a0b8f-f3ea-4f2b-9f0d-0a27dc44dce3"),
                        ),
                        FieldBinding::new(
                            "Humidity",
                            uuid!("35af36ae-4d57-416c-8354-c05457bcc6cc"),
                        ),
                        FieldBinding::new(
                            "DewPoint",
                            uuid!("5645b49f-32de-45d0-b4f2-5578b822ac86"),
                        ),
                    ],
                },
                // Energy plug: routed and logged, no datastreams bound yet
                TopicBinding {
                    topic: "tele/NOUS_A1T_4E4984/SENSOR".to_string(),
                    decoder: PayloadDecoder::Tasmota {
                        sensor: "ENERGY".to_string(),
                    },
                    fields: Vec::new(),
                },
            ],
        }
    }

    /// Parse a JSON array of bindings
    pub fn from_json(json: &str) -> Result<Self, IngestionError> {
        let bindings: Vec<TopicBinding> = serde_json::from_str(json)
            .map_err(|e| IngestionError::Configuration(format!("invalid bindings: {}", e)))?;
        Self::new(bindings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IngestionError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            IngestionError::Configuration(format!(
                "cannot read bindings file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// First binding whose pattern matches, in declaration order
    pub fn route(&self, topic: &str) -> Option<&TopicBinding> {
        self.bindings
            .iter()
            .find(|binding| topic_matches(&binding.topic, topic))
    }

    /// Subscription list, in declaration order
    pub fn topics(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.topic.clone()).collect()
    }

    pub fn bindings(&self) -> &[TopicBinding] {
        &self.bindings
    }
}

fn validate_pattern(pattern: &str) -> Result<(), IngestionError> {
    if pattern.is_empty() {
        return Err(IngestionError::Configuration(
            "topic pattern cannot be empty".to_string(),
        ));
    }

    let levels: Vec<&str> = pattern.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        let misplaced_hash = level.contains('#') && (*level != "#" || i != levels.len() - 1);
        let partial_plus = level.contains('+') && *level != "+";
        if misplaced_hash || partial_plus {
            return Err(IngestionError::Configuration(format!(
                "invalid topic pattern: {}",
                pattern
            )));
        }
    }
    Ok(())
}

/// MQTT topic filter matching
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

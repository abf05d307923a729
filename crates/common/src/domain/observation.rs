use crate::domain::result::DomainResult;
use crate::domain::ResultType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The single result value carried by an observation
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationResult {
    Numeric(f64),
    Text(String),
    Boolean(bool),
    Complex(serde_json::Value),
}

impl ObservationResult {
    /// Name of the variant, used in logs and mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            ObservationResult::Numeric(_) => "NUMERIC",
            ObservationResult::Text(_) => "TEXT",
            ObservationResult::Boolean(_) => "BOOLEAN",
            ObservationResult::Complex(_) => "COMPLEX",
        }
    }

    /// Whether this value may be stored in a datastream declaring `result_type`
    pub fn fits(&self, result_type: ResultType) -> bool {
        match (self, result_type) {
            (ObservationResult::Numeric(_), ResultType::Float) => true,
            (ObservationResult::Numeric(v), ResultType::Integer) => v.fract() == 0.0,
            (ObservationResult::Text(_), ResultType::String) => true,
            (ObservationResult::Boolean(_), ResultType::Boolean) => true,
            (ObservationResult::Complex(_), ResultType::Json) => true,
            _ => false,
        }
    }

    pub fn numeric(&self) -> Option<f64> {
        match self {
            ObservationResult::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ObservationResult::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self {
            ObservationResult::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn complex(&self) -> Option<&serde_json::Value> {
        match self {
            ObservationResult::Complex(v) => Some(v),
            _ => None,
        }
    }

    /// Rebuild from the four nullable result columns.
    /// Returns None unless exactly one column is set.
    pub fn from_columns(
        numeric: Option<f64>,
        text: Option<String>,
        boolean: Option<bool>,
        complex: Option<serde_json::Value>,
    ) -> Option<Self> {
        match (numeric, text, boolean, complex) {
            (Some(v), None, None, None) => Some(ObservationResult::Numeric(v)),
            (None, Some(v), None, None) => Some(ObservationResult::Text(v)),
            (None, None, Some(v), None) => Some(ObservationResult::Boolean(v)),
            (None, None, None, Some(v)) => Some(ObservationResult::Complex(v)),
            _ => None,
        }
    }
}

/// Observation not yet persisted
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationDraft {
    /// Assigned by the repository when absent
    pub id: Option<Uuid>,
    pub datastream_id: Uuid,
    pub result_time: DateTime<Utc>,
    pub result: ObservationResult,
    pub parameters: Option<serde_json::Value>,
}

/// Persisted observation, identified by (id, result_time)
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub id: Uuid,
    pub datastream_id: Uuid,
    pub result_time: DateTime<Utc>,
    pub result: ObservationResult,
    pub parameters: Option<serde_json::Value>,
}

/// Repository input for listing observations
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListObservationsRepoInput {
    pub datastream_id: Option<Uuid>,
}

/// Repository input for updating an observation's value or parameters
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateObservationRepoInput {
    pub id: Uuid,
    pub result: Option<ObservationResult>,
    pub parameters: Option<serde_json::Value>,
}

/// Repository trait for observation storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ObservationRepository: Send + Sync {
    /// Insert a single observation
    async fn create_observation(&self, draft: ObservationDraft) -> DomainResult<Observation>;

    /// Insert a batch of observations in one transaction.
    /// Failure handling: entire batch fails atomically (all-or-nothing)
    async fn create_observations(
        &self,
        drafts: Vec<ObservationDraft>,
    ) -> DomainResult<Vec<Observation>>;

    /// Get an observation by id
    async fn get_observation(&self, id: Uuid) -> DomainResult<Option<Observation>>;

    /// List observations, newest first
    async fn list_observations(
        &self,
        input: ListObservationsRepoInput,
    ) -> DomainResult<Vec<Observation>>;

    /// Update an observation, returning the stored row
    async fn update_observation(
        &self,
        input: UpdateObservationRepoInput,
    ) -> DomainResult<Observation>;

    /// Delete an observation by id
    async fn delete_observation(&self, id: Uuid) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_fits_integer_only_when_whole() {
        assert!(ObservationResult::Numeric(12.0).fits(ResultType::Integer));
        assert!(!ObservationResult::Numeric(12.5).fits(ResultType::Integer));
        assert!(ObservationResult::Numeric(12.5).fits(ResultType::Float));
    }

    #[test]
    fn test_kind_mismatches_are_rejected() {
        assert!(!ObservationResult::Text("on".to_string()).fits(ResultType::Boolean));
        assert!(!ObservationResult::Boolean(true).fits(ResultType::String));
        assert!(ObservationResult::Complex(serde_json::json!({"a": 1})).fits(ResultType::Json));
    }

    #[test]
    fn test_from_columns_requires_exactly_one() {
        assert_eq!(
            ObservationResult::from_columns(Some(1.5), None, None, None),
            Some(ObservationResult::Numeric(1.5))
        );
        assert_eq!(
            ObservationResult::from_columns(None, Some("x".to_string()), None, None),
            Some(ObservationResult::Text("x".to_string()))
        );
        assert_eq!(ObservationResult::from_columns(None, None, None, None), None);
        assert_eq!(
            ObservationResult::from_columns(Some(1.0), None, Some(true), None),
            None
        );
    }
}

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("System not found: {0}")]
    SystemNotFound(String),

    #[error("System already exists: {0}")]
    SystemAlreadyExists(String),

    #[error("Datastream not found: {0}")]
    DatastreamNotFound(String),

    #[error("Datastream already exists: {0}")]
    DatastreamAlreadyExists(String),

    #[error("Datastream in use: {0}")]
    DatastreamInUse(String),

    #[error("Deployment not found: {0}")]
    DeploymentNotFound(String),

    #[error("Deployment already exists: {0}")]
    DeploymentAlreadyExists(String),

    #[error("Deployment in use: {0}")]
    DeploymentInUse(String),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error("Procedure already exists: {0}")]
    ProcedureAlreadyExists(String),

    #[error("Procedure in use: {0}")]
    ProcedureInUse(String),

    #[error("Feature of interest not found: {0}")]
    FeatureOfInterestNotFound(String),

    #[error("Feature of interest already exists: {0}")]
    FeatureOfInterestAlreadyExists(String),

    #[error("Feature of interest in use: {0}")]
    FeatureOfInterestInUse(String),

    #[error("Observed property not found: {0}")]
    ObservedPropertyNotFound(String),

    #[error("Observed property already exists: {0}")]
    ObservedPropertyAlreadyExists(String),

    #[error("Observed property in use: {0}")]
    ObservedPropertyInUse(String),

    #[error("Observation not found: {0}")]
    ObservationNotFound(String),

    #[error("Observation already exists: {0}")]
    ObservationAlreadyExists(String),

    /// Uniqueness, foreign-key or check constraint rejected a write
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Result type mismatch for datastream {datastream_id}: expected {expected}, got {actual}")]
    ResultTypeMismatch {
        datastream_id: String,
        expected: String,
        actual: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

impl DomainError {
    /// True for errors raised by a storage constraint rather than by lookup or I/O
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            DomainError::IntegrityViolation(_)
                | DomainError::SystemAlreadyExists(_)
                | DomainError::DatastreamAlreadyExists(_)
                | DomainError::DatastreamInUse(_)
                | DomainError::DeploymentAlreadyExists(_)
                | DomainError::DeploymentInUse(_)
                | DomainError::ProcedureAlreadyExists(_)
                | DomainError::ProcedureInUse(_)
                | DomainError::FeatureOfInterestAlreadyExists(_)
                | DomainError::FeatureOfInterestInUse(_)
                | DomainError::ObservedPropertyAlreadyExists(_)
                | DomainError::ObservedPropertyInUse(_)
                | DomainError::ObservationAlreadyExists(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_classification() {
        assert!(DomainError::IntegrityViolation("fk".to_string()).is_integrity());
        assert!(DomainError::ObservationAlreadyExists("id".to_string()).is_integrity());
        assert!(DomainError::ProcedureInUse("id".to_string()).is_integrity());
        assert!(!DomainError::ObservationNotFound("id".to_string()).is_integrity());
        assert!(!DomainError::DeploymentNotFound("id".to_string()).is_integrity());
        assert!(!DomainError::RepositoryError(anyhow::anyhow!("pool timeout")).is_integrity());
    }

    #[test]
    fn test_mismatch_message() {
        let err = DomainError::ResultTypeMismatch {
            datastream_id: "ds-1".to_string(),
            expected: "FLOAT".to_string(),
            actual: "STRING".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Result type mismatch for datastream ds-1: expected FLOAT, got STRING"
        );
    }
}

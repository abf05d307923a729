use common::domain::DomainError;
use thiserror::Error;

/// Failure kinds of the ingestion pipeline.
///
/// None of them stops the supervisor: transport errors trigger a reconnect,
/// everything else drops the message at hand.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("MQTT transport error: {0}")]
    Transport(String),

    #[error("Payload decode error: {0}")]
    Decode(String),

    #[error("No handler registered for topic: {0}")]
    UnroutableTopic(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid ingestion configuration: {0}")]
    Configuration(String),
}

impl From<DomainError> for IngestionError {
    fn from(e: DomainError) -> Self {
        if e.is_integrity() {
            IngestionError::Integrity(e.to_string())
        } else {
            IngestionError::Storage(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_split_into_integrity_and_storage() {
        let integrity: IngestionError =
            DomainError::IntegrityViolation("[23503] fk".to_string()).into();
        assert!(matches!(integrity, IngestionError::Integrity(_)));

        let storage: IngestionError =
            DomainError::RepositoryError(anyhow::anyhow!("connection reset")).into();
        assert!(matches!(storage, IngestionError::Storage(_)));
    }
}

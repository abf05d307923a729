use crate::domain::IngestionError;
use common::domain::{Observation, ObservationDraft, ObservationRepository};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Writes the drafts of one message as a single all-or-nothing batch
#[derive(Clone)]
pub struct ObservationSink {
    repository: Arc<dyn ObservationRepository>,
}

impl ObservationSink {
    pub fn new(repository: Arc<dyn ObservationRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, drafts), fields(batch_size = drafts.len()))]
    pub async fn save_batch(
        &self,
        drafts: Vec<ObservationDraft>,
    ) -> Result<Vec<Observation>, IngestionError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let saved = self.repository.create_observations(drafts).await?;
        debug!("saved {} observations", saved.len());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::domain::{DomainError, MockObservationRepository, ObservationResult};
    use uuid::Uuid;

    fn draft(value: f64) -> ObservationDraft {
        ObservationDraft {
            id: None,
            datastream_id: Uuid::new_v4(),
            result_time: Utc::now(),
            result: ObservationResult::Numeric(value),
            parameters: None,
        }
    }

    fn persisted(drafts: Vec<ObservationDraft>) -> Vec<Observation> {
        drafts
            .into_iter()
            .map(|d| Observation {
                id: Uuid::new_v4(),
                datastream_id: d.datastream_id,
                result_time: d.result_time,
                result: d.result,
                parameters: d.parameters,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_batch_skips_repository() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo.expect_create_observations().times(0);

        let sink = ObservationSink::new(Arc::new(mock_repo));
        let saved = sink.save_batch(Vec::new()).await.unwrap();

        assert!(saved.is_empty());
    }

    #[tokio::test]
    async fn test_batch_is_written_in_one_call() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .withf(|drafts: &Vec<ObservationDraft>| drafts.len() == 3)
            .times(1)
            .returning(|drafts| Ok(persisted(drafts)));

        let sink = ObservationSink::new(Arc::new(mock_repo));
        let saved = sink
            .save_batch(vec![draft(23.3), draft(29.8), draft(4.6)])
            .await
            .unwrap();

        assert_eq!(saved.len(), 3);
    }

    #[tokio::test]
    async fn test_integrity_failure_is_reported_as_integrity() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .times(1)
            .returning(|_| Err(DomainError::IntegrityViolation("[23503] fk".to_string())));

        let sink = ObservationSink::new(Arc::new(mock_repo));
        let result = sink.save_batch(vec![draft(1.0)]).await;

        assert!(matches!(result, Err(IngestionError::Integrity(_))));
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported_as_storage() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .times(1)
            .returning(|_| Err(DomainError::RepositoryError(anyhow::anyhow!("pool timeout"))));

        let sink = ObservationSink::new(Arc::new(mock_repo));
        let result = sink.save_batch(vec![draft(1.0)]).await;

        assert!(matches!(result, Err(IngestionError::Storage(_))));
    }
}

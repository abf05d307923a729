use crate::domain::{map_reading, IngestionError, ObservationSink, TopicRegistry};
use chrono_tz::Tz;
use common::domain::Observation;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to one incoming message
#[derive(Debug)]
pub enum DispatchOutcome {
    Persisted(Vec<Observation>),
    /// Routed and decoded, but no bound field carried a value
    NothingToRecord,
    /// Dropped: unroutable topic, undecodable payload or failed write
    Rejected(IngestionError),
}

/// Route → decode → map → persist, for a single message
#[derive(Clone)]
pub struct IngestionService {
    registry: Arc<TopicRegistry>,
    sink: ObservationSink,
    device_tz: Tz,
}

impl IngestionService {
    pub fn new(
        registry: Arc<TopicRegistry>,
        sink: ObservationSink,
        device_tz: Tz,
    ) -> Self {
        Self {
            registry,
            sink,
            device_tz,
        }
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    /// Handle one message. Failures are logged and reported, never propagated.
    pub async fn dispatch(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        let Some(binding) = self.registry.route(topic) else {
            warn!(topic = %topic, "no handler registered for topic, dropping message");
            return DispatchOutcome::Rejected(IngestionError::UnroutableTopic(topic.to_string()));
        };

        let reading = match binding.decoder.decode(payload, self.device_tz) {
            Ok(reading) => reading,
            Err(e) => {
                error!(topic = %topic, error = %e, "failed to decode payload, dropping message");
                return DispatchOutcome::Rejected(e);
            }
        };

        let drafts = map_reading(&binding.fields, &reading);
        if drafts.is_empty() {
            debug!(
                topic = %topic,
                fields = reading.values.len(),
                "no bound fields in reading, nothing to record"
            );
            return DispatchOutcome::NothingToRecord;
        }

        match self.sink.save_batch(drafts).await {
            Ok(saved) => {
                info!(
                    topic = %topic,
                    count = saved.len(),
                    result_time = %reading.timestamp,
                    "observations recorded"
                );
                DispatchOutcome::Persisted(saved)
            }
            Err(e) => {
                error!(topic = %topic, error = %e, "failed to persist observations");
                DispatchOutcome::Rejected(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldBinding, PayloadDecoder, TopicBinding};
    use chrono::{TimeZone, Utc};
    use common::domain::{
        DomainError, MockObservationRepository, ObservationDraft, ObservationRepository,
        ObservationResult,
    };
    use uuid::{uuid, Uuid};

    const SHT4X_TOPIC: &str = "tele/IoTorero_6057F8/SENSOR";
    const SHT4X_PAYLOAD: &[u8] = br#"{"Time":"2026-02-28T17:13:40","SHT4X":{"Temperature":23.3,"Humidity":29.8,"DewPoint":4.6},"TempUnit":"C"}"#;

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

    fn service(registry: TopicRegistry, repo: MockObservationRepository) -> IngestionService {
        let repo: Arc<dyn ObservationRepository> = Arc::new(repo);
        IngestionService::new(
            Arc::new(registry),
            ObservationSink::new(repo),
            chrono_tz::Europe::Athens,
        )
    }

    #[tokio::test]
    async fn test_sht4x_message_persists_three_observations() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .withf(|drafts: &Vec<ObservationDraft>| {
                // 17:13:40 on an Athens winter clock
                let time = Utc.with_ymd_and_hms(2026, 2, 28, 15, 13, 40).unwrap();
                drafts.len() == 3
                    && drafts.iter().all(|d| d.result_time == time)
                    && drafts[0].datastream_id == uuid!("388a0b8f-f3ea-4f2b-9f0d-0a27dc44dce3")
                    && drafts[0].result == ObservationResult::Numeric(23.3)
                    && drafts[1].datastream_id == uuid!("35af36ae-4d57-416c-8354-c05457bcc6cc")
                    && drafts[1].result == ObservationResult::Numeric(29.8)
                    && drafts[2].datastream_id == uuid!("5645b49f-32de-45d0-b4f2-5578b822ac86")
                    && drafts[2].result == ObservationResult::Numeric(4.6)
            })
            .times(1)
            .returning(|drafts| Ok(persisted(drafts)));

        let service = service(TopicRegistry::builtin(), mock_repo);
        let outcome = service.dispatch(SHT4X_TOPIC, SHT4X_PAYLOAD).await;

        match outcome {
            DispatchOutcome::Persisted(saved) => assert_eq!(saved.len(), 3),
            other => panic!("expected Persisted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected_without_writes() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo.expect_create_observations().times(0);

        let service = service(TopicRegistry::builtin(), mock_repo);
        let outcome = service.dispatch(SHT4X_TOPIC, b"{\"Time\": ").await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(IngestionError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unroutable_topic_then_routed_message() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .times(1)
            .returning(|drafts| Ok(persisted(drafts)));

        let service = service(TopicRegistry::builtin(), mock_repo);

        let first = service.dispatch("tele/unknown/SENSOR", SHT4X_PAYLOAD).await;
        match first {
            DispatchOutcome::Rejected(IngestionError::UnroutableTopic(topic)) => {
                assert_eq!(topic, "tele/unknown/SENSOR")
            }
            other => panic!("expected UnroutableTopic, got {:?}", other),
        }

        let second = service.dispatch(SHT4X_TOPIC, SHT4X_PAYLOAD).await;
        assert!(matches!(second, DispatchOutcome::Persisted(_)));
    }

    #[tokio::test]
    async fn test_energy_topic_has_nothing_to_record() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo.expect_create_observations().times(0);

        let service = service(TopicRegistry::builtin(), mock_repo);
        let outcome = service
            .dispatch(
                "tele/NOUS_A1T_4E4984/SENSOR",
                br#"{"Time":"2026-02-28T17:13:40","ENERGY":{"Power":12,"Voltage":231}}"#,
            )
            .await;

        assert!(matches!(outcome, DispatchOutcome::NothingToRecord));
    }

    #[tokio::test]
    async fn test_values_of_the_wrong_kind_never_reach_float_streams() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo.expect_create_observations().times(0);

        let service = service(TopicRegistry::builtin(), mock_repo);
        let outcome = service
            .dispatch(
                SHT4X_TOPIC,
                br#"{"Time":"2026-02-28T17:13:40","SHT4X":{"Temperature":"23.3","Humidity":true}}"#,
            )
            .await;

        assert!(matches!(outcome, DispatchOutcome::NothingToRecord));
    }

    #[tokio::test]
    async fn test_only_fitting_values_are_persisted() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .withf(|drafts: &Vec<ObservationDraft>| {
                drafts.len() == 1
                    && drafts[0].datastream_id == uuid!("5645b49f-32de-45d0-b4f2-5578b822ac86")
                    && drafts[0].result == ObservationResult::Numeric(4.6)
            })
            .times(1)
            .returning(|drafts| Ok(persisted(drafts)));

        let service = service(TopicRegistry::builtin(), mock_repo);
        let outcome = service
            .dispatch(
                SHT4X_TOPIC,
                br#"{"Time":"2026-02-28T17:13:40","SHT4X":{"Temperature":"23.3","Humidity":true,"DewPoint":4.6}}"#,
            )
            .await;

        assert!(matches!(outcome, DispatchOutcome::Persisted(saved) if saved.len() == 1));
    }

    #[tokio::test]
    async fn test_summer_timestamps_follow_device_zone() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .withf(|drafts: &Vec<ObservationDraft>| {
                let time = Utc.with_ymd_and_hms(2026, 7, 15, 9, 0, 0).unwrap();
                drafts.iter().all(|d| d.result_time == time)
            })
            .times(1)
            .returning(|drafts| Ok(persisted(drafts)));

        let service = service(TopicRegistry::builtin(), mock_repo);
        let outcome = service
            .dispatch(
                SHT4X_TOPIC,
                br#"{"Time":"2026-07-15T12:00:00","SHT4X":{"Temperature":31.0}}"#,
            )
            .await;

        assert!(matches!(outcome, DispatchOutcome::Persisted(_)));
    }

    #[tokio::test]
    async fn test_integrity_failure_is_rejected() {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo
            .expect_create_observations()
            .times(1)
            .returning(|_| Err(DomainError::IntegrityViolation("[23503] fk".to_string())));

        let registry = TopicRegistry::new(vec![TopicBinding {
            topic: "tele/+/SENSOR".to_string(),
            decoder: PayloadDecoder::Tasmota {
                sensor: "SHT4X".to_string(),
            },
            fields: vec![FieldBinding::new("Temperature", Uuid::new_v4())],
        }])
        .unwrap();

        let service = service(registry, mock_repo);
        let outcome = service.dispatch("tele/garage/SENSOR", SHT4X_PAYLOAD).await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Rejected(IngestionError::Integrity(_))
        ));
    }
}

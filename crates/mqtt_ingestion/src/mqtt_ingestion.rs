use crate::domain::{
    IngestionError, IngestionService, MqttIngestionConfig, ObservationSink, TopicRegistry,
};
use crate::mqtt::{parse_broker_url, run_mqtt_supervisor, BrokerAddress};
use common::domain::ObservationRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct MqttIngestion {
    config: MqttIngestionConfig,
    broker: BrokerAddress,
    service: IngestionService,
}

impl MqttIngestion {
    /// Validate the configuration and wire the pipeline; nothing connects until `start`
    pub fn new(
        config: MqttIngestionConfig,
        registry: TopicRegistry,
        repository: Arc<dyn ObservationRepository>,
    ) -> Result<Self, IngestionError> {
        debug!("initializing MQTT ingestion module");

        let broker = parse_broker_url(&config.broker_url)?;
        let device_tz = config.device_timezone()?;
        let service = IngestionService::new(
            Arc::new(registry),
            ObservationSink::new(repository),
            device_tz,
        );

        Ok(Self {
            config,
            broker,
            service,
        })
    }

    pub fn service(&self) -> &IngestionService {
        &self.service
    }

    /// Spawn the supervisor and hand back the only way to stop it
    pub fn start(self) -> IngestionHandle {
        let token = CancellationToken::new();
        // Supervisor stop + drain must fit inside the handle's wait
        let stop_timeout = self.config.drain_timeout() + Duration::from_secs(2);

        info!(
            host = %self.broker.host,
            port = self.broker.port,
            "starting MQTT ingestion"
        );

        let task = tokio::spawn(run_mqtt_supervisor(
            self.config,
            self.broker,
            self.service,
            token.clone(),
        ));

        IngestionHandle {
            token,
            task,
            stop_timeout,
        }
    }
}

/// Owned handle to a running ingestion supervisor
pub struct IngestionHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    stop_timeout: Duration,
}

impl IngestionHandle {
    /// Cancel the supervisor and wait for it, aborting after the stop timeout
    pub async fn stop(self) {
        self.token.cancel();

        let mut task = self.task;
        match tokio::time::timeout(self.stop_timeout, &mut task).await {
            Ok(Ok(())) => info!("MQTT ingestion stopped"),
            Ok(Err(e)) => warn!("MQTT ingestion task ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "MQTT ingestion did not stop within {:?}, aborting",
                    self.stop_timeout
                );
                task.abort();
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::MockObservationRepository;

    fn repository() -> Arc<dyn ObservationRepository> {
        let mut mock_repo = MockObservationRepository::new();
        mock_repo.expect_create_observations().times(0);
        Arc::new(mock_repo)
    }

    #[test]
    fn test_invalid_broker_url_is_rejected() {
        let config = MqttIngestionConfig {
            broker_url: "mqtt://broker:not-a-port".to_string(),
            ..Default::default()
        };
        let result = MqttIngestion::new(config, TopicRegistry::builtin(), repository());
        assert!(matches!(result, Err(IngestionError::Configuration(_))));
    }

    #[test]
    fn test_unknown_device_timezone_is_rejected() {
        let config = MqttIngestionConfig {
            device_timezone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        let result = MqttIngestion::new(config, TopicRegistry::builtin(), repository());
        assert!(matches!(result, Err(IngestionError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_start_then_stop_against_unreachable_broker() {
        let config = MqttIngestionConfig {
            broker_url: "mqtt://127.0.0.1:1".to_string(),
            retry_delay_secs: 60,
            drain_timeout_secs: 1,
            ..Default::default()
        };
        let ingestion =
            MqttIngestion::new(config, TopicRegistry::builtin(), repository()).unwrap();
        assert_eq!(ingestion.service().registry().topics().len(), 2);

        let handle = ingestion.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .expect("stop should complete");
    }
}

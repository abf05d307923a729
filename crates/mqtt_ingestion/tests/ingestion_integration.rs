#![cfg(feature = "integration-tests")]

use chrono::{TimeZone, Utc};
use common::domain::{
    CreateDatastreamRepoInput, CreateSystemRepoInput, DatastreamRepository,
    ListObservationsRepoInput, ObservationRepository, ObservationResult, ResultType,
    SystemRepository,
};
use common::postgres::{
    PostgresClient, PostgresConfig, PostgresDatastreamRepository, PostgresObservationRepository,
    PostgresSystemRepository,
};
use goose::MigrationRunner;
use mqtt_ingestion::{
    DispatchOutcome, FieldBinding, IngestionError, IngestionService, ObservationSink,
    PayloadDecoder, TopicBinding, TopicRegistry,
};
use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use uuid::{uuid, Uuid};

const SHT4X_TOPIC: &str = "tele/IoTorero_6057F8/SENSOR";
const TEMPERATURE: Uuid = uuid!("388a0b8f-f3ea-4f2b-9f0d-0a27dc44dce3");
const HUMIDITY: Uuid = uuid!("35af36ae-4d57-416c-8354-c05457bcc6cc");
const DEW_POINT: Uuid = uuid!("5645b49f-32de-45d0-b4f2-5578b822ac86");

async fn setup_test_db() -> (ContainerAsync<Postgres>, PostgresClient) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let config = PostgresConfig {
        host: host.to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        max_pool_size: 5,
    };

    let migrations_dir = format!("{}/../../migrations/postgres", env!("CARGO_MANIFEST_DIR"));
    let goose_path = which::which("goose").expect("goose binary not found");

    MigrationRunner::postgres(goose_path, migrations_dir, config.dsn())
        .run_migrations()
        .await
        .expect("Migrations failed");

    let client = PostgresClient::new(&config).expect("Failed to create client");
    (postgres, client)
}

/// The SHT4X sensor with its three datastreams
async fn seed_catalog(client: &PostgresClient) {
    let system_id = Uuid::new_v4();
    PostgresSystemRepository::new(client.clone())
        .create_system(CreateSystemRepoInput {
            id: system_id,
            name: "IoTorero SHT4X".to_string(),
            description: None,
            system_type: Some("tasmota".to_string()),
            external_id: Some("IoTorero_6057F8".to_string()),
            properties: None,
        })
        .await
        .unwrap();

    let datastreams = PostgresDatastreamRepository::new(client.clone());
    for (id, name) in [
        (TEMPERATURE, "temperature"),
        (HUMIDITY, "humidity"),
        (DEW_POINT, "dew point"),
    ] {
        datastreams
            .create_datastream(CreateDatastreamRepoInput {
                id,
                name: name.to_string(),
                description: None,
                system_id,
                observed_property_id: None,
                deployment_id: None,
                procedure_id: None,
                feature_of_interest_id: None,
                observation_result_type: ResultType::Float,
                is_active: true,
                is_gps_enabled: false,
                properties: None,
            })
            .await
            .unwrap();
    }
}

fn service(registry: TopicRegistry, repository: Arc<dyn ObservationRepository>) -> IngestionService {
    IngestionService::new(
        Arc::new(registry),
        ObservationSink::new(repository),
        chrono_tz::Europe::Athens,
    )
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_sht4x_message_is_persisted() {
    let (_container, client) = setup_test_db().await;
    seed_catalog(&client).await;

    let repository = Arc::new(PostgresObservationRepository::new(client));
    let service = service(TopicRegistry::builtin(), repository.clone());

    let outcome = service
        .dispatch(
            SHT4X_TOPIC,
            br#"{"Time":"2026-02-28T17:13:40","SHT4X":{"Temperature":23.3,"Humidity":29.8}}"#,
        )
        .await;
    assert!(matches!(outcome, DispatchOutcome::Persisted(ref saved) if saved.len() == 2));

    // 17:13:40 on an Athens winter clock
    let expected_time = Utc.with_ymd_and_hms(2026, 2, 28, 15, 13, 40).unwrap();
    for (datastream_id, value) in [(TEMPERATURE, 23.3), (HUMIDITY, 29.8)] {
        let stored = repository
            .list_observations(ListObservationsRepoInput {
                datastream_id: Some(datastream_id),
            })
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].result_time, expected_time);
        assert_eq!(stored[0].result, ObservationResult::Numeric(value));
    }

    let dew_point = repository
        .list_observations(ListObservationsRepoInput {
            datastream_id: Some(DEW_POINT),
        })
        .await
        .unwrap();
    assert!(dew_point.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_malformed_and_unroutable_messages_store_nothing() {
    let (_container, client) = setup_test_db().await;
    seed_catalog(&client).await;

    let repository = Arc::new(PostgresObservationRepository::new(client));
    let service = service(TopicRegistry::builtin(), repository.clone());

    service.dispatch(SHT4X_TOPIC, b"{\"Time\":").await;
    service
        .dispatch("tele/unknown/SENSOR", br#"{"Time":"2026-02-28T17:13:40"}"#)
        .await;

    let stored = repository
        .list_observations(ListObservationsRepoInput::default())
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_batch_with_unknown_datastream_fails_atomically() {
    let (_container, client) = setup_test_db().await;
    seed_catalog(&client).await;

    let registry = TopicRegistry::new(vec![TopicBinding {
        topic: SHT4X_TOPIC.to_string(),
        decoder: PayloadDecoder::Tasmota {
            sensor: "SHT4X".to_string(),
        },
        fields: vec![
            FieldBinding::new("Temperature", TEMPERATURE),
            FieldBinding::new("Humidity", Uuid::new_v4()),
        ],
    }])
    .unwrap();

    let repository = Arc::new(PostgresObservationRepository::new(client));
    let service = service(registry, repository.clone());

    let outcome = service
        .dispatch(
            SHT4X_TOPIC,
            br#"{"Time":"2026-02-28T17:13:40","SHT4X":{"Temperature":23.3,"Humidity":29.8}}"#,
        )
        .await;
    assert!(matches!(
        outcome,
        DispatchOutcome::Rejected(IngestionError::Integrity(_))
    ));

    let stored = repository
        .list_observations(ListObservationsRepoInput::default())
        .await
        .unwrap();
    assert!(stored.is_empty());
}

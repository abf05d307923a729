mod config;

use catalog_api::{
    CatalogApi, CatalogApiServices, DatastreamService, DeploymentService,
    FeatureOfInterestService, HttpServerConfig, ObservationService, ObservedPropertyService,
    ProcedureService, SystemService,
};
use common::postgres::{
    PostgresClient, PostgresConfig, PostgresDatastreamRepository, PostgresDeploymentRepository,
    PostgresFeatureOfInterestRepository, PostgresObservationRepository,
    PostgresObservedPropertyRepository, PostgresProcedureRepository, PostgresSystemRepository,
};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use config::ServiceConfig;
use goose::MigrationRunner;
use hometel_runner::Runner;
use mqtt_ingestion::{
    verify_bindings, IngestionHandle, MqttIngestion, MqttIngestionConfig, TopicRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        mqtt_enabled = config.mqtt_enabled,
        "Starting hometel-all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    let repos = match initialize_postgres(&config).await {
        Ok(repos) => repos,
        Err(e) => {
            error!("Failed to initialize PostgreSQL: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize domain services
    let services = CatalogApiServices {
        system_service: Arc::new(SystemService::new(repos.system.clone())),
        datastream_service: Arc::new(DatastreamService::new(
            repos.datastream.clone(),
            repos.system.clone(),
        )),
        observation_service: Arc::new(ObservationService::new(
            repos.observation.clone(),
            repos.datastream.clone(),
        )),
        deployment_service: Arc::new(DeploymentService::new(
            repos.deployment.clone(),
            repos.system.clone(),
        )),
        procedure_service: Arc::new(ProcedureService::new(repos.procedure.clone())),
        feature_of_interest_service: Arc::new(FeatureOfInterestService::new(
            repos.feature_of_interest.clone(),
        )),
        observed_property_service: Arc::new(ObservedPropertyService::new(
            repos.observed_property.clone(),
        )),
    };

    let catalog_api = CatalogApi::new(
        services,
        HttpServerConfig {
            host: config.http_host.clone(),
            port: config.http_port,
        },
    );

    // Ingestion lives outside the runner: started here, stopped by a closer
    let ingestion_handle: Option<IngestionHandle> = if config.mqtt_enabled {
        match build_ingestion(&config, &repos).await {
            Ok(ingestion) => Some(ingestion.start()),
            Err(e) => {
                error!("Failed to initialize MQTT ingestion: {:#}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("MQTT ingestion disabled");
        None
    };

    Runner::new()
        .with_named_process("catalog_api", catalog_api.into_runner_process())
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            if let Some(handle) = ingestion_handle {
                handle.stop().await;
            }

            // Flush pending traces
            shutdown_telemetry(telemetry_providers);

            info!("Cleanup complete");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(15))
        .run()
        .await;
}

struct PostgresRepositories {
    system: Arc<PostgresSystemRepository>,
    datastream: Arc<PostgresDatastreamRepository>,
    observation: Arc<PostgresObservationRepository>,
    deployment: Arc<PostgresDeploymentRepository>,
    procedure: Arc<PostgresProcedureRepository>,
    feature_of_interest: Arc<PostgresFeatureOfInterestRepository>,
    observed_property: Arc<PostgresObservedPropertyRepository>,
}

async fn initialize_postgres(config: &ServiceConfig) -> anyhow::Result<PostgresRepositories> {
    info!("Initializing PostgreSQL...");
    let postgres_config = PostgresConfig {
        host: config.postgres_host.clone(),
        port: config.postgres_port,
        database: config.postgres_database.clone(),
        username: config.postgres_username.clone(),
        password: config.postgres_password.clone(),
        max_pool_size: config.postgres_max_pool_size,
    };

    MigrationRunner::postgres(
        config.postgres_goose_binary_path.clone(),
        config.postgres_migrations_dir.clone(),
        postgres_config.dsn(),
    )
    .run_migrations()
    .await?;

    let client = PostgresClient::new(&postgres_config)?;
    client.ping().await?;

    Ok(PostgresRepositories {
        system: Arc::new(PostgresSystemRepository::new(client.clone())),
        datastream: Arc::new(PostgresDatastreamRepository::new(client.clone())),
        observation: Arc::new(PostgresObservationRepository::new(client.clone())),
        deployment: Arc::new(PostgresDeploymentRepository::new(client.clone())),
        procedure: Arc::new(PostgresProcedureRepository::new(client.clone())),
        feature_of_interest: Arc::new(PostgresFeatureOfInterestRepository::new(client.clone())),
        observed_property: Arc::new(PostgresObservedPropertyRepository::new(client)),
    })
}

async fn build_ingestion(
    config: &ServiceConfig,
    repos: &PostgresRepositories,
) -> anyhow::Result<MqttIngestion> {
    let registry = match &config.mqtt_bindings_path {
        Some(path) => {
            info!(path = %path, "loading MQTT topic bindings");
            TopicRegistry::from_file(path)?
        }
        None => TopicRegistry::builtin(),
    };

    // Refuse to start when a binding disagrees with its datastream's result type
    verify_bindings(&registry, repos.datastream.as_ref()).await?;

    let ingestion_config = MqttIngestionConfig {
        broker_url: config.mqtt_broker_url.clone(),
        client_id: config.mqtt_client_id.clone(),
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        retry_delay_secs: config.mqtt_retry_delay_secs,
        max_in_flight: config.mqtt_max_in_flight,
        device_timezone: config.mqtt_device_timezone.clone(),
        ..Default::default()
    };

    Ok(MqttIngestion::new(
        ingestion_config,
        registry,
        repos.observation.clone(),
    )?)
}

use crate::domain::{
    DatastreamService, DeploymentService, FeatureOfInterestService, ObservationService,
    ObservedPropertyService, ProcedureService, SystemService,
};
use crate::http::router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Domain services shared by every handler
#[derive(Clone)]
pub struct CatalogApiServices {
    pub system_service: Arc<SystemService>,
    pub datastream_service: Arc<DatastreamService>,
    pub observation_service: Arc<ObservationService>,
    pub deployment_service: Arc<DeploymentService>,
    pub procedure_service: Arc<ProcedureService>,
    pub feature_of_interest_service: Arc<FeatureOfInterestService>,
    pub observed_property_service: Arc<ObservedPropertyService>,
}

/// Run the HTTP server until the token is cancelled, then finish in-flight requests
pub async fn run_catalog_http_server(
    config: HttpServerConfig,
    services: CatalogApiServices,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Starting HTTP server on {}", listener.local_addr()?);

    let server = axum::serve(listener, router(services)).with_graceful_shutdown(async move {
        cancellation_token.cancelled().await;
        info!("HTTP server shutdown signal received");
    });

    match server.await {
        Ok(()) => {
            info!("HTTP server stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!("HTTP server error: {}", e);
            Err(e.into())
        }
    }
}

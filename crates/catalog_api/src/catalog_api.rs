use crate::http::{run_catalog_http_server, CatalogApiServices, HttpServerConfig};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct CatalogApi {
    services: CatalogApiServices,
    config: HttpServerConfig,
}

impl CatalogApi {
    pub fn new(services: CatalogApiServices, config: HttpServerConfig) -> Self {
        debug!("Initializing catalog API module");
        Self { services, config }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| {
            Box::pin(async move { run_catalog_http_server(self.config, self.services, ctx).await })
        }
    }
}

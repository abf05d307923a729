//! Route definitions for the REST API.

use crate::http::{
    datastream_handler, deployment_handler, feature_of_interest_handler, observation_handler,
    observed_property_handler, procedure_handler, system_handler, CatalogApiServices,
};
use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// API v1 routes
pub fn api_routes() -> Router<CatalogApiServices> {
    Router::new()
        .route("/api/v1", get(info))
        .route(
            "/api/v1/systems",
            get(system_handler::list_systems).post(system_handler::create_system),
        )
        .route("/api/v1/systems/:id", get(system_handler::get_system))
        .route(
            "/api/v1/datastreams",
            get(datastream_handler::list_datastreams).post(datastream_handler::create_datastream),
        )
        .route(
            "/api/v1/datastreams/:id",
            get(datastream_handler::get_datastream)
                .put(datastream_handler::update_datastream)
                .delete(datastream_handler::delete_datastream),
        )
        .route(
            "/api/v1/deployments",
            get(deployment_handler::list_deployments).post(deployment_handler::create_deployment),
        )
        .route(
            "/api/v1/deployments/:id",
            get(deployment_handler::get_deployment)
                .put(deployment_handler::update_deployment)
                .delete(deployment_handler::delete_deployment),
        )
        .route(
            "/api/v1/procedures",
            get(procedure_handler::list_procedures).post(procedure_handler::create_procedure),
        )
        .route(
            "/api/v1/procedures/:id",
            get(procedure_handler::get_procedure)
                .put(procedure_handler::update_procedure)
                .delete(procedure_handler::delete_procedure),
        )
        .route(
            "/api/v1/features-of-interest",
            get(feature_of_interest_handler::list_features_of_interest)
                .post(feature_of_interest_handler::create_feature_of_interest),
        )
        .route(
            "/api/v1/features-of-interest/:id",
            get(feature_of_interest_handler::get_feature_of_interest)
                .put(feature_of_interest_handler::update_feature_of_interest)
                .delete(feature_of_interest_handler::delete_feature_of_interest),
        )
        .route(
            "/api/v1/observed-properties",
            get(observed_property_handler::list_observed_properties)
                .post(observed_property_handler::create_observed_property),
        )
        .route(
            "/api/v1/observed-properties/:id",
            get(observed_property_handler::get_observed_property)
                .put(observed_property_handler::update_observed_property)
                .delete(observed_property_handler::delete_observed_property),
        )
        .route(
            "/api/v1/observations",
            get(observation_handler::list_observations)
                .post(observation_handler::create_observation),
        )
        .route(
            "/api/v1/observations/bulk",
            post(observation_handler::create_observations),
        )
        .route(
            "/api/v1/observations/:id",
            get(observation_handler::get_observation)
                .put(observation_handler::update_observation)
                .delete(observation_handler::delete_observation),
        )
}

/// Complete application router with request tracing
pub fn router(services: CatalogApiServices) -> Router {
    api_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}

/// GET /api/v1 - service info
async fn info() -> Response {
    let info = serde_json::json!({
        "name": "hometel",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/systems",
            "/api/v1/datastreams",
            "/api/v1/deployments",
            "/api/v1/procedures",
            "/api/v1/features-of-interest",
            "/api/v1/observed-properties",
            "/api/v1/observations",
            "/api/v1/observations/bulk"
        ]
    });

    Json(info).into_response()
}

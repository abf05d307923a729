use crate::domain::{CreateDatastreamRequest, UpdateDatastreamRequest};
use crate::http::{ApiError, CatalogApiServices};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common::domain::{Datastream, ResultType};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateDatastreamBody {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub system_id: Uuid,
    pub observed_property_id: Option<Uuid>,
    pub deployment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub feature_of_interest_id: Option<Uuid>,
    pub observation_result_type: ResultType,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_gps_enabled: bool,
    pub properties: Option<serde_json::Value>,
}

/// Absent fields keep their stored value
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDatastreamBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub system_id: Option<Uuid>,
    pub observed_property_id: Option<Uuid>,
    pub deployment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub feature_of_interest_id: Option<Uuid>,
    pub observation_result_type: Option<ResultType>,
    pub is_active: Option<bool>,
    pub is_gps_enabled: Option<bool>,
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatastreamResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub system_id: Uuid,
    pub observed_property_id: Option<Uuid>,
    pub deployment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub feature_of_interest_id: Option<Uuid>,
    pub observation_result_type: ResultType,
    pub is_active: bool,
    pub is_gps_enabled: bool,
    pub properties: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Datastream> for DatastreamResponse {
    fn from(datastream: Datastream) -> Self {
        Self {
            id: datastream.id,
            name: datastream.name,
            description: datastream.description,
            system_id: datastream.system_id,
            observed_property_id: datastream.observed_property_id,
            deployment_id: datastream.deployment_id,
            procedure_id: datastream.procedure_id,
            feature_of_interest_id: datastream.feature_of_interest_id,
            observation_result_type: datastream.observation_result_type,
            is_active: datastream.is_active,
            is_gps_enabled: datastream.is_gps_enabled,
            properties: datastream.properties,
            created_at: datastream.created_at,
        }
    }
}

/// POST /api/v1/datastreams
pub async fn create_datastream(
    State(services): State<CatalogApiServices>,
    body: Result<Json<CreateDatastreamBody>, JsonRejection>,
) -> Result<(StatusCode, Json<DatastreamResponse>), ApiError> {
    let Json(body) = body?;

    let datastream = services
        .datastream_service
        .create_datastream(CreateDatastreamRequest {
            id: body.id,
            name: body.name,
            description: body.description,
            system_id: body.system_id,
            observed_property_id: body.observed_property_id,
            deployment_id: body.deployment_id,
            procedure_id: body.procedure_id,
            feature_of_interest_id: body.feature_of_interest_id,
            observation_result_type: body.observation_result_type,
            is_active: body.is_active,
            is_gps_enabled: body.is_gps_enabled,
            properties: body.properties,
        })
        .await?;

    debug!(datastream_id = %datastream.id, "datastream created");
    Ok((StatusCode::CREATED, Json(datastream.into())))
}

/// GET /api/v1/datastreams
pub async fn list_datastreams(
    State(services): State<CatalogApiServices>,
) -> Result<Json<Vec<DatastreamResponse>>, ApiError> {
    let datastreams = services.datastream_service.list_datastreams().await?;
    Ok(Json(
        datastreams.into_iter().map(DatastreamResponse::from).collect(),
    ))
}

/// GET /api/v1/datastreams/:id
pub async fn get_datastream(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DatastreamResponse>, ApiError> {
    let Path(id) = id?;
    let datastream = services.datastream_service.get_datastream(id).await?;
    Ok(Json(datastream.into()))
}

/// PUT /api/v1/datastreams/:id
pub async fn update_datastream(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateDatastreamBody>, JsonRejection>,
) -> Result<Json<DatastreamResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;

    let datastream = services
        .datastream_service
        .update_datastream(UpdateDatastreamRequest {
            id,
            name: body.name,
            description: body.description,
            system_id: body.system_id,
            observed_property_id: body.observed_property_id,
            deployment_id: body.deployment_id,
            procedure_id: body.procedure_id,
            feature_of_interest_id: body.feature_of_interest_id,
            observation_result_type: body.observation_result_type,
            is_active: body.is_active,
            is_gps_enabled: body.is_gps_enabled,
            properties: body.properties,
        })
        .await?;

    debug!(datastream_id = %id, "datastream updated");
    Ok(Json(datastream.into()))
}

/// DELETE /api/v1/datastreams/:id
pub async fn delete_datastream(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    services.datastream_service.delete_datastream(id).await?;
    debug!(datastream_id = %id, "datastream deleted");
    Ok(StatusCode::NO_CONTENT)
}

use crate::domain::{CreateDeploymentRequest, UpdateDeploymentRequest};
use crate::http::{ApiError, CatalogApiServices};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common::domain::{Deployment, DeploymentType};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateDeploymentBody {
    pub id: Option<Uuid>,
    pub system_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deployment_type: DeploymentType,
    /// GeoJSON
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDeploymentBody {
    pub system_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub deployment_type: Option<DeploymentType>,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeploymentResponse {
    pub id: Uuid,
    pub system_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deployment_type: DeploymentType,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Deployment> for DeploymentResponse {
    fn from(deployment: Deployment) -> Self {
        Self {
            id: deployment.id,
            system_id: deployment.system_id,
            name: deployment.name,
            description: deployment.description,
            deployment_type: deployment.deployment_type,
            location: deployment.location,
            properties: deployment.properties,
            created_at: deployment.created_at,
        }
    }
}

/// POST /api/v1/deployments
pub async fn create_deployment(
    State(services): State<CatalogApiServices>,
    body: Result<Json<CreateDeploymentBody>, JsonRejection>,
) -> Result<(StatusCode, Json<DeploymentResponse>), ApiError> {
    let Json(body) = body?;

    let deployment = services
        .deployment_service
        .create_deployment(CreateDeploymentRequest {
            id: body.id,
            system_id: body.system_id,
            name: body.name,
            description: body.description,
            deployment_type: body.deployment_type,
            location: body.location,
            properties: body.properties,
        })
        .await?;

    debug!(deployment_id = %deployment.id, "deployment created");
    Ok((StatusCode::CREATED, Json(deployment.into())))
}

/// GET /api/v1/deployments
pub async fn list_deployments(
    State(services): State<CatalogApiServices>,
) -> Result<Json<Vec<DeploymentResponse>>, ApiError> {
    let deployments = services.deployment_service.list_deployments().await?;
    Ok(Json(
        deployments
            .into_iter()
            .map(DeploymentResponse::from)
            .collect(),
    ))
}

/// GET /api/v1/deployments/:id
pub async fn get_deployment(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let Path(id) = id?;
    let deployment = services.deployment_service.get_deployment(id).await?;
    Ok(Json(deployment.into()))
}

/// PUT /api/v1/deployments/:id
pub async fn update_deployment(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateDeploymentBody>, JsonRejection>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;

    let deployment = services
        .deployment_service
        .update_deployment(UpdateDeploymentRequest {
            id,
            system_id: body.system_id,
            name: body.name,
            description: body.description,
            deployment_type: body.deployment_type,
            location: body.location,
            properties: body.properties,
        })
        .await?;

    Ok(Json(deployment.into()))
}

/// DELETE /api/v1/deployments/:id
pub async fn delete_deployment(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    services.deployment_service.delete_deployment(id).await?;
    debug!(deployment_id = %id, "deployment deleted");
    Ok(StatusCode::NO_CONTENT)
}

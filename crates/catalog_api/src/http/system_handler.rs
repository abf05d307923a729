use crate::domain::CreateSystemRequest;
use crate::http::{ApiError, CatalogApiServices};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common::domain::System;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateSystemBody {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub system_type: Option<String>,
    pub external_id: Option<String>,
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub system_type: Option<String>,
    pub external_id: Option<String>,
    pub properties: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<System> for SystemResponse {
    fn from(system: System) -> Self {
        Self {
            id: system.id,
            name: system.name,
            description: system.description,
            system_type: system.system_type,
            external_id: system.external_id,
            properties: system.properties,
            created_at: system.created_at,
        }
    }
}

/// POST /api/v1/systems
pub async fn create_system(
    State(services): State<CatalogApiServices>,
    body: Result<Json<CreateSystemBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SystemResponse>), ApiError> {
    let Json(body) = body?;

    let system = services
        .system_service
        .create_system(CreateSystemRequest {
            id: body.id,
            name: body.name,
            description: body.description,
            system_type: body.system_type,
            external_id: body.external_id,
            properties: body.properties,
        })
        .await?;

    debug!(system_id = %system.id, "system created");
    Ok((StatusCode::CREATED, Json(system.into())))
}

/// GET /api/v1/systems
pub async fn list_systems(
    State(services): State<CatalogApiServices>,
) -> Result<Json<Vec<SystemResponse>>, ApiError> {
    let systems = services.system_service.list_systems().await?;
    Ok(Json(systems.into_iter().map(SystemResponse::from).collect()))
}

/// GET /api/v1/systems/:id
pub async fn get_system(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SystemResponse>, ApiError> {
    let Path(id) = id?;
    let system = services.system_service.get_system(id).await?;
    Ok(Json(system.into()))
}

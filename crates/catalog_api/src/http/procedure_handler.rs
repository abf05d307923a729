use crate::domain::{CreateProcedureRequest, UpdateProcedureRequest};
use crate::http::{ApiError, CatalogApiServices};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common::domain::{Procedure, ProcedureType};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateProcedureBody {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub procedure_type: ProcedureType,
    pub reference: Option<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProcedureBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub procedure_type: Option<ProcedureType>,
    pub reference: Option<String>,
    pub steps: Option<Vec<String>>,
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcedureResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub procedure_type: ProcedureType,
    pub reference: Option<String>,
    pub steps: Vec<String>,
    pub properties: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Procedure> for ProcedureResponse {
    fn from(procedure: Procedure) -> Self {
        Self {
            id: procedure.id,
            name: procedure.name,
            description: procedure.description,
            procedure_type: procedure.procedure_type,
            reference: procedure.reference,
            steps: procedure.steps,
            properties: procedure.properties,
            created_at: procedure.created_at,
        }
    }
}

/// POST /api/v1/procedures
pub async fn create_procedure(
    State(services): State<CatalogApiServices>,
    body: Result<Json<CreateProcedureBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ProcedureResponse>), ApiError> {
    let Json(body) = body?;

    let procedure = services
        .procedure_service
        .create_procedure(CreateProcedureRequest {
            id: body.id,
            name: body.name,
            description: body.description,
            procedure_type: body.procedure_type,
            reference: body.reference,
            steps: body.steps,
            properties: body.properties,
        })
        .await?;

    debug!(procedure_id = %procedure.id, "procedure created");
    Ok((StatusCode::CREATED, Json(procedure.into())))
}

/// GET /api/v1/procedures
pub async fn list_procedures(
    State(services): State<CatalogApiServices>,
) -> Result<Json<Vec<ProcedureResponse>>, ApiError> {
    let procedures = services.procedure_service.list_procedures().await?;
    Ok(Json(
        procedures.into_iter().map(ProcedureResponse::from).collect(),
    ))
}

/// GET /api/v1/procedures/:id
pub async fn get_procedure(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProcedureResponse>, ApiError> {
    let Path(id) = id?;
    let procedure = services.procedure_service.get_procedure(id).await?;
    Ok(Json(procedure.into()))
}

/// PUT /api/v1/procedures/:id
pub async fn update_procedure(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateProcedureBody>, JsonRejection>,
) -> Result<Json<ProcedureResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;

    let procedure = services
        .procedure_service
        .update_procedure(UpdateProcedureRequest {
            id,
            name: body.name,
            description: body.description,
            procedure_type: body.procedure_type,
            reference: body.reference,
            steps: body.steps,
            properties: body.properties,
        })
        .await?;

    Ok(Json(procedure.into()))
}

/// DELETE /api/v1/procedures/:id
pub async fn delete_procedure(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    services.procedure_service.delete_procedure(id).await?;
    debug!(procedure_id = %id, "procedure deleted");
    Ok(StatusCode::NO_CONTENT)
}

use crate::domain::{CreateObservedPropertyRequest, UpdateObservedPropertyRequest};
use crate::http::{ApiError, CatalogApiServices};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common::domain::{ObservedProperty, PropertyDomain, ResultType};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateObservedPropertyBody {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub domain: PropertyDomain,
    pub property_definition: Option<String>,
    pub unit_definition: Option<String>,
    pub unit_symbol: Option<String>,
    pub reference: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub value_type: ResultType,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateObservedPropertyBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub domain: Option<PropertyDomain>,
    pub property_definition: Option<String>,
    pub unit_definition: Option<String>,
    pub unit_symbol: Option<String>,
    pub reference: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub value_type: Option<ResultType>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObservedPropertyResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub domain: PropertyDomain,
    pub property_definition: Option<String>,
    pub unit_definition: Option<String>,
    pub unit_symbol: Option<String>,
    pub reference: Option<String>,
    pub keywords: Vec<String>,
    pub value_type: ResultType,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ObservedProperty> for ObservedPropertyResponse {
    fn from(property: ObservedProperty) -> Self {
        Self {
            id: property.id,
            name: property.name,
            description: property.description,
            domain: property.domain,
            property_definition: property.property_definition,
            unit_definition: property.unit_definition,
            unit_symbol: property.unit_symbol,
            reference: property.reference,
            keywords: property.keywords,
            value_type: property.value_type,
            created_at: property.created_at,
        }
    }
}

/// POST /api/v1/observed-properties
pub async fn create_observed_property(
    State(services): State<CatalogApiServices>,
    body: Result<Json<CreateObservedPropertyBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ObservedPropertyResponse>), ApiError> {
    let Json(body) = body?;

    let property = services
        .observed_property_service
        .create_observed_property(CreateObservedPropertyRequest {
            id: body.id,
            name: body.name,
            description: body.description,
            domain: body.domain,
            property_definition: body.property_definition,
            unit_definition: body.unit_definition,
            unit_symbol: body.unit_symbol,
            reference: body.reference,
            keywords: body.keywords,
            value_type: body.value_type,
        })
        .await?;

    debug!(observed_property_id = %property.id, "observed property created");
    Ok((StatusCode::CREATED, Json(property.into())))
}

/// GET /api/v1/observed-properties
pub async fn list_observed_properties(
    State(services): State<CatalogApiServices>,
) -> Result<Json<Vec<ObservedPropertyResponse>>, ApiError> {
    let properties = services
        .observed_property_service
        .list_observed_properties()
        .await?;
    Ok(Json(
        properties
            .into_iter()
            .map(ObservedPropertyResponse::from)
            .collect(),
    ))
}

/// GET /api/v1/observed-properties/:id
pub async fn get_observed_property(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ObservedPropertyResponse>, ApiError> {
    let Path(id) = id?;
    let property = services
        .observed_property_service
        .get_observed_property(id)
        .await?;
    Ok(Json(property.into()))
}

/// PUT /api/v1/observed-properties/:id
pub async fn update_observed_property(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateObservedPropertyBody>, JsonRejection>,
) -> Result<Json<ObservedPropertyResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;

    let property = services
        .observed_property_service
        .update_observed_property(UpdateObservedPropertyRequest {
            id,
            name: body.name,
            description: body.description,
            domain: body.domain,
            property_definition: body.property_definition,
            unit_definition: body.unit_definition,
            unit_symbol: body.unit_symbol,
            reference: body.reference,
            keywords: body.keywords,
            value_type: body.value_type,
        })
        .await?;

    Ok(Json(property.into()))
}

/// DELETE /api/v1/observed-properties/:id
pub async fn delete_observed_property(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    services
        .observed_property_service
        .delete_observed_property(id)
        .await?;
    debug!(observed_property_id = %id, "observed property deleted");
    Ok(StatusCode::NO_CONTENT)
}

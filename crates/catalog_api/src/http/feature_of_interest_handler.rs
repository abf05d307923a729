use crate::domain::{CreateFeatureOfInterestRequest, UpdateFeatureOfInterestRequest};
use crate::http::{ApiError, CatalogApiServices};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common::domain::{FeatureOfInterest, FeatureType};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateFeatureOfInterestBody {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub feature_type: FeatureType,
    pub reference: Option<String>,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
    #[serde(default)]
    pub media_links: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFeatureOfInterestBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub feature_type: Option<FeatureType>,
    pub reference: Option<String>,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
    pub media_links: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureOfInterestResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub feature_type: FeatureType,
    pub reference: Option<String>,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
    pub media_links: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<FeatureOfInterest> for FeatureOfInterestResponse {
    fn from(feature: FeatureOfInterest) -> Self {
        Self {
            id: feature.id,
            name: feature.name,
            description: feature.description,
            feature_type: feature.feature_type,
            reference: feature.reference,
            location: feature.location,
            properties: feature.properties,
            media_links: feature.media_links,
            created_at: feature.created_at,
        }
    }
}

/// POST /api/v1/features-of-interest
pub async fn create_feature_of_interest(
    State(services): State<CatalogApiServices>,
    body: Result<Json<CreateFeatureOfInterestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<FeatureOfInterestResponse>), ApiError> {
    let Json(body) = body?;

    let feature = services
        .feature_of_interest_service
        .create_feature_of_interest(CreateFeatureOfInterestRequest {
            id: body.id,
            name: body.name,
            description: body.description,
            feature_type: body.feature_type,
            reference: body.reference,
            location: body.location,
            properties: body.properties,
            media_links: body.media_links,
        })
        .await?;

    debug!(feature_of_interest_id = %feature.id, "feature of interest created");
    Ok((StatusCode::CREATED, Json(feature.into())))
}

/// GET /api/v1/features-of-interest
pub async fn list_features_of_interest(
    State(services): State<CatalogApiServices>,
) -> Result<Json<Vec<FeatureOfInterestResponse>>, ApiError> {
    let features = services
        .feature_of_interest_service
        .list_features_of_interest()
        .await?;
    Ok(Json(
        features
            .into_iter()
            .map(FeatureOfInterestResponse::from)
            .collect(),
    ))
}

/// GET /api/v1/features-of-interest/:id
pub async fn get_feature_of_interest(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<FeatureOfInterestResponse>, ApiError> {
    let Path(id) = id?;
    let feature = services
        .feature_of_interest_service
        .get_feature_of_interest(id)
        .await?;
    Ok(Json(feature.into()))
}

/// PUT /api/v1/features-of-interest/:id
pub async fn update_feature_of_interest(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateFeatureOfInterestBody>, JsonRejection>,
) -> Result<Json<FeatureOfInterestResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;

    let feature = services
        .feature_of_interest_service
        .update_feature_of_interest(UpdateFeatureOfInterestRequest {
            id,
            name: body.name,
            description: body.description,
            feature_type: body.feature_type,
            reference: body.reference,
            location: body.location,
            properties: body.properties,
            media_links: body.media_links,
        })
        .await?;

    Ok(Json(feature.into()))
}

/// DELETE /api/v1/features-of-interest/:id
pub async fn delete_feature_of_interest(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    services
        .feature_of_interest_service
        .delete_feature_of_interest(id)
        .await?;
    debug!(feature_of_interest_id = %id, "feature of interest deleted");
    Ok(StatusCode::NO_CONTENT)
}

use crate::domain::{CreateObservationRequest, UpdateObservationRequest};
use crate::http::{ApiError, CatalogApiServices};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use common::domain::{Observation, ObservationResult};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

const EXACTLY_ONE_RESULT: &str =
    "exactly one of result_numeric, result_text, result_boolean, result_complex must be set";

/// Flat wire form of the observation result
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResultFields {
    pub result_numeric: Option<f64>,
    pub result_text: Option<String>,
    pub result_boolean: Option<bool>,
    pub result_complex: Option<serde_json::Value>,
}

impl ResultFields {
    fn is_empty(&self) -> bool {
        self.result_numeric.is_none()
            && self.result_text.is_none()
            && self.result_boolean.is_none()
            && self.result_complex.is_none()
    }

    fn into_result(self) -> Result<ObservationResult, ApiError> {
        ObservationResult::from_columns(
            self.result_numeric,
            self.result_text,
            self.result_boolean,
            self.result_complex,
        )
        .ok_or_else(|| ApiError::bad_request(EXACTLY_ONE_RESULT))
    }
}

impl From<ObservationResult> for ResultFields {
    fn from(result: ObservationResult) -> Self {
        match result {
            ObservationResult::Numeric(v) => Self {
                result_numeric: Some(v),
                ..Default::default()
            },
            ObservationResult::Text(v) => Self {
                result_text: Some(v),
                ..Default::default()
            },
            ObservationResult::Boolean(v) => Self {
                result_boolean: Some(v),
                ..Default::default()
            },
            ObservationResult::Complex(v) => Self {
                result_complex: Some(v),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateObservationBody {
    pub id: Option<Uuid>,
    pub datastream_id: Uuid,
    pub result_time: DateTime<Utc>,
    #[serde(flatten)]
    pub result: ResultFields,
    pub parameters: Option<serde_json::Value>,
}

impl TryFrom<CreateObservationBody> for CreateObservationRequest {
    type Error = ApiError;

    fn try_from(body: CreateObservationBody) -> Result<Self, Self::Error> {
        Ok(CreateObservationRequest {
            id: body.id,
            datastream_id: body.datastream_id,
            result_time: body.result_time,
            result: body.result.into_result()?,
            parameters: body.parameters,
        })
    }
}

/// Omitted result fields leave the stored result unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateObservationBody {
    #[serde(flatten)]
    pub result: ResultFields,
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListObservationsQuery {
    pub datastream_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObservationResponse {
    pub id: Uuid,
    pub datastream_id: Uuid,
    pub result_time: DateTime<Utc>,
    #[serde(flatten)]
    pub result: ResultFields,
    pub parameters: Option<serde_json::Value>,
}

impl From<Observation> for ObservationResponse {
    fn from(observation: Observation) -> Self {
        Self {
            id: observation.id,
            datastream_id: observation.datastream_id,
            result_time: observation.result_time,
            result: observation.result.into(),
            parameters: observation.parameters,
        }
    }
}

/// POST /api/v1/observations
pub async fn create_observation(
    State(services): State<CatalogApiServices>,
    body: Result<Json<CreateObservationBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ObservationResponse>), ApiError> {
    let Json(body) = body?;

    let observation = services
        .observation_service
        .create_observation(body.try_into()?)
        .await?;

    debug!(observation_id = %observation.id, "observation created");
    Ok((StatusCode::CREATED, Json(observation.into())))
}

/// POST /api/v1/observations/bulk - all or nothing
pub async fn create_observations(
    State(services): State<CatalogApiServices>,
    body: Result<Json<Vec<CreateObservationBody>>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<ObservationResponse>>), ApiError> {
    let Json(bodies) = body?;

    let requests = bodies
        .into_iter()
        .map(CreateObservationRequest::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let observations = services
        .observation_service
        .create_observations(requests)
        .await?;

    debug!(count = observations.len(), "observations created");
    Ok((
        StatusCode::CREATED,
        Json(
            observations
                .into_iter()
                .map(ObservationResponse::from)
                .collect(),
        ),
    ))
}

/// GET /api/v1/observations?datastream_id=
pub async fn list_observations(
    State(services): State<CatalogApiServices>,
    query: Result<Query<ListObservationsQuery>, QueryRejection>,
) -> Result<Json<Vec<ObservationResponse>>, ApiError> {
    let Query(query) = query?;
    let observations = services
        .observation_service
        .list_observations(query.datastream_id)
        .await?;
    Ok(Json(
        observations
            .into_iter()
            .map(ObservationResponse::from)
            .collect(),
    ))
}

/// GET /api/v1/observations/:id
pub async fn get_observation(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ObservationResponse>, ApiError> {
    let Path(id) = id?;
    let observation = services.observation_service.get_observation(id).await?;
    Ok(Json(observation.into()))
}

/// PUT /api/v1/observations/:id
pub async fn update_observation(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateObservationBody>, JsonRejection>,
) -> Result<Json<ObservationResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;

    let result = if body.result.is_empty() {
        None
    } else {
        Some(body.result.into_result()?)
    };

    let observation = services
        .observation_service
        .update_observation(UpdateObservationRequest {
            id,
            result,
            parameters: body.parameters,
        })
        .await?;

    Ok(Json(observation.into()))
}

/// DELETE /api/v1/observations/:id
pub async fn delete_observation(
    State(services): State<CatalogApiServices>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    services.observation_service.delete_observation(id).await?;
    debug!(observation_id = %id, "observation deleted");
    Ok(StatusCode::NO_CONTENT)
}

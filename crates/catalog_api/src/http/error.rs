use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::domain::DomainError;
use serde::Serialize;
use tracing::error;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: StatusCode::BAD_REQUEST.as_u16(),
        }
    }

    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: status.as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = match &err {
            DomainError::SystemNotFound(_)
            | DomainError::DatastreamNotFound(_)
            | DomainError::ObservationNotFound(_)
            | DomainError::DeploymentNotFound(_)
            | DomainError::ProcedureNotFound(_)
            | DomainError::FeatureOfInterestNotFound(_)
            | DomainError::ObservedPropertyNotFound(_) => StatusCode::NOT_FOUND,

            DomainError::ValidationError(_) | DomainError::ResultTypeMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }

            DomainError::SystemAlreadyExists(_)
            | DomainError::DatastreamAlreadyExists(_)
            | DomainError::ObservationAlreadyExists(_)
            | DomainError::DeploymentAlreadyExists(_)
            | DomainError::ProcedureAlreadyExists(_)
            | DomainError::FeatureOfInterestAlreadyExists(_)
            | DomainError::ObservedPropertyAlreadyExists(_)
            | DomainError::DatastreamInUse(_)
            | DomainError::DeploymentInUse(_)
            | DomainError::ProcedureInUse(_)
            | DomainError::FeatureOfInterestInUse(_)
            | DomainError::ObservedPropertyInUse(_)
            | DomainError::IntegrityViolation(_) => StatusCode::CONFLICT,

            DomainError::RepositoryError(e) => {
                error!("repository error: {:#}", e);
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal storage error");
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_status_mapping() {
        let cases = [
            (DomainError::SystemNotFound("s".into()), 404),
            (DomainError::ObservationNotFound("o".into()), 404),
            (DomainError::FeatureOfInterestNotFound("f".into()), 404),
            (DomainError::ObservedPropertyAlreadyExists("p".into()), 409),
            (DomainError::ProcedureInUse("p".into()), 409),
            (DomainError::ValidationError("bad".into()), 400),
            (
                DomainError::ResultTypeMismatch {
                    datastream_id: "d".into(),
                    expected: "FLOAT".into(),
                    actual: "TEXT".into(),
                },
                400,
            ),
            (DomainError::IntegrityViolation("[23503] fk".into()), 409),
            (DomainError::DatastreamInUse("d".into()), 409),
            (DomainError::RepositoryError(anyhow::anyhow!("down")), 500),
        ];

        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code, code);
        }
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let api_error = ApiError::from(DomainError::RepositoryError(anyhow::anyhow!(
            "password authentication failed for user hometel"
        )));
        assert_eq!(api_error.error, "internal storage error");
    }
}

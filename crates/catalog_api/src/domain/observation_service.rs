use chrono::{DateTime, Utc};
use common::domain::{
    Datastream, DatastreamRepository, DomainError, DomainResult, ListObservationsRepoInput,
    Observation, ObservationDraft, ObservationRepository, ObservationResult,
    UpdateObservationRepoInput,
};
use garde::Validate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Service request for recording an observation
#[derive(Debug, Clone, Validate)]
pub struct CreateObservationRequest {
    /// Generated by the repository when absent
    #[garde(skip)]
    pub id: Option<Uuid>,
    #[garde(skip)]
    pub datastream_id: Uuid,
    #[garde(skip)]
    pub result_time: DateTime<Utc>,
    #[garde(custom(finite_number))]
    pub result: ObservationResult,
    #[garde(custom(object_or_absent))]
    pub parameters: Option<serde_json::Value>,
}

/// Service request for correcting an observation
#[derive(Debug, Clone, Validate)]
pub struct UpdateObservationRequest {
    #[garde(skip)]
    pub id: Uuid,
    #[garde(custom(finite_number_if_present))]
    pub result: Option<ObservationResult>,
    #[garde(custom(object_or_absent))]
    pub parameters: Option<serde_json::Value>,
}

fn finite_number(value: &ObservationResult, _ctx: &()) -> garde::Result {
    match value {
        ObservationResult::Numeric(v) if !v.is_finite() => {
            Err(garde::Error::new("numeric result must be finite"))
        }
        _ => Ok(()),
    }
}

fn finite_number_if_present(value: &Option<ObservationResult>, ctx: &()) -> garde::Result {
    match value {
        Some(result) => finite_number(result, ctx),
        None => Ok(()),
    }
}

fn object_or_absent(value: &Option<serde_json::Value>, _ctx: &()) -> garde::Result {
    match value {
        Some(v) if !v.is_object() => Err(garde::Error::new("parameters must be a JSON object")),
        _ => Ok(()),
    }
}

impl From<CreateObservationRequest> for ObservationDraft {
    fn from(request: CreateObservationRequest) -> Self {
        ObservationDraft {
            id: request.id,
            datastream_id: request.datastream_id,
            result_time: request.result_time,
            result: request.result,
            parameters: request.parameters,
        }
    }
}

/// Domain service for observations.
///
/// Every write is checked against the declared result type of its datastream.
pub struct ObservationService {
    observation_repository: Arc<dyn ObservationRepository>,
    datastream_repository: Arc<dyn DatastreamRepository>,
}

impl ObservationService {
    pub fn new(
        observation_repository: Arc<dyn ObservationRepository>,
        datastream_repository: Arc<dyn DatastreamRepository>,
    ) -> Self {
        Self {
            observation_repository,
            datastream_repository,
        }
    }

    #[instrument(skip(self, request), fields(datastream_id = %request.datastream_id))]
    pub async fn create_observation(
        &self,
        request: CreateObservationRequest,
    ) -> DomainResult<Observation> {
        common::garde::validate_struct(&request)?;

        let datastream = self.require_datastream(request.datastream_id).await?;
        check_result_type(&datastream, &request.result)?;

        self.observation_repository
            .create_observation(request.into())
            .await
    }

    /// Record a batch in one transaction; nothing is stored if any entry is rejected
    #[instrument(skip(self, requests), fields(batch_size = requests.len()))]
    pub async fn create_observations(
        &self,
        requests: Vec<CreateObservationRequest>,
    ) -> DomainResult<Vec<Observation>> {
        if requests.is_empty() {
            return Err(DomainError::ValidationError(
                "batch must contain at least one observation".to_string(),
            ));
        }

        let mut datastreams: HashMap<Uuid, Datastream> = HashMap::new();
        for request in &requests {
            common::garde::validate_struct(request)?;

            if !datastreams.contains_key(&request.datastream_id) {
                let datastream = self.require_datastream(request.datastream_id).await?;
                datastreams.insert(request.datastream_id, datastream);
            }
            if let Some(datastream) = datastreams.get(&request.datastream_id) {
                check_result_type(datastream, &request.result)?;
            }
        }

        debug!(datastreams = datastreams.len(), "batch checked");

        self.observation_repository
            .create_observations(requests.into_iter().map(ObservationDraft::from).collect())
            .await
    }

    #[instrument(skip(self), fields(observation_id = %id))]
    pub async fn get_observation(&self, id: Uuid) -> DomainResult<Observation> {
        self.observation_repository
            .get_observation(id)
            .await?
            .ok_or_else(|| DomainError::ObservationNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_observations(
        &self,
        datastream_id: Option<Uuid>,
    ) -> DomainResult<Vec<Observation>> {
        self.observation_repository
            .list_observations(ListObservationsRepoInput { datastream_id })
            .await
    }

    #[instrument(skip(self, request), fields(observation_id = %request.id))]
    pub async fn update_observation(
        &self,
        request: UpdateObservationRequest,
    ) -> DomainResult<Observation> {
        common::garde::validate_struct(&request)?;

        if request.result.is_none() && request.parameters.is_none() {
            return Err(DomainError::ValidationError(
                "nothing to update: provide a result or parameters".to_string(),
            ));
        }

        if let Some(result) = &request.result {
            let current = self.get_observation(request.id).await?;
            let datastream = self.require_datastream(current.datastream_id).await?;
            check_result_type(&datastream, result)?;
        }

        self.observation_repository
            .update_observation(UpdateObservationRepoInput {
                id: request.id,
                result: request.result,
                parameters: request.parameters,
            })
            .await
    }

    #[instrument(skip(self), fields(observation_id = %id))]
    pub async fn delete_observation(&self, id: Uuid) -> DomainResult<()> {
        self.observation_repository.delete_observation(id).await
    }

    async fn require_datastream(&self, id: Uuid) -> DomainResult<Datastream> {
        self.datastream_repository
            .get_datastream(id)
            .await?
            .ok_or_else(|| DomainError::DatastreamNotFound(id.to_string()))
    }
}

fn check_result_type(datastream: &Datastream, result: &ObservationResult) -> DomainResult<()> {
    if result.fits(datastream.observation_result_type) {
        return Ok(());
    }
    Err(DomainError::ResultTypeMismatch {
        datastream_id: datastream.id.to_string(),
        expected: datastream.observation_result_type.to_string(),
        actual: result.kind().to_string(),
    })
}

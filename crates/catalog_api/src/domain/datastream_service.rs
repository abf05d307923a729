use common::domain::{
    CreateDatastreamRepoInput, Datastream, DatastreamRepository, DomainError, DomainResult,
    ResultType, SystemRepository, UpdateDatastreamRepoInput,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Service request for creating a datastream
#[derive(Debug, Clone, Validate)]
pub struct CreateDatastreamRequest {
    /// Generated when absent
    #[garde(skip)]
    pub id: Option<Uuid>,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub system_id: Uuid,
    #[garde(skip)]
    pub observed_property_id: Option<Uuid>,
    #[garde(skip)]
    pub deployment_id: Option<Uuid>,
    #[garde(skip)]
    pub procedure_id: Option<Uuid>,
    #[garde(skip)]
    pub feature_of_interest_id: Option<Uuid>,
    #[garde(skip)]
    pub observation_result_type: ResultType,
    #[garde(skip)]
    pub is_active: bool,
    #[garde(skip)]
    pub is_gps_enabled: bool,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
}

/// Service request for changing a datastream; absent fields keep their value
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateDatastreamRequest {
    #[garde(skip)]
    pub id: Uuid,
    #[garde(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub system_id: Option<Uuid>,
    #[garde(skip)]
    pub observed_property_id: Option<Uuid>,
    #[garde(skip)]
    pub deployment_id: Option<Uuid>,
    #[garde(skip)]
    pub procedure_id: Option<Uuid>,
    #[garde(skip)]
    pub feature_of_interest_id: Option<Uuid>,
    #[garde(skip)]
    pub observation_result_type: Option<ResultType>,
    #[garde(skip)]
    pub is_active: Option<bool>,
    #[garde(skip)]
    pub is_gps_enabled: Option<bool>,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
}

/// Domain service for datastream management
pub struct DatastreamService {
    datastream_repository: Arc<dyn DatastreamRepository>,
    system_repository: Arc<dyn SystemRepository>,
}

impl DatastreamService {
    pub fn new(
        datastream_repository: Arc<dyn DatastreamRepository>,
        system_repository: Arc<dyn SystemRepository>,
    ) -> Self {
        Self {
            datastream_repository,
            system_repository,
        }
    }

    /// Create a datastream under an existing system
    #[instrument(skip(self, request), fields(system_id = %request.system_id, datastream_name = %request.name))]
    pub async fn create_datastream(
        &self,
        request: CreateDatastreamRequest,
    ) -> DomainResult<Datastream> {
        common::garde::validate_struct(&request)?;

        if self
            .system_repository
            .get_system(request.system_id)
            .await?
            .is_none()
        {
            return Err(DomainError::SystemNotFound(request.system_id.to_string()));
        }

        let id = request.id.unwrap_or_else(Uuid::new_v4);
        debug!(datastream_id = %id, result_type = %request.observation_result_type, "creating datastream");

        self.datastream_repository
            .create_datastream(CreateDatastreamRepoInput {
                id,
                name: request.name,
                description: request.description,
                system_id: request.system_id,
                observed_property_id: request.observed_property_id,
                deployment_id: request.deployment_id,
                procedure_id: request.procedure_id,
                feature_of_interest_id: request.feature_of_interest_id,
                observation_result_type: request.observation_result_type,
                is_active: request.is_active,
                is_gps_enabled: request.is_gps_enabled,
                properties: request.properties,
            })
            .await
    }

    #[instrument(skip(self), fields(datastream_id = %id))]
    pub async fn get_datastream(&self, id: Uuid) -> DomainResult<Datastream> {
        self.datastream_repository
            .get_datastream(id)
            .await?
            .ok_or_else(|| DomainError::DatastreamNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_datastreams(&self) -> DomainResult<Vec<Datastream>> {
        self.datastream_repository.list_datastreams().await
    }

    /// Apply the fields present in the request.
    /// The result type is frozen once the datastream carries observations.
    #[instrument(skip(self, request), fields(datastream_id = %request.id))]
    pub async fn update_datastream(
        &self,
        request: UpdateDatastreamRequest,
    ) -> DomainResult<Datastream> {
        common::garde::validate_struct(&request)?;

        debug!("updating datastream");
        self.datastream_repository
            .update_datastream(UpdateDatastreamRepoInput {
                id: request.id,
                name: request.name,
                description: request.description,
                system_id: request.system_id,
                observed_property_id: request.observed_property_id,
                deployment_id: request.deployment_id,
                procedure_id: request.procedure_id,
                feature_of_interest_id: request.feature_of_interest_id,
                observation_result_type: request.observation_result_type,
                is_active: request.is_active,
                is_gps_enabled: request.is_gps_enabled,
                properties: request.properties,
            })
            .await
    }

    /// Fails with DatastreamInUse while observations still reference it
    #[instrument(skip(self), fields(datastream_id = %id))]
    pub async fn delete_datastream(&self, id: Uuid) -> DomainResult<()> {
        self.datastream_repository.delete_datastream(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{MockDatastreamRepository, MockSystemRepository, System};

    fn system(id: Uuid) -> System {
        System {
            id,
            name: "living room".to_string(),
            description: None,
            system_type: None,
            external_id: None,
            properties: None,
            created_at: None,
        }
    }

    fn request(system_id: Uuid) -> CreateDatastreamRequest {
        CreateDatastreamRequest {
            id: None,
            name: "temperature".to_string(),
            description: None,
            system_id,
            observed_property_id: None,
            deployment_id: None,
            procedure_id: Some(Uuid::new_v4()),
            feature_of_interest_id: None,
            observation_result_type: ResultType::Float,
            is_active: true,
            is_gps_enabled: false,
            properties: None,
        }
    }

    #[tokio::test]
    async fn test_create_datastream_success() {
        let system_id = Uuid::new_v4();

        let mut mock_system_repo = MockSystemRepository::new();
        mock_system_repo
            .expect_get_system()
            .withf(move |id: &Uuid| *id == system_id)
            .times(1)
            .returning(|id| Ok(Some(system(id))));

        let mut mock_datastream_repo = MockDatastreamRepository::new();
        mock_datastream_repo
            .expect_create_datastream()
            .withf(move |input: &CreateDatastreamRepoInput| {
                input.system_id == system_id && input.observation_result_type == ResultType::Float
            })
            .times(1)
            .returning(|input| {
                Ok(Datastream {
                    id: input.id,
                    name: input.name,
                    description: input.description,
                    system_id: input.system_id,
                    observed_property_id: input.observed_property_id,
                    deployment_id: input.deployment_id,
                    procedure_id: input.procedure_id,
                    feature_of_interest_id: input.feature_of_interest_id,
                    observation_result_type: input.observation_result_type,
                    is_active: input.is_active,
                    is_gps_enabled: input.is_gps_enabled,
                    properties: input.properties,
                    created_at: None,
                })
            });

        let service =
            DatastreamService::new(Arc::new(mock_datastream_repo), Arc::new(mock_system_repo));
        let datastream = service.create_datastream(request(system_id)).await.unwrap();

        assert_eq!(datastream.system_id, system_id);
        assert_eq!(datastream.name, "temperature");
        assert!(datastream.procedure_id.is_some());
    }

    #[tokio::test]
    async fn test_create_datastream_with_missing_procedure() {
        let mut mock_system_repo = MockSystemRepository::new();
        mock_system_repo
            .expect_get_system()
            .times(1)
            .returning(|id| Ok(Some(system(id))));

        let mut mock_datastream_repo = MockDatastreamRepository::new();
        mock_datastream_repo
            .expect_create_datastream()
            .times(1)
            .returning(|input| {
                Err(DomainError::ProcedureNotFound(
                    input.procedure_id.unwrap_or_default().to_string(),
                ))
            });

        let service =
            DatastreamService::new(Arc::new(mock_datastream_repo), Arc::new(mock_system_repo));
        let result = service.create_datastream(request(Uuid::new_v4())).await;

        assert!(matches!(result, Err(DomainError::ProcedureNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_datastream_passes_only_present_fields() {
        let id = Uuid::new_v4();
        let deployment_id = Uuid::new_v4();

        let mut mock_datastream_repo = MockDatastreamRepository::new();
        mock_datastream_repo
            .expect_update_datastream()
            .withf(move |input: &UpdateDatastreamRepoInput| {
                input.id == id
                    && input.deployment_id == Some(deployment_id)
                    && input.name.is_none()
                    && input.observation_result_type.is_none()
            })
            .times(1)
            .returning(|input| {
                Ok(Datastream {
                    id: input.id,
                    name: "temperature".to_string(),
                    description: None,
                    system_id: Uuid::new_v4(),
                    observed_property_id: None,
                    deployment_id: input.deployment_id,
                    procedure_id: None,
                    feature_of_interest_id: None,
                    observation_result_type: ResultType::Float,
                    is_active: true,
                    is_gps_enabled: false,
                    properties: None,
                    created_at: None,
                })
            });

        let service = DatastreamService::new(
            Arc::new(mock_datastream_repo),
            Arc::new(MockSystemRepository::new()),
        );
        let datastream = service
            .update_datastream(UpdateDatastreamRequest {
                id,
                deployment_id: Some(deployment_id),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(datastream.deployment_id, Some(deployment_id));
    }

    #[tokio::test]
    async fn test_update_datastream_rejects_empty_name() {
        let mut mock_datastream_repo = MockDatastreamRepository::new();
        mock_datastream_repo.expect_update_datastream().times(0);

        let service = DatastreamService::new(
            Arc::new(mock_datastream_repo),
            Arc::new(MockSystemRepository::new()),
        );
        let result = service
            .update_datastream(UpdateDatastreamRequest {
                id: Uuid::new_v4(),
                name: Some(String::new()),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_result_type_change_on_used_datastream_is_rejected() {
        let mut mock_datastream_repo = MockDatastreamRepository::new();
        mock_datastream_repo
            .expect_update_datastream()
            .times(1)
            .returning(|input| Err(DomainError::DatastreamInUse(input.id.to_string())));

        let service = DatastreamService::new(
            Arc::new(mock_datastream_repo),
            Arc::new(MockSystemRepository::new()),
        );
        let result = service
            .update_datastream(UpdateDatastreamRequest {
                id: Uuid::new_v4(),
                observation_result_type: Some(ResultType::String),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(DomainError::DatastreamInUse(_))));
    }

    #[tokio::test]
    async fn test_create_datastream_for_missing_system() {
        let mut mock_system_repo = MockSystemRepository::new();
        mock_system_repo
            .expect_get_system()
            .times(1)
            .returning(|_| Ok(None));

        let mut mock_datastream_repo = MockDatastreamRepository::new();
        mock_datastream_repo.expect_create_datastream().times(0);

        let service =
            DatastreamService::new(Arc::new(mock_datastream_repo), Arc::new(mock_system_repo));
        let result = service.create_datastream(request(Uuid::new_v4())).await;

        assert!(matches!(result, Err(DomainError::SystemNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_datastream_in_use() {
        let mut mock_datastream_repo = MockDatastreamRepository::new();
        mock_datastream_repo
            .expect_delete_datastream()
            .times(1)
            .returning(|id| Err(DomainError::DatastreamInUse(id.to_string())));

        let service = DatastreamService::new(
            Arc::new(mock_datastream_repo),
            Arc::new(MockSystemRepository::new()),
        );
        let result = service.delete_datastream(Uuid::new_v4()).await;

        assert!(matches!(result, Err(DomainError::DatastreamInUse(_))));
    }
}

use common::domain::{CreateSystemRepoInput, DomainError, DomainResult, System, SystemRepository};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Service request for registering a system
#[derive(Debug, Clone, Validate)]
pub struct CreateSystemRequest {
    /// Generated when absent
    #[garde(skip)]
    pub id: Option<Uuid>,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(length(min = 1, max = 64))]
    pub system_type: Option<String>,
    #[garde(length(min = 1, max = 255))]
    pub external_id: Option<String>,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
}

/// Domain service for the systems that own datastreams
pub struct SystemService {
    system_repository: Arc<dyn SystemRepository>,
}

impl SystemService {
    pub fn new(system_repository: Arc<dyn SystemRepository>) -> Self {
        Self { system_repository }
    }

    #[instrument(skip(self, request), fields(system_name = %request.name))]
    pub async fn create_system(&self, request: CreateSystemRequest) -> DomainResult<System> {
        common::garde::validate_struct(&request)?;

        let id = request.id.unwrap_or_else(Uuid::new_v4);
        debug!(system_id = %id, "creating system");

        self.system_repository
            .create_system(CreateSystemRepoInput {
                id,
                name: request.name,
                description: request.description,
                system_type: request.system_type,
                external_id: request.external_id,
                properties: request.properties,
            })
            .await
    }

    #[instrument(skip(self), fields(system_id = %id))]
    pub async fn get_system(&self, id: Uuid) -> DomainResult<System> {
        self.system_repository
            .get_system(id)
            .await?
            .ok_or_else(|| DomainError::SystemNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_systems(&self) -> DomainResult<Vec<System>> {
        self.system_repository.list_systems().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::MockSystemRepository;

    fn request(name: &str) -> CreateSystemRequest {
        CreateSystemRequest {
            id: None,
            name: name.to_string(),
            description: None,
            system_type: Some("tasmota".to_string()),
            external_id: Some("IoTorero_6057F8".to_string()),
            properties: None,
        }
    }

    #[tokio::test]
    async fn test_create_system_generates_id() {
        let mut mock_repo = MockSystemRepository::new();
        mock_repo
            .expect_create_system()
            .withf(|input: &CreateSystemRepoInput| {
                !input.id.is_nil() && input.external_id.as_deref() == Some("IoTorero_6057F8")
            })
            .times(1)
            .returning(|input| {
                Ok(System {
                    id: input.id,
                    name: input.name,
                    description: input.description,
                    system_type: input.system_type,
                    external_id: input.external_id,
                    properties: input.properties,
                    created_at: Some(chrono::Utc::now()),
                })
            });

        let service = SystemService::new(Arc::new(mock_repo));
        let system = service.create_system(request("living room")).await.unwrap();

        assert_eq!(system.name, "living room");
    }

    #[tokio::test]
    async fn test_create_system_rejects_empty_name() {
        let mut mock_repo = MockSystemRepository::new();
        mock_repo.expect_create_system().times(0);

        let service = SystemService::new(Arc::new(mock_repo));
        let result = service.create_system(request("")).await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_get_missing_system() {
        let mut mock_repo = MockSystemRepository::new();
        mock_repo.expect_get_system().times(1).returning(|_| Ok(None));

        let service = SystemService::new(Arc::new(mock_repo));
        let result = service.get_system(Uuid::new_v4()).await;

        assert!(matches!(result, Err(DomainError::SystemNotFound(_))));
    }
}

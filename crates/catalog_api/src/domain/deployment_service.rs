use common::domain::{
    CreateDeploymentRepoInput, Deployment, DeploymentRepository, DeploymentType, DomainError,
    DomainResult, SystemRepository, UpdateDeploymentRepoInput,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Validate)]
pub struct CreateDeploymentRequest {
    /// Generated when absent
    #[garde(skip)]
    pub id: Option<Uuid>,
    #[garde(skip)]
    pub system_id: Uuid,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub deployment_type: DeploymentType,
    #[garde(skip)]
    pub location: Option<serde_json::Value>,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateDeploymentRequest {
    #[garde(skip)]
    pub id: Uuid,
    #[garde(skip)]
    pub system_id: Option<Uuid>,
    #[garde(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub deployment_type: Option<DeploymentType>,
    #[garde(skip)]
    pub location: Option<serde_json::Value>,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
}

/// Domain service for system deployments
pub struct DeploymentService {
    deployment_repository: Arc<dyn DeploymentRepository>,
    system_repository: Arc<dyn SystemRepository>,
}

impl DeploymentService {
    pub fn new(
        deployment_repository: Arc<dyn DeploymentRepository>,
        system_repository: Arc<dyn SystemRepository>,
    ) -> Self {
        Self {
            deployment_repository,
            system_repository,
        }
    }

    /// Deploy an existing system
    #[instrument(skip(self, request), fields(system_id = %request.system_id, deployment_name = %request.name))]
    pub async fn create_deployment(
        &self,
        request: CreateDeploymentRequest,
    ) -> DomainResult<Deployment> {
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
        debug!(deployment_id = %id, deployment_type = %request.deployment_type, "creating deployment");

        self.deployment_repository
            .create_deployment(CreateDeploymentRepoInput {
                id,
                system_id: request.system_id,
                name: request.name,
                description: request.description,
                deployment_type: request.deployment_type,
                location: request.location,
                properties: request.properties,
            })
            .await
    }

    #[instrument(skip(self), fields(deployment_id = %id))]
    pub async fn get_deployment(&self, id: Uuid) -> DomainResult<Deployment> {
        self.deployment_repository
            .get_deployment(id)
            .await?
            .ok_or_else(|| DomainError::DeploymentNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_deployments(&self) -> DomainResult<Vec<Deployment>> {
        self.deployment_repository.list_deployments().await
    }

    #[instrument(skip(self, request), fields(deployment_id = %request.id))]
    pub async fn update_deployment(
        &self,
        request: UpdateDeploymentRequest,
    ) -> DomainResult<Deployment> {
        common::garde::validate_struct(&request)?;

        self.deployment_repository
            .update_deployment(UpdateDeploymentRepoInput {
                id: request.id,
                system_id: request.system_id,
                name: request.name,
                description: request.description,
                deployment_type: request.deployment_type,
                location: request.location,
                properties: request.properties,
            })
            .await
    }

    /// Fails with DeploymentInUse while a datastream references it
    #[instrument(skip(self), fields(deployment_id = %id))]
    pub async fn delete_deployment(&self, id: Uuid) -> DomainResult<()> {
        self.deployment_repository.delete_deployment(id).await
    }
}

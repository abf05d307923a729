use common::domain::{
    CreateProcedureRepoInput, DomainError, DomainResult, Procedure, ProcedureRepository,
    ProcedureType, UpdateProcedureRepoInput,
};
use garde::Validate;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Validate)]
pub struct CreateProcedureRequest {
    /// Generated when absent
    #[garde(skip)]
    pub id: Option<Uuid>,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub procedure_type: ProcedureType,
    #[garde(length(min = 1, max = 2048))]
    pub reference: Option<String>,
    #[garde(inner(length(min = 1)))]
    pub steps: Vec<String>,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateProcedureRequest {
    #[garde(skip)]
    pub id: Uuid,
    #[garde(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(skip)]
    pub procedure_type: Option<ProcedureType>,
    #[garde(length(min = 1, max = 2048))]
    pub reference: Option<String>,
    #[garde(inner(inner(length(min = 1))))]
    pub steps: Option<Vec<String>>,
    #[garde(skip)]
    pub properties: Option<serde_json::Value>,
}

pub struct ProcedureService {
    procedure_repository: Arc<dyn ProcedureRepository>,
}

impl ProcedureService {
    pub fn new(procedure_repository: Arc<dyn ProcedureRepository>) -> Self {
        Self {
            procedure_repository,
        }
    }

    #[instrument(skip(self, request), fields(procedure_name = %request.name))]
    pub async fn create_procedure(&self, request: CreateProcedureRequest) -> DomainResult<Procedure> {
        common::garde::validate_struct(&request)?;

        let id = request.id.unwrap_or_else(Uuid::new_v4);
        debug!(procedure_id = %id, procedure_type = %request.procedure_type, "creating procedure");

        self.procedure_repository
            .create_procedure(CreateProcedureRepoInput {
                id,
                name: request.name,
                description: request.description,
                procedure_type: request.procedure_type,
                reference: request.reference,
                steps: request.steps,
                properties: request.properties,
            })
            .await
    }

    #[instrument(skip(self), fields(procedure_id = %id))]
    pub async fn get_procedure(&self, id: Uuid) -> DomainResult<Procedure> {
        self.procedure_repository
            .get_procedure(id)
            .await?
            .ok_or_else(|| DomainError::ProcedureNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_procedures(&self) -> DomainResult<Vec<Procedure>> {
        self.procedure_repository.list_procedures().await
    }

    #[instrument(skip(self, request), fields(procedure_id = %request.id))]
    pub async fn update_procedure(&self, request: UpdateProcedureRequest) -> DomainResult<Procedure> {
        common::garde::validate_struct(&request)?;

        self.procedure_repository
            .update_procedure(UpdateProcedureRepoInput {
                id: request.id,
                name: request.name,
                description: request.description,
                procedure_type: request.procedure_type,
                reference: request.reference,
                steps: request.steps,
                properties: request.properties,
            })
            .await
    }

    /// Fails with ProcedureInUse while a datastream references it
    #[instrument(skip(self), fields(procedure_id = %id))]
    pub async fn delete_procedure(&self, id: Uuid) -> DomainResult<()> {
        self.procedure_repository.delete_procedure(id).await
    }
}

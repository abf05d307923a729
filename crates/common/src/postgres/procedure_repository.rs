use crate::domain::{
    CreateProcedureRepoInput, DomainError, DomainResult, Procedure, ProcedureRepository,
    ProcedureType, UpdateProcedureRepoInput,
};
use crate::postgres::error::{is_foreign_key_violation, is_unique_violation, write_error};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

const PROCEDURE_COLUMNS: &str =
    "id, name, description, procedure_type, reference, steps, properties, created_at";

#[derive(Debug, Clone)]
struct ProcedureRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    procedure_type: String,
    reference: Option<String>,
    steps: Vec<String>,
    properties: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<&Row> for ProcedureRow {
    fn from(row: &Row) -> Self {
        ProcedureRow {
            id: row.get(0),
            name: row.get(1),
            description: row.get(2),
            procedure_type: row.get(3),
            reference: row.get(4),
            steps: row.get(5),
            properties: row.get(6),
            created_at: row.get(7),
        }
    }
}

impl ProcedureRow {
    fn into_domain(self) -> DomainResult<Procedure> {
        let procedure_type = self
            .procedure_type
            .parse::<ProcedureType>()
            .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!(e)))?;

        Ok(Procedure {
            id: self.id,
            name: self.name,
            description: self.description,
            procedure_type,
            reference: self.reference,
            steps: self.steps,
            properties: self.properties,
            created_at: Some(self.created_at),
        })
    }
}

/// PostgreSQL implementation of ProcedureRepository
#[derive(Clone)]
pub struct PostgresProcedureRepository {
    client: PostgresClient,
}

impl PostgresProcedureRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProcedureRepository for PostgresProcedureRepository {
    #[instrument(skip(self, input), fields(procedure_id = %input.id))]
    async fn create_procedure(&self, input: CreateProcedureRepoInput) -> DomainResult<Procedure> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let result = conn
            .execute(
                "INSERT INTO procedures (id, name, description, procedure_type, reference, steps,
                     properties, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.procedure_type.as_str(),
                    &input.reference,
                    &input.steps,
                    &input.properties,
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(DomainError::ProcedureAlreadyExists(input.id.to_string()));
            }
            return Err(write_error(e));
        }

        debug!("registered procedure: {}", input.id);

        Ok(Procedure {
            id: input.id,
            name: input.name,
            description: input.description,
            procedure_type: input.procedure_type,
            reference: input.reference,
            steps: input.steps,
            properties: input.properties,
            created_at: Some(now),
        })
    }

    #[instrument(skip(self), fields(procedure_id = %id))]
    async fn get_procedure(&self, id: Uuid) -> DomainResult<Option<Procedure>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!("SELECT {} FROM procedures WHERE id = $1", PROCEDURE_COLUMNS).as_str(),
                &[&id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.map(|r| ProcedureRow::from(&r).into_domain()).transpose()
    }

    #[instrument(skip(self))]
    async fn list_procedures(&self) -> DomainResult<Vec<Procedure>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                format!(
                    "SELECT {} FROM procedures ORDER BY created_at DESC",
                    PROCEDURE_COLUMNS
                )
                .as_str(),
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} procedures", rows.len());
        rows.iter()
            .map(|r| ProcedureRow::from(r).into_domain())
            .collect()
    }

    #[instrument(skip(self, input), fields(procedure_id = %input.id))]
    async fn update_procedure(&self, input: UpdateProcedureRepoInput) -> DomainResult<Procedure> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!(
                    "UPDATE procedures
                     SET name = COALESCE($2, name),
                         description = COALESCE($3, description),
                         procedure_type = COALESCE($4, procedure_type),
                         reference = COALESCE($5, reference),
                         steps = COALESCE($6, steps),
                         properties = COALESCE($7, properties)
                     WHERE id = $1
                     RETURNING {}",
                    PROCEDURE_COLUMNS
                )
                .as_str(),
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.procedure_type.map(|t| t.as_str()),
                    &input.reference,
                    &input.steps,
                    &input.properties,
                ],
            )
            .await
            .map_err(write_error)?
            .ok_or_else(|| DomainError::ProcedureNotFound(input.id.to_string()))?;

        debug!("updated procedure: {}", input.id);
        ProcedureRow::from(&row).into_domain()
    }

    #[instrument(skip(self), fields(procedure_id = %id))]
    async fn delete_procedure(&self, id: Uuid) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = match conn
            .execute("DELETE FROM procedures WHERE id = $1", &[&id])
            .await
        {
            Ok(n) => n,
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(DomainError::ProcedureInUse(id.to_string()));
            }
            Err(e) => return Err(write_error(e)),
        };

        if deleted == 0 {
            return Err(DomainError::ProcedureNotFound(id.to_string()));
        }

        debug!("deleted procedure: {}", id);
        Ok(())
    }
}

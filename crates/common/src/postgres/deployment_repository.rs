use crate::domain::{
    CreateDeploymentRepoInput, Deployment, DeploymentRepository, DeploymentType, DomainError,
    DomainResult, UpdateDeploymentRepoInput,
};
use crate::postgres::error::{is_foreign_key_violation, is_unique_violation, write_error};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

const DEPLOYMENT_COLUMNS: &str =
    "id, system_id, name, description, deployment_type, location, properties, created_at";

#[derive(Debug, Clone)]
struct DeploymentRow {
    id: Uuid,
    system_id: Uuid,
    name: String,
    description: Option<String>,
    deployment_type: String,
    location: Option<serde_json::Value>,
    properties: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<&Row> for DeploymentRow {
    fn from(row: &Row) -> Self {
        DeploymentRow {
            id: row.get(0),
            system_id: row.get(1),
            name: row.get(2),
            description: row.get(3),
            deployment_type: row.get(4),
            location: row.get(5),
            properties: row.get(6),
            created_at: row.get(7),
        }
    }
}

impl DeploymentRow {
    fn into_domain(self) -> DomainResult<Deployment> {
        let deployment_type = self
            .deployment_type
            .parse::<DeploymentType>()
            .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!(e)))?;

        Ok(Deployment {
            id: self.id,
            system_id: self.system_id,
            name: self.name,
            description: self.description,
            deployment_type,
            location: self.location,
            properties: self.properties,
            created_at: Some(self.created_at),
        })
    }
}

/// PostgreSQL implementation of DeploymentRepository
#[derive(Clone)]
pub struct PostgresDeploymentRepository {
    client: PostgresClient,
}

impl PostgresDeploymentRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeploymentRepository for PostgresDeploymentRepository {
    #[instrument(skip(self, input), fields(deployment_id = %input.id, system_id = %input.system_id))]
    async fn create_deployment(&self, input: CreateDeploymentRepoInput) -> DomainResult<Deployment> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let result = conn
            .execute(
                "INSERT INTO deployments (id, system_id, name, description, deployment_type,
                     location, properties, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &input.id,
                    &input.system_id,
                    &input.name,
                    &input.description,
                    &input.deployment_type.as_str(),
                    &input.location,
                    &input.properties,
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(DomainError::DeploymentAlreadyExists(input.id.to_string()));
            }
            if is_foreign_key_violation(&e) {
                return Err(DomainError::SystemNotFound(input.system_id.to_string()));
            }
            return Err(write_error(e));
        }

        debug!("registered deployment: {}", input.id);

        Ok(Deployment {
            id: input.id,
            system_id: input.system_id,
            name: input.name,
            description: input.description,
            deployment_type: input.deployment_type,
            location: input.location,
            properties: input.properties,
            created_at: Some(now),
        })
    }

    #[instrument(skip(self), fields(deployment_id = %id))]
    async fn get_deployment(&self, id: Uuid) -> DomainResult<Option<Deployment>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!("SELECT {} FROM deployments WHERE id = $1", DEPLOYMENT_COLUMNS).as_str(),
                &[&id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.map(|r| DeploymentRow::from(&r).into_domain()).transpose()
    }

    #[instrument(skip(self))]
    async fn list_deployments(&self) -> DomainResult<Vec<Deployment>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                format!(
                    "SELECT {} FROM deployments ORDER BY created_at DESC",
                    DEPLOYMENT_COLUMNS
                )
                .as_str(),
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} deployments", rows.len());
        rows.iter()
            .map(|r| DeploymentRow::from(r).into_domain())
            .collect()
    }

    #[instrument(skip(self, input), fields(deployment_id = %input.id))]
    async fn update_deployment(&self, input: UpdateDeploymentRepoInput) -> DomainResult<Deployment> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!(
                    "UPDATE deployments
                     SET system_id = COALESCE($2, system_id),
                         name = COALESCE($3, name),
                         description = COALESCE($4, description),
                         deployment_type = COALESCE($5, deployment_type),
                         location = COALESCE($6, location),
                         properties = COALESCE($7, properties)
                     WHERE id = $1
                     RETURNING {}",
                    DEPLOYMENT_COLUMNS
                )
                .as_str(),
                &[
                    &input.id,
                    &input.system_id,
                    &input.name,
                    &input.description,
                    &input.deployment_type.map(|t| t.as_str()),
                    &input.location,
                    &input.properties,
                ],
            )
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    let system_id = input.system_id.map(|id| id.to_string()).unwrap_or_default();
                    DomainError::SystemNotFound(system_id)
                } else {
                    write_error(e)
                }
            })?
            .ok_or_else(|| DomainError::DeploymentNotFound(input.id.to_string()))?;

        debug!("updated deployment: {}", input.id);
        DeploymentRow::from(&row).into_domain()
    }

    #[instrument(skip(self), fields(deployment_id = %id))]
    async fn delete_deployment(&self, id: Uuid) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = match conn
            .execute("DELETE FROM deployments WHERE id = $1", &[&id])
            .await
        {
            Ok(n) => n,
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(DomainError::DeploymentInUse(id.to_string()));
            }
            Err(e) => return Err(write_error(e)),
        };

        if deleted == 0 {
            return Err(DomainError::DeploymentNotFound(id.to_string()));
        }

        debug!("deleted deployment: {}", id);
        Ok(())
    }
}

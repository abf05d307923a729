use crate::domain::{CreateSystemRepoInput, DomainError, DomainResult, System, SystemRepository};
use crate::postgres::error::{is_unique_violation, write_error};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct SystemRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    system_type: Option<String>,
    external_id: Option<String>,
    properties: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<&Row> for SystemRow {
    fn from(row: &Row) -> Self {
        SystemRow {
            id: row.get(0),
            name: row.get(1),
            description: row.get(2),
            system_type: row.get(3),
            external_id: row.get(4),
            properties: row.get(5),
            created_at: row.get(6),
        }
    }
}

impl From<SystemRow> for System {
    fn from(row: SystemRow) -> Self {
        System {
            id: row.id,
            name: row.name,
            description: row.description,
            system_type: row.system_type,
            external_id: row.external_id,
            properties: row.properties,
            created_at: Some(row.created_at),
        }
    }
}

/// PostgreSQL implementation of SystemRepository
#[derive(Clone)]
pub struct PostgresSystemRepository {
    client: PostgresClient,
}

impl PostgresSystemRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SystemRepository for PostgresSystemRepository {
    #[instrument(skip(self, input), fields(system_id = %input.id))]
    async fn create_system(&self, input: CreateSystemRepoInput) -> DomainResult<System> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let result = conn
            .execute(
                "INSERT INTO systems (id, name, description, system_type, external_id, properties, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.system_type,
                    &input.external_id,
                    &input.properties,
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                let key = input
                    .external_id
                    .clone()
                    .unwrap_or_else(|| input.id.to_string());
                return Err(DomainError::SystemAlreadyExists(key));
            }
            return Err(write_error(e));
        }

        debug!("registered system: {}", input.id);

        Ok(System {
            id: input.id,
            name: input.name,
            description: input.description,
            system_type: input.system_type,
            external_id: input.external_id,
            properties: input.properties,
            created_at: Some(now),
        })
    }

    #[instrument(skip(self), fields(system_id = %id))]
    async fn get_system(&self, id: Uuid) -> DomainResult<Option<System>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT id, name, description, system_type, external_id, properties, created_at
                 FROM systems
                 WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|r| SystemRow::from(&r).into()))
    }

    #[instrument(skip(self))]
    async fn list_systems(&self) -> DomainResult<Vec<System>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, name, description, system_type, external_id, properties, created_at
                 FROM systems
                 ORDER BY created_at DESC",
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} systems", rows.len());
        Ok(rows.iter().map(|r| SystemRow::from(r).into()).collect())
    }
}

use crate::domain::{
    CreateDatastreamRepoInput, Datastream, DatastreamRepository, DomainError, DomainResult,
    ResultType, UpdateDatastreamRepoInput,
};
use crate::postgres::error::{
    is_foreign_key_violation, is_unique_violation, violated_constraint, write_error,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

const DATASTREAM_COLUMNS: &str = "id, name, description, system_id, observed_property_id,
    deployment_id, procedure_id, feature_of_interest_id, observation_result_type,
    is_active, is_gps_enabled, properties, created_at";

/// Datastream row for PostgreSQL storage
#[derive(Debug, Clone)]
struct DatastreamRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    system_id: Uuid,
    observed_property_id: Option<Uuid>,
    deployment_id: Option<Uuid>,
    procedure_id: Option<Uuid>,
    feature_of_interest_id: Option<Uuid>,
    observation_result_type: String,
    is_active: bool,
    is_gps_enabled: bool,
    properties: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<&Row> for DatastreamRow {
    fn from(row: &Row) -> Self {
        DatastreamRow {
            id: row.get(0),
            name: row.get(1),
            description: row.get(2),
            system_id: row.get(3),
            observed_property_id: row.get(4),
            deployment_id: row.get(5),
            procedure_id: row.get(6),
            feature_of_interest_id: row.get(7),
            observation_result_type: row.get(8),
            is_active: row.get(9),
            is_gps_enabled: row.get(10),
            properties: row.get(11),
            created_at: row.get(12),
        }
    }
}

impl DatastreamRow {
    fn into_domain(self) -> DomainResult<Datastream> {
        let observation_result_type = self
            .observation_result_type
            .parse::<ResultType>()
            .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!(e)))?;

        Ok(Datastream {
            id: self.id,
            name: self.name,
            description: self.description,
            system_id: self.system_id,
            observed_property_id: self.observed_property_id,
            deployment_id: self.deployment_id,
            procedure_id: self.procedure_id,
            feature_of_interest_id: self.feature_of_interest_id,
            observation_result_type,
            is_active: self.is_active,
            is_gps_enabled: self.is_gps_enabled,
            properties: self.properties,
            created_at: Some(self.created_at),
        })
    }
}

/// Rows a datastream write points at
#[derive(Debug, Clone, Copy, Default)]
struct References {
    system_id: Option<Uuid>,
    observed_property_id: Option<Uuid>,
    deployment_id: Option<Uuid>,
    procedure_id: Option<Uuid>,
    feature_of_interest_id: Option<Uuid>,
}

impl From<&CreateDatastreamRepoInput> for References {
    fn from(input: &CreateDatastreamRepoInput) -> Self {
        References {
            system_id: Some(input.system_id),
            observed_property_id: input.observed_property_id,
            deployment_id: input.deployment_id,
            procedure_id: input.procedure_id,
            feature_of_interest_id: input.feature_of_interest_id,
        }
    }
}

impl From<&UpdateDatastreamRepoInput> for References {
    fn from(input: &UpdateDatastreamRepoInput) -> Self {
        References {
            system_id: input.system_id,
            observed_property_id: input.observed_property_id,
            deployment_id: input.deployment_id,
            procedure_id: input.procedure_id,
            feature_of_interest_id: input.feature_of_interest_id,
        }
    }
}

impl References {
    /// The NotFound error for the row a foreign-key violation names
    fn missing(&self, e: &tokio_postgres::Error) -> Option<DomainError> {
        let id = |id: Option<Uuid>| id.map(|id| id.to_string()).unwrap_or_default();
        match violated_constraint(e)? {
            "datastreams_system_id_fkey" => Some(DomainError::SystemNotFound(id(self.system_id))),
            "datastreams_observed_property_id_fkey" => Some(
                DomainError::ObservedPropertyNotFound(id(self.observed_property_id)),
            ),
            "datastreams_deployment_id_fkey" => {
                Some(DomainError::DeploymentNotFound(id(self.deployment_id)))
            }
            "datastreams_procedure_id_fkey" => {
                Some(DomainError::ProcedureNotFound(id(self.procedure_id)))
            }
            "datastreams_feature_of_interest_id_fkey" => Some(
                DomainError::FeatureOfInterestNotFound(id(self.feature_of_interest_id)),
            ),
            _ => None,
        }
    }
}

/// PostgreSQL implementation of DatastreamRepository
#[derive(Clone)]
pub struct PostgresDatastreamRepository {
    client: PostgresClient,
}

impl PostgresDatastreamRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DatastreamRepository for PostgresDatastreamRepository {
    #[instrument(skip(self, input), fields(datastream_id = %input.id, system_id = %input.system_id))]
    async fn create_datastream(&self, input: CreateDatastreamRepoInput) -> DomainResult<Datastream> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let result = conn
            .execute(
                "INSERT INTO datastreams (id, name, description, system_id, observed_property_id,
                     deployment_id, procedure_id, feature_of_interest_id, observation_result_type,
                     is_active, is_gps_enabled, properties, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.system_id,
                    &input.observed_property_id,
                    &input.deployment_id,
                    &input.procedure_id,
                    &input.feature_of_interest_id,
                    &input.observation_result_type.as_str(),
                    &input.is_active,
                    &input.is_gps_enabled,
                    &input.properties,
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(DomainError::DatastreamAlreadyExists(input.id.to_string()));
            }
            if let Some(missing) = References::from(&input).missing(&e) {
                return Err(missing);
            }
            return Err(write_error(e));
        }

        debug!("registered datastream: {}", input.id);

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
            created_at: Some(now),
        })
    }

    #[instrument(skip(self), fields(datastream_id = %id))]
    async fn get_datastream(&self, id: Uuid) -> DomainResult<Option<Datastream>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!("SELECT {} FROM datastreams WHERE id = $1", DATASTREAM_COLUMNS).as_str(),
                &[&id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.map(|r| DatastreamRow::from(&r).into_domain()).transpose()
    }

    #[instrument(skip(self))]
    async fn list_datastreams(&self) -> DomainResult<Vec<Datastream>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                format!(
                    "SELECT {} FROM datastreams ORDER BY created_at DESC",
                    DATASTREAM_COLUMNS
                )
                .as_str(),
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} datastreams", rows.len());

        rows.iter()
            .map(|r| DatastreamRow::from(r).into_domain())
            .collect()
    }

    #[instrument(skip(self, input), fields(datastream_id = %input.id))]
    async fn update_datastream(&self, input: UpdateDatastreamRepoInput) -> DomainResult<Datastream> {
        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let current = tx
            .query_opt(
                "SELECT observation_result_type FROM datastreams WHERE id = $1 FOR UPDATE",
                &[&input.id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?
            .ok_or_else(|| DomainError::DatastreamNotFound(input.id.to_string()))?;
        let current_type: String = current.get(0);

        // Stored observations were checked against the current type
        if let Some(new_type) = input.observation_result_type {
            if new_type.as_str() != current_type {
                let has_observations: bool = tx
                    .query_one(
                        "SELECT EXISTS (SELECT 1 FROM observations WHERE datastream_id = $1)",
                        &[&input.id],
                    )
                    .await
                    .map_err(|e| DomainError::RepositoryError(e.into()))?
                    .get(0);
                if has_observations {
                    return Err(DomainError::DatastreamInUse(input.id.to_string()));
                }
            }
        }

        let row = tx
            .query_one(
                format!(
                    "UPDATE datastreams
                     SET name = COALESCE($2, name),
                         description = COALESCE($3, description),
                         system_id = COALESCE($4, system_id),
                         observed_property_id = COALESCE($5, observed_property_id),
                         deployment_id = COALESCE($6, deployment_id),
                         procedure_id = COALESCE($7, procedure_id),
                         feature_of_interest_id = COALESCE($8, feature_of_interest_id),
                         observation_result_type = COALESCE($9, observation_result_type),
                         is_active = COALESCE($10, is_active),
                         is_gps_enabled = COALESCE($11, is_gps_enabled),
                         properties = COALESCE($12, properties)
                     WHERE id = $1
                     RETURNING {}",
                    DATASTREAM_COLUMNS
                )
                .as_str(),
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.system_id,
                    &input.observed_property_id,
                    &input.deployment_id,
                    &input.procedure_id,
                    &input.feature_of_interest_id,
                    &input.observation_result_type.map(|t| t.as_str()),
                    &input.is_active,
                    &input.is_gps_enabled,
                    &input.properties,
                ],
            )
            .await
            .map_err(|e| References::from(&input).missing(&e).unwrap_or_else(|| write_error(e)))?;

        tx.commit().await.map_err(write_error)?;

        debug!("updated datastream: {}", input.id);
        DatastreamRow::from(&row).into_domain()
    }

    #[instrument(skip(self), fields(datastream_id = %id))]
    async fn delete_datastream(&self, id: Uuid) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = match conn
            .execute("DELETE FROM datastreams WHERE id = $1", &[&id])
            .await
        {
            Ok(n) => n,
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(DomainError::DatastreamInUse(id.to_string()));
            }
            Err(e) => return Err(write_error(e)),
        };

        if deleted == 0 {
            return Err(DomainError::DatastreamNotFound(id.to_string()));
        }

        debug!("deleted datastream: {}", id);
        Ok(())
    }
}

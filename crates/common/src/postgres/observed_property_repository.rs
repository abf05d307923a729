use crate::domain::{
    CreateObservedPropertyRepoInput, DomainError, DomainResult, ObservedProperty,
    ObservedPropertyRepository, PropertyDomain, ResultType, UpdateObservedPropertyRepoInput,
};
use crate::postgres::error::{is_foreign_key_violation, is_unique_violation, write_error};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

const OBSERVED_PROPERTY_COLUMNS: &str = "id, name, description, domain, property_definition,
    unit_definition, unit_symbol, reference, keywords, value_type, created_at";

#[derive(Debug, Clone)]
struct ObservedPropertyRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    domain: String,
    property_definition: Option<String>,
    unit_definition: Option<String>,
    unit_symbol: Option<String>,
    reference: Option<String>,
    keywords: Vec<String>,
    value_type: String,
    created_at: DateTime<Utc>,
}

impl From<&Row> for ObservedPropertyRow {
    fn from(row: &Row) -> Self {
        ObservedPropertyRow {
            id: row.get(0),
            name: row.get(1),
            description: row.get(2),
            domain: row.get(3),
            property_definition: row.get(4),
            unit_definition: row.get(5),
            unit_symbol: row.get(6),
            reference: row.get(7),
            keywords: row.get(8),
            value_type: row.get(9),
            created_at: row.get(10),
        }
    }
}

impl ObservedPropertyRow {
    fn into_domain(self) -> DomainResult<ObservedProperty> {
        let domain = self
            .domain
            .parse::<PropertyDomain>()
            .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!(e)))?;
        let value_type = self
            .value_type
            .parse::<ResultType>()
            .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!(e)))?;

        Ok(ObservedProperty {
            id: self.id,
            name: self.name,
            description: self.description,
            domain,
            property_definition: self.property_definition,
            unit_definition: self.unit_definition,
            unit_symbol: self.unit_symbol,
            reference: self.reference,
            keywords: self.keywords,
            value_type,
            created_at: Some(self.created_at),
        })
    }
}

/// PostgreSQL implementation of ObservedPropertyRepository
#[derive(Clone)]
pub struct PostgresObservedPropertyRepository {
    client: PostgresClient,
}

impl PostgresObservedPropertyRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObservedPropertyRepository for PostgresObservedPropertyRepository {
    #[instrument(skip(self, input), fields(observed_property_id = %input.id))]
    async fn create_observed_property(
        &self,
        input: CreateObservedPropertyRepoInput,
    ) -> DomainResult<ObservedProperty> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let result = conn
            .execute(
                "INSERT INTO observed_properties (id, name, description, domain,
                     property_definition, unit_definition, unit_symbol, reference, keywords,
                     value_type, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.domain.as_str(),
                    &input.property_definition,
                    &input.unit_definition,
                    &input.unit_symbol,
                    &input.reference,
                    &input.keywords,
                    &input.value_type.as_str(),
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(DomainError::ObservedPropertyAlreadyExists(
                    input.id.to_string(),
                ));
            }
            return Err(write_error(e));
        }

        debug!("registered observed property: {}", input.id);

        Ok(ObservedProperty {
            id: input.id,
            name: input.name,
            description: input.description,
            domain: input.domain,
            property_definition: input.property_definition,
            unit_definition: input.unit_definition,
            unit_symbol: input.unit_symbol,
            reference: input.reference,
            keywords: input.keywords,
            value_type: input.value_type,
            created_at: Some(now),
        })
    }

    #[instrument(skip(self), fields(observed_property_id = %id))]
    async fn get_observed_property(&self, id: Uuid) -> DomainResult<Option<ObservedProperty>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!(
                    "SELECT {} FROM observed_properties WHERE id = $1",
                    OBSERVED_PROPERTY_COLUMNS
                )
                .as_str(),
                &[&id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.map(|r| ObservedPropertyRow::from(&r).into_domain())
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_observed_properties(&self) -> DomainResult<Vec<ObservedProperty>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                format!(
                    "SELECT {} FROM observed_properties ORDER BY created_at DESC",
                    OBSERVED_PROPERTY_COLUMNS
                )
                .as_str(),
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} observed properties", rows.len());
        rows.iter()
            .map(|r| ObservedPropertyRow::from(r).into_domain())
            .collect()
    }

    #[instrument(skip(self, input), fields(observed_property_id = %input.id))]
    async fn update_observed_property(
        &self,
        input: UpdateObservedPropertyRepoInput,
    ) -> DomainResult<ObservedProperty> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!(
                    "UPDATE observed_properties
                     SET name = COALESCE($2, name),
                         description = COALESCE($3, description),
                         domain = COALESCE($4, domain),
                         property_definition = COALESCE($5, property_definition),
                         unit_definition = COALESCE($6, unit_definition),
                         unit_symbol = COALESCE($7, unit_symbol),
                         reference = COALESCE($8, reference),
                         keywords = COALESCE($9, keywords),
                         value_type = COALESCE($10, value_type)
                     WHERE id = $1
                     RETURNING {}",
                    OBSERVED_PROPERTY_COLUMNS
                )
                .as_str(),
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.domain.map(|d| d.as_str()),
                    &input.property_definition,
                    &input.unit_definition,
                    &input.unit_symbol,
                    &input.reference,
                    &input.keywords,
                    &input.value_type.map(|t| t.as_str()),
                ],
            )
            .await
            .map_err(write_error)?
            .ok_or_else(|| DomainError::ObservedPropertyNotFound(input.id.to_string()))?;

        debug!("updated observed property: {}", input.id);
        ObservedPropertyRow::from(&row).into_domain()
    }

    #[instrument(skip(self), fields(observed_property_id = %id))]
    async fn delete_observed_property(&self, id: Uuid) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = match conn
            .execute("DELETE FROM observed_properties WHERE id = $1", &[&id])
            .await
        {
            Ok(n) => n,
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(DomainError::ObservedPropertyInUse(id.to_string()));
            }
            Err(e) => return Err(write_error(e)),
        };

        if deleted == 0 {
            return Err(DomainError::ObservedPropertyNotFound(id.to_string()));
        }

        debug!("deleted observed property: {}", id);
        Ok(())
    }
}

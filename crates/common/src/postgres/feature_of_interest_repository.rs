use crate::domain::{
    CreateFeatureOfInterestRepoInput, DomainError, DomainResult, FeatureOfInterest,
    FeatureOfInterestRepository, FeatureType, UpdateFeatureOfInterestRepoInput,
};
use crate::postgres::error::{is_foreign_key_violation, is_unique_violation, write_error};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

const FEATURE_COLUMNS: &str = "id, name, description, feature_type, reference, location,
    properties, media_links, created_at";

#[derive(Debug, Clone)]
struct FeatureOfInterestRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    feature_type: String,
    reference: Option<String>,
    location: Option<serde_json::Value>,
    properties: Option<serde_json::Value>,
    media_links: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<&Row> for FeatureOfInterestRow {
    fn from(row: &Row) -> Self {
        FeatureOfInterestRow {
            id: row.get(0),
            name: row.get(1),
            description: row.get(2),
            feature_type: row.get(3),
            reference: row.get(4),
            location: row.get(5),
            properties: row.get(6),
            media_links: row.get(7),
            created_at: row.get(8),
        }
    }
}

impl FeatureOfInterestRow {
    fn into_domain(self) -> DomainResult<FeatureOfInterest> {
        let feature_type = self
            .feature_type
            .parse::<FeatureType>()
            .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!(e)))?;

        Ok(FeatureOfInterest {
            id: self.id,
            name: self.name,
            description: self.description,
            feature_type,
            reference: self.reference,
            location: self.location,
            properties: self.properties,
            media_links: self.media_links,
            created_at: Some(self.created_at),
        })
    }
}

/// PostgreSQL implementation of FeatureOfInterestRepository
#[derive(Clone)]
pub struct PostgresFeatureOfInterestRepository {
    client: PostgresClient,
}

impl PostgresFeatureOfInterestRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeatureOfInterestRepository for PostgresFeatureOfInterestRepository {
    #[instrument(skip(self, input), fields(feature_of_interest_id = %input.id))]
    async fn create_feature_of_interest(
        &self,
        input: CreateFeatureOfInterestRepoInput,
    ) -> DomainResult<FeatureOfInterest> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();

        let result = conn
            .execute(
                "INSERT INTO features_of_interest (id, name, description, feature_type, reference,
                     location, properties, media_links, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.feature_type.as_str(),
                    &input.reference,
                    &input.location,
                    &input.properties,
                    &input.media_links,
                    &now,
                ],
            )
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(DomainError::FeatureOfInterestAlreadyExists(
                    input.id.to_string(),
                ));
            }
            return Err(write_error(e));
        }

        debug!("registered feature of interest: {}", input.id);

        Ok(FeatureOfInterest {
            id: input.id,
            name: input.name,
            description: input.description,
            feature_type: input.feature_type,
            reference: input.reference,
            location: input.location,
            properties: input.properties,
            media_links: input.media_links,
            created_at: Some(now),
        })
    }

    #[instrument(skip(self), fields(feature_of_interest_id = %id))]
    async fn get_feature_of_interest(&self, id: Uuid) -> DomainResult<Option<FeatureOfInterest>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!(
                    "SELECT {} FROM features_of_interest WHERE id = $1",
                    FEATURE_COLUMNS
                )
                .as_str(),
                &[&id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.map(|r| FeatureOfInterestRow::from(&r).into_domain())
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_features_of_interest(&self) -> DomainResult<Vec<FeatureOfInterest>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                format!(
                    "SELECT {} FROM features_of_interest ORDER BY created_at DESC",
                    FEATURE_COLUMNS
                )
                .as_str(),
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} features of interest", rows.len());
        rows.iter()
            .map(|r| FeatureOfInterestRow::from(r).into_domain())
            .collect()
    }

    #[instrument(skip(self, input), fields(feature_of_interest_id = %input.id))]
    async fn update_feature_of_interest(
        &self,
        input: UpdateFeatureOfInterestRepoInput,
    ) -> DomainResult<FeatureOfInterest> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!(
                    "UPDATE features_of_interest
                     SET name = COALESCE($2, name),
                         description = COALESCE($3, description),
                         feature_type = COALESCE($4, feature_type),
                         reference = COALESCE($5, reference),
                         location = COALESCE($6, location),
                         properties = COALESCE($7, properties),
                         media_links = COALESCE($8, media_links)
                     WHERE id = $1
                     RETURNING {}",
                    FEATURE_COLUMNS
                )
                .as_str(),
                &[
                    &input.id,
                    &input.name,
                    &input.description,
                    &input.feature_type.map(|t| t.as_str()),
                    &input.reference,
                    &input.location,
                    &input.properties,
                    &input.media_links,
                ],
            )
            .await
            .map_err(write_error)?
            .ok_or_else(|| DomainError::FeatureOfInterestNotFound(input.id.to_string()))?;

        debug!("updated feature of interest: {}", input.id);
        FeatureOfInterestRow::from(&row).into_domain()
    }

    #[instrument(skip(self), fields(feature_of_interest_id = %id))]
    async fn delete_feature_of_interest(&self, id: Uuid) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = match conn
            .execute("DELETE FROM features_of_interest WHERE id = $1", &[&id])
            .await
        {
            Ok(n) => n,
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(DomainError::FeatureOfInterestInUse(id.to_string()));
            }
            Err(e) => return Err(write_error(e)),
        };

        if deleted == 0 {
            return Err(DomainError::FeatureOfInterestNotFound(id.to_string()));
        }

        debug!("deleted feature of interest: {}", id);
        Ok(())
    }
}

use crate::domain::{
    DomainError, DomainResult, ListObservationsRepoInput, Observation, ObservationDraft,
    ObservationRepository, ObservationResult, UpdateObservationRepoInput,
};
use crate::postgres::error::write_error;
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

const INSERT_OBSERVATION: &str = "INSERT INTO observations
    (id, datastream_id, result_time, result_numeric, result_text, result_boolean, result_complex, parameters)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

const SELECT_OBSERVATION: &str = "SELECT id, datastream_id, result_time, result_numeric, result_text,
    result_boolean, result_complex, parameters
    FROM observations";

/// Observation row as stored, one nullable column per result kind
#[derive(Debug, Clone)]
struct ObservationRow {
    id: Uuid,
    datastream_id: Uuid,
    result_time: DateTime<Utc>,
    result_numeric: Option<f64>,
    result_text: Option<String>,
    result_boolean: Option<bool>,
    result_complex: Option<serde_json::Value>,
    parameters: Option<serde_json::Value>,
}

impl From<&Row> for ObservationRow {
    fn from(row: &Row) -> Self {
        ObservationRow {
            id: row.get(0),
            datastream_id: row.get(1),
            result_time: row.get(2),
            result_numeric: row.get(3),
            result_text: row.get(4),
            result_boolean: row.get(5),
            result_complex: row.get(6),
            parameters: row.get(7),
        }
    }
}

impl ObservationRow {
    fn into_domain(self) -> DomainResult<Observation> {
        let result = ObservationResult::from_columns(
            self.result_numeric,
            self.result_text,
            self.result_boolean,
            self.result_complex,
        )
        .ok_or_else(|| {
            DomainError::RepositoryError(anyhow::anyhow!(
                "observation {} does not carry exactly one result",
                self.id
            ))
        })?;

        Ok(Observation {
            id: self.id,
            datastream_id: self.datastream_id,
            result_time: self.result_time,
            result,
            parameters: self.parameters,
        })
    }
}

/// Column values bound for an insert
struct ResultColumns<'a> {
    numeric: Option<f64>,
    text: Option<&'a str>,
    boolean: Option<bool>,
    complex: Option<&'a serde_json::Value>,
}

impl<'a> From<&'a ObservationResult> for ResultColumns<'a> {
    fn from(result: &'a ObservationResult) -> Self {
        ResultColumns {
            numeric: result.numeric(),
            text: result.text(),
            boolean: result.boolean(),
            complex: result.complex(),
        }
    }
}

fn assign_id(draft: ObservationDraft) -> Observation {
    Observation {
        id: draft.id.unwrap_or_else(Uuid::new_v4),
        datastream_id: draft.datastream_id,
        result_time: draft.result_time,
        result: draft.result,
        parameters: draft.parameters,
    }
}

/// PostgreSQL implementation of ObservationRepository
#[derive(Clone)]
pub struct PostgresObservationRepository {
    client: PostgresClient,
}

impl PostgresObservationRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObservationRepository for PostgresObservationRepository {
    #[instrument(skip(self, draft), fields(datastream_id = %draft.datastream_id))]
    async fn create_observation(&self, draft: ObservationDraft) -> DomainResult<Observation> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let observation = assign_id(draft);
        let cols = ResultColumns::from(&observation.result);

        conn.execute(
            INSERT_OBSERVATION,
            &[
                &observation.id,
                &observation.datastream_id,
                &observation.result_time,
                &cols.numeric,
                &cols.text,
                &cols.boolean,
                &cols.complex,
                &observation.parameters,
            ],
        )
        .await
        .map_err(write_error)?;

        debug!(observation_id = %observation.id, "created observation");
        Ok(observation)
    }

    #[instrument(skip(self, drafts), fields(batch_size = drafts.len()))]
    async fn create_observations(
        &self,
        drafts: Vec<ObservationDraft>,
    ) -> DomainResult<Vec<Observation>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        // Dropping the transaction on any early return rolls the batch back
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;
        let stmt = tx
            .prepare_cached(INSERT_OBSERVATION)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let observations: Vec<Observation> = drafts.into_iter().map(assign_id).collect();
        for observation in &observations {
            let cols = ResultColumns::from(&observation.result);
            tx.execute(
                &stmt,
                &[
                    &observation.id,
                    &observation.datastream_id,
                    &observation.result_time,
                    &cols.numeric,
                    &cols.text,
                    &cols.boolean,
                    &cols.complex,
                    &observation.parameters,
                ],
            )
            .await
            .map_err(write_error)?;
        }

        tx.commit().await.map_err(write_error)?;

        debug!("created {} observations", observations.len());
        Ok(observations)
    }

    #[instrument(skip(self), fields(observation_id = %id))]
    async fn get_observation(&self, id: Uuid) -> DomainResult<Option<Observation>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                format!("{} WHERE id = $1 LIMIT 1", SELECT_OBSERVATION).as_str(),
                &[&id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.map(|r| ObservationRow::from(&r).into_domain()).transpose()
    }

    #[instrument(skip(self, input))]
    async fn list_observations(
        &self,
        input: ListObservationsRepoInput,
    ) -> DomainResult<Vec<Observation>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = match input.datastream_id {
            Some(datastream_id) => {
                conn.query(
                    format!(
                        "{} WHERE datastream_id = $1 ORDER BY result_time DESC",
                        SELECT_OBSERVATION
                    )
                    .as_str(),
                    &[&datastream_id],
                )
                .await
            }
            None => {
                conn.query(
                    format!("{} ORDER BY result_time DESC", SELECT_OBSERVATION).as_str(),
                    &[],
                )
                .await
            }
        }
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} observations", rows.len());

        rows.iter()
            .map(|r| ObservationRow::from(r).into_domain())
            .collect()
    }

    #[instrument(skip(self, input), fields(observation_id = %input.id))]
    async fn update_observation(
        &self,
        input: UpdateObservationRepoInput,
    ) -> DomainResult<Observation> {
        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let row = tx
            .query_opt(
                format!("{} WHERE id = $1 LIMIT 1 FOR UPDATE", SELECT_OBSERVATION).as_str(),
                &[&input.id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?
            .ok_or_else(|| DomainError::ObservationNotFound(input.id.to_string()))?;

        let mut observation = ObservationRow::from(&row).into_domain()?;
        if let Some(result) = input.result {
            observation.result = result;
        }
        if let Some(parameters) = input.parameters {
            observation.parameters = Some(parameters);
        }

        let cols = ResultColumns::from(&observation.result);
        tx.execute(
            "UPDATE observations
             SET result_numeric = $3, result_text = $4, result_boolean = $5,
                 result_complex = $6, parameters = $7
             WHERE id = $1 AND result_time = $2",
            &[
                &observation.id,
                &observation.result_time,
                &cols.numeric,
                &cols.text,
                &cols.boolean,
                &cols.complex,
                &observation.parameters,
            ],
        )
        .await
        .map_err(write_error)?;

        tx.commit().await.map_err(write_error)?;

        debug!("updated observation: {}", observation.id);
        Ok(observation)
    }

    #[instrument(skip(self), fields(observation_id = %id))]
    async fn delete_observation(&self, id: Uuid) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = conn
            .execute("DELETE FROM observations WHERE id = $1", &[&id])
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if deleted == 0 {
            return Err(DomainError::ObservationNotFound(id.to_string()));
        }

        debug!("deleted observation: {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_id_keeps_client_id() {
        let id = Uuid::new_v4();
        let draft = ObservationDraft {
            id: Some(id),
            datastream_id: Uuid::new_v4(),
            result_time: Utc::now(),
            result: ObservationResult::Numeric(1.0),
            parameters: None,
        };
        assert_eq!(assign_id(draft).id, id);
    }

    #[test]
    fn test_result_columns_sets_only_matching_column() {
        let text = ObservationResult::Text("open".to_string());
        let cols = ResultColumns::from(&text);
        assert_eq!(cols.text, Some("open"));
        assert!(cols.numeric.is_none() && cols.boolean.is_none() && cols.complex.is_none());
    }

    #[test]
    fn test_row_with_two_results_is_rejected() {
        let row = ObservationRow {
            id: Uuid::new_v4(),
            datastream_id: Uuid::new_v4(),
            result_time: Utc::now(),
            result_numeric: Some(1.0),
            result_text: Some("1".to_string()),
            result_boolean: None,
            result_complex: None,
            parameters: None,
        };
        assert!(matches!(
            row.into_domain(),
            Err(DomainError::RepositoryError(_))
        ));
    }
}

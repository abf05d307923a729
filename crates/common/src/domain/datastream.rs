use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declared type of the results a datastream carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultType {
    Boolean,
    Integer,
    Float,
    String,
    Json,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Boolean => "BOOLEAN",
            ResultType::Integer => "INTEGER",
            ResultType::Float => "FLOAT",
            ResultType::String => "STRING",
            ResultType::Json => "JSON",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOLEAN" => Ok(ResultType::Boolean),
            "INTEGER" => Ok(ResultType::Integer),
            "FLOAT" => Ok(ResultType::Float),
            "STRING" => Ok(ResultType::String),
            "JSON" => Ok(ResultType::Json),
            other => Err(format!("unknown result type: {}", other)),
        }
    }
}

/// A named, typed channel of observations produced by a system
#[derive(Debug, Clone, PartialEq)]
pub struct Datastream {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub system_id: Uuid,
    pub observed_property_id: Option<Uuid>,
    pub deployment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub feature_of_interest_id: Option<Uuid>,
    pub observation_result_type: ResultType,
    pub is_active: bool,
    pub is_gps_enabled: bool,
    pub properties: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Repository input for creating a datastream
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatastreamRepoInput {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub system_id: Uuid,
    pub observed_property_id: Option<Uuid>,
    pub deployment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub feature_of_interest_id: Option<Uuid>,
    pub observation_result_type: ResultType,
    pub is_active: bool,
    pub is_gps_enabled: bool,
    pub properties: Option<serde_json::Value>,
}

/// Repository input for updating a datastream; None keeps the stored value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateDatastreamRepoInput {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub system_id: Option<Uuid>,
    pub observed_property_id: Option<Uuid>,
    pub deployment_id: Option<Uuid>,
    pub procedure_id: Option<Uuid>,
    pub feature_of_interest_id: Option<Uuid>,
    pub observation_result_type: Option<ResultType>,
    pub is_active: Option<bool>,
    pub is_gps_enabled: Option<bool>,
    pub properties: Option<serde_json::Value>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DatastreamRepository: Send + Sync {
    async fn create_datastream(&self, input: CreateDatastreamRepoInput) -> DomainResult<Datastream>;

    async fn get_datastream(&self, id: Uuid) -> DomainResult<Option<Datastream>>;

    async fn list_datastreams(&self) -> DomainResult<Vec<Datastream>>;

    /// Changing the result type fails with DatastreamInUse once observations exist.
    /// A referenced row that does not exist fails with its NotFound error.
    async fn update_datastream(&self, input: UpdateDatastreamRepoInput) -> DomainResult<Datastream>;

    /// Fails with DatastreamInUse while observations still reference it
    async fn delete_datastream(&self, id: Uuid) -> DomainResult<()>;
}

use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of setting a system is deployed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentType {
    Field,
    Laboratory,
    Mobile,
    Fixed,
    Temporary,
    Permanent,
    Virtual,
    Custom,
}

impl DeploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentType::Field => "FIELD",
            DeploymentType::Laboratory => "LABORATORY",
            DeploymentType::Mobile => "MOBILE",
            DeploymentType::Fixed => "FIXED",
            DeploymentType::Temporary => "TEMPORARY",
            DeploymentType::Permanent => "PERMANENT",
            DeploymentType::Virtual => "VIRTUAL",
            DeploymentType::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIELD" => Ok(DeploymentType::Field),
            "LABORATORY" => Ok(DeploymentType::Laboratory),
            "MOBILE" => Ok(DeploymentType::Mobile),
            "FIXED" => Ok(DeploymentType::Fixed),
            "TEMPORARY" => Ok(DeploymentType::Temporary),
            "PERMANENT" => Ok(DeploymentType::Permanent),
            "VIRTUAL" => Ok(DeploymentType::Virtual),
            "CUSTOM" => Ok(DeploymentType::Custom),
            other => Err(format!("unknown deployment type: {}", other)),
        }
    }
}

/// Where and how a system is put to work
#[derive(Debug, Clone, PartialEq)]
pub struct Deployment {
    pub id: Uuid,
    pub system_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deployment_type: DeploymentType,
    /// Free-form location, e.g. a GeoJSON geometry
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Repository input for creating a deployment
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDeploymentRepoInput {
    pub id: Uuid,
    pub system_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deployment_type: DeploymentType,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
}

/// Repository input for updating a deployment; None keeps the stored value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateDeploymentRepoInput {
    pub id: Uuid,
    pub system_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub deployment_type: Option<DeploymentType>,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeploymentRepository: Send + Sync {
    /// Fails with SystemNotFound when the system does not exist
    async fn create_deployment(&self, input: CreateDeploymentRepoInput) -> DomainResult<Deployment>;

    async fn get_deployment(&self, id: Uuid) -> DomainResult<Option<Deployment>>;

    async fn list_deployments(&self) -> DomainResult<Vec<Deployment>>;

    async fn update_deployment(&self, input: UpdateDeploymentRepoInput) -> DomainResult<Deployment>;

    /// Fails with DeploymentInUse while a datastream references it
    async fn delete_deployment(&self, id: Uuid) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_type_names() {
        assert_eq!(DeploymentType::Laboratory.as_str(), "LABORATORY");
        assert_eq!("VIRTUAL".parse::<DeploymentType>(), Ok(DeploymentType::Virtual));
        assert!("field".parse::<DeploymentType>().is_err());
        assert_eq!(
            serde_json::to_string(&DeploymentType::Fixed).unwrap(),
            "\"FIXED\""
        );
    }
}

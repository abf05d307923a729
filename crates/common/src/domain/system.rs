use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A sensor, actuator or platform that produces datastreams
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub system_type: Option<String>,
    /// External reference, e.g. the device name used in MQTT topics
    pub external_id: Option<String>,
    pub properties: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Repository input for creating a system
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSystemRepoInput {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub system_type: Option<String>,
    pub external_id: Option<String>,
    pub properties: Option<serde_json::Value>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SystemRepository: Send + Sync {
    async fn create_system(&self, input: CreateSystemRepoInput) -> DomainResult<System>;

    async fn get_system(&self, id: Uuid) -> DomainResult<Option<System>>;

    async fn list_systems(&self) -> DomainResult<Vec<System>>;
}

use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    Environment,
    Atmosphere,
    Hydrosphere,
    Lithosphere,
    Biosphere,
    BuiltEnvironment,
    Individual,
    Population,
    Object,
    Event,
    Custom,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Environment => "ENVIRONMENT",
            FeatureType::Atmosphere => "ATMOSPHERE",
            FeatureType::Hydrosphere => "HYDROSPHERE",
            FeatureType::Lithosphere => "LITHOSPHERE",
            FeatureType::Biosphere => "BIOSPHERE",
            FeatureType::BuiltEnvironment => "BUILT_ENVIRONMENT",
            FeatureType::Individual => "INDIVIDUAL",
            FeatureType::Population => "POPULATION",
            FeatureType::Object => "OBJECT",
            FeatureType::Event => "EVENT",
            FeatureType::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENVIRONMENT" => Ok(FeatureType::Environment),
            "ATMOSPHERE" => Ok(FeatureType::Atmosphere),
            "HYDROSPHERE" => Ok(FeatureType::Hydrosphere),
            "LITHOSPHERE" => Ok(FeatureType::Lithosphere),
            "BIOSPHERE" => Ok(FeatureType::Biosphere),
            "BUILT_ENVIRONMENT" => Ok(FeatureType::BuiltEnvironment),
            "INDIVIDUAL" => Ok(FeatureType::Individual),
            "POPULATION" => Ok(FeatureType::Population),
            "OBJECT" => Ok(FeatureType::Object),
            "EVENT" => Ok(FeatureType::Event),
            "CUSTOM" => Ok(FeatureType::Custom),
            other => Err(format!("unknown feature type: {}", other)),
        }
    }
}

/// The real-world thing whose property a datastream observes, e.g. a room
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOfInterest {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub feature_type: FeatureType,
    pub reference: Option<String>,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
    pub media_links: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateFeatureOfInterestRepoInput {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub feature_type: FeatureType,
    pub reference: Option<String>,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
    pub media_links: Vec<String>,
}

/// None keeps the stored value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateFeatureOfInterestRepoInput {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub feature_type: Option<FeatureType>,
    pub reference: Option<String>,
    pub location: Option<serde_json::Value>,
    pub properties: Option<serde_json::Value>,
    pub media_links: Option<Vec<String>>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FeatureOfInterestRepository: Send + Sync {
    async fn create_feature_of_interest(
        &self,
        input: CreateFeatureOfInterestRepoInput,
    ) -> DomainResult<FeatureOfInterest>;

    async fn get_feature_of_interest(&self, id: Uuid) -> DomainResult<Option<FeatureOfInterest>>;

    async fn list_features_of_interest(&self) -> DomainResult<Vec<FeatureOfInterest>>;

    async fn update_feature_of_interest(
        &self,
        input: UpdateFeatureOfInterestRepoInput,
    ) -> DomainResult<FeatureOfInterest>;

    /// Fails with FeatureOfInterestInUse while a datastream references it
    async fn delete_feature_of_interest(&self, id: Uuid) -> DomainResult<()>;
}

use crate::domain::result::DomainResult;
use crate::domain::ResultType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Subject area an observed property belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyDomain {
    EnvironmentalBasics,
    AirQuality,
    WaterQuality,
    Electrical,
    LightAndRadiation,
    MotionAndPosition,
    Mechanical,
    Biological,
    BuiltEnvironment,
    RemoteSensing,
    EnergyAndHeat,
    HealthAndBiomedical,
    SpecialCases,
}

impl PropertyDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyDomain::EnvironmentalBasics => "ENVIRONMENTAL_BASICS",
            PropertyDomain::AirQuality => "AIR_QUALITY",
            PropertyDomain::WaterQuality => "WATER_QUALITY",
            PropertyDomain::Electrical => "ELECTRICAL",
            PropertyDomain::LightAndRadiation => "LIGHT_AND_RADIATION",
            PropertyDomain::MotionAndPosition => "MOTION_AND_POSITION",
            PropertyDomain::Mechanical => "MECHANICAL",
            PropertyDomain::Biological => "BIOLOGICAL",
            PropertyDomain::BuiltEnvironment => "BUILT_ENVIRONMENT",
            PropertyDomain::RemoteSensing => "REMOTE_SENSING",
            PropertyDomain::EnergyAndHeat => "ENERGY_AND_HEAT",
            PropertyDomain::HealthAndBiomedical => "HEALTH_AND_BIOMEDICAL",
            PropertyDomain::SpecialCases => "SPECIAL_CASES",
        }
    }
}

impl fmt::Display for PropertyDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENVIRONMENTAL_BASICS" => Ok(PropertyDomain::EnvironmentalBasics),
            "AIR_QUALITY" => Ok(PropertyDomain::AirQuality),
            "WATER_QUALITY" => Ok(PropertyDomain::WaterQuality),
            "ELECTRICAL" => Ok(PropertyDomain::Electrical),
            "LIGHT_AND_RADIATION" => Ok(PropertyDomain::LightAndRadiation),
            "MOTION_AND_POSITION" => Ok(PropertyDomain::MotionAndPosition),
            "MECHANICAL" => Ok(PropertyDomain::Mechanical),
            "BIOLOGICAL" => Ok(PropertyDomain::Biological),
            "BUILT_ENVIRONMENT" => Ok(PropertyDomain::BuiltEnvironment),
            "REMOTE_SENSING" => Ok(PropertyDomain::RemoteSensing),
            "ENERGY_AND_HEAT" => Ok(PropertyDomain::EnergyAndHeat),
            "HEALTH_AND_BIOMEDICAL" => Ok(PropertyDomain::HealthAndBiomedical),
            "SPECIAL_CASES" => Ok(PropertyDomain::SpecialCases),
            other => Err(format!("unknown property domain: {}", other)),
        }
    }
}

/// The phenomenon a datastream measures, with its unit
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedProperty {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub domain: PropertyDomain,
    pub property_definition: Option<String>,
    pub unit_definition: Option<String>,
    pub unit_symbol: Option<String>,
    pub reference: Option<String>,
    pub keywords: Vec<String>,
    pub value_type: ResultType,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateObservedPropertyRepoInput {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub domain: PropertyDomain,
    pub property_definition: Option<String>,
    pub unit_definition: Option<String>,
    pub unit_symbol: Option<String>,
    pub reference: Option<String>,
    pub keywords: Vec<String>,
    pub value_type: ResultType,
}

/// None keeps the stored value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateObservedPropertyRepoInput {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub domain: Option<PropertyDomain>,
    pub property_definition: Option<String>,
    pub unit_definition: Option<String>,
    pub unit_symbol: Option<String>,
    pub reference: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub value_type: Option<ResultType>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ObservedPropertyRepository: Send + Sync {
    async fn create_observed_property(
        &self,
        input: CreateObservedPropertyRepoInput,
    ) -> DomainResult<ObservedProperty>;

    async fn get_observed_property(&self, id: Uuid) -> DomainResult<Option<ObservedProperty>>;

    async fn list_observed_properties(&self) -> DomainResult<Vec<ObservedProperty>>;

    async fn update_observed_property(
        &self,
        input: UpdateObservedPropertyRepoInput,
    ) -> DomainResult<ObservedProperty>;

    /// Fails with ObservedPropertyInUse while a datastream references it
    async fn delete_observed_property(&self, id: Uuid) -> DomainResult<()>;
}

use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcedureType {
    DataCollection,
    DataProcessing,
    SensorCalibration,
    ActuatorOperation,
    Maintenance,
    Shutdown,
    Startup,
    AlgorithmExecution,
    UserDefined,
}

impl ProcedureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureType::DataCollection => "DATA_COLLECTION",
            ProcedureType::DataProcessing => "DATA_PROCESSING",
            ProcedureType::SensorCalibration => "SENSOR_CALIBRATION",
            ProcedureType::ActuatorOperation => "ACTUATOR_OPERATION",
            ProcedureType::Maintenance => "MAINTENANCE",
            ProcedureType::Shutdown => "SHUTDOWN",
            ProcedureType::Startup => "STARTUP",
            ProcedureType::AlgorithmExecution => "ALGORITHM_EXECUTION",
            ProcedureType::UserDefined => "USER_DEFINED",
        }
    }
}

impl fmt::Display for ProcedureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcedureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DATA_COLLECTION" => Ok(ProcedureType::DataCollection),
            "DATA_PROCESSING" => Ok(ProcedureType::DataProcessing),
            "SENSOR_CALIBRATION" => Ok(ProcedureType::SensorCalibration),
            "ACTUATOR_OPERATION" => Ok(ProcedureType::ActuatorOperation),
            "MAINTENANCE" => Ok(ProcedureType::Maintenance),
            "SHUTDOWN" => Ok(ProcedureType::Shutdown),
            "STARTUP" => Ok(ProcedureType::Startup),
            "ALGORITHM_EXECUTION" => Ok(ProcedureType::AlgorithmExecution),
            "USER_DEFINED" => Ok(ProcedureType::UserDefined),
            other => Err(format!("unknown procedure type: {}", other)),
        }
    }
}

/// The method by which observations of a datastream are produced
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub procedure_type: ProcedureType,
    /// Link to a method description
    pub reference: Option<String>,
    pub steps: Vec<String>,
    pub properties: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateProcedureRepoInput {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub procedure_type: ProcedureType,
    pub reference: Option<String>,
    pub steps: Vec<String>,
    pub properties: Option<serde_json::Value>,
}

/// None keeps the stored value; `steps` replaces the whole list when set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateProcedureRepoInput {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub procedure_type: Option<ProcedureType>,
    pub reference: Option<String>,
    pub steps: Option<Vec<String>>,
    pub properties: Option<serde_json::Value>,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProcedureRepository: Send + Sync {
    async fn create_procedure(&self, input: CreateProcedureRepoInput) -> DomainResult<Procedure>;

    async fn get_procedure(&self, id: Uuid) -> DomainResult<Option<Procedure>>;

    async fn list_procedures(&self) -> DomainResult<Vec<Procedure>>;

    async fn update_procedure(&self, input: UpdateProcedureRepoInput) -> DomainResult<Procedure>;

    /// Fails with ProcedureInUse while a datastream references it
    async fn delete_procedure(&self, id: Uuid) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_type_uses_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProcedureType::SensorCalibration).unwrap(),
            "\"SENSOR_CALIBRATION\""
        );
        let parsed: ProcedureType = serde_json::from_str("\"ALGORITHM_EXECUTION\"").unwrap();
        assert_eq!(parsed, ProcedureType::AlgorithmExecution);
        assert_eq!(parsed.as_str().parse::<ProcedureType>(), Ok(parsed));
    }
}

mod binding_check;
mod error;
mod ingestion_config;
mod ingestion_service;
mod observation_mapper;
mod observation_sink;
mod reading;
mod topic_registry;

pub use binding_check::*;
pub use error::*;
pub use ingestion_config::*;
pub use ingestion_service::*;
pub use observation_mapper::*;
pub use observation_sink::*;
pub use reading::*;
pub use topic_registry::*;

mod client;
mod config;
mod datastream_repository;
mod deployment_repository;
mod error;
mod feature_of_interest_repository;
mod observation_repository;
mod observed_property_repository;
mod procedure_repository;
mod system_repository;

pub use client::*;
pub use config::*;
pub use datastream_repository::*;
pub use deployment_repository::*;
pub use feature_of_interest_repository::*;
pub use observation_repository::*;
pub use observed_property_repository::*;
pub use procedure_repository::*;
pub use system_repository::*;

mod domain;
mod mqtt;
mod mqtt_ingestion;

pub use domain::*;
pub use mqtt::*;
pub use mqtt_ingestion::*;

mod broker_url;
pub(crate) mod supervisor;

pub use broker_url::{parse_broker_url, BrokerAddress};
pub use supervisor::run_mqtt_supervisor;

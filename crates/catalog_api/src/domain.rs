mod datastream_service;
mod deployment_service;
mod feature_of_interest_service;
mod observation_service;
mod observed_property_service;
mod procedure_service;
mod system_service;

pub use datastream_service::*;
pub use deployment_service::*;
pub use feature_of_interest_service::*;
pub use observation_service::*;
pub use observed_property_service::*;
pub use procedure_service::*;
pub use system_service::*;

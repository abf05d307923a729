mod datastream_handler;
mod deployment_handler;
mod error;
mod feature_of_interest_handler;
mod observation_handler;
mod observed_property_handler;
mod procedure_handler;
mod routes;
mod server;
mod system_handler;

pub use datastream_handler::{CreateDatastreamBody, DatastreamResponse, UpdateDatastreamBody};
pub use deployment_handler::{CreateDeploymentBody, DeploymentResponse, UpdateDeploymentBody};
pub use error::ApiError;
pub use feature_of_interest_handler::{
    CreateFeatureOfInterestBody, FeatureOfInterestResponse, UpdateFeatureOfInterestBody,
};
pub use observation_handler::{
    CreateObservationBody, ObservationResponse, ResultFields, UpdateObservationBody,
};
pub use observed_property_handler::{
    CreateObservedPropertyBody, ObservedPropertyResponse, UpdateObservedPropertyBody,
};
pub use procedure_handler::{CreateProcedureBody, ProcedureResponse, UpdateProcedureBody};
pub use routes::{api_routes, router};
pub use server::{run_catalog_http_server, CatalogApiServices, HttpServerConfig};
pub use system_handler::{CreateSystemBody, SystemResponse};

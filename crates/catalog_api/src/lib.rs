pub mod catalog_api;
pub mod domain;
pub mod http;

pub use catalog_api::*;
pub use domain::*;
pub use http::*;

pub mod domain;
pub mod garde;
pub mod postgres;
pub mod telemetry;

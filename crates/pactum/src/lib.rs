pub mod config;
pub mod error;
pub mod migrations;
pub mod telemetry;
pub mod versioning;

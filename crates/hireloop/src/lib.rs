pub mod communications;
pub mod config;
pub mod error;
pub mod telemetry;

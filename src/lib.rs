pub mod accounts;
pub mod config;
pub mod error;
pub mod strategy;
pub mod telemetry;

//! Argo CD drift controller: wiring, health endpoint and logging setup.

pub mod bootstrap;
pub mod health;
pub mod telemetry;

pub use bootstrap::{Overrides, config_path, run};
pub use telemetry::LogFormat;

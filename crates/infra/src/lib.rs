//! Infrastructure layer: persistence adapters, services, config, wiring.

pub mod config;
pub mod locks;
pub mod movement_recorder;
pub mod publisher;
pub mod repository;
pub mod services;
pub mod stowage;

pub use config::{ConfigError, StoreBackend, StowageConfig};
pub use services::{ServiceError, ServiceResult, WorkspaceContext};
pub use stowage::{Repositories, Stowage};

#[cfg(test)]
mod integration_tests;

//! Records: applications (service requests), their type catalog and users.
//!
//! Layout follows a light DDD split: `contract` holds plain models, `domain`
//! the error taxonomy, repository ports and the orchestration service, `infra`
//! the SeaORM adapters and `api` the REST surface.

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::model;

// === MODULE DEFINITION ===
pub mod module;
pub use module::Records;

pub mod config;
pub use config::RecordsConfig;

// === INTERNAL MODULES ===
// Exposed for integration tests and the server binary.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;

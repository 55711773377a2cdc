//! Parcel tracking persistence core.
//! Owns the `parcel` table, its entity mapping and the lifecycle guards.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::parcel::{
    now_rfc3339, ClientId, Parcel, ParcelNumber, ParcelStatus, ParcelValidationError,
};
pub use repo::parcel_repo::{ParcelStore, SqliteParcelStore, StoreError, StoreResult};
pub use service::parcel_service::{ParcelService, ParcelServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

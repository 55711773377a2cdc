//! Repository layer for parcel persistence.
//!
//! # Responsibility
//! - Define the data-access contract used by services.
//! - Isolate SQLite query details from callers.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) distinct from DB
//!   transport errors.
//! - Lifecycle guards live in SQL predicates.

pub mod parcel_repo;

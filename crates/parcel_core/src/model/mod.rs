//! Parcel domain model.
//!
//! # Responsibility
//! - Define the canonical parcel record persisted by the store.
//! - Define the closed status set and its forward transition order.
//!
//! # Invariants
//! - A parcel number is assigned by storage and never reused.
//! - Status is always one of `registered|sent|delivered`.

pub mod parcel;

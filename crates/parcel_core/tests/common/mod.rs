#![allow(dead_code)]

use parcel_core::{ClientId, Parcel};
use uuid::Uuid;

pub const CREATED_AT: &str = "2024-01-01T00:00:00Z";

/// Returns an unsaved registered parcel for client 1000.
pub fn test_parcel() -> Parcel {
    Parcel::new(1000, "test", CREATED_AT)
}

/// Xorshift generator for client ids, seeded per instance.
pub struct ClientIdSource {
    state: u64,
}

impl ClientIdSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    pub fn from_entropy() -> Self {
        let (high, low) = Uuid::new_v4().as_u64_pair();
        Self::seeded(high ^ low)
    }

    /// Returns an id in `[0, 10_000_000)`.
    pub fn next_client(&mut self) -> ClientId {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x % 10_000_000) as ClientId
    }
}

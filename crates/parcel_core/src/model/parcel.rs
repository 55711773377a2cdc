//! Parcel entity and status lifecycle.
//!
//! # Responsibility
//! - Define the shipment record shared by the store, service and CLI.
//! - Validate caller-provided fields before they reach persistence.
//!
//! # Invariants
//! - `number == 0` means "not yet persisted".
//! - `created_at` is an RFC3339 timestamp chosen by the caller.
//! - Status only moves forward: registered -> sent -> delivered.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Store-assigned parcel identifier (SQLite rowid).
pub type ParcelNumber = i64;

/// Identifier of the client owning a parcel.
pub type ClientId = i64;

/// Lifecycle stage of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    /// Accepted and waiting for dispatch. The only editable state.
    Registered,
    /// Handed over to transport.
    Sent,
    /// Received by the client. Terminal.
    Delivered,
}

impl ParcelStatus {
    /// Returns the text stored in `parcel.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
        }
    }

    /// Parses the stored text form exactly; no trimming or case folding.
    /// Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "registered" => Some(Self::Registered),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    /// Returns the following lifecycle stage, or `None` once delivered.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Sent),
            Self::Sent => Some(Self::Delivered),
            Self::Delivered => None,
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Same exact-match rules as [`ParcelStatus::parse`].
impl FromStr for ParcelStatus {
    type Err = ParcelValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
            .ok_or_else(|| ParcelValidationError::UnknownStatus(value.to_string()))
    }
}

/// Validation error for parcel fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelValidationError {
    /// `created_at` is not an RFC3339 timestamp.
    InvalidCreatedAt(String),
    /// Status text outside the closed status set.
    UnknownStatus(String),
    /// Current time could not be rendered as RFC3339.
    Clock(String),
}

impl Display for ParcelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCreatedAt(value) => {
                write!(f, "created_at `{value}` is not an RFC3339 timestamp")
            }
            Self::UnknownStatus(value) => write!(
                f,
                "unknown parcel status `{value}`; expected registered|sent|delivered"
            ),
            Self::Clock(message) => write!(f, "failed to read current time: {message}"),
        }
    }
}

impl Error for ParcelValidationError {}

/// One shipment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Zero until the store assigns a rowid.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: ParcelStatus,
    /// Free-text delivery address.
    pub address: String,
    /// RFC3339 creation timestamp, set by the caller.
    pub created_at: String,
}

impl Parcel {
    /// Creates an unsaved parcel in `registered` state.
    ///
    /// Does not validate `created_at`; the store calls [`Parcel::validate`]
    /// before writing.
    pub fn new(
        client: ClientId,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            number: 0,
            client,
            status: ParcelStatus::Registered,
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Creates an unsaved `registered` parcel stamped with the current UTC
    /// time at second precision.
    pub fn registered_now(
        client: ClientId,
        address: impl Into<String>,
    ) -> Result<Self, ParcelValidationError> {
        Ok(Self::new(client, address, now_rfc3339()?))
    }

    /// Returns whether the parcel has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.number != 0
    }

    /// Returns whether address edits and deletion are still allowed.
    pub fn is_editable(&self) -> bool {
        self.status == ParcelStatus::Registered
    }

    /// Checks field invariants that SQL constraints do not cover.
    pub fn validate(&self) -> Result<(), ParcelValidationError> {
        if OffsetDateTime::parse(&self.created_at, &Rfc3339).is_err() {
            return Err(ParcelValidationError::InvalidCreatedAt(
                self.created_at.clone(),
            ));
        }
        Ok(())
    }
}

/// Formats the current UTC time as RFC3339 without fractional seconds.
pub fn now_rfc3339() -> Result<String, ParcelValidationError> {
    let now = OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .map_err(|err| ParcelValidationError::Clock(err.to_string()))?;
    now.format(&Rfc3339)
        .map_err(|err| ParcelValidationError::Clock(err.to_string()))
}

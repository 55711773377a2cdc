//! Parcel use-case service.
//!
//! # Responsibility
//! - Register parcels with a creation timestamp.
//! - Own the status transition policy (registered -> sent -> delivered).
//! - Report why a guarded edit or deletion did not apply.
//!
//! # Invariants
//! - Every mutation is one guarded store statement; its changed-row result
//!   decides success.
//! - A read only follows a write that changed nothing, to name the reason.

use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus, ParcelValidationError};
use crate::repo::parcel_repo::{ParcelStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ParcelServiceError>;

/// Service error for parcel use-cases.
#[derive(Debug)]
pub enum ParcelServiceError {
    /// Target parcel does not exist.
    ParcelNotFound(ParcelNumber),
    /// Address edits and deletion require `registered`.
    NotRegistered {
        number: ParcelNumber,
        status: ParcelStatus,
    },
    /// No status follows `delivered`.
    AlreadyDelivered(ParcelNumber),
    /// The parcel changed between the read and the guarded write.
    Conflict(ParcelNumber),
    /// Parcel fields could not be built.
    Validation(ParcelValidationError),
    /// Persistence-layer failure.
    Store(StoreError),
}

impl Display for ParcelServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParcelNotFound(number) => write!(f, "parcel not found: {number}"),
            Self::NotRegistered { number, status } => write!(
                f,
                "parcel {number} is {status}; only registered parcels can be changed"
            ),
            Self::AlreadyDelivered(number) => write!(f, "parcel {number} is already delivered"),
            Self::Conflict(number) => {
                write!(f, "parcel {number} was changed concurrently; retry")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ParcelServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ParcelServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(number) => Self::ParcelNotFound(number),
            other => Self::Store(other),
        }
    }
}

impl From<ParcelValidationError> for ParcelServiceError {
    fn from(value: ParcelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Use-case wrapper over a [`ParcelStore`].
pub struct ParcelService<S: ParcelStore> {
    store: S,
}

impl<S: ParcelStore> ParcelService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a new parcel for `client` stamped with the current time.
    ///
    /// Returns the stored parcel including its assigned number.
    pub fn register(
        &self,
        client: ClientId,
        address: impl Into<String>,
    ) -> ServiceResult<Parcel> {
        let mut parcel = Parcel::registered_now(client, address)?;
        parcel.number = self.store.add(&parcel)?;

        info!(
            "event=parcel_register module=service status=ok number={} client={}",
            parcel.number, parcel.client
        );
        Ok(parcel)
    }

    /// Loads one parcel.
    pub fn parcel(&self, number: ParcelNumber) -> ServiceResult<Parcel> {
        Ok(self.store.get(number)?)
    }

    /// Lists all parcels of a client, oldest first.
    pub fn client_parcels(&self, client: ClientId) -> ServiceResult<Vec<Parcel>> {
        Ok(self.store.get_by_client(client)?)
    }

    /// Moves a parcel to the following lifecycle stage and returns it.
    ///
    /// The write only applies if the status is still the one read here, so a
    /// concurrent advance is reported as `Conflict` instead of overwritten.
    pub fn next_status(&self, number: ParcelNumber) -> ServiceResult<ParcelStatus> {
        let parcel = self.store.get(number)?;
        let next = parcel
            .status
            .next()
            .ok_or(ParcelServiceError::AlreadyDelivered(number))?;

        if !self.store.advance_status(number, parcel.status, next)? {
            // Surfaces ParcelNotFound if the row vanished in between.
            self.store.get(number)?;
            return Err(ParcelServiceError::Conflict(number));
        }

        info!(
            "event=parcel_next_status module=service status=ok number={} from={} to={}",
            number, parcel.status, next
        );
        Ok(next)
    }

    /// Changes the delivery address of a registered parcel.
    ///
    /// # Errors
    /// - `ParcelNotFound` when the number is unknown.
    /// - `NotRegistered` when the parcel has left `registered`.
    pub fn change_address(&self, number: ParcelNumber, address: &str) -> ServiceResult<()> {
        if self.store.set_address(number, address)? {
            return Ok(());
        }
        Err(self.classify_rejected(number))
    }

    /// Deletes a registered parcel.
    ///
    /// # Errors
    /// - `ParcelNotFound` when the number is unknown.
    /// - `NotRegistered` when the parcel has left `registered`.
    pub fn delete(&self, number: ParcelNumber) -> ServiceResult<()> {
        if !self.store.delete(number)? {
            return Err(self.classify_rejected(number));
        }

        info!(
            "event=parcel_delete module=service status=ok number={}",
            number
        );
        Ok(())
    }

    /// Names the reason a registered-only write matched no row.
    fn classify_rejected(&self, number: ParcelNumber) -> ParcelServiceError {
        match self.store.get(number) {
            Ok(parcel) if parcel.is_editable() => ParcelServiceError::Conflict(number),
            Ok(parcel) => ParcelServiceError::NotRegistered {
                number,
                status: parcel.status,
            },
            Err(err) => err.into(),
        }
    }
}

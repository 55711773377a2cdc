//! Parcel store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD plus client lookup over the `parcel` table.
//! - Map rows to `Parcel` and back, keeping SQL inside this module.
//!
//! # Invariants
//! - Every call issues exactly one SQL statement (construction aside).
//! - Address edits and deletion are guarded by `status = 'registered'` in the
//!   statement predicate, never by a separate read.
//! - Status transitions that must only move forward are guarded by the
//!   expected current status in the predicate (`advance_status`).
//! - Mutations matching zero rows succeed; only `get` reports `NotFound`.
//!   Guarded mutations return whether a row was changed.
//! - Read paths reject rows that do not map to a valid `Parcel`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus, ParcelValidationError};
use log::debug;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: &[&str] = &["number", "client", "status", "address", "created_at"];

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for parcel persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    Validation(ParcelValidationError),
    Db(DbError),
    NotFound(ParcelNumber),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::InvalidData(message) => write!(f, "invalid persisted parcel data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParcelValidationError> for StoreError {
    fn from(value: ParcelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Data-access contract for parcel records.
pub trait ParcelStore {
    /// Inserts a parcel and returns the number assigned by storage.
    /// `parcel.number` is ignored.
    fn add(&self, parcel: &Parcel) -> StoreResult<ParcelNumber>;
    /// Loads one parcel; a missing row is `StoreError::NotFound`.
    fn get(&self, number: ParcelNumber) -> StoreResult<Parcel>;
    /// Lists all parcels of a client in ascending number order.
    fn get_by_client(&self, client: ClientId) -> StoreResult<Vec<Parcel>>;
    /// Replaces the address while the parcel is still registered.
    ///
    /// Returns `false` when no row matched (missing or not registered).
    fn set_address(&self, number: ParcelNumber, address: &str) -> StoreResult<bool>;
    /// Overwrites the status without transition checks.
    fn set_status(&self, number: ParcelNumber, status: ParcelStatus) -> StoreResult<()>;
    /// Moves the status from `from` to `to` only if it is still `from`.
    ///
    /// Returns `false` when no row matched (missing or status moved on).
    fn advance_status(
        &self,
        number: ParcelNumber,
        from: ParcelStatus,
        to: ParcelStatus,
    ) -> StoreResult<bool>;
    /// Removes the parcel while it is still registered.
    ///
    /// Returns `false` when no row matched (missing or not registered).
    fn delete(&self, number: ParcelNumber) -> StoreResult<bool>;
}

/// SQLite-backed parcel store over a borrowed connection.
pub struct SqliteParcelStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParcelStore<'conn> {
    /// Wraps a connection whose schema is already migrated.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `PRAGMA user_version` is behind.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the `parcel`
    ///   table does not have the expected shape.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ParcelStore for SqliteParcelStore<'_> {
    fn add(&self, parcel: &Parcel) -> StoreResult<ParcelNumber> {
        parcel.validate()?;

        self.conn.execute(
            "INSERT INTO parcel (client, status, address, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                parcel.client,
                parcel.status.as_str(),
                parcel.address.as_str(),
                parcel.created_at.as_str(),
            ],
        )?;

        let number = self.conn.last_insert_rowid();
        if number <= 0 {
            return Err(StoreError::InvalidData(format!(
                "insert returned invalid rowid `{number}`"
            )));
        }

        debug!(
            "event=parcel_add module=repo status=ok number={} client={}",
            number, parcel.client
        );
        Ok(number)
    }

    fn get(&self, number: ParcelNumber) -> StoreResult<Parcel> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE number = ?1;"))?;

        let mut rows = stmt.query([number])?;
        match rows.next()? {
            Some(row) => parse_parcel_row(row),
            None => Err(StoreError::NotFound(number)),
        }
    }

    fn get_by_client(&self, client: ClientId) -> StoreResult<Vec<Parcel>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARCEL_SELECT_SQL} WHERE client = ?1 ORDER BY number ASC;"
        ))?;

        let mut rows = stmt.query([client])?;
        let mut parcels = Vec::new();
        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        Ok(parcels)
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE parcel
             SET address = ?2
             WHERE number = ?1
               AND status = ?3;",
            params![number, address, ParcelStatus::Registered.as_str()],
        )?;

        debug!(
            "event=parcel_set_address module=repo status=ok number={} changed={}",
            number, changed
        );
        Ok(changed > 0)
    }

    fn set_status(&self, number: ParcelNumber, status: ParcelStatus) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel SET status = ?2 WHERE number = ?1;",
            params![number, status.as_str()],
        )?;

        debug!(
            "event=parcel_set_status module=repo status=ok number={} parcel_status={} changed={}",
            number, status, changed
        );
        Ok(())
    }

    fn advance_status(
        &self,
        number: ParcelNumber,
        from: ParcelStatus,
        to: ParcelStatus,
    ) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE parcel
             SET status = ?3
             WHERE number = ?1
               AND status = ?2;",
            params![number, from.as_str(), to.as_str()],
        )?;

        debug!(
            "event=parcel_advance_status module=repo status=ok number={} from={} to={} changed={}",
            number, from, to, changed
        );
        Ok(changed > 0)
    }

    fn delete(&self, number: ParcelNumber) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM parcel
             WHERE number = ?1
               AND status = ?2;",
            params![number, ParcelStatus::Registered.as_str()],
        )?;

        debug!(
            "event=parcel_delete module=repo status=ok number={} changed={}",
            number, changed
        );
        Ok(changed > 0)
    }
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [PARCEL_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(StoreError::MissingRequiredTable(PARCEL_TABLE));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let present = stmt
        .query_map([PARCEL_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(column) = PARCEL_COLUMNS
        .iter()
        .find(|column| !present.iter().any(|name| name.as_str() == **column))
    {
        return Err(StoreError::MissingRequiredColumn {
            table: PARCEL_TABLE,
            column: *column,
        });
    }

    Ok(())
}

fn parse_parcel_row(row: &Row<'_>) -> StoreResult<Parcel> {
    let number: ParcelNumber = row.get("number")?;

    let status_text: String = row.get("status")?;
    let status = ParcelStatus::parse(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid status `{status_text}` in parcel.status for number {number}"
        ))
    })?;

    let created_at: String = row.get("created_at")?;
    if OffsetDateTime::parse(&created_at, &Rfc3339).is_err() {
        return Err(StoreError::InvalidData(format!(
            "invalid timestamp `{created_at}` in parcel.created_at for number {number}"
        )));
    }

    Ok(Parcel {
        number,
        client: row.get("client")?,
        status,
        address: row.get("address")?,
        created_at,
    })
}

mod common;

use common::{test_parcel, ClientIdSource, CREATED_AT};
use parcel_core::db::migrations::latest_version;
use parcel_core::db::{open_db_in_memory, DbError};
use parcel_core::{
    Parcel, ParcelStatus, ParcelStore, ParcelValidationError, SqliteParcelStore, StoreError,
};
use rusqlite::Connection;
use std::collections::HashSet;

#[test]
fn add_get_delete() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let mut parcel = test_parcel();

    let number = store.add(&parcel).unwrap();
    assert!(number > 0);

    let stored = store.get(number).unwrap();
    parcel.number = number;
    assert_eq!(stored, parcel);

    assert!(store.delete(number).unwrap());

    let err = store.get(number).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(missing) if missing == number));
}

#[test]
fn add_assigns_increasing_numbers_and_ignores_caller_number() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();

    let mut parcel = test_parcel();
    parcel.number = 42;
    let first = store.add(&parcel).unwrap();
    let second = store.add(&parcel).unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert!(matches!(store.get(42), Err(StoreError::NotFound(42))));
}

#[test]
fn add_rejects_invalid_created_at() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();

    let parcel = Parcel::new(1000, "test", "not a timestamp");
    let err = store.add(&parcel).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ParcelValidationError::InvalidCreatedAt(_))
    ));
    assert!(store.get_by_client(1000).unwrap().is_empty());
}

#[test]
fn get_missing_is_not_found_not_db_error() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();

    let err = store.get(7).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(7)));
    assert_eq!(err.to_string(), "parcel not found: 7");
}

#[test]
fn get_on_broken_table_is_db_error_not_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    conn.execute_batch("DROP TABLE parcel;").unwrap();

    let err = store.get(1).unwrap_err();
    assert!(
        matches!(err, StoreError::Db(DbError::Sqlite(_))),
        "unexpected error: {err}"
    );
}

#[test]
fn set_address_updates_registered_parcel() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let number = store.add(&test_parcel()).unwrap();

    assert!(store.set_address(number, "new test address").unwrap());

    let stored = store.get(number).unwrap();
    assert_eq!(stored.address, "new test address");
    assert_eq!(stored.status, ParcelStatus::Registered);
}

#[test]
fn set_address_is_ignored_once_sent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let number = store.add(&test_parcel()).unwrap();

    store.set_status(number, ParcelStatus::Sent).unwrap();
    assert!(!store.set_address(number, "new").unwrap());

    assert_eq!(store.get(number).unwrap().address, "test");
}

#[test]
fn set_address_is_ignored_once_delivered() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let number = store.add(&test_parcel()).unwrap();

    store.set_status(number, ParcelStatus::Delivered).unwrap();
    store.set_address(number, "new").unwrap();

    assert_eq!(store.get(number).unwrap().address, "test");
}

#[test]
fn mutations_on_missing_number_are_no_ops() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();

    assert!(!store.set_address(99, "nowhere").unwrap());
    store.set_status(99, ParcelStatus::Sent).unwrap();
    assert!(!store
        .advance_status(99, ParcelStatus::Registered, ParcelStatus::Sent)
        .unwrap());
    assert!(!store.delete(99).unwrap());
    assert!(matches!(store.get(99), Err(StoreError::NotFound(99))));
}

#[test]
fn advance_status_applies_only_from_expected_status() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let number = store.add(&test_parcel()).unwrap();

    assert!(store
        .advance_status(number, ParcelStatus::Registered, ParcelStatus::Sent)
        .unwrap());
    assert_eq!(store.get(number).unwrap().status, ParcelStatus::Sent);

    store.set_status(number, ParcelStatus::Delivered).unwrap();
    assert!(!store
        .advance_status(number, ParcelStatus::Registered, ParcelStatus::Sent)
        .unwrap());
    assert_eq!(store.get(number).unwrap().status, ParcelStatus::Delivered);
}

#[test]
fn set_status_is_unconditional() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let number = store.add(&test_parcel()).unwrap();

    for status in [
        ParcelStatus::Sent,
        ParcelStatus::Delivered,
        ParcelStatus::Registered,
        ParcelStatus::Delivered,
    ] {
        store.set_status(number, status).unwrap();
        assert_eq!(store.get(number).unwrap().status, status);
    }
}

#[test]
fn delete_keeps_sent_and_delivered_parcels() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let sent = store.add(&test_parcel()).unwrap();
    let delivered = store.add(&test_parcel()).unwrap();
    store.set_status(sent, ParcelStatus::Sent).unwrap();
    store.set_status(delivered, ParcelStatus::Delivered).unwrap();

    assert!(!store.delete(sent).unwrap());
    assert!(!store.delete(delivered).unwrap());

    assert_eq!(store.get(sent).unwrap().status, ParcelStatus::Sent);
    assert_eq!(store.get(delivered).unwrap().status, ParcelStatus::Delivered);
}

#[test]
fn get_by_client_returns_exactly_that_clients_parcels() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let mut ids = ClientIdSource::from_entropy();
    let client = ids.next_client();
    let other_client = client + 1;

    let mut parcels = vec![test_parcel(), test_parcel(), test_parcel()];
    for parcel in &mut parcels {
        parcel.client = client;
        parcel.number = store.add(parcel).unwrap();
        assert!(parcel.number > 0);
    }
    let mut foreign = test_parcel();
    foreign.client = other_client;
    store.add(&foreign).unwrap();

    let stored = store.get_by_client(client).unwrap();
    assert_eq!(stored.len(), parcels.len());

    let expected: HashSet<i64> = parcels.iter().map(|p| p.number).collect();
    let actual: HashSet<i64> = stored.iter().map(|p| p.number).collect();
    assert_eq!(actual, expected);
    for parcel in &parcels {
        assert!(stored.contains(parcel));
    }
}

#[test]
fn get_by_client_orders_by_number() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let client = ClientIdSource::seeded(0x5eed).next_client();

    let mut parcel = test_parcel();
    parcel.client = client;
    let numbers: Vec<i64> = (0..4).map(|_| store.add(&parcel).unwrap()).collect();

    let stored: Vec<i64> = store
        .get_by_client(client)
        .unwrap()
        .into_iter()
        .map(|p| p.number)
        .collect();
    assert_eq!(stored, numbers);
}

#[test]
fn get_by_client_unknown_client_is_empty() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    store.add(&test_parcel()).unwrap();

    assert!(store.get_by_client(-1).unwrap().is_empty());
}

#[test]
fn address_is_stored_verbatim() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let tricky = "1'); DROP TABLE parcel; --\nул. Ленина, 1";
    let parcel = Parcel::new(5, tricky, CREATED_AT);

    let number = store.add(&parcel).unwrap();
    assert_eq!(store.get(number).unwrap().address, tricky);
}

#[test]
fn get_rejects_corrupted_status_row() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "PRAGMA ignore_check_constraints = ON;
         INSERT INTO parcel (client, status, address, created_at)
         VALUES (1, 'lost', 'a', '2024-01-01T00:00:00Z');",
    )
    .unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();

    let err = store.get(1).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteParcelStore::try_new(&conn) {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn store_rejects_connection_without_parcel_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteParcelStore::try_new(&conn),
        Err(StoreError::MissingRequiredTable("parcel"))
    ));
}

#[test]
fn store_rejects_parcel_table_missing_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE parcel (
            number INTEGER PRIMARY KEY AUTOINCREMENT,
            client INTEGER NOT NULL,
            status TEXT NOT NULL,
            address TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteParcelStore::try_new(&conn),
        Err(StoreError::MissingRequiredColumn {
            table: "parcel",
            column: "created_at"
        })
    ));
}

use resonant::db;
use resonant::db::migrations::{
    get_schema_version, get_signature_version, run_migrations, CURRENT_SCHEMA_VERSION,
};

#[test]
fn fresh_db_migrates_to_current_version() {
    let conn = db::open_memory_database().unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    assert_eq!(
        get_signature_version(&conn).unwrap(),
        Some(resonant::signature::SCHEMA_VERSION)
    );
}

#[test]
fn manual_v1_db_upgrades_correctly() {
    // Simulate a v1 database that hasn't been migrated
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), 1);

    run_migrations(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    let log_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM ingest_log", [], |r| r.get(0))
        .unwrap();
    assert_eq!(log_rows, 0);
}

#[test]
fn reopening_an_on_disk_database_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.db");

    drop(db::open_database(&path).unwrap());
    let conn = db::open_database(&path).unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, CURRENT_SCHEMA_VERSION);
    assert_eq!(report.signature_count, 0);

    let journal: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(journal.to_lowercase(), "wal");
}

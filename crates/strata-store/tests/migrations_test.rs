use rusqlite::Connection;
use strata_store::migrations::apply_migrations;

#[test]
fn test_migrations_create_entity_tables() {
    // GIVEN a fresh database
    let mut conn = Connection::open_in_memory().unwrap();

    // WHEN migrations are applied
    apply_migrations(&mut conn).unwrap();

    // THEN every entity table and the provenance table exist
    let expected = [
        "deploy_events",
        "files",
        "folders",
        "localizations",
        "mail_templates",
        "nodes",
        "pages",
        "principals",
        "records",
        "schema_types",
        "schema_version",
        "shadow_components",
    ];
    for table in expected {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "missing table {}", table);
    }
}

#[test]
fn test_migrations_recorded_once() {
    // GIVEN a migrated database
    let mut conn = Connection::open_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();

    // WHEN migrations run again
    apply_migrations(&mut conn).unwrap();

    // THEN each migration has exactly one schema_version row with a checksum
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 2);
    let missing: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM schema_version WHERE checksum IS NULL OR length(checksum) != 64",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(missing, 0);
}

#[test]
fn test_open_and_migrate_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/.strata/store.db");

    let conn = strata_store::db::open_and_migrate(&path).unwrap();

    assert!(path.exists());
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 2);
}

//! CLI deploy integration tests
//!
//! These tests run the binary against temporary databases and verify that
//! the commands delegate to the engine's persistent deploy path.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use strata_core::model::{EntityRef, ParentRef, Subject};
use strata_core::ops::{content_ops, principal_ops};
use strata_core::Store;
use strata_store::db::open_and_migrate;
use strata_store::repo::{load_store, SqliteRepo};
use tempfile::TempDir;

fn seed_db(temp_dir: &TempDir, name: &str, store: &Store) -> PathBuf {
    let db_path = temp_dir.path().join(name);
    let mut conn = open_and_migrate(&db_path).unwrap();
    SqliteRepo::save_store(&mut conn, store).unwrap();
    db_path
}

fn sample_store() -> Store {
    let mut store = Store::new();
    let page = content_ops::create_page(&mut store, "index").unwrap();
    let div = content_ops::create_element(&mut store, "div").unwrap();
    content_ops::append_child(&mut store, &ParentRef::Page(page.clone()), &div).unwrap();
    let text = content_ops::create_text(&mut store, "hello").unwrap();
    content_ops::append_child(&mut store, &ParentRef::Node(div), &text).unwrap();
    principal_ops::set_owner(
        &mut store,
        &EntityRef::page(page),
        Some(Subject::unresolved("admin")),
    )
    .unwrap();
    store
}

fn run(dir: &Path, args: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_strata-cli");
    Command::new(cli_bin)
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn hash(dir: &Path, db: &Path) -> String {
    let output = run(dir, &["hash", "--db", db.to_str().unwrap()]);
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn test_cli_export_then_import_matches_digest() {
    // Scenario: deploy a site from one database to another
    // When: `strata deploy export` then `strata deploy import` with the admin present
    // Then: both exit 0 and `strata hash` prints the same digest for both

    let temp_dir = TempDir::new().unwrap();
    let source_db = seed_db(&temp_dir, "source.db", &sample_store());
    let target_db = seed_db(&temp_dir, "target.db", &Store::new());
    let export_dir = temp_dir.path().join("out");

    let add = run(
        temp_dir.path(),
        &["principal", "add", "admin", "--db", target_db.to_str().unwrap()],
    );
    assert!(add.status.success(), "{}", String::from_utf8_lossy(&add.stderr));

    let export = run(
        temp_dir.path(),
        &[
            "deploy",
            "export",
            export_dir.to_str().unwrap(),
            "--db",
            source_db.to_str().unwrap(),
        ],
    );
    assert_eq!(
        export.status.code(),
        Some(0),
        "Stderr: {}",
        String::from_utf8_lossy(&export.stderr)
    );
    assert!(export_dir.join("deploy.json").exists());

    let import = run(
        temp_dir.path(),
        &[
            "deploy",
            "import",
            export_dir.to_str().unwrap(),
            "--db",
            target_db.to_str().unwrap(),
        ],
    );
    assert_eq!(
        import.status.code(),
        Some(0),
        "Stdout: {}",
        String::from_utf8_lossy(&import.stdout)
    );

    assert_eq!(
        hash(temp_dir.path(), &source_db),
        hash(temp_dir.path(), &target_db)
    );

    // Each run recorded its start and completion
    let conn = rusqlite::Connection::open(&target_db).unwrap();
    let kinds: Vec<String> = conn
        .prepare("SELECT kind FROM deploy_events ORDER BY id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(kinds, vec!["import_started", "import_completed"]);
}

#[test]
fn test_cli_partial_import_exits_with_two() {
    // Scenario: the target lacks the page owner
    // Then: exit code 2 and an UnresolvedPrincipal issue in the JSON report

    let temp_dir = TempDir::new().unwrap();
    let source_db = seed_db(&temp_dir, "source.db", &sample_store());
    let target_db = seed_db(&temp_dir, "target.db", &Store::new());
    let export_dir = temp_dir.path().join("out");
    run(
        temp_dir.path(),
        &[
            "deploy",
            "export",
            export_dir.to_str().unwrap(),
            "--db",
            source_db.to_str().unwrap(),
        ],
    );

    let import = run(
        temp_dir.path(),
        &[
            "deploy",
            "import",
            export_dir.to_str().unwrap(),
            "--db",
            target_db.to_str().unwrap(),
            "--json",
        ],
    );

    assert_eq!(import.status.code(), Some(2));
    let report: serde_json::Value = serde_json::from_slice(&import.stdout).unwrap();
    assert_eq!(report["outcome"], "partial");
    assert_eq!(report["issues"][0]["code"], "ERR_UNRESOLVED_PRINCIPAL");

    // Adding the principal afterwards binds the pending owner
    let add = run(
        temp_dir.path(),
        &["principal", "add", "admin", "--db", target_db.to_str().unwrap()],
    );
    assert!(String::from_utf8_lossy(&add.stdout).contains("bound pending"));
    let conn = open_and_migrate(&target_db).unwrap();
    let store = load_store(&conn).unwrap();
    assert!(principal_ops::pending_names(&store).is_empty());
}

#[test]
fn test_cli_missing_export_directory_exits_with_one() {
    let temp_dir = TempDir::new().unwrap();
    let target_db = seed_db(&temp_dir, "target.db", &Store::new());

    let import = run(
        temp_dir.path(),
        &[
            "deploy",
            "import",
            "does-not-exist",
            "--db",
            target_db.to_str().unwrap(),
        ],
    );

    assert_eq!(import.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&import.stdout).contains("ERR_INVALID_EXPORT"));
}

#[test]
fn test_cli_replace_flag_removes_absent_pages() {
    let temp_dir = TempDir::new().unwrap();
    let source_db = seed_db(&temp_dir, "source.db", &sample_store());
    let mut existing = Store::new();
    content_ops::create_page(&mut existing, "stale").unwrap();
    let target_db = seed_db(&temp_dir, "target.db", &existing);
    let export_dir = temp_dir.path().join("out");
    run(
        temp_dir.path(),
        &[
            "deploy",
            "export",
            export_dir.to_str().unwrap(),
            "--db",
            source_db.to_str().unwrap(),
        ],
    );

    run(
        temp_dir.path(),
        &[
            "deploy",
            "import",
            export_dir.to_str().unwrap(),
            "--replace",
            "--db",
            target_db.to_str().unwrap(),
        ],
    );

    let conn = open_and_migrate(&target_db).unwrap();
    let store = load_store(&conn).unwrap();
    assert!(store.page_by_name("stale").is_none());
    assert!(store.page_by_name("index").is_some());
}

#[test]
fn test_cli_config_file_is_applied() {
    // Scenario: `.strata/deploy.yaml` turns off the schema group
    // Then: the export has no schema directory

    let temp_dir = TempDir::new().unwrap();
    let mut store = sample_store();
    strata_core::ops::schema_ops::define_type(&mut store, "Item", &[], Vec::new()).unwrap();
    let source_db = seed_db(&temp_dir, "source.db", &store);
    std::fs::create_dir_all(temp_dir.path().join(".strata")).unwrap();
    std::fs::write(
        temp_dir.path().join(".strata/deploy.yaml"),
        "export:\n  schema: false\nlogging: test\n",
    )
    .unwrap();
    let export_dir = temp_dir.path().join("out");

    let export = run(
        temp_dir.path(),
        &[
            "deploy",
            "export",
            export_dir.to_str().unwrap(),
            "--db",
            source_db.to_str().unwrap(),
        ],
    );

    assert_eq!(export.status.code(), Some(0));
    assert!(!export_dir.join("schema").exists());
}

#[test]
fn test_cli_hash_of_unknown_page_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = seed_db(&temp_dir, "store.db", &sample_store());

    let output = run(
        temp_dir.path(),
        &["hash", "--page", "missing", "--db", db.to_str().unwrap()],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing"));
}

#[test]
fn test_cli_principal_add_to_unknown_group_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = seed_db(&temp_dir, "store.db", &Store::new());

    let output = run(
        temp_dir.path(),
        &[
            "principal",
            "add",
            "alice",
            "--member-of",
            "nobody",
            "--db",
            db.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    let conn = open_and_migrate(&db).unwrap();
    assert!(load_store(&conn).unwrap().list_principals().is_empty());
}

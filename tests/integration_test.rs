//! Integration tests for postport.
#![allow(clippy::unwrap_used, clippy::panic)]

use postport::config::PostportConfig;
use postport::io::{ExportOptions, ExportService, ImportOptions, ImportOutcome, ImportService};
use postport::license::{ActivationStore, FileActivationStore};
use postport::storage::{ContentStore, SqliteStore, UserDirectory};
use postport::{ActionContext, Error, FeatureFlags};
use std::sync::Arc;

#[test]
fn test_error_types() {
    let err = Error::Transport("no file uploaded".to_string());
    assert!(err.to_string().contains("transport"));
    assert!(err.to_string().contains("no file uploaded"));

    let err = Error::FeatureNotEnabled("license manager".to_string());
    assert!(err.to_string().contains("not enabled"));

    let err = Error::LicenseRejected("expired".to_string());
    assert_eq!(err.to_string(), "license rejected: expired");
}

#[test]
fn test_config_file_drives_context() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "data_dir = {:?}\n\n[features]\nlicense_manager = true\n\n[license]\noffline_keys = [\"OFFLINE-1\"]\n",
            data_dir.display().to_string()
        ),
    )
    .unwrap();

    let config = PostportConfig::load(Some(&config_path)).unwrap();
    assert_eq!(
        config.features,
        FeatureFlags {
            license_manager: true,
            require_license: false,
        }
    );

    let context = ActionContext::from_config(&config).unwrap();
    let gate = context.license().unwrap();
    gate.activate("OFFLINE-1").unwrap();

    let stored = FileActivationStore::in_dir(&data_dir).load().unwrap();
    assert!(stored.activated);
    assert_eq!(stored.serial_key.as_deref(), Some("OFFLINE-1"));
}

#[test]
fn test_sqlite_import_survives_reopen_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("postport.db");
    let csv = "\u{feff}ID,Title,Content,Date,Author\n\
               7,Kept,<p>kept</p>,2023-12-31 23:59:59,Jane Doe\n\
               8,Also kept,<p>also</p>,yesterday,Jane Doe\n";

    {
        let store = Arc::new(SqliteStore::open(&db).unwrap());
        let jane = store.add_user("jdoe", "Jane Doe").unwrap();
        let report = ImportService::new(store.clone(), store.clone()).import_from_reader(
            csv.as_bytes(),
            jane.id,
            &ImportOptions::default(),
            None,
        );
        assert_eq!(report.outcome, ImportOutcome::FullSuccess);
    }

    let store = Arc::new(SqliteStore::open(&db).unwrap());
    assert_eq!(store.count_published().unwrap(), 2);

    let mut out = Vec::new();
    let result = ExportService::new(store.clone(), store)
        .export_to_writer(&mut out, &ExportOptions::default())
        .unwrap();
    assert_eq!(result.exported, 2);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "ID,Title,Content,Date,Author");
    assert!(lines[2].ends_with(",Kept,<p>kept</p>,2023-12-31 23:59:59,Jane Doe"));
}

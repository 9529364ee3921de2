//! Integration tests for renames against a local directory export

use std::fs;

use tempfile::TempDir;

use common::handles::HandleManager;
use common::nfs::NfsStatus;
use knot_daemon::{Config, ExportState, StateError};

/// Export rooted in a fresh temp dir holding `docs/readme.txt`
fn setup_export(read_only: bool) -> (ExportState, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("docs")).unwrap();
    fs::write(temp_dir.path().join("docs/readme.txt"), b"hello").unwrap();
    fs::create_dir(temp_dir.path().join("archive")).unwrap();

    let mut config = Config::default();
    config.export.root = temp_dir.path().to_path_buf();
    config.export.read_only = read_only;
    config.cache.handle_limit = 32;

    let state = ExportState::from_config(config).unwrap();
    (state, temp_dir)
}

#[test]
fn test_rename_within_directory() {
    let (state, temp_dir) = setup_export(false);
    let readme = state.handle_for("docs/readme.txt");

    let outcome = state.rename("docs/readme.txt", "docs/readme.bak").unwrap();

    assert_eq!(outcome.reply.status, NfsStatus::Ok);
    assert!(outcome.error.is_none());
    assert!(!temp_dir.path().join("docs/readme.txt").exists());
    assert_eq!(
        fs::read(temp_dir.path().join("docs/readme.bak")).unwrap(),
        b"hello"
    );

    let resolved = state.handler.from_handle(readme.as_bytes()).unwrap();
    assert_eq!(resolved.path, vec!["docs".to_string(), "readme.bak".to_string()]);
}

#[test]
fn test_rename_across_directories_reports_wcc() {
    let (state, temp_dir) = setup_export(false);

    let outcome = state.rename("docs/readme.txt", "archive/readme.txt").unwrap();

    assert_eq!(outcome.reply.status, NfsStatus::Ok);
    assert!(temp_dir.path().join("archive/readme.txt").exists());
    assert_ne!(outcome.from_dir, outcome.to_dir);
    assert!(outcome.reply.from_dir_wcc.before.is_some());
    assert!(outcome.reply.to_dir_wcc.after.is_some());
}

#[test]
fn test_rename_missing_source() {
    let (state, _temp_dir) = setup_export(false);

    let outcome = state.rename("docs/nothing.txt", "docs/other.txt").unwrap();

    assert_eq!(outcome.reply.status, NfsStatus::NoEnt);
    assert_eq!(outcome.error.unwrap().status, NfsStatus::NoEnt);
}

#[test]
fn test_read_only_export_refuses() {
    let (state, temp_dir) = setup_export(true);

    let outcome = state.rename("docs/readme.txt", "docs/readme.bak").unwrap();

    assert_eq!(outcome.reply.status, NfsStatus::RoFs);
    assert!(temp_dir.path().join("docs/readme.txt").exists());
}

#[test]
fn test_rename_into_missing_directory() {
    let (state, temp_dir) = setup_export(false);

    let outcome = state.rename("docs/readme.txt", "nowhere/readme.txt").unwrap();

    assert_eq!(outcome.reply.status, NfsStatus::NoEnt);
    assert!(temp_dir.path().join("docs/readme.txt").exists());
}

#[test]
fn test_root_that_is_a_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();

    let mut config = Config::default();
    config.export.root = file;

    assert!(matches!(
        ExportState::from_config(config),
        Err(StateError::NotADirectory(_))
    ));
}

#[test]
fn test_config_file_drives_export() {
    let temp_dir = TempDir::new().unwrap();
    let export_dir = temp_dir.path().join("export");
    fs::create_dir(&export_dir).unwrap();

    let config_path = temp_dir.path().join("knot.toml");
    fs::write(
        &config_path,
        format!(
            "[export]\nroot = {:?}\nread_only = true\n\n[cache]\nhandle_limit = 4\n",
            export_dir.display().to_string()
        ),
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    let state = ExportState::from_config(config).unwrap();

    assert!(state.backend.is_read_only());
    assert_eq!(state.handler.handle_limit(), 4);
}

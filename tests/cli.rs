use std::{fs, path::Path, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rusqlite::Connection;
use tempfile::TempDir;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Path to the stand-in `siegfried` binary used by every test that runs `identify`.
fn fake_siegfried() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/fake-siegfried.sh")
        .to_string_lossy()
        .into_owned()
}

struct TestState {
    root: TempDir,
}

impl TestState {
    fn init() -> Result<Self> {
        let root = TempDir::new()?;
        fs::create_dir_all(root.path().join("OriginalDocuments"))?;
        Ok(Self { root })
    }

    fn archive_root(&self) -> &Path {
        self.root.path()
    }

    fn database_path(&self) -> std::path::PathBuf {
        self.archive_root().join("_metadata").join("avid.db")
    }

    fn cmd(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("digiarch")?;
        cmd.arg("--archive-root")
            .arg(self.archive_root())
            .arg("--siegfried")
            .arg(fake_siegfried())
            .arg("-v");
        Ok(cmd)
    }

    fn connection(&self) -> Result<Connection> {
        Ok(Connection::open(self.database_path())?)
    }
}

#[test]
fn init_creates_database_and_logs_initialized_event() -> Result<()> {
    let s = TestState::init()?;

    let mut cmd = s.cmd()?;
    cmd.arg("init");
    cmd.assert().success();

    assert!(s.database_path().is_file());

    let conn = s.connection()?;
    let app_id: i64 = conn.pragma_query_value(None, "application_id", |row| row.get(0))?;
    assert_ne!(app_id, 0);
    let user_version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    assert_eq!(user_version, 1);

    let mut cmd = s.cmd()?;
    cmd.arg("history");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("init:initialized"));

    Ok(())
}

#[test]
fn empty_file_is_classified_with_fixed_identification() -> Result<()> {
    let s = TestState::init()?;
    fs::write(s.archive_root().join("OriginalDocuments/e.bin"), b"")?;

    s.cmd()?.arg("init").assert().success();
    s.cmd()?.args(["identify", "original"]).assert().success();

    let conn = s.connection()?;
    let (puid, signature, warning): (String, String, String) = conn.query_row(
        "SELECT puid, signature, warning FROM OriginalFiles WHERE relative_path = 'OriginalDocuments/e.bin'",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    assert_eq!(puid, "aca-error/1");
    assert_eq!(signature, "Empty file");
    assert_eq!(warning, "Error: File is empty");

    Ok(())
}

#[test]
fn extension_mismatch_is_renamed_and_reidentify_clears_warning() -> Result<()> {
    let s = TestState::init()?;
    // Lotus WordPro documents begin with the magic bytes 57 6F 72 64 50 72 6F ("WordPro" ASCII prefix).
    let mut content = b"WordPro\x00 document body".to_vec();
    content.extend(std::iter::repeat(0u8).take(64));
    fs::write(s.archive_root().join("OriginalDocuments/doc.fail"), &content)?;

    s.cmd()?.arg("init").assert().success();
    s.cmd()?.args(["identify", "original"]).assert().success();

    assert!(!s.archive_root().join("OriginalDocuments/doc.fail").exists());
    assert!(s.archive_root().join("OriginalDocuments/doc.lwp").exists());

    let conn = s.connection()?;
    let (puid, warning): (String, String) = conn.query_row(
        "SELECT puid, warning FROM OriginalFiles WHERE relative_path = 'OriginalDocuments/doc.lwp'",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    assert_eq!(puid, "x-fmt/340");
    assert_eq!(warning, "Extension mismatch");
    drop(conn);

    // Re-running identification against the now-correctly-suffixed file clears the warning.
    s.cmd()?.args(["identify", "original"]).assert().success();

    let conn = s.connection()?;
    let warning: Option<String> = conn.query_row(
        "SELECT warning FROM OriginalFiles WHERE relative_path = 'OriginalDocuments/doc.lwp'",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(warning, None);

    Ok(())
}

#[test]
fn edit_action_then_rollback_restores_previous_action() -> Result<()> {
    let s = TestState::init()?;
    fs::write(s.archive_root().join("OriginalDocuments/notes.txt"), b"hello")?;

    s.cmd()?.arg("init").assert().success();
    s.cmd()?.args(["identify", "original"]).assert().success();

    let conn = s.connection()?;
    let uuid: String = conn.query_row(
        "SELECT uuid FROM OriginalFiles WHERE relative_path = 'OriginalDocuments/notes.txt'",
        [],
        |row| row.get(0),
    )?;
    let previous_action: Option<String> = conn.query_row(
        "SELECT action FROM OriginalFiles WHERE uuid = ?1",
        [&uuid],
        |row| row.get(0),
    )?;
    drop(conn);

    let before = chrono::Local::now() - chrono::Duration::seconds(1);

    s.cmd()?
        .args(["edit", "action", &uuid, "manual", "because"])
        .assert()
        .success();

    let conn = s.connection()?;
    let (action, processed): (String, bool) = conn.query_row(
        "SELECT action, processed FROM OriginalFiles WHERE uuid = ?1",
        [&uuid],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    assert_eq!(action, "manual");
    assert!(!processed);
    drop(conn);

    let after = chrono::Local::now() + chrono::Duration::seconds(1);

    s.cmd()?
        .args([
            "edit",
            "rollback",
            &before.to_rfc3339(),
            &after.to_rfc3339(),
            "undo",
        ])
        .assert()
        .success();

    let conn = s.connection()?;
    let restored: Option<String> = conn.query_row(
        "SELECT action FROM OriginalFiles WHERE uuid = ?1",
        [&uuid],
        |row| row.get(0),
    )?;
    assert_eq!(restored, previous_action);

    Ok(())
}

#[test]
fn edit_rename_dry_run_leaves_disk_and_database_unchanged() -> Result<()> {
    let s = TestState::init()?;
    fs::write(s.archive_root().join("OriginalDocuments/notes.md"), b"hello")?;

    s.cmd()?.arg("init").assert().success();
    s.cmd()?.args(["identify", "original"]).assert().success();

    let conn = s.connection()?;
    let uuid: String = conn.query_row(
        "SELECT uuid FROM OriginalFiles WHERE relative_path = 'OriginalDocuments/notes.md'",
        [],
        |row| row.get(0),
    )?;
    drop(conn);

    s.cmd()?
        .args(["edit", "rename", &uuid, "txt", "fix", "--replace", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("notes.md").and(predicate::str::contains("notes.txt")));

    assert!(s.archive_root().join("OriginalDocuments/notes.md").exists());
    assert!(!s.archive_root().join("OriginalDocuments/notes.txt").exists());

    let conn = s.connection()?;
    let relative_path: String = conn.query_row(
        "SELECT relative_path FROM OriginalFiles WHERE uuid = ?1",
        [&uuid],
        |row| row.get(0),
    )?;
    assert_eq!(relative_path, "OriginalDocuments/notes.md");

    Ok(())
}

#[test]
fn png_pixel_count_drives_preservability() -> Result<()> {
    let s = TestState::init()?;
    image::RgbImage::new(50, 50)
        .save(s.archive_root().join("OriginalDocuments/small.png"))?;
    image::RgbImage::new(255, 255)
        .save(s.archive_root().join("OriginalDocuments/large.png"))?;

    s.cmd()?.arg("init").assert().success();
    s.cmd()?.args(["identify", "original"]).assert().success();

    let conn = s.connection()?;
    let small_warning: Option<String> = conn.query_row(
        "SELECT warning FROM OriginalFiles WHERE relative_path = 'OriginalDocuments/small.png'",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(
        small_warning.as_deref(),
        Some("Image contains less than 20000 pixels.")
    );

    let large_warning: Option<String> = conn.query_row(
        "SELECT warning FROM OriginalFiles WHERE relative_path = 'OriginalDocuments/large.png'",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(large_warning, None);

    Ok(())
}

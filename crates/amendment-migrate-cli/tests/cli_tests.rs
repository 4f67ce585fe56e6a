//! CLI integration tests for amendment-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! exit codes for error conditions, and end-to-end imports into a
//! throwaway SQLite file.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command for the amendment-migrate binary, isolated from the caller's
/// environment and working directory.
fn cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("amendment-migrate").unwrap();
    cmd.current_dir(dir)
        .env_remove("DATABASE_URL")
        .env_remove("ENVIRONMENT");
    cmd
}

/// A command pointed at a fresh database file inside `dir`.
fn cmd_with_db(dir: &TempDir) -> Command {
    let mut cmd = cmd(dir.path());
    cmd.env("DATABASE_URL", database_url(dir));
    cmd
}

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("amendments.db").display())
}

/// Write `text` as a UTF-16LE dump with BOM, the way SSMS scripts it.
fn write_dump(dir: &TempDir, text: &str) -> PathBuf {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let path = dir.path().join("script.sql");
    std::fs::write(&path, bytes).unwrap();
    path
}

const DUMP: &str = "\
SET IDENTITY_INSERT [dbo].[Amendments] ON
GO
INSERT INTO [dbo].[Amendments] ([Id], [Type], [Description], [Status], [DevStatus], [Priority])
VALUES (1, 'Bug', 'Crash on save', 'Open', 'Not Started', 'High'),
       (2, 'Feature', 'Export to CSV', 'In Progress', NULL, 'Low');
INSERT INTO [dbo].[Amendments] ([Id], [Type], [Description], [Status], [DevStatus], [Priority])
VALUES (3, 'Bug', 'Bad priority', 'Open', 'Not Started', 'Urgent');
GO
";

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("init-db"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_global_flags_and_defaults() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("amendment-migrate"));
}

#[test]
fn test_short_config_flag() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_explicit_config_exits_with_code_7() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let dir = TempDir::new().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd(dir.path())
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_config_values_exit_with_code_1() {
    let dir = TempDir::new().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "migration:").unwrap();
    writeln!(file, "  progress_interval: 0").unwrap();

    cmd(dir.path())
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_non_sqlite_database_url_exits_with_code_1() {
    let dir = TempDir::new().unwrap();
    cmd(dir.path())
        .env("DATABASE_URL", "postgres://localhost/amendments")
        .arg("health-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sqlite"));
}

#[test]
fn test_missing_dump_argument_exits_with_code_7() {
    let dir = TempDir::new().unwrap();
    cmd_with_db(&dir)
        .args(["migrate", "/nonexistent/script.sql"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("SQL dump file not found"));
}

#[test]
fn test_missing_dump_still_initializes_schema() {
    let dir = TempDir::new().unwrap();
    cmd_with_db(&dir)
        .args(["migrate", "/nonexistent/script.sql"])
        .assert()
        .code(7);

    cmd_with_db(&dir)
        .arg("health-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Amendments: 0"));
}

#[test]
fn test_default_command_without_dump_exits_with_code_7() {
    // no config.yaml in the working directory, default dump path is absent,
    // and no terminal is attached to prompt on
    let dir = TempDir::new().unwrap();
    cmd_with_db(&dir).assert().code(7);
}

#[test]
fn test_reset_refused_in_production() {
    let dir = TempDir::new().unwrap();
    cmd_with_db(&dir)
        .env("ENVIRONMENT", "production")
        .args(["init-db", "--reset"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("production"));
}

// =============================================================================
// End-to-end Tests
// =============================================================================

#[test]
fn test_init_db_then_health_check() {
    let dir = TempDir::new().unwrap();
    cmd_with_db(&dir)
        .arg("init-db")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database tables created"));

    assert!(dir.path().join("amendments.db").exists());

    cmd_with_db(&dir)
        .arg("health-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("HEALTHY"))
        .stdout(predicate::str::contains("Amendments: 0"));
}

#[test]
fn test_migrate_imports_utf16_dump() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir, DUMP);

    cmd_with_db(&dir)
        .arg("migrate")
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("Migration completed!"))
        .stdout(predicate::str::contains("Statements: 2"))
        .stdout(predicate::str::contains("Imported: 2"))
        .stdout(predicate::str::contains("Skipped: 1"))
        .stdout(predicate::str::contains("unknown priority 'Urgent'"));

    cmd_with_db(&dir)
        .arg("health-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Amendments: 2"));
}

#[test]
fn test_migrate_uses_configured_dump_path() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir, DUMP);
    let config = dir.path().join("config.yaml");
    std::fs::write(
        &config,
        format!(
            "source:\n  dump_path: {}\ntarget:\n  database_url: {}\n",
            dump.display(),
            database_url(&dir)
        ),
    )
    .unwrap();

    // config.yaml in the working directory is picked up without --config
    cmd(dir.path())
        .arg("--output-json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rows_imported\": 2"));
}

#[test]
fn test_migrate_json_summary() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir, DUMP);

    let output = cmd_with_db(&dir)
        .arg("--output-json")
        .arg("migrate")
        .arg(&dump)
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["table"], "Amendments");
    assert_eq!(summary["rows_processed"], 3);
    assert_eq!(summary["rows_imported"], 2);
    assert_eq!(summary["rows_skipped"], 1);
    assert_eq!(summary["row_errors"][0]["row"], 3);
    // row 2 has a NULL development status
    assert_eq!(summary["substitutions"][0]["field"], "development_status");
}

#[test]
fn test_migrate_reports_tables_when_target_missing() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(
        &dir,
        "INSERT INTO [dbo].[Users] ([Id], [Name]) VALUES (1, 'admin');\n\
         INSERT INTO [dbo].[Roles] ([Id]) VALUES (1);\n",
    );

    cmd_with_db(&dir)
        .arg("migrate")
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("No Amendments data found"))
        .stdout(predicate::str::contains("[dbo].[Users]"))
        .stdout(predicate::str::contains("[dbo].[Roles]"));
}

#[test]
fn test_health_check_json() {
    let dir = TempDir::new().unwrap();
    let output = cmd_with_db(&dir)
        .args(["--output-json", "health-check"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["healthy"], true);
    assert!(result["amendment_count"].is_null());
}

//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::migrate::ColumnMap;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Legacy dump location.
    #[serde(default)]
    pub source: SourceConfig,

    /// Destination store.
    #[serde(default)]
    pub target: TargetConfig,

    /// Import behavior.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Legacy SQL Server dump configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the `script.sql` dump (default: `../fis-amendments/script.sql`).
    #[serde(default = "default_dump_path")]
    pub dump_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dump_path: default_dump_path(),
        }
    }
}

/// Destination store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// SQLite connection URL (default: `sqlite://amendment_system.db`).
    /// The `DATABASE_URL` environment variable takes precedence.
    /// In YAML, quote URLs that end in `:`, such as `'sqlite::memory:'`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Deployment environment (default: `development`). Destructive schema
    /// operations are refused in `production`. `ENVIRONMENT` takes precedence.
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            environment: default_environment(),
        }
    }
}

impl TargetConfig {
    /// Whether the URL names a private in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Import behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Legacy table whose INSERT statements are imported (default: `Amendments`).
    #[serde(default = "default_table")]
    pub table: String,

    /// Creator recorded when a row carries none (default: `migration_script`).
    #[serde(default = "default_creator")]
    pub creator: String,

    /// Log progress every N successful imports (default: 10).
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Table names listed when the target table is missing (default: 50).
    #[serde(default = "default_diagnostic_table_limit")]
    pub diagnostic_table_limit: usize,

    /// Dump column positions to record fields (default: the legacy layout).
    #[serde(default)]
    pub column_map: ColumnMap,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            creator: default_creator(),
            progress_interval: default_progress_interval(),
            diagnostic_table_limit: default_diagnostic_table_limit(),
            column_map: ColumnMap::default(),
        }
    }
}

fn default_dump_path() -> PathBuf {
    PathBuf::from("../fis-amendments/script.sql")
}

fn default_database_url() -> String {
    "sqlite://amendment_system.db".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_table() -> String {
    "Amendments".to_string()
}

fn default_creator() -> String {
    "migration_script".to_string()
}

fn default_progress_interval() -> usize {
    10
}

fn default_diagnostic_table_limit() -> usize {
    50
}

//! Configuration validation.

use super::{Config, MigrationConfig};
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.source.dump_path.as_os_str().is_empty() {
        return Err(MigrateError::Config("source.dump_path is required".into()));
    }

    let url = config.target.database_url.trim();
    if url.is_empty() {
        return Err(MigrateError::Config(
            "target.database_url must be set and non-empty".into(),
        ));
    }
    if !url.starts_with("sqlite:") {
        return Err(MigrateError::Config(format!(
            "target.database_url must be a sqlite: URL, got '{}'",
            url
        )));
    }

    validate_migration(&config.migration)
}

/// Validate the import settings on their own.
pub fn validate_migration(migration: &MigrationConfig) -> Result<()> {
    if migration.table.trim().is_empty() {
        return Err(MigrateError::Config("migration.table is required".into()));
    }
    if migration.creator.trim().is_empty() {
        return Err(MigrateError::Config("migration.creator is required".into()));
    }
    if migration.progress_interval == 0 {
        return Err(MigrateError::Config(
            "migration.progress_interval must be at least 1".into(),
        ));
    }
    if migration.diagnostic_table_limit == 0 {
        return Err(MigrateError::Config(
            "migration.diagnostic_table_limit must be at least 1".into(),
        ));
    }

    migration.column_map.validate()
}

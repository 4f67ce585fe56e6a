//! Error types for the amendment store and importer.

use std::path::PathBuf;

use thiserror::Error;

/// Process exit code for configuration and validation errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code when the batch commit fails and is rolled back.
pub const EXIT_BATCH_ERROR: u8 = 2;
/// Process exit code for database connection or query errors.
pub const EXIT_DATABASE_ERROR: u8 = 3;
/// Process exit code for file errors, including a missing dump.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for store and migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, bad column map, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A value failed domain validation (unknown enum, blank description, ...)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The legacy dump could not be located
    #[error("SQL dump file not found: {}", .0.display())]
    DumpNotFound(PathBuf),

    /// A single dump row could not be mapped or stored
    #[error("Row {row} failed: {message}")]
    Row { row: usize, message: String },

    /// Committing the import batch failed; the whole batch was rolled back
    #[error("Batch commit failed: {0}")]
    Commit(String),

    /// A record lookup found nothing
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Row error for the given 1-based row number.
    pub fn row(row: usize, message: impl Into<String>) -> Self {
        MigrateError::Row {
            row,
            message: message.into(),
        }
    }

    /// Create a NotFound error.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        MigrateError::NotFound { entity, id }
    }

    /// Map the error to a process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_)
            | MigrateError::Validation(_)
            | MigrateError::Yaml(_)
            | MigrateError::Json(_)
            | MigrateError::NotFound { .. } => EXIT_CONFIG_ERROR,
            MigrateError::Commit(_) | MigrateError::Row { .. } => EXIT_BATCH_ERROR,
            MigrateError::Database(_) => EXIT_DATABASE_ERROR,
            MigrateError::Io(_) | MigrateError::DumpNotFound(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for store and migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

//! # amendment-migrate
//!
//! Amendment tracking store and legacy data importer.
//!
//! This library imports amendment records from a SQL Server "Generate
//! Scripts" dump into a SQLite-backed amendment store:
//!
//! - **Dump parsing** of UTF-16 `INSERT ... VALUES` scripts, tolerant of
//!   quoting quirks and multi-row statements
//! - **Positional column mapping** with defaults for missing required fields
//! - **Per-row error isolation** inside one all-or-nothing batch
//! - **Amendment store** with progress entries, applications and links
//!
//! ## Example
//!
//! ```rust,no_run
//! use amendment_migrate::{AmendmentStore, Config, Migrator};
//!
//! #[tokio::main]
//! async fn main() -> amendment_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let store = AmendmentStore::connect(&config.target).await?;
//!     store.init_schema().await?;
//!
//!     let migrator = Migrator::new(config.migration.clone())?;
//!     let summary = migrator.run_file(&config.source.dump_path, &mut store.sink()).await?;
//!     println!("Imported {} amendments", summary.rows_imported);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dump;
pub mod error;
pub mod migrate;
pub mod store;

// Re-exports for convenient access
pub use crate::core::{
    Amendment, AmendmentCreate, AmendmentFilter, AmendmentUpdate, ImportRecord, RecordSink,
};
pub use config::{Config, MigrationConfig, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use migrate::{ColumnMap, ImportSummary, Migrator};
pub use store::{AmendmentStore, HealthCheckResult, SqliteSink};

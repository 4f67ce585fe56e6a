//! Legacy dump import driver.
//!
//! Reads a dump, extracts the target table's INSERT rows, maps each row
//! through the [`ColumnMap`], and writes it to a [`RecordSink`].
//!
//! Failure domains are kept apart:
//!
//! - a row that cannot be mapped or is rejected by the sink is logged,
//!   counted as skipped, and the run continues
//! - if the final commit fails, the batch is rolled back and the run fails
//!
//! Re-running against the same dump duplicates records; there is no
//! natural key to deduplicate on.

mod mapping;

pub use mapping::{
    ColumnMap, ColumnMapping, DefaultSubstitution, ImportField, MappedRow, DEFAULT_DESCRIPTION,
};

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::MigrationConfig;
use crate::core::RecordSink;
use crate::dump::{read_dump, scan_table_names, StatementExtractor};
use crate::error::{MigrateError, Result};

/// Number of leading raw fields logged for a failed row.
const ROW_CONTEXT_FIELDS: usize = 5;

/// A row that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based row number across the whole run.
    pub row: usize,
    pub message: String,
    /// The first few raw tokens, for locating the row in the dump.
    pub leading_fields: Vec<String>,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    /// Legacy table that was imported.
    pub table: String,
    pub statements_found: usize,
    pub rows_processed: usize,
    pub rows_imported: usize,
    pub rows_skipped: usize,
    /// Required fields that were absent and defaulted.
    pub substitutions: Vec<DefaultSubstitution>,
    pub row_errors: Vec<RowError>,
    /// INSERT targets present in the dump, filled only when `table` was not found.
    pub tables_found: Vec<String>,
    pub duration_seconds: f64,
}

impl ImportSummary {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    /// True when the dump held no statements for the table.
    pub fn is_empty(&self) -> bool {
        self.statements_found == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Import driver for one legacy table.
pub struct Migrator {
    config: MigrationConfig,
    extractor: StatementExtractor,
}

impl Migrator {
    pub fn new(config: MigrationConfig) -> Result<Self> {
        config.validate()?;
        let extractor = StatementExtractor::new(&config.table)?;
        Ok(Self { config, extractor })
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Read the dump at `path` and import it.
    pub async fn run_file<P, S>(&self, path: P, sink: &mut S) -> Result<ImportSummary>
    where
        P: AsRef<Path>,
        S: RecordSink + ?Sized,
    {
        let path = path.as_ref();
        info!("Reading SQL file: {:?}", path);
        let dump = read_dump(path)?;
        info!("SQL file size: {} characters", dump.chars().count());
        self.run(&dump, sink).await
    }

    /// Import every matching row of `dump` into `sink` as one batch.
    pub async fn run<S>(&self, dump: &str, sink: &mut S) -> Result<ImportSummary>
    where
        S: RecordSink + ?Sized,
    {
        let started = Instant::now();
        let mut summary = ImportSummary::new(self.extractor.table());

        let statements = self.extractor.extract(dump);
        summary.statements_found = statements.len();
        info!(
            "Found {} INSERT statements for {}",
            statements.len(),
            self.extractor.table()
        );

        if statements.is_empty() {
            summary.tables_found = scan_table_names(dump, self.config.diagnostic_table_limit);
            warn!(
                "No {} data found in dump; INSERT statements present for tables: {:?}",
                self.extractor.table(),
                summary.tables_found
            );
            summary.duration_seconds = started.elapsed().as_secs_f64();
            return Ok(summary);
        }

        sink.begin().await?;

        for statement in &statements {
            for row in &statement.rows {
                summary.rows_processed += 1;
                let row_number = summary.rows_processed;

                match self.import_row(row_number, row, sink).await {
                    Ok(mapped) => {
                        summary.rows_imported += 1;
                        for sub in &mapped.substitutions {
                            warn!(
                                "Row {}: {} missing, defaulted to '{}'",
                                sub.row,
                                sub.field.as_str(),
                                sub.value
                            );
                        }
                        summary.substitutions.extend(mapped.substitutions);
                        if summary.rows_imported % self.config.progress_interval == 0 {
                            info!("Imported {} amendments...", summary.rows_imported);
                        }
                    }
                    Err(e) => {
                        let leading_fields: Vec<String> =
                            row.iter().take(ROW_CONTEXT_FIELDS).cloned().collect();
                        warn!("Error importing amendment: {}", e);
                        warn!("Row data (first {} fields): {:?}", ROW_CONTEXT_FIELDS, leading_fields);
                        summary.rows_skipped += 1;
                        summary.row_errors.push(RowError {
                            row: row_number,
                            message: e.to_string(),
                            leading_fields,
                        });
                    }
                }
            }
        }

        if let Err(e) = sink.commit().await {
            error!("Error during migration commit: {}", e);
            if let Err(rollback_err) = sink.rollback().await {
                error!("Rollback after failed commit also failed: {}", rollback_err);
            }
            return Err(MigrateError::Commit(e.to_string()));
        }

        summary.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Successfully imported {} amendments ({} skipped, {} defaults applied) in {:.2}s",
            summary.rows_imported,
            summary.rows_skipped,
            summary.substitutions.len(),
            summary.duration_seconds
        );

        Ok(summary)
    }

    async fn import_row<S>(&self, row_number: usize, row: &[String], sink: &mut S) -> Result<MappedRow>
    where
        S: RecordSink + ?Sized,
    {
        let mapped = self
            .config
            .column_map
            .map_row(row_number, row, &self.config.creator)?;
        let id = sink
            .create_amendment(&mapped.record, &mapped.created_by)
            .await
            .map_err(|e| MigrateError::row(row_number, e.to_string()))?;
        debug!("Row {} imported as amendment {}", row_number, id);
        Ok(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AmendmentType, ImportRecord};
    use async_trait::async_trait;

    /// In-memory sink that can reject chosen descriptions and fail the commit.
    #[derive(Default)]
    struct FakeSink {
        reject_description: Option<String>,
        fail_commit: bool,
        pending: Vec<(ImportRecord, String)>,
        committed: Vec<(ImportRecord, String)>,
        began: bool,
        rolled_back: bool,
    }

    #[async_trait]
    impl RecordSink for FakeSink {
        async fn begin(&mut self) -> Result<()> {
            self.began = true;
            Ok(())
        }

        async fn create_amendment(&mut self, record: &ImportRecord, created_by: &str) -> Result<i64> {
            if self.reject_description.as_deref() == Some(record.description.as_str()) {
                return Err(MigrateError::Validation("rejected by sink".into()));
            }
            self.pending.push((record.clone(), created_by.to_string()));
            Ok(self.pending.len() as i64)
        }

        async fn commit(&mut self) -> Result<()> {
            if self.fail_commit {
                return Err(MigrateError::Validation("disk full".into()));
            }
            self.committed.append(&mut self.pending);
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.pending.clear();
            self.rolled_back = true;
            Ok(())
        }
    }

    fn migrator() -> Migrator {
        Migrator::new(MigrationConfig::default()).unwrap()
    }

    const TWO_GOOD_ROWS: &str = "\
INSERT INTO [dbo].[Amendments] ([Id],[Type],[Description],[Status])
VALUES (1, 'Bug', 'Crash on save', 'Open'),
       (2, 'Feature', 'Export to CSV', NULL);
";

    #[tokio::test]
    async fn test_imports_all_rows() {
        let mut sink = FakeSink::default();
        let summary = migrator().run(TWO_GOOD_ROWS, &mut sink).await.unwrap();

        assert_eq!(summary.statements_found, 1);
        assert_eq!(summary.rows_processed, 2);
        assert_eq!(summary.rows_imported, 2);
        assert_eq!(summary.rows_skipped, 0);
        assert_eq!(sink.committed.len(), 2);
        assert_eq!(sink.committed[0].0.amendment_type, AmendmentType::Bug);
        assert_eq!(sink.committed[1].1, "migration_script");
        // row 2: status NULL, plus dev status and priority missing on both rows
        assert_eq!(summary.substitutions.len(), 5);
    }

    #[test]
    fn test_new_rejects_zero_intervals() {
        let config = MigrationConfig {
            progress_interval: 0,
            ..Default::default()
        };
        assert!(matches!(Migrator::new(config), Err(MigrateError::Config(_))));

        let config = MigrationConfig {
            diagnostic_table_limit: 0,
            ..Default::default()
        };
        assert!(matches!(Migrator::new(config), Err(MigrateError::Config(_))));
    }

    #[tokio::test]
    async fn test_progress_logged_every_row() {
        let migrator = Migrator::new(MigrationConfig {
            progress_interval: 1,
            ..Default::default()
        })
        .unwrap();
        let mut sink = FakeSink::default();
        let summary = migrator
            .run("INSERT INTO Amendments VALUES (1, 'Bug', 'x');", &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.rows_imported, 1);
        assert_eq!(sink.committed.len(), 1);
    }

    #[tokio::test]
    async fn test_no_matching_statements_reports_tables() {
        let dump = "INSERT INTO [dbo].[Users] ([Id]) VALUES (1);\nINSERT INTO Roles VALUES (2);";
        let mut sink = FakeSink::default();
        let summary = migrator().run(dump, &mut sink).await.unwrap();

        assert!(summary.is_empty());
        assert_eq!(summary.rows_imported, 0);
        assert_eq!(summary.tables_found, vec!["[dbo].[Users]", "Roles"]);
        assert!(!sink.began);
    }

    #[tokio::test]
    async fn test_sink_rejection_skips_only_that_row() {
        let dump = "\
INSERT INTO Amendments VALUES (1, 'Bug', 'Crash on save'), (2, 'Bug', 'poison');";
        let mut sink = FakeSink {
            reject_description: Some("poison".into()),
            ..Default::default()
        };
        let summary = migrator().run(dump, &mut sink).await.unwrap();

        assert_eq!(summary.rows_imported, 1);
        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(sink.committed.len(), 1);
        assert_eq!(summary.row_errors[0].row, 2);
        assert_eq!(summary.row_errors[0].leading_fields, vec!["2", "'Bug'", "'poison'"]);
    }

    #[tokio::test]
    async fn test_malformed_row_skipped_batch_committed() {
        let dump = "\
INSERT INTO Amendments VALUES (1, 'Bug', 'Crash on save', 'Open');
INSERT INTO Amendments VALUES (2, 'Bug', 'Bad status', 'Bogus');";
        let mut sink = FakeSink::default();
        let summary = migrator().run(dump, &mut sink).await.unwrap();

        assert_eq!(summary.statements_found, 2);
        assert_eq!(summary.rows_imported, 1);
        assert_eq!(summary.rows_skipped, 1);
        assert!(summary.row_errors[0].message.contains("unknown amendment status 'Bogus'"));
        assert_eq!(sink.committed.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let mut sink = FakeSink {
            fail_commit: true,
            ..Default::default()
        };
        let err = migrator().run(TWO_GOOD_ROWS, &mut sink).await.unwrap_err();

        assert!(matches!(err, MigrateError::Commit(_)));
        assert!(sink.rolled_back);
        assert!(sink.committed.is_empty());
    }

    #[tokio::test]
    async fn test_run_file_missing_dump() {
        let mut sink = FakeSink::default();
        let err = migrator()
            .run_file("/nonexistent/script.sql", &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::DumpNotFound(_)));
    }

    #[test]
    fn test_summary_json() {
        let summary = ImportSummary::new("Amendments");
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"rows_imported\": 0"));
    }
}

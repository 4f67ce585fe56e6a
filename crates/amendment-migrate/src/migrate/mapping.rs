//! Positional dump columns to import record fields.
//!
//! Legacy dumps carry no column names we can rely on, so rows are mapped by
//! position. The layout lives in a [`ColumnMap`] (configurable in YAML)
//! rather than in code, so a dump with a different column order is a config
//! change.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{
    AmendmentStatus, AmendmentType, DevelopmentStatus, FieldValue, ImportRecord, Priority,
};
use crate::dump::{normalize, normalize_date, normalize_flag};
use crate::error::{MigrateError, Result};

pub const DEFAULT_DESCRIPTION: &str = "No description";

/// A record field that a dump column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportField {
    AmendmentType,
    Description,
    AmendmentStatus,
    DevelopmentStatus,
    Priority,
    Force,
    Application,
    Notes,
    ReportedBy,
    AssignedTo,
    DateReported,
    DatabaseChanges,
    DbUpgradeChanges,
    ReleaseNotes,
    CreatedBy,
}

impl ImportField {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportField::AmendmentType => "amendment_type",
            ImportField::Description => "description",
            ImportField::AmendmentStatus => "amendment_status",
            ImportField::DevelopmentStatus => "development_status",
            ImportField::Priority => "priority",
            ImportField::Force => "force",
            ImportField::Application => "application",
            ImportField::Notes => "notes",
            ImportField::ReportedBy => "reported_by",
            ImportField::AssignedTo => "assigned_to",
            ImportField::DateReported => "date_reported",
            ImportField::DatabaseChanges => "database_changes",
            ImportField::DbUpgradeChanges => "db_upgrade_changes",
            ImportField::ReleaseNotes => "release_notes",
            ImportField::CreatedBy => "created_by",
        }
    }
}

/// One column position feeding one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub index: usize,
    pub field: ImportField,
}

impl ColumnMapping {
    pub fn new(index: usize, field: ImportField) -> Self {
        Self { index, field }
    }
}

/// A required field that was absent in the dump and got its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultSubstitution {
    /// 1-based row number across the whole run.
    pub row: usize,
    pub field: ImportField,
    pub value: String,
}

/// The outcome of mapping one row.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub record: ImportRecord,
    pub created_by: String,
    pub substitutions: Vec<DefaultSubstitution>,
}

/// Ordered list of position-to-field mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap {
    entries: Vec<ColumnMapping>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::legacy()
    }
}

impl ColumnMap {
    pub fn new(entries: Vec<ColumnMapping>) -> Self {
        Self { entries }
    }

    /// Layout of the legacy `[dbo].[Amendments]` table.
    ///
    /// Position 0 is the legacy primary key and is not imported.
    pub fn legacy() -> Self {
        let fields = [
            ImportField::AmendmentType,
            ImportField::Description,
            ImportField::AmendmentStatus,
            ImportField::DevelopmentStatus,
            ImportField::Priority,
            ImportField::Force,
            ImportField::Application,
            ImportField::Notes,
            ImportField::ReportedBy,
            ImportField::AssignedTo,
            ImportField::DateReported,
            ImportField::DatabaseChanges,
            ImportField::DbUpgradeChanges,
            ImportField::ReleaseNotes,
            ImportField::CreatedBy,
        ];
        Self::new(
            fields
                .iter()
                .enumerate()
                .map(|(i, field)| ColumnMapping::new(i + 1, *field))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[ColumnMapping] {
        &self.entries
    }

    /// Position feeding `field`, if mapped.
    pub fn index_of(&self, field: ImportField) -> Option<usize> {
        self.entries
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.index)
    }

    /// Each field may be fed by at most one position.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for mapping in &self.entries {
            if !seen.insert(mapping.field) {
                return Err(MigrateError::Config(format!(
                    "column_map maps field '{}' more than once",
                    mapping.field.as_str()
                )));
            }
        }
        Ok(())
    }

    fn token<'r>(&self, row: &'r [String], field: ImportField) -> Option<&'r str> {
        self.index_of(field)
            .and_then(|i| row.get(i))
            .map(String::as_str)
    }

    fn text(&self, row: &[String], field: ImportField) -> Option<String> {
        self.token(row, field).map(normalize).and_then(FieldValue::into_text)
    }

    /// Map one tokenized row to an import record.
    ///
    /// Positions past the end of a short row read as absent. Absent required
    /// fields get their defaults and are reported as substitutions. An enum
    /// value outside its closed set fails the row.
    pub fn map_row(&self, row_number: usize, row: &[String], default_creator: &str) -> Result<MappedRow> {
        let mut substitutions = Vec::new();

        let mut required = |field: ImportField, default: &str| -> String {
            match self.text(row, field) {
                Some(v) => v,
                None => {
                    substitutions.push(DefaultSubstitution {
                        row: row_number,
                        field,
                        value: default.to_string(),
                    });
                    default.to_string()
                }
            }
        };

        let amendment_type = required(ImportField::AmendmentType, AmendmentType::Bug.as_str());
        let description = required(ImportField::Description, DEFAULT_DESCRIPTION);
        let amendment_status = required(ImportField::AmendmentStatus, AmendmentStatus::Open.as_str());
        let development_status = required(
            ImportField::DevelopmentStatus,
            DevelopmentStatus::NotStarted.as_str(),
        );
        let priority = required(ImportField::Priority, Priority::Medium.as_str());

        let record = ImportRecord {
            amendment_type: parse_enum(row_number, &amendment_type)?,
            description,
            amendment_status: parse_enum(row_number, &amendment_status)?,
            development_status: parse_enum(row_number, &development_status)?,
            priority: parse_enum(row_number, &priority)?,
            force: self.text(row, ImportField::Force),
            application: self.text(row, ImportField::Application),
            notes: self.text(row, ImportField::Notes),
            reported_by: self.text(row, ImportField::ReportedBy),
            assigned_to: self.text(row, ImportField::AssignedTo),
            date_reported: self
                .token(row, ImportField::DateReported)
                .and_then(|t| normalize_date(t).as_datetime()),
            database_changes: self
                .token(row, ImportField::DatabaseChanges)
                .is_some_and(|t| normalize_flag(t).as_flag()),
            db_upgrade_changes: self
                .token(row, ImportField::DbUpgradeChanges)
                .is_some_and(|t| normalize_flag(t).as_flag()),
            release_notes: self.text(row, ImportField::ReleaseNotes),
        };

        let created_by = self
            .text(row, ImportField::CreatedBy)
            .unwrap_or_else(|| default_creator.to_string());

        Ok(MappedRow {
            record,
            created_by,
            substitutions,
        })
    }
}

fn parse_enum<T>(row_number: usize, value: &str) -> Result<T>
where
    T: FromStr<Err = MigrateError>,
{
    value
        .parse()
        .map_err(|e: MigrateError| MigrateError::row(row_number, e.to_string()))
}

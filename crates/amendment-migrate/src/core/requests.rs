//! Request shapes accepted by the store.
//!
//! These mirror what an HTTP layer would deserialize: creation payloads with
//! defaults filled in, partial updates, and list filters.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::amendment::{AmendmentStatus, AmendmentType, DevelopmentStatus, LinkType, Priority};
use crate::error::{MigrateError, Result};

/// Largest page a filter may request.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Columns that `AmendmentFilter::sort_by` may name.
pub const SORTABLE_COLUMNS: &[&str] = &[
    "amendment_id",
    "amendment_reference",
    "amendment_type",
    "amendment_status",
    "development_status",
    "priority",
    "date_reported",
    "created_on",
    "modified_on",
];

/// Payload for creating an amendment.
///
/// The migration driver produces these too; see
/// [`ImportRecord`](crate::core::ImportRecord).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentCreate {
    pub amendment_type: AmendmentType,
    pub description: String,
    #[serde(default)]
    pub amendment_status: AmendmentStatus,
    #[serde(default)]
    pub development_status: DevelopmentStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub force: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub date_reported: Option<NaiveDateTime>,
    #[serde(default)]
    pub database_changes: bool,
    #[serde(default)]
    pub db_upgrade_changes: bool,
    #[serde(default)]
    pub release_notes: Option<String>,
}

impl AmendmentCreate {
    /// Create a payload with only the required fields; everything else defaults.
    pub fn new(amendment_type: AmendmentType, description: impl Into<String>) -> Self {
        Self {
            amendment_type,
            description: description.into(),
            amendment_status: AmendmentStatus::default(),
            development_status: DevelopmentStatus::default(),
            priority: Priority::default(),
            force: None,
            application: None,
            notes: None,
            reported_by: None,
            assigned_to: None,
            date_reported: None,
            database_changes: false,
            db_upgrade_changes: false,
            release_notes: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(MigrateError::Validation("description is required".into()));
        }
        Ok(())
    }
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmendmentUpdate {
    pub amendment_type: Option<AmendmentType>,
    pub description: Option<String>,
    pub amendment_status: Option<AmendmentStatus>,
    pub development_status: Option<DevelopmentStatus>,
    pub priority: Option<Priority>,
    pub force: Option<String>,
    pub application: Option<String>,
    pub notes: Option<String>,
    pub reported_by: Option<String>,
    pub assigned_to: Option<String>,
    pub date_reported: Option<NaiveDateTime>,
    pub database_changes: Option<bool>,
    pub db_upgrade_changes: Option<bool>,
    pub release_notes: Option<String>,
    pub qa_assigned_id: Option<i64>,
    pub qa_assigned_date: Option<NaiveDateTime>,
    pub qa_test_plan_check: Option<bool>,
    pub qa_test_release_notes_check: Option<bool>,
    pub qa_completed: Option<bool>,
    pub qa_signature: Option<String>,
    pub qa_completed_date: Option<NaiveDateTime>,
    pub qa_notes: Option<String>,
    pub qa_test_plan_link: Option<String>,
    pub modified_by: Option<String>,
}

impl AmendmentUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(desc) = &self.description {
            if desc.trim().is_empty() {
                return Err(MigrateError::Validation("description cannot be blank".into()));
            }
        }
        Ok(())
    }
}

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(MigrateError::Validation(format!(
                "sort_order must be 'asc' or 'desc', got '{}'",
                other
            ))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Search and paging options for listing amendments.
///
/// Empty vectors mean "no constraint" for that column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmendmentFilter {
    pub amendment_type: Vec<AmendmentType>,
    pub amendment_status: Vec<AmendmentStatus>,
    pub development_status: Vec<DevelopmentStatus>,
    pub priority: Vec<Priority>,
    pub assigned_to: Vec<String>,
    pub date_reported_from: Option<NaiveDateTime>,
    pub date_reported_to: Option<NaiveDateTime>,
    pub search_text: Option<String>,
    pub skip: i64,
    pub limit: i64,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl Default for AmendmentFilter {
    fn default() -> Self {
        Self {
            amendment_type: Vec::new(),
            amendment_status: Vec::new(),
            development_status: Vec::new(),
            priority: Vec::new(),
            assigned_to: Vec::new(),
            date_reported_from: None,
            date_reported_to: None,
            search_text: None,
            skip: 0,
            limit: 100,
            sort_by: "amendment_id".to_string(),
            sort_order: SortOrder::Asc,
        }
    }
}

impl AmendmentFilter {
    pub fn validate(&self) -> Result<()> {
        if self.skip < 0 {
            return Err(MigrateError::Validation("skip cannot be negative".into()));
        }
        if self.limit < 1 || self.limit > MAX_PAGE_SIZE {
            return Err(MigrateError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if !SORTABLE_COLUMNS.contains(&self.sort_by.as_str()) {
            return Err(MigrateError::Validation(format!(
                "cannot sort by '{}'",
                self.sort_by
            )));
        }
        if let (Some(from), Some(to)) = (self.date_reported_from, self.date_reported_to) {
            if from > to {
                return Err(MigrateError::Validation(
                    "date_reported_from is after date_reported_to".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentProgressCreate {
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl AmendmentProgressCreate {
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(MigrateError::Validation(
                "progress description is required".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentApplicationCreate {
    pub application_name: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl AmendmentApplicationCreate {
    pub fn validate(&self) -> Result<()> {
        if self.application_name.trim().is_empty() {
            return Err(MigrateError::Validation("application_name is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentLinkCreate {
    pub linked_amendment_id: i64,
    #[serde(default)]
    pub link_type: LinkType,
}

/// Apply one update to many amendments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateRequest {
    pub amendment_ids: Vec<i64>,
    pub updates: AmendmentUpdate,
}

impl BulkUpdateRequest {
    pub fn validate(&self) -> Result<()> {
        if self.amendment_ids.is_empty() {
            return Err(MigrateError::Validation(
                "amendment_ids must not be empty".into(),
            ));
        }
        self.updates.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_create_defaults() {
        let create = AmendmentCreate::new(AmendmentType::Feature, "Minimal amendment");
        assert_eq!(create.amendment_status, AmendmentStatus::Open);
        assert_eq!(create.development_status, DevelopmentStatus::NotStarted);
        assert_eq!(create.priority, Priority::Medium);
        assert!(!create.database_changes);
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_create_requires_description() {
        let create = AmendmentCreate::new(AmendmentType::Bug, "   ");
        assert!(create.validate().is_err());
    }

    #[test]
    fn test_create_deserialize_applies_defaults() {
        let create: AmendmentCreate =
            serde_json::from_str(r#"{"amendment_type":"Bug","description":"Crash on save"}"#)
                .unwrap();
        assert_eq!(create.priority, Priority::Medium);
        assert_eq!(create.amendment_status, AmendmentStatus::Open);
    }

    #[test]
    fn test_create_deserialize_missing_description_fails() {
        let result: std::result::Result<AmendmentCreate, _> =
            serde_json::from_str(r#"{"amendment_type":"Bug"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_is_partial() {
        let update = AmendmentUpdate {
            amendment_status: Some(AmendmentStatus::InProgress),
            assigned_to: Some("New Assignee".into()),
            modified_by: Some("admin".into()),
            ..Default::default()
        };
        assert!(update.description.is_none());
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_filter_defaults() {
        let filter = AmendmentFilter::default();
        assert_eq!(filter.skip, 0);
        assert_eq!(filter.limit, 100);
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn test_filter_complex_is_valid() {
        let filter = AmendmentFilter {
            amendment_status: vec![AmendmentStatus::Open, AmendmentStatus::InProgress],
            priority: vec![Priority::High, Priority::Critical],
            assigned_to: vec!["John Doe".into(), "Jane Smith".into()],
            date_reported_from: NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            date_reported_to: NaiveDate::from_ymd_opt(2024, 12, 31)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
            search_text: Some("bug fix".into()),
            limit: 50,
            sort_by: "priority".into(),
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        assert!(filter.validate().is_ok());
        assert_eq!(filter.amendment_status.len(), 2);
    }

    #[test]
    fn test_filter_rejects_bad_paging_and_sort() {
        let mut filter = AmendmentFilter::default();
        filter.limit = 0;
        assert!(filter.validate().is_err());

        let mut filter = AmendmentFilter::default();
        filter.sort_by = "description; DROP TABLE amendments".into();
        assert!(filter.validate().is_err());
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("DESC").unwrap(), SortOrder::Desc);
        assert!(SortOrder::parse("invalid").is_err());
        let result: std::result::Result<AmendmentFilter, _> =
            serde_json::from_str(r#"{"sort_order":"invalid"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_link_create_default_type() {
        let link: AmendmentLinkCreate =
            serde_json::from_str(r#"{"linked_amendment_id":42}"#).unwrap();
        assert_eq!(link.link_type, LinkType::Related);
    }

    #[test]
    fn test_bulk_update_validation() {
        let bulk = BulkUpdateRequest {
            amendment_ids: vec![1, 2, 3, 4, 5],
            updates: AmendmentUpdate {
                amendment_status: Some(AmendmentStatus::Completed),
                modified_by: Some("admin".into()),
                ..Default::default()
            },
        };
        assert!(bulk.validate().is_ok());

        let empty = BulkUpdateRequest {
            amendment_ids: vec![],
            updates: AmendmentUpdate::default(),
        };
        assert!(empty.validate().is_err());
    }
}

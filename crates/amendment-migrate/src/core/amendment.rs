//! Amendment entities and the closed enumerations they are tracked by.
//!
//! Enumerations are persisted as their display strings (`"In Progress"`,
//! `"Ready for QA"`, ...) so that the database stays readable and matches
//! the values found in legacy dumps.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

macro_rules! display_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored/display form.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = MigrateError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        MigrateError::Validation(format!("unknown {} '{}'", $label, s))
                    })
            }
        }
    };
}

display_enum! {
    /// Kind of change an amendment requests.
    AmendmentType, "amendment type" {
        Bug => "Bug",
        Enhancement => "Enhancement",
        Feature => "Feature",
        Maintenance => "Maintenance",
        Documentation => "Documentation",
    }
}

display_enum! {
    /// Lifecycle status of an amendment.
    AmendmentStatus, "amendment status" {
        Open => "Open",
        InProgress => "In Progress",
        Testing => "Testing",
        Completed => "Completed",
        Deployed => "Deployed",
    }
}

display_enum! {
    /// Development progress, tracked separately from the lifecycle status.
    DevelopmentStatus, "development status" {
        NotStarted => "Not Started",
        InDevelopment => "In Development",
        CodeReview => "Code Review",
        ReadyForQa => "Ready for QA",
    }
}

display_enum! {
    Priority, "priority" {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
}

display_enum! {
    /// Relationship between two amendments.
    LinkType, "link type" {
        Related => "Related",
        Duplicate => "Duplicate",
        Blocks => "Blocks",
        BlockedBy => "Blocked By",
    }
}

impl Default for AmendmentStatus {
    fn default() -> Self {
        AmendmentStatus::Open
    }
}

impl Default for DevelopmentStatus {
    fn default() -> Self {
        DevelopmentStatus::NotStarted
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::Related
    }
}

/// A tracked change request as stored in `amendments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amendment {
    pub amendment_id: i64,
    pub amendment_reference: String,

    pub amendment_type: AmendmentType,
    pub description: String,
    pub amendment_status: AmendmentStatus,
    pub development_status: DevelopmentStatus,
    pub priority: Priority,
    pub force: Option<String>,
    pub application: Option<String>,
    pub notes: Option<String>,

    pub reported_by: Option<String>,
    pub assigned_to: Option<String>,
    pub date_reported: Option<NaiveDateTime>,

    pub database_changes: bool,
    pub db_upgrade_changes: bool,
    pub release_notes: Option<String>,

    pub qa_assigned_id: Option<i64>,
    pub qa_assigned_date: Option<NaiveDateTime>,
    pub qa_test_plan_check: bool,
    pub qa_test_release_notes_check: bool,
    pub qa_completed: bool,
    pub qa_signature: Option<String>,
    pub qa_completed_date: Option<NaiveDateTime>,
    pub qa_notes: Option<String>,
    pub qa_test_plan_link: Option<String>,

    pub created_by: Option<String>,
    pub created_on: NaiveDateTime,
    pub modified_by: Option<String>,
    pub modified_on: NaiveDateTime,
}

/// A dated progress note on an amendment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentProgress {
    pub amendment_progress_id: i64,
    pub amendment_id: i64,
    pub start_date: Option<NaiveDateTime>,
    pub description: String,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_on: NaiveDateTime,
    pub modified_by: Option<String>,
    pub modified_on: NaiveDateTime,
}

/// An application (and optionally version) affected by an amendment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentApplication {
    pub id: i64,
    pub amendment_id: i64,
    pub application_name: String,
    pub version: Option<String>,
}

/// A directed link from one amendment to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentLink {
    pub amendment_link_id: i64,
    pub amendment_id: i64,
    pub linked_amendment_id: i64,
    pub link_type: LinkType,
}

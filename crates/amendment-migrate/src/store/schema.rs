//! DDL for the amendment tracking tables.

use crate::core::{AmendmentStatus, AmendmentType, DevelopmentStatus, LinkType, Priority};

/// Tables in creation order; dropped in reverse.
pub const TABLES: &[&str] = &[
    "amendments",
    "amendment_progress",
    "amendment_applications",
    "amendment_links",
];

/// `CHECK (column IN (...))` over an enum's stored strings.
fn check_in(column: &str, values: impl IntoIterator<Item = &'static str>) -> String {
    let quoted: Vec<String> = values
        .into_iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect();
    format!("CHECK ({} IN ({}))", column, quoted.join(", "))
}

/// Statements that create every table and index. Each is idempotent.
pub fn create_statements() -> Vec<String> {
    let amendments = format!(
        "CREATE TABLE IF NOT EXISTS amendments (
            amendment_id INTEGER PRIMARY KEY AUTOINCREMENT,
            amendment_reference TEXT NOT NULL UNIQUE,
            amendment_type TEXT NOT NULL {type_check},
            description TEXT NOT NULL CHECK (length(trim(description)) > 0),
            amendment_status TEXT NOT NULL DEFAULT 'Open' {status_check},
            development_status TEXT NOT NULL DEFAULT 'Not Started' {dev_check},
            priority TEXT NOT NULL DEFAULT 'Medium' {priority_check},
            force TEXT,
            application TEXT,
            notes TEXT,
            reported_by TEXT,
            assigned_to TEXT,
            date_reported TEXT,
            database_changes INTEGER NOT NULL DEFAULT 0,
            db_upgrade_changes INTEGER NOT NULL DEFAULT 0,
            release_notes TEXT,
            qa_assigned_id INTEGER,
            qa_assigned_date TEXT,
            qa_test_plan_check INTEGER NOT NULL DEFAULT 0,
            qa_test_release_notes_check INTEGER NOT NULL DEFAULT 0,
            qa_completed INTEGER NOT NULL DEFAULT 0,
            qa_signature TEXT,
            qa_completed_date TEXT,
            qa_notes TEXT,
            qa_test_plan_link TEXT,
            created_by TEXT,
            created_on TEXT NOT NULL,
            modified_by TEXT,
            modified_on TEXT NOT NULL
        )",
        type_check = check_in("amendment_type", AmendmentType::ALL.iter().map(|v| v.as_str())),
        status_check = check_in(
            "amendment_status",
            AmendmentStatus::ALL.iter().map(|v| v.as_str())
        ),
        dev_check = check_in(
            "development_status",
            DevelopmentStatus::ALL.iter().map(|v| v.as_str())
        ),
        priority_check = check_in("priority", Priority::ALL.iter().map(|v| v.as_str())),
    );

    let progress = "CREATE TABLE IF NOT EXISTS amendment_progress (
            amendment_progress_id INTEGER PRIMARY KEY AUTOINCREMENT,
            amendment_id INTEGER NOT NULL REFERENCES amendments(amendment_id) ON DELETE CASCADE,
            start_date TEXT,
            description TEXT NOT NULL,
            notes TEXT,
            created_by TEXT,
            created_on TEXT NOT NULL,
            modified_by TEXT,
            modified_on TEXT NOT NULL
        )"
    .to_string();

    let applications = "CREATE TABLE IF NOT EXISTS amendment_applications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amendment_id INTEGER NOT NULL REFERENCES amendments(amendment_id) ON DELETE CASCADE,
            application_name TEXT NOT NULL,
            version TEXT
        )"
    .to_string();

    let links = format!(
        "CREATE TABLE IF NOT EXISTS amendment_links (
            amendment_link_id INTEGER PRIMARY KEY AUTOINCREMENT,
            amendment_id INTEGER NOT NULL REFERENCES amendments(amendment_id) ON DELETE CASCADE,
            linked_amendment_id INTEGER NOT NULL REFERENCES amendments(amendment_id) ON DELETE CASCADE,
            link_type TEXT NOT NULL DEFAULT 'Related' {link_check}
        )",
        link_check = check_in("link_type", LinkType::ALL.iter().map(|v| v.as_str())),
    );

    let mut statements = vec![amendments, progress, applications, links];
    statements.extend(
        [
            "CREATE INDEX IF NOT EXISTS idx_amendments_status ON amendments(amendment_status)",
            "CREATE INDEX IF NOT EXISTS idx_amendments_priority ON amendments(priority)",
            "CREATE INDEX IF NOT EXISTS idx_amendments_assigned_to ON amendments(assigned_to)",
            "CREATE INDEX IF NOT EXISTS idx_amendments_date_reported ON amendments(date_reported)",
            "CREATE INDEX IF NOT EXISTS idx_progress_amendment ON amendment_progress(amendment_id)",
            "CREATE INDEX IF NOT EXISTS idx_applications_amendment ON amendment_applications(amendment_id)",
            "CREATE INDEX IF NOT EXISTS idx_links_amendment ON amendment_links(amendment_id)",
        ]
        .into_iter()
        .map(String::from),
    );
    statements
}

/// Statements that drop every table, children first.
pub fn drop_statements() -> Vec<String> {
    TABLES
        .iter()
        .rev()
        .map(|t| format!("DROP TABLE IF EXISTS {}", t))
        .collect()
}

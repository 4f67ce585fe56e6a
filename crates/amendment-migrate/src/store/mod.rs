//! SQLite-backed amendment store.
//!
//! Holds the four tracking tables (amendments plus their progress entries,
//! affected applications and links) and is the destination of the legacy
//! import via [`SqliteSink`].

mod schema;
mod sink;

pub use sink::SqliteSink;

use std::str::FromStr;
use std::time::Instant;

use chrono::{Datelike, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Encode, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool, Type};
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::core::{
    Amendment, AmendmentApplication, AmendmentApplicationCreate, AmendmentCreate, AmendmentFilter,
    AmendmentLink, AmendmentLinkCreate, AmendmentProgress, AmendmentProgressCreate,
    AmendmentUpdate, BulkUpdateRequest, Priority,
};
use crate::error::{MigrateError, Result};

const MAX_FILE_CONNECTIONS: u32 = 5;

/// Result of a store health check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub database_connected: bool,
    pub database_latency_ms: u64,
    pub database_error: Option<String>,
    /// `None` when the schema has not been created yet.
    pub amendment_count: Option<i64>,
}

/// Amendment store over a SQLite pool.
#[derive(Clone)]
pub struct AmendmentStore {
    pool: SqlitePool,
    target: TargetConfig,
}

impl AmendmentStore {
    /// Open the database named by `target.database_url`, creating the file if needed.
    ///
    /// An in-memory database lives as long as its single pooled connection,
    /// so that connection is never recycled.
    pub async fn connect(target: &TargetConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&target.database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if target.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_FILE_CONNECTIONS)
        };

        let pool = pool_options.connect_with(options).await?;
        info!("Connected to {}", target.database_url);

        Ok(Self {
            pool,
            target: target.clone(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// A record sink writing into this store.
    pub fn sink(&self) -> SqliteSink {
        SqliteSink::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create all tables and indexes that do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        for statement in schema::create_statements() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        info!("Database tables created");
        Ok(())
    }

    /// Drop every table. Refused in production.
    pub async fn drop_all_tables(&self) -> Result<()> {
        if self.target.is_production() {
            return Err(MigrateError::Config(
                "refusing to drop tables in production".into(),
            ));
        }
        for statement in schema::drop_statements() {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        warn!("Database tables dropped");
        Ok(())
    }

    /// Drop and recreate every table.
    pub async fn reset(&self) -> Result<()> {
        self.drop_all_tables().await?;
        self.init_schema().await
    }

    pub async fn check_connection(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Database connection check failed: {}", e);
                false
            }
        }
    }

    pub async fn health(&self) -> HealthCheckResult {
        let started = Instant::now();
        let ping = sqlx::query("SELECT 1").execute(&self.pool).await;
        let latency = started.elapsed().as_millis() as u64;

        match ping {
            Ok(_) => {
                let amendment_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM amendments")
                    .fetch_one(&self.pool)
                    .await
                    .ok();
                HealthCheckResult {
                    healthy: true,
                    database_connected: true,
                    database_latency_ms: latency,
                    database_error: None,
                    amendment_count,
                }
            }
            Err(e) => HealthCheckResult {
                healthy: false,
                database_connected: false,
                database_latency_ms: latency,
                database_error: Some(e.to_string()),
                amendment_count: None,
            },
        }
    }

    // ===== Amendments =====

    pub async fn create_amendment(
        &self,
        amendment: &AmendmentCreate,
        created_by: &str,
    ) -> Result<Amendment> {
        let mut tx = self.pool.begin().await?;
        let id = insert_amendment(&mut tx, amendment, created_by).await?;
        tx.commit().await?;
        self.fetch_amendment(id).await
    }

    pub async fn get_amendment(&self, id: i64) -> Result<Option<Amendment>> {
        let row = sqlx::query("SELECT * FROM amendments WHERE amendment_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(amendment_from_row).transpose()
    }

    pub async fn get_amendment_by_reference(&self, reference: &str) -> Result<Option<Amendment>> {
        let row = sqlx::query("SELECT * FROM amendments WHERE amendment_reference = ?")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(amendment_from_row).transpose()
    }

    /// One page of amendments matching `filter`.
    pub async fn list_amendments(&self, filter: &AmendmentFilter) -> Result<Vec<Amendment>> {
        filter.validate()?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM amendments WHERE 1 = 1");
        push_filters(&mut qb, filter);

        let order = filter.sort_order.as_sql();
        qb.push(" ORDER BY ");
        if filter.sort_by == "priority" {
            qb.push(priority_rank_sql());
        } else {
            qb.push(&filter.sort_by);
        }
        qb.push(" ").push(order);
        if filter.sort_by != "amendment_id" {
            qb.push(", amendment_id ASC");
        }
        qb.push(" LIMIT ").push_bind(filter.limit);
        qb.push(" OFFSET ").push_bind(filter.skip);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(amendment_from_row).collect()
    }

    /// Number of amendments matching `filter`, ignoring paging.
    pub async fn count_amendments(&self, filter: &AmendmentFilter) -> Result<i64> {
        filter.validate()?;
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM amendments WHERE 1 = 1");
        push_filters(&mut qb, filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Apply the `Some` fields of `update` and bump `modified_on`.
    pub async fn update_amendment(&self, id: i64, update: &AmendmentUpdate) -> Result<Amendment> {
        update.validate()?;
        let mut qb = build_update(id, update, now());
        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(MigrateError::not_found("amendment", id));
        }
        self.fetch_amendment(id).await
    }

    /// Apply one update to many amendments in a single transaction.
    ///
    /// Returns how many rows changed; unknown ids are ignored.
    pub async fn bulk_update(&self, request: &BulkUpdateRequest) -> Result<u64> {
        request.validate()?;
        let modified_on = now();
        let mut updated = 0;

        let mut tx = self.pool.begin().await?;
        for &id in &request.amendment_ids {
            let mut qb = build_update(id, &request.updates, modified_on);
            updated += qb.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        debug!(
            "Bulk update changed {} of {} amendments",
            updated,
            request.amendment_ids.len()
        );
        Ok(updated)
    }

    /// Delete an amendment together with its progress, applications and links.
    pub async fn delete_amendment(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM amendments WHERE amendment_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MigrateError::not_found("amendment", id));
        }
        Ok(())
    }

    // ===== Progress =====

    pub async fn add_progress(
        &self,
        amendment_id: i64,
        progress: &AmendmentProgressCreate,
    ) -> Result<AmendmentProgress> {
        progress.validate()?;
        self.ensure_exists(amendment_id).await?;

        let now = now();
        let result = sqlx::query(
            "INSERT INTO amendment_progress
             (amendment_id, start_date, description, notes, created_by, created_on, modified_on)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(amendment_id)
        .bind(progress.start_date)
        .bind(progress.description.as_str())
        .bind(progress.notes.as_deref())
        .bind(progress.created_by.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM amendment_progress WHERE amendment_progress_id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await?;
        progress_from_row(&row)
    }

    pub async fn list_progress(&self, amendment_id: i64) -> Result<Vec<AmendmentProgress>> {
        self.ensure_exists(amendment_id).await?;
        let rows = sqlx::query(
            "SELECT * FROM amendment_progress WHERE amendment_id = ?
             ORDER BY amendment_progress_id",
        )
        .bind(amendment_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(progress_from_row).collect()
    }

    // ===== Applications =====

    pub async fn add_application(
        &self,
        amendment_id: i64,
        application: &AmendmentApplicationCreate,
    ) -> Result<AmendmentApplication> {
        application.validate()?;
        self.ensure_exists(amendment_id).await?;

        let result = sqlx::query(
            "INSERT INTO amendment_applications (amendment_id, application_name, version)
             VALUES (?, ?, ?)",
        )
        .bind(amendment_id)
        .bind(application.application_name.as_str())
        .bind(application.version.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(AmendmentApplication {
            id: result.last_insert_rowid(),
            amendment_id,
            application_name: application.application_name.clone(),
            version: application.version.clone(),
        })
    }

    pub async fn list_applications(&self, amendment_id: i64) -> Result<Vec<AmendmentApplication>> {
        self.ensure_exists(amendment_id).await?;
        let rows = sqlx::query("SELECT * FROM amendment_applications WHERE amendment_id = ? ORDER BY id")
            .bind(amendment_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(AmendmentApplication {
                    id: row.try_get("id")?,
                    amendment_id: row.try_get("amendment_id")?,
                    application_name: row.try_get("application_name")?,
                    version: row.try_get("version")?,
                })
            })
            .collect()
    }

    // ===== Links =====

    /// Link two amendments. Both must exist.
    pub async fn add_link(&self, amendment_id: i64, link: &AmendmentLinkCreate) -> Result<AmendmentLink> {
        self.ensure_exists(amendment_id).await?;
        self.ensure_exists(link.linked_amendment_id).await?;

        let result = sqlx::query(
            "INSERT INTO amendment_links (amendment_id, linked_amendment_id, link_type)
             VALUES (?, ?, ?)",
        )
        .bind(amendment_id)
        .bind(link.linked_amendment_id)
        .bind(link.link_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(AmendmentLink {
            amendment_link_id: result.last_insert_rowid(),
            amendment_id,
            linked_amendment_id: link.linked_amendment_id,
            link_type: link.link_type,
        })
    }

    pub async fn list_links(&self, amendment_id: i64) -> Result<Vec<AmendmentLink>> {
        self.ensure_exists(amendment_id).await?;
        let rows = sqlx::query(
            "SELECT * FROM amendment_links WHERE amendment_id = ? ORDER BY amendment_link_id",
        )
        .bind(amendment_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(AmendmentLink {
                    amendment_link_id: row.try_get("amendment_link_id")?,
                    amendment_id: row.try_get("amendment_id")?,
                    linked_amendment_id: row.try_get("linked_amendment_id")?,
                    link_type: row.try_get::<String, _>("link_type")?.parse()?,
                })
            })
            .collect()
    }

    async fn fetch_amendment(&self, id: i64) -> Result<Amendment> {
        self.get_amendment(id)
            .await?
            .ok_or_else(|| MigrateError::not_found("amendment", id))
    }

    async fn ensure_exists(&self, id: i64) -> Result<()> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT amendment_id FROM amendments WHERE amendment_id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        found
            .map(|_| ())
            .ok_or_else(|| MigrateError::not_found("amendment", id))
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Insert one amendment on `conn`, assigning the next reference for its year.
///
/// Shared by the store and the import sink so both produce identical rows.
pub(crate) async fn insert_amendment(
    conn: &mut SqliteConnection,
    amendment: &AmendmentCreate,
    created_by: &str,
) -> Result<i64> {
    amendment.validate()?;
    let reference = next_reference(conn, amendment.date_reported).await?;
    let now = now();

    let result = sqlx::query(
        "INSERT INTO amendments
         (amendment_reference, amendment_type, description, amendment_status,
          development_status, priority, force, application, notes, reported_by,
          assigned_to, date_reported, database_changes, db_upgrade_changes,
          release_notes, created_by, created_on, modified_on)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(reference.as_str())
    .bind(amendment.amendment_type.as_str())
    .bind(amendment.description.as_str())
    .bind(amendment.amendment_status.as_str())
    .bind(amendment.development_status.as_str())
    .bind(amendment.priority.as_str())
    .bind(amendment.force.as_deref())
    .bind(amendment.application.as_deref())
    .bind(amendment.notes.as_deref())
    .bind(amendment.reported_by.as_deref())
    .bind(amendment.assigned_to.as_deref())
    .bind(amendment.date_reported)
    .bind(amendment.database_changes)
    .bind(amendment.db_upgrade_changes)
    .bind(amendment.release_notes.as_deref())
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!("Created amendment {}", reference);
    Ok(result.last_insert_rowid())
}

/// Next `AMN-<year>-<seq>` reference, the sequence restarting each year.
async fn next_reference(
    conn: &mut SqliteConnection,
    date_reported: Option<NaiveDateTime>,
) -> Result<String> {
    let year = date_reported.map_or_else(|| Utc::now().year(), |d| d.year());
    let prefix = format!("AMN-{}-", year);

    let last: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(CAST(SUBSTR(amendment_reference, ?) AS INTEGER)), 0)
         FROM amendments WHERE amendment_reference LIKE ?",
    )
    .bind(prefix.len() as i64 + 1)
    .bind(format!("{}%", prefix))
    .fetch_one(&mut *conn)
    .await?;

    Ok(format!("{}{:03}", prefix, last + 1))
}

/// `CASE` expression ranking priorities from Low upwards.
fn priority_rank_sql() -> String {
    let arms: Vec<String> = Priority::ALL
        .iter()
        .enumerate()
        .map(|(rank, p)| format!("WHEN '{}' THEN {}", p.as_str(), rank))
        .collect();
    format!("CASE priority {} END", arms.join(" "))
}

fn push_in(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, values: Vec<String>) {
    if values.is_empty() {
        return;
    }
    qb.push(" AND ").push(column).push(" IN (");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AmendmentFilter) {
    push_in(
        qb,
        "amendment_type",
        filter.amendment_type.iter().map(|v| v.to_string()).collect(),
    );
    push_in(
        qb,
        "amendment_status",
        filter.amendment_status.iter().map(|v| v.to_string()).collect(),
    );
    push_in(
        qb,
        "development_status",
        filter.development_status.iter().map(|v| v.to_string()).collect(),
    );
    push_in(
        qb,
        "priority",
        filter.priority.iter().map(|v| v.to_string()).collect(),
    );
    push_in(qb, "assigned_to", filter.assigned_to.clone());

    if let Some(from) = filter.date_reported_from {
        qb.push(" AND date_reported >= ").push_bind(from);
    }
    if let Some(to) = filter.date_reported_to {
        qb.push(" AND date_reported <= ").push_bind(to);
    }

    let search = filter
        .search_text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(text) = search {
        let pattern = format!("%{}%", text);
        qb.push(" AND (description LIKE ")
            .push_bind(pattern.clone())
            .push(" OR notes LIKE ")
            .push_bind(pattern.clone())
            .push(" OR amendment_reference LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_set<'a, T>(qb: &mut QueryBuilder<'a, Sqlite>, column: &str, value: Option<T>)
where
    T: 'a + Encode<'a, Sqlite> + Type<Sqlite>,
{
    if let Some(value) = value {
        qb.push(", ").push(column).push(" = ").push_bind(value);
    }
}

fn build_update<'a>(
    id: i64,
    update: &AmendmentUpdate,
    modified_on: NaiveDateTime,
) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new("UPDATE amendments SET modified_on = ");
    qb.push_bind(modified_on);

    push_set(&mut qb, "amendment_type", update.amendment_type.map(|v| v.to_string()));
    push_set(&mut qb, "description", update.description.clone());
    push_set(&mut qb, "amendment_status", update.amendment_status.map(|v| v.to_string()));
    push_set(
        &mut qb,
        "development_status",
        update.development_status.map(|v| v.to_string()),
    );
    push_set(&mut qb, "priority", update.priority.map(|v| v.to_string()));
    push_set(&mut qb, "force", update.force.clone());
    push_set(&mut qb, "application", update.application.clone());
    push_set(&mut qb, "notes", update.notes.clone());
    push_set(&mut qb, "reported_by", update.reported_by.clone());
    push_set(&mut qb, "assigned_to", update.assigned_to.clone());
    push_set(&mut qb, "date_reported", update.date_reported);
    push_set(&mut qb, "database_changes", update.database_changes);
    push_set(&mut qb, "db_upgrade_changes", update.db_upgrade_changes);
    push_set(&mut qb, "release_notes", update.release_notes.clone());
    push_set(&mut qb, "qa_assigned_id", update.qa_assigned_id);
    push_set(&mut qb, "qa_assigned_date", update.qa_assigned_date);
    push_set(&mut qb, "qa_test_plan_check", update.qa_test_plan_check);
    push_set(
        &mut qb,
        "qa_test_release_notes_check",
        update.qa_test_release_notes_check,
    );
    push_set(&mut qb, "qa_completed", update.qa_completed);
    push_set(&mut qb, "qa_signature", update.qa_signature.clone());
    push_set(&mut qb, "qa_completed_date", update.qa_completed_date);
    push_set(&mut qb, "qa_notes", update.qa_notes.clone());
    push_set(&mut qb, "qa_test_plan_link", update.qa_test_plan_link.clone());
    push_set(&mut qb, "modified_by", update.modified_by.clone());

    qb.push(" WHERE amendment_id = ").push_bind(id);
    qb
}

fn amendment_from_row(row: &SqliteRow) -> Result<Amendment> {
    Ok(Amendment {
        amendment_id: row.try_get("amendment_id")?,
        amendment_reference: row.try_get("amendment_reference")?,
        amendment_type: row.try_get::<String, _>("amendment_type")?.parse()?,
        description: row.try_get("description")?,
        amendment_status: row.try_get::<String, _>("amendment_status")?.parse()?,
        development_status: row.try_get::<String, _>("development_status")?.parse()?,
        priority: row.try_get::<String, _>("priority")?.parse()?,
        force: row.try_get("force")?,
        application: row.try_get("application")?,
        notes: row.try_get("notes")?,
        reported_by: row.try_get("reported_by")?,
        assigned_to: row.try_get("assigned_to")?,
        date_reported: row.try_get("date_reported")?,
        database_changes: row.try_get("database_changes")?,
        db_upgrade_changes: row.try_get("db_upgrade_changes")?,
        release_notes: row.try_get("release_notes")?,
        qa_assigned_id: row.try_get("qa_assigned_id")?,
        qa_assigned_date: row.try_get("qa_assigned_date")?,
        qa_test_plan_check: row.try_get("qa_test_plan_check")?,
        qa_test_release_notes_check: row.try_get("qa_test_release_notes_check")?,
        qa_completed: row.try_get("qa_completed")?,
        qa_signature: row.try_get("qa_signature")?,
        qa_completed_date: row.try_get("qa_completed_date")?,
        qa_notes: row.try_get("qa_notes")?,
        qa_test_plan_link: row.try_get("qa_test_plan_link")?,
        created_by: row.try_get("created_by")?,
        created_on: row.try_get("created_on")?,
        modified_by: row.try_get("modified_by")?,
        modified_on: row.try_get("modified_on")?,
    })
}

fn progress_from_row(row: &SqliteRow) -> Result<AmendmentProgress> {
    Ok(AmendmentProgress {
        amendment_progress_id: row.try_get("amendment_progress_id")?,
        amendment_id: row.try_get("amendment_id")?,
        start_date: row.try_get("start_date")?,
        description: row.try_get("description")?,
        notes: row.try_get("notes")?,
        created_by: row.try_get("created_by")?,
        created_on: row.try_get("created_on")?,
        modified_by: row.try_get("modified_by")?,
        modified_on: row.try_get("modified_on")?,
    })
}

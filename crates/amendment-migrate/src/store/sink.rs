//! [`RecordSink`] over one SQLite transaction.

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use super::insert_amendment;
use crate::core::{ImportRecord, RecordSink};
use crate::error::{MigrateError, Result};

/// Import batch writer.
///
/// `begin` opens a transaction. Every record is written inside its own
/// savepoint so a rejected row is undone alone and the batch stays usable.
pub struct SqliteSink {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, tx: None }
    }

    /// Whether a batch is open.
    pub fn in_batch(&self) -> bool {
        self.tx.is_some()
    }
}

#[async_trait]
impl RecordSink for SqliteSink {
    async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(MigrateError::Validation("import batch already open".into()));
        }
        self.tx = Some(self.pool.begin().await?);
        debug!("Import batch opened");
        Ok(())
    }

    async fn create_amendment(&mut self, record: &ImportRecord, created_by: &str) -> Result<i64> {
        let tx = self.tx.as_mut().ok_or_else(|| {
            MigrateError::Validation("no open import batch; call begin() first".into())
        })?;

        sqlx::query("SAVEPOINT import_row").execute(&mut **tx).await?;
        match insert_amendment(&mut **tx, record, created_by).await {
            Ok(id) => {
                sqlx::query("RELEASE SAVEPOINT import_row")
                    .execute(&mut **tx)
                    .await?;
                Ok(id)
            }
            Err(e) => {
                sqlx::query("ROLLBACK TO SAVEPOINT import_row")
                    .execute(&mut **tx)
                    .await?;
                sqlx::query("RELEASE SAVEPOINT import_row")
                    .execute(&mut **tx)
                    .await?;
                Err(e)
            }
        }
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| MigrateError::Commit("no open import batch".into()))?;
        tx.commit().await?;
        debug!("Import batch committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            debug!("Import batch rolled back");
        }
        Ok(())
    }
}

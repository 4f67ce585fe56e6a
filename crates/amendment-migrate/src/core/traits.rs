//! The persistence seam between the importer and the store.
//!
//! [`RecordSink`] is the only thing the migration driver knows about the
//! destination. It separates two failure domains:
//!
//! - **Row level**: `create_amendment` may reject a single record. The driver
//!   counts it as skipped and carries on; the sink must leave the batch usable.
//! - **Batch level**: `commit` either persists every accepted record or none.
//!   On failure the driver calls `rollback` and the run fails.

use async_trait::async_trait;

use super::requests::AmendmentCreate;
use crate::error::Result;

/// A mapped dump row, ready to be written.
pub type ImportRecord = AmendmentCreate;

/// Transactional destination for imported amendments.
#[async_trait]
pub trait RecordSink: Send {
    /// Open the batch transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Create one amendment inside the open batch.
    ///
    /// Returns the new `amendment_id`. An error here must not poison the
    /// batch: later calls and the final `commit` still work.
    async fn create_amendment(&mut self, record: &ImportRecord, created_by: &str) -> Result<i64>;

    /// Persist the batch.
    async fn commit(&mut self) -> Result<()>;

    /// Discard the batch. Calling this with no open batch is a no-op.
    async fn rollback(&mut self) -> Result<()>;
}

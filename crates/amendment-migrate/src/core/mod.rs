//! Domain types shared by the store and the importer.
//!
//! - [`amendment`]: entities and their closed enumerations
//! - [`requests`]: create/update/filter payloads accepted by the store
//! - [`value`]: normalized dump field values
//! - [`traits`]: the [`RecordSink`] persistence seam

pub mod amendment;
pub mod requests;
pub mod traits;
pub mod value;

pub use amendment::{
    Amendment, AmendmentApplication, AmendmentLink, AmendmentProgress, AmendmentStatus,
    AmendmentType, DevelopmentStatus, LinkType, Priority,
};
pub use requests::{
    AmendmentApplicationCreate, AmendmentCreate, AmendmentFilter, AmendmentLinkCreate,
    AmendmentProgressCreate, AmendmentUpdate, BulkUpdateRequest, SortOrder,
};
pub use traits::{ImportRecord, RecordSink};
pub use value::FieldValue;

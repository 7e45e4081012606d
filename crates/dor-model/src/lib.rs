//! Digital object data model for the dor repository core.
//!
//! A [`DigitalObject`] aggregates identity, lifecycle state, an
//! insertion-ordered map of named [`Datastream`] version lists, an
//! append-only audit trail, and a lazily derived relationship graph read
//! from the two reserved relationship datastreams.
//!
//! Content custody is expressed as a tagged union ([`ContentLocation`]):
//! inline XML held in the object itself, managed content addressed by an
//! internal location key, and externally referenced or redirected content
//! fetched live by URL. The custody mode ("control group") is fixed per
//! datastream ID for its lifetime.
//!
//! Nothing in this crate performs I/O directly; content is resolved through
//! the collaborator interfaces in `dor-store`.

pub mod audit;
pub mod canonical;
pub mod datastream;
pub mod error;
pub mod object;
pub mod relationships;

pub use audit::AuditRecord;
pub use datastream::{ContentLocation, ControlGroup, Datastream};
pub use error::{ModelError, ModelResult};
pub use object::DigitalObject;
pub use relationships::{
    AUDIT_ID, BASELINE_CONTENT_MODEL, HAS_MODEL_PREDICATE, RELS_EXT_ID, RELS_INT_ID,
};

//! Foundation types for the dor digital-object repository core.
//!
//! This crate provides the identity, state, and wire-format types used
//! throughout the dor system. Every other dor crate depends on `dor-types`.
//!
//! # Key Types
//!
//! - [`Pid`] — Persistent identifier of a digital object (namespace-qualified)
//! - [`ObjectState`] / [`DatastreamState`] — lifecycle state codes
//! - [`ChecksumType`] — the supported content-digest algorithm family
//! - [`RelationshipTuple`] — one edge of an object's relationship graph
//! - [`TranslationContext`] — why a serialization is happening
//! - [`FormatIdentity`] — (format URI, XML namespace, schema location) triple

pub mod checksum;
pub mod context;
pub mod date;
pub mod error;
pub mod format;
pub mod pid;
pub mod relationship;
pub mod state;

pub use checksum::ChecksumType;
pub use context::TranslationContext;
pub use error::TypeError;
pub use format::FormatIdentity;
pub use pid::Pid;
pub use relationship::RelationshipTuple;
pub use state::{DatastreamState, ObjectState};

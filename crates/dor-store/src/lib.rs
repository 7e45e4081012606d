//! Content collaborator interfaces for the dor repository core.
//!
//! The object model and codecs never perform raw I/O themselves; they
//! resolve datastream content through three injected collaborators:
//!
//! - [`ExternalContentFetcher`] — live retrieval of externally referenced
//!   and redirect content by URL
//! - [`ManagedContentStore`] — the repository's internal byte-addressed
//!   store, keyed by opaque location keys
//! - [`StagingArea`] — temporary pre-commit storage, so checksums can be
//!   computed and validated before an ingest transaction commits
//!
//! In-memory implementations are provided for tests and embedding.
//!
//! # Design Rules
//!
//! 1. Collaborators are object-safe traits taken by reference or `Arc`;
//!    there are no global handles.
//! 2. Fetching is synchronous and blocking; timeout and cancellation
//!    policy belongs to the implementations, not the callers.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryFetcher, MemoryManagedStore, MemoryStagingArea};
pub use traits::{ContentResolver, ExternalContentFetcher, FetchedContent, ManagedContentStore, StagingArea};

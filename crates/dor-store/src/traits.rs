use std::sync::Arc;

use crate::error::StoreResult;

/// Result of one external fetch: the bytes plus what the transport layer
/// learned about them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchedContent {
    pub bytes: Vec<u8>,
    /// MIME type reported by the source, if any.
    pub mime_type: Option<String>,
    /// Content length reported by the source, if any.
    pub length: Option<u64>,
}

impl FetchedContent {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: None,
            length: None,
        }
    }
}

/// Live retrieval of content by URL.
///
/// Used every time an externally referenced or redirect datastream is
/// resolved, and exactly once per managed datastream whose initial content
/// was supplied as a URL at ingest. The fetch is synchronous and blocking;
/// implementations own retry, timeout, and cancellation policy.
pub trait ExternalContentFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> StoreResult<FetchedContent>;
}

/// The repository's internal byte-addressed store.
///
/// Keys are opaque location strings of the form `pid+dsId+dsVersionId`;
/// the store never interprets them beyond lookup.
pub trait ManagedContentStore: Send + Sync {
    /// Read the content at a location key.
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if the
    /// key has no content.
    fn read(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Check whether a location key has content.
    fn exists(&self, key: &str) -> StoreResult<bool>;
}

/// Temporary pre-commit content storage.
///
/// Managed content deposited during an uncommitted ingest or modify
/// transaction lives here, so checksum computation and validation can run
/// before anything reaches the permanent store. Keys use the `staged://`
/// scheme to distinguish them from permanent location keys.
pub trait StagingArea: Send + Sync {
    /// Deposit bytes and return the staged location key.
    fn stage(&self, bytes: &[u8]) -> StoreResult<String>;

    /// Read back staged bytes by key.
    fn read(&self, key: &str) -> StoreResult<Vec<u8>>;
}

/// Key scheme prefix for staged content locations.
pub const STAGED_SCHEME: &str = "staged://";

/// The three collaborators bundled for injection.
///
/// Cloning is cheap (shared handles). A resolver is what the object model
/// and codecs take wherever content must be materialized.
#[derive(Clone)]
pub struct ContentResolver {
    pub fetcher: Arc<dyn ExternalContentFetcher>,
    pub store: Arc<dyn ManagedContentStore>,
    pub staging: Arc<dyn StagingArea>,
}

impl ContentResolver {
    pub fn new(
        fetcher: Arc<dyn ExternalContentFetcher>,
        store: Arc<dyn ManagedContentStore>,
        staging: Arc<dyn StagingArea>,
    ) -> Self {
        Self {
            fetcher,
            store,
            staging,
        }
    }
}

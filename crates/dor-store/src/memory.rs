use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    ContentResolver, ExternalContentFetcher, FetchedContent, ManagedContentStore, StagingArea,
    STAGED_SCHEME,
};

/// In-memory fetcher serving a fixed URL → content map.
///
/// Intended for tests. Unknown URLs fail with
/// [`StoreError::FetchFailed`].
#[derive(Default)]
pub struct MemoryFetcher {
    content: RwLock<HashMap<String, FetchedContent>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register content to be served for a URL.
    pub fn put(&self, url: &str, content: FetchedContent) {
        self.content
            .write()
            .expect("lock poisoned")
            .insert(url.to_string(), content);
    }
}

impl ExternalContentFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> StoreResult<FetchedContent> {
        let map = self.content.read().expect("lock poisoned");
        map.get(url).cloned().ok_or_else(|| StoreError::FetchFailed {
            url: url.to_string(),
            reason: "no content registered".to_string(),
        })
    }
}

/// In-memory, HashMap-based managed-content store.
///
/// Intended for tests and embedding. All content is held behind a `RwLock`
/// for safe concurrent access.
#[derive(Default)]
pub struct MemoryManagedStore {
    content: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryManagedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content under a location key.
    pub fn put(&self, key: &str, bytes: Vec<u8>) {
        self.content
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), bytes);
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.content.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.content.read().expect("lock poisoned").is_empty()
    }
}

impl ManagedContentStore for MemoryManagedStore {
    fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        let map = self.content.read().expect("lock poisoned");
        map.get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.content.read().expect("lock poisoned").contains_key(key))
    }
}

/// In-memory staging area with sequential `staged://` keys.
#[derive(Default)]
pub struct MemoryStagingArea {
    content: RwLock<HashMap<String, Vec<u8>>>,
    next: AtomicU64,
}

impl MemoryStagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged entries.
    pub fn len(&self) -> usize {
        self.content.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.content.read().expect("lock poisoned").is_empty()
    }
}

impl StagingArea for MemoryStagingArea {
    fn stage(&self, bytes: &[u8]) -> StoreResult<String> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let key = format!("{STAGED_SCHEME}{n}");
        self.content
            .write()
            .expect("lock poisoned")
            .insert(key.clone(), bytes.to_vec());
        Ok(key)
    }

    fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        let map = self.content.read().expect("lock poisoned");
        map.get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

/// A resolver wired to fresh in-memory collaborators, for tests.
pub fn memory_resolver() -> ContentResolver {
    ContentResolver::new(
        Arc::new(MemoryFetcher::new()),
        Arc::new(MemoryManagedStore::new()),
        Arc::new(MemoryStagingArea::new()),
    )
}

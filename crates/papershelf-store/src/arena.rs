//! In-session registry of decoded binaries.
//!
//! A [`BlobArena`] hands out string keys (locally-resolvable references)
//! for decoded PDF bytes. The component that created a key owns it and
//! must release it before discarding, or the backing memory lives for the
//! rest of the session.

use std::collections::HashMap;

/// Keyed in-memory blob registry with explicit release.
#[derive(Debug, Default)]
pub struct BlobArena {
    blobs: HashMap<String, Vec<u8>>,
    next: u64,
}

impl BlobArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return the key resolving to them.
    pub fn insert(&mut self, bytes: Vec<u8>) -> String {
        self.next += 1;
        let key = format!("blob-{}", self.next);
        self.blobs.insert(key.clone(), bytes);
        key
    }

    /// Resolve a key to its bytes.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.blobs.get(key).map(|b| b.as_slice())
    }

    /// Release one reference. Returns whether the key was live.
    pub fn release(&mut self, key: &str) -> bool {
        self.blobs.remove(key).is_some()
    }

    /// Release every reference.
    pub fn release_all(&mut self) {
        self.blobs.clear();
    }

    /// Number of live references.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Total bytes currently backing live references.
    pub fn resident_bytes(&self) -> usize {
        self.blobs.values().map(|b| b.len()).sum()
    }
}

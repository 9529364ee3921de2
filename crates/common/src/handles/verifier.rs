//! Cookie verifiers for paginated directory listings
//!
//! READDIR hands out a verifier with each page. When the client asks for the
//! next page it sends the verifier back, and the snapshot stored under it
//! tells the server which entries the cookie offsets refer to. Snapshots are
//! LRU-bounded; a missing one just means the client restarts the listing.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::backend::DirEntry;

/// Snapshot of one listing
#[derive(Debug, Clone)]
struct Snapshot {
    path: String,
    entries: Arc<Vec<DirEntry>>,
}

/// Capacity-bounded verifier → listing snapshot cache
#[derive(Debug)]
pub struct VerifierCache {
    snapshots: Mutex<LruCache<u64, Snapshot>>,
    limit: usize,
}

impl VerifierCache {
    /// Create a cache holding at most `limit` snapshots (a zero limit acts as 1)
    pub fn new(limit: usize) -> Self {
        let capacity = NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            snapshots: Mutex::new(LruCache::new(capacity)),
            limit,
        }
    }

    /// Record a listing and return its verifier
    pub fn verifier_for(&self, path: &str, entries: Vec<DirEntry>) -> u64 {
        let id = hash_path_and_entries(path, &entries);
        self.snapshots.lock().put(
            id,
            Snapshot {
                path: path.to_string(),
                entries: Arc::new(entries),
            },
        );
        id
    }

    /// Listing recorded under `id` for `path`, if still cached
    pub fn data_for_verifier(&self, path: &str, id: u64) -> Option<Arc<Vec<DirEntry>>> {
        let mut snapshots = self.snapshots.lock();
        match snapshots.get(&id) {
            Some(snapshot) if snapshot.path == path => Some(Arc::clone(&snapshot.entries)),
            Some(_) => {
                tracing::debug!(path, verifier = id, "verifier issued for another directory");
                None
            }
            None => None,
        }
    }

    /// Configured capacity
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First 8 bytes of SHA-256 over the path length, the path, then every entry
/// name in listing order
pub fn hash_path_and_entries(path: &str, entries: &[DirEntry]) -> u64 {
    let mut hasher = Sha256::new();

    // Length prefix keeps path bytes from running into the first name
    hasher.update((path.len() as u64).to_be_bytes());
    hasher.update(path.as_bytes());
    for entry in entries {
        hasher.update(entry.name.as_bytes());
    }

    let digest = hasher.finalize();
    let mut id = [0u8; 8];
    id.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(id)
}

//! Bounded bidirectional handle ↔ path mapping
//!
//! NFS clients hold 16-byte opaque handles, while backends only understand
//! paths. This cache keeps both directions:
//!
//! - forward: handle → (backend, path components), in strict LRU order
//! - reverse: joined path → every handle currently stored at that path
//!
//! Both live in one struct behind one mutex, so an eviction, invalidation or
//! retarget always updates the two sides together.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::backend::{same_backend, BackendRef};

use super::{FileHandle, HandleError, ResolvedHandle};

#[derive(Debug)]
struct Entry {
    backend: BackendRef,
    path: Vec<String>,
}

#[derive(Debug)]
struct Inner {
    forward: LruCache<FileHandle, Entry>,
    reverse: HashMap<String, Vec<FileHandle>>,
}

impl Inner {
    /// Existing handle for this backend at `key`, refreshed on hit
    fn find(&mut self, backend: &BackendRef, key: &str) -> Option<FileHandle> {
        let bucket = self.reverse.get(key)?;
        let found = bucket.iter().copied().find(|handle| {
            self.forward
                .peek(handle)
                .is_some_and(|entry| same_backend(entry.backend.as_ref(), backend.as_ref()))
        })?;
        self.forward.promote(&found);
        Some(found)
    }

    fn index(&mut self, key: String, handle: FileHandle) {
        let bucket = self.reverse.entry(key).or_default();
        if !bucket.contains(&handle) {
            bucket.push(handle);
        }
    }

    fn unindex(&mut self, key: &str, handle: &FileHandle) {
        if let Some(bucket) = self.reverse.get_mut(key) {
            bucket.retain(|h| h != handle);
            if bucket.is_empty() {
                self.reverse.remove(key);
            }
        }
    }
}

/// Capacity-bounded handle cache
#[derive(Debug)]
pub struct HandleCache {
    inner: Mutex<Inner>,
    limit: usize,
}

impl HandleCache {
    /// Create a cache holding at most `limit` handles (a zero limit acts as 1)
    pub fn new(limit: usize) -> Self {
        let capacity = NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                forward: LruCache::new(capacity),
                reverse: HashMap::new(),
            }),
            limit,
        }
    }

    /// Get the handle for a path, minting one if none is cached
    ///
    /// Repeated calls for the same backend and path return the same handle
    /// and never grow the cache.
    pub fn to_handle(&self, backend: &BackendRef, path: &[String]) -> FileHandle {
        let key = join_key(path);
        let mut inner = self.inner.lock();

        if let Some(handle) = inner.find(backend, &key) {
            return handle;
        }

        let handle = loop {
            let candidate = FileHandle::generate();
            if !inner.forward.contains(&candidate) {
                break candidate;
            }
        };
        let entry = Entry {
            backend: Arc::clone(backend),
            path: path.to_vec(),
        };
        if let Some((evicted, old)) = inner.forward.push(handle, entry) {
            let old_key = join_key(&old.path);
            tracing::debug!(handle = %evicted, path = %old_key, "evicted file handle");
            inner.unindex(&old_key, &evicted);
        }
        tracing::trace!(%handle, path = %key, "issued file handle");
        inner.index(key, handle);

        handle
    }

    /// Resolve a handle to its backend and a copy of its path
    ///
    /// Every cached entry whose path is a prefix of the resolved one (the
    /// handle itself and its ancestor directories) is refreshed too, so
    /// directories of files in active use are not evicted first.
    pub fn from_handle(&self, handle: &FileHandle) -> Result<ResolvedHandle, HandleError> {
        let mut inner = self.inner.lock();

        let (backend, path) = match inner.forward.peek(handle) {
            Some(entry) => (Arc::clone(&entry.backend), entry.path.clone()),
            None => return Err(HandleError::Stale(*handle)),
        };

        // Oldest first so the relative order of the refreshed entries holds
        let warm: Vec<FileHandle> = inner
            .forward
            .iter()
            .rev()
            .filter(|(_, entry)| path.starts_with(&entry.path))
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &warm {
            inner.forward.promote(handle);
        }

        Ok(ResolvedHandle { backend, path })
    }

    /// Drop a handle; returns whether it was cached
    pub fn invalidate(&self, handle: &FileHandle) -> bool {
        let mut inner = self.inner.lock();
        match inner.forward.pop(handle) {
            Some(entry) => {
                inner.unindex(&join_key(&entry.path), handle);
                tracing::debug!(%handle, "invalidated file handle");
                true
            }
            None => false,
        }
    }

    /// Point one handle at a new path
    pub fn update_handle(
        &self,
        backend: &BackendRef,
        handle: &FileHandle,
        new_path: &[String],
    ) -> Result<(), HandleError> {
        let mut inner = self.inner.lock();

        let old_key = match inner.forward.get_mut(handle) {
            Some(entry) => {
                let old_key = join_key(&entry.path);
                entry.backend = Arc::clone(backend);
                entry.path = new_path.to_vec();
                old_key
            }
            None => return Err(HandleError::Stale(*handle)),
        };
        let new_key = join_key(new_path);
        tracing::debug!(%handle, from = %old_key, to = %new_key, "retargeted file handle");
        inner.unindex(&old_key, handle);
        inner.index(new_key, *handle);

        Ok(())
    }

    /// Point every handle stored at exactly `old_path` at `new_path`
    ///
    /// Handles minted through any backend reference are moved, and all of
    /// them take `backend` as their new reference. Handles stored under
    /// `old_path` (children of a renamed directory) keep their old path.
    /// Returns the number of handles moved.
    pub fn update_handles_by_path(
        &self,
        backend: &BackendRef,
        old_path: &[String],
        new_path: &[String],
    ) -> usize {
        let old_key = join_key(old_path);
        let new_key = join_key(new_path);
        let mut inner = self.inner.lock();

        let snapshot = match inner.reverse.get(&old_key) {
            Some(bucket) => bucket.clone(),
            None => return 0,
        };

        let mut updated = 0;
        for handle in snapshot {
            match inner.forward.get_mut(&handle) {
                Some(entry) => {
                    entry.backend = Arc::clone(backend);
                    entry.path = new_path.to_vec();
                }
                None => continue,
            }
            inner.unindex(&old_key, &handle);
            inner.index(new_key.clone(), handle);
            updated += 1;
        }

        if updated > 0 {
            tracing::debug!(from = %old_key, to = %new_key, updated, "retargeted file handles");
        }
        updated
    }

    /// Handles currently stored at `path`
    pub fn handles_at(&self, path: &[String]) -> Vec<FileHandle> {
        self.inner
            .lock()
            .reverse
            .get(&join_key(path))
            .cloned()
            .unwrap_or_default()
    }

    /// Configured capacity
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.inner.lock().forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reverse index key for a path
pub(crate) fn join_key(path: &[String]) -> String {
    format!("/{}", path.join("/"))
}

//! File handle and cookie verifier bookkeeping
//!
//! - `FileHandle`: the 16-byte opaque value clients hold
//! - `HandleCache`: bounded bidirectional handle ↔ path mapping
//! - `VerifierCache`: bounded READDIR verifier → listing snapshot mapping
//! - `CachingHandler`: one of each, shared by every request of an export
//!
//! Protocol handlers only see the traits below, so a handle manager that
//! cannot retarget by path (`bulk_retarget` returns `None`) still works with
//! RENAME through its per-handle fallback.

mod cache;
mod handle;
mod verifier;

pub use cache::HandleCache;
pub use handle::FileHandle;
pub use verifier::{hash_path_and_entries, VerifierCache};

use std::sync::Arc;

use crate::backend::{BackendRef, DirEntry};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// Never issued, evicted or invalidated
    #[error("stale file handle {0}")]
    Stale(FileHandle),
    #[error("malformed file handle: expected {len} bytes, got {0}", len = FileHandle::LEN)]
    Malformed(usize),
}

/// What a handle points at
#[derive(Debug, Clone)]
pub struct ResolvedHandle {
    pub backend: BackendRef,
    pub path: Vec<String>,
}

/// Translation between handles and backend paths
pub trait HandleManager: Send + Sync {
    /// Handle for a path, minted if needed
    fn to_handle(&self, backend: &BackendRef, path: &[String]) -> FileHandle;

    /// Resolve raw handle bytes from a request
    fn from_handle(&self, handle: &[u8]) -> Result<ResolvedHandle, HandleError>;

    /// Forget a handle; unknown handles are ignored
    fn invalidate_handle(&self, handle: &FileHandle);

    /// Point one handle at a new path
    fn update_handle(
        &self,
        backend: &BackendRef,
        handle: &FileHandle,
        new_path: &[String],
    ) -> Result<(), HandleError>;

    /// How many handles can be held at once
    fn handle_limit(&self) -> usize;

    /// Path-based retargeting, when this manager supports it
    fn bulk_retarget(&self) -> Option<&dyn BulkRetarget> {
        None
    }
}

/// Retarget every handle stored at a path in one call
pub trait BulkRetarget {
    fn update_handles_by_path(
        &self,
        backend: &BackendRef,
        old_path: &[String],
        new_path: &[String],
    ) -> usize;
}

/// Storage for READDIR cookie verifiers
pub trait VerifierStore: Send + Sync {
    fn verifier_for(&self, path: &str, entries: Vec<DirEntry>) -> u64;

    fn data_for_verifier(&self, path: &str, id: u64) -> Option<Arc<Vec<DirEntry>>>;
}

/// Handle and verifier caches for one export
///
/// Build it once at startup and share it (`Arc<CachingHandler>`) with every
/// request handler.
#[derive(Debug)]
pub struct CachingHandler {
    handles: HandleCache,
    verifiers: VerifierCache,
}

impl CachingHandler {
    /// Use `limit` for both the handle and the verifier cache
    pub fn new(limit: usize) -> Self {
        Self::with_verifier_limit(limit, limit)
    }

    /// Size the verifier cache separately, usually smaller than the handle cache
    pub fn with_verifier_limit(limit: usize, verifier_limit: usize) -> Self {
        if limit < 2 || verifier_limit < 2 {
            tracing::warn!(
                size = limit,
                verifiers = verifier_limit,
                "caching handler created with insufficient cache to support directory listing"
            );
        }
        Self {
            handles: HandleCache::new(limit),
            verifiers: VerifierCache::new(verifier_limit),
        }
    }

    pub fn handles(&self) -> &HandleCache {
        &self.handles
    }

    pub fn verifiers(&self) -> &VerifierCache {
        &self.verifiers
    }
}

impl HandleManager for CachingHandler {
    fn to_handle(&self, backend: &BackendRef, path: &[String]) -> FileHandle {
        self.handles.to_handle(backend, path)
    }

    fn from_handle(&self, handle: &[u8]) -> Result<ResolvedHandle, HandleError> {
        let handle = FileHandle::from_slice(handle)?;
        self.handles.from_handle(&handle)
    }

    fn invalidate_handle(&self, handle: &FileHandle) {
        self.handles.invalidate(handle);
    }

    fn update_handle(
        &self,
        backend: &BackendRef,
        handle: &FileHandle,
        new_path: &[String],
    ) -> Result<(), HandleError> {
        self.handles.update_handle(backend, handle, new_path)
    }

    fn handle_limit(&self) -> usize {
        self.handles.limit()
    }

    fn bulk_retarget(&self) -> Option<&dyn BulkRetarget> {
        Some(self)
    }
}

impl BulkRetarget for CachingHandler {
    fn update_handles_by_path(
        &self,
        backend: &BackendRef,
        old_path: &[String],
        new_path: &[String],
    ) -> usize {
        self.handles.update_handles_by_path(backend, old_path, new_path)
    }
}

impl VerifierStore for CachingHandler {
    fn verifier_for(&self, path: &str, entries: Vec<DirEntry>) -> u64 {
        self.verifiers.verifier_for(path, entries)
    }

    fn data_for_verifier(&self, path: &str, id: u64) -> Option<Arc<Vec<DirEntry>>> {
        self.verifiers.data_for_verifier(path, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn test_limits() {
        let handler = CachingHandler::with_verifier_limit(64, 8);
        assert_eq!(handler.handle_limit(), 64);
        assert_eq!(handler.verifiers().limit(), 8);

        let handler = CachingHandler::new(16);
        assert_eq!(handler.handle_limit(), 16);
        assert_eq!(handler.verifiers().limit(), 16);
    }

    #[test]
    fn test_undersized_limits_are_accepted() {
        let handler = CachingHandler::with_verifier_limit(1, 0);
        let fs: BackendRef = Arc::new(MemoryBackend::new());

        let handle = handler.to_handle(&fs, &["a".to_string()]);
        assert!(handler.from_handle(handle.as_bytes()).is_ok());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn warnings_while(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);

        let bytes = captured.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_undersized_limits_warn() {
        let logs = warnings_while(|| {
            CachingHandler::with_verifier_limit(1, 64);
        });
        assert!(logs.contains("WARN"));
        assert!(logs.contains("insufficient cache"));

        let logs = warnings_while(|| {
            CachingHandler::with_verifier_limit(64, 0);
        });
        assert!(logs.contains("insufficient cache"));

        let logs = warnings_while(|| {
            CachingHandler::new(2);
        });
        assert!(logs.is_empty());
    }

    #[test]
    fn test_from_handle_rejects_bad_bytes() {
        let handler = CachingHandler::new(4);
        assert_eq!(
            handler.from_handle(&[0u8; 8]).unwrap_err(),
            HandleError::Malformed(8)
        );
        assert!(matches!(
            handler.from_handle(&[0u8; 16]),
            Err(HandleError::Stale(_))
        ));
    }

    #[test]
    fn test_bulk_retarget_is_available() {
        let handler = CachingHandler::new(4);
        let fs: BackendRef = Arc::new(MemoryBackend::new());
        let handle = handler.to_handle(&fs, &["old".to_string()]);

        let bulk = handler.bulk_retarget().unwrap();
        assert_eq!(
            bulk.update_handles_by_path(&fs, &["old".to_string()], &["new".to_string()]),
            1
        );
        assert_eq!(
            handler.from_handle(handle.as_bytes()).unwrap().path,
            vec!["new".to_string()]
        );
    }

    #[test]
    fn test_verifier_store() {
        let handler = CachingHandler::new(4);
        let id = handler.verifier_for("/", Vec::new());
        assert!(handler.data_for_verifier("/", id).unwrap().is_empty());
        assert!(handler.data_for_verifier("/", id.wrapping_add(1)).is_none());
    }
}

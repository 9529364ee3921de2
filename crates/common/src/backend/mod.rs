//! Storage backend collaborator
//!
//! The handle layer never walks a backend on its own. It only needs to join
//! path components, stat and rename by path, ask whether writes are allowed,
//! and tell two backend references apart.

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::SystemTime;

use uuid::Uuid;

/// Stable identity of a backend instance
///
/// Two backend references are "the same backend" exactly when their ids
/// match. Comparing backend internals is not reliable, so every
/// implementation hands out one of these instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(Uuid);

impl BackendId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BackendId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of object a path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

/// What a stat call returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub kind: FileKind,
    /// Permission bits only (no file type bits)
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    /// Native inode number, when the backend has one
    pub ino: Option<u64>,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub metadata: Metadata,
}

/// Storage backend consumed by the handle layer and protocol handlers
pub trait Backend: fmt::Debug + Send + Sync {
    /// Identity used for handle dedup and cross-backend checks
    fn id(&self) -> BackendId;

    /// Join path components into a path this backend understands
    fn join(&self, components: &[String]) -> String;

    /// Stat by path; a missing path is `io::ErrorKind::NotFound`
    fn stat(&self, path: &str) -> io::Result<Metadata>;

    /// Rename by path
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Whether the backend refuses mutations
    fn is_read_only(&self) -> bool;
}

/// Shared reference to a backend, as held by handle entries
pub type BackendRef = Arc<dyn Backend>;

/// Check whether two backend references denote the same backend
pub fn same_backend(a: &dyn Backend, b: &dyn Backend) -> bool {
    a.id() == b.id()
}

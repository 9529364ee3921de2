//! In-memory backend
//!
//! A flat map of canonical paths (`/`, `/docs`, `/docs/readme.txt`) to nodes.
//! Clones share the same tree and the same identity.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use super::{Backend, BackendId, FileKind, Metadata};

#[derive(Debug, Clone)]
struct Node {
    kind: FileKind,
    mode: u32,
    size: u64,
    ino: u64,
    atime: SystemTime,
    mtime: SystemTime,
    ctime: SystemTime,
}

impl Node {
    fn new(kind: FileKind, size: u64, ino: u64) -> Self {
        let now = SystemTime::now();
        let mode = match kind {
            FileKind::Dir => 0o755,
            _ => 0o644,
        };
        Self {
            kind,
            mode,
            size,
            ino,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            kind: self.kind,
            mode: self.mode,
            nlink: if self.kind == FileKind::Dir { 2 } else { 1 },
            uid: 0,
            gid: 0,
            size: self.size,
            ino: Some(self.ino),
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }
}

/// Backend keeping its whole tree in memory
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    id: BackendId,
    read_only: bool,
    nodes: Arc<RwLock<BTreeMap<String, Node>>>,
    next_ino: Arc<AtomicU64>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Root directory inode
    pub const ROOT_INO: u64 = 1;

    /// Create an empty writable tree holding only `/`
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::new(FileKind::Dir, 0, Self::ROOT_INO));
        Self {
            id: BackendId::generate(),
            read_only: false,
            nodes: Arc::new(RwLock::new(nodes)),
            next_ino: Arc::new(AtomicU64::new(Self::ROOT_INO + 1)),
        }
    }

    /// Same tree and identity, with writes refused or allowed
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Create a directory; the parent has to exist
    pub fn create_dir(&self, path: &str) -> io::Result<()> {
        self.create(path, FileKind::Dir, 0)
    }

    /// Create a regular file of the given size; the parent has to exist
    pub fn create_file(&self, path: &str, size: u64) -> io::Result<()> {
        self.create(path, FileKind::File, size)
    }

    /// Whether a path exists
    pub fn exists(&self, path: &str) -> bool {
        self.nodes.read().contains_key(&normalize_path(path))
    }

    fn create(&self, path: &str, kind: FileKind, size: u64) -> io::Result<()> {
        let path = normalize_path(path);
        let mut nodes = self.nodes.write();

        if nodes.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path),
            ));
        }
        let parent = parent_path(&path);
        match nodes.get_mut(&parent) {
            Some(node) if node.kind == FileKind::Dir => {
                let now = SystemTime::now();
                node.mtime = now;
                node.ctime = now;
            }
            Some(_) => return Err(io::Error::other(format!("{} is not a directory", parent))),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", parent),
                ))
            }
        }

        let ino = self.next_ino.fetch_add(1, Ordering::SeqCst);
        nodes.insert(path, Node::new(kind, size, ino));
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    fn join(&self, components: &[String]) -> String {
        let joined = components
            .iter()
            .filter(|c| !c.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/");
        normalize_path(&joined)
    }

    fn stat(&self, path: &str) -> io::Result<Metadata> {
        let path = normalize_path(path);
        self.nodes
            .read()
            .get(&path)
            .map(Node::metadata)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", path))
            })
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "backend is read-only",
            ));
        }

        let from = normalize_path(from);
        let to = normalize_path(to);
        if from == "/" || to == "/" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot rename the root directory",
            ));
        }
        if from == to {
            return Ok(());
        }
        if to.starts_with(&format!("{}/", from)) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot move {} into itself", from),
            ));
        }

        let mut nodes = self.nodes.write();

        let source_kind = match nodes.get(&from) {
            Some(node) => node.kind,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", from),
                ))
            }
        };
        let to_parent = parent_path(&to);
        match nodes.get(&to_parent) {
            Some(node) if node.kind == FileKind::Dir => {}
            Some(_) => return Err(io::Error::other(format!("{} is not a directory", to_parent))),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", to_parent),
                ))
            }
        }
        if let Some(target) = nodes.get(&to) {
            if target.kind == FileKind::Dir {
                if source_kind != FileKind::Dir {
                    return Err(io::Error::other(format!("{} is a directory", to)));
                }
                if has_children(&nodes, &to) {
                    return Err(io::Error::other(format!("{} is not empty", to)));
                }
            } else if source_kind == FileKind::Dir {
                return Err(io::Error::other(format!("{} is not a directory", to)));
            }
        }

        let prefix = format!("{}/", from);
        let moved: Vec<String> = nodes
            .keys()
            .filter(|k| **k == from || k.starts_with(&prefix))
            .cloned()
            .collect();

        nodes.remove(&to);
        let now = SystemTime::now();
        for old in moved {
            if let Some(mut node) = nodes.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                if old == from {
                    node.ctime = now;
                }
                nodes.insert(new, node);
            }
        }
        for parent in [parent_path(&from), to_parent] {
            if let Some(node) = nodes.get_mut(&parent) {
                node.mtime = now;
                node.ctime = now;
            }
        }

        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

fn has_children(nodes: &BTreeMap<String, Node>, dir: &str) -> bool {
    let prefix = format!("{}/", dir);
    nodes.keys().any(|k| k.starts_with(&prefix))
}

/// Ensure leading slash, no trailing slash
fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }

    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

fn parent_path(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(pos) => normalized[..pos].to_string(),
    }
}

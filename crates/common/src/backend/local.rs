//! Backend over a directory on the local filesystem

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use super::{Backend, BackendId, FileKind, Metadata};

/// Exposes everything below `root`
///
/// Joined paths are relative to the root (`docs/readme.txt`, `""` for the
/// root itself) so they never escape it by construction.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    id: BackendId,
    root: PathBuf,
    read_only: bool,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            id: BackendId::generate(),
            root: root.into(),
            read_only,
        }
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mut resolved = self.root.clone();
        for component in path.split('/').filter(|c| !c.is_empty() && *c != ".") {
            if component == ".." {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("{} escapes the export root", path),
                ));
            }
            resolved.push(component);
        }
        Ok(resolved)
    }
}

impl Backend for LocalBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    fn join(&self, components: &[String]) -> String {
        components
            .iter()
            .filter(|c| !c.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }

    fn stat(&self, path: &str) -> io::Result<Metadata> {
        let meta = fs::symlink_metadata(self.resolve(path)?)?;
        Ok(convert_metadata(&meta))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "backend is read-only",
            ));
        }
        fs::rename(self.resolve(from)?, self.resolve(to)?)
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

fn convert_metadata(meta: &fs::Metadata) -> Metadata {
    let kind = if meta.is_dir() {
        FileKind::Dir
    } else if meta.file_type().is_symlink() {
        FileKind::Symlink
    } else {
        FileKind::File
    };
    let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let atime = meta.accessed().unwrap_or(mtime);

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        let ctime = SystemTime::UNIX_EPOCH
            .checked_add(std::time::Duration::new(
                meta.ctime().max(0) as u64,
                meta.ctime_nsec().clamp(0, 999_999_999) as u32,
            ))
            .unwrap_or(mtime);
        Metadata {
            kind,
            mode: meta.mode() & 0o7777,
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            size: meta.len(),
            ino: Some(meta.ino()),
            atime,
            mtime,
            ctime,
        }
    }

    #[cfg(not(unix))]
    {
        let mode = match (kind, meta.permissions().readonly()) {
            (FileKind::Dir, false) => 0o755,
            (FileKind::Dir, true) => 0o555,
            (_, false) => 0o644,
            (_, true) => 0o444,
        };
        Metadata {
            kind,
            mode,
            nlink: 1,
            uid: 0,
            gid: 0,
            size: meta.len(),
            ino: None,
            atime,
            mtime,
            ctime: mtime,
        }
    }
}

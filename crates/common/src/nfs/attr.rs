//! File attributes and weak cache consistency data
//!
//! Mutating NFSv3 calls return a `wcc_data` per affected directory: a small
//! attribute set from before the call and the full attributes after it, so
//! clients can tell whether their cached copy went stale in between.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use sha2::{Digest, Sha256};

use crate::backend::{Backend, FileKind, Metadata};

use super::xdr::{self, XdrError};

/// `nfstime3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NfsTime {
    pub seconds: u32,
    pub nseconds: u32,
}

impl NfsTime {
    pub fn encode(&self, buf: &mut impl BufMut) {
        xdr::write_u32(buf, self.seconds);
        xdr::write_u32(buf, self.nseconds);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, XdrError> {
        Ok(Self {
            seconds: xdr::read_u32(buf)?,
            nseconds: xdr::read_u32(buf)?,
        })
    }
}

impl From<SystemTime> for NfsTime {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self {
                seconds: since.as_secs().min(u64::from(u32::MAX)) as u32,
                nseconds: since.subsec_nanos(),
            },
            Err(_) => Self::default(),
        }
    }
}

/// `ftype3`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FileType {
    Regular = 1,
    Directory = 2,
    Block = 3,
    Character = 4,
    Link = 5,
    Socket = 6,
    Fifo = 7,
}

impl TryFrom<u32> for FileType {
    type Error = XdrError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => FileType::Regular,
            2 => FileType::Directory,
            3 => FileType::Block,
            4 => FileType::Character,
            5 => FileType::Link,
            6 => FileType::Socket,
            7 => FileType::Fifo,
            _ => {
                return Err(XdrError::InvalidEnum {
                    name: "ftype3",
                    value,
                })
            }
        })
    }
}

impl From<FileKind> for FileType {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::File => FileType::Regular,
            FileKind::Dir => FileType::Directory,
            FileKind::Symlink => FileType::Link,
        }
    }
}

/// `fattr3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    pub file_type: FileType,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub used: u64,
    pub rdev: (u32, u32),
    pub fsid: u64,
    pub fileid: u64,
    pub atime: NfsTime,
    pub mtime: NfsTime,
    pub ctime: NfsTime,
}

impl FileAttr {
    /// Attributes for `path` as reported by the backend
    ///
    /// Backends without inode numbers get a fileid derived from the path.
    pub fn from_metadata(meta: &Metadata, path: &str) -> Self {
        Self {
            file_type: meta.kind.into(),
            mode: meta.mode & 0o7777,
            nlink: meta.nlink,
            uid: meta.uid,
            gid: meta.gid,
            size: meta.size,
            used: meta.size,
            rdev: (0, 0),
            fsid: 0,
            fileid: meta.ino.unwrap_or_else(|| path_fileid(path)),
            atime: meta.atime.into(),
            mtime: meta.mtime.into(),
            ctime: meta.ctime.into(),
        }
    }

    /// The subset recorded before a mutation
    pub fn as_wcc(&self) -> WccAttr {
        WccAttr {
            size: self.size,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        xdr::write_u32(buf, self.file_type as u32);
        xdr::write_u32(buf, self.mode);
        xdr::write_u32(buf, self.nlink);
        xdr::write_u32(buf, self.uid);
        xdr::write_u32(buf, self.gid);
        xdr::write_u64(buf, self.size);
        xdr::write_u64(buf, self.used);
        xdr::write_u32(buf, self.rdev.0);
        xdr::write_u32(buf, self.rdev.1);
        xdr::write_u64(buf, self.fsid);
        xdr::write_u64(buf, self.fileid);
        self.atime.encode(buf);
        self.mtime.encode(buf);
        self.ctime.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, XdrError> {
        Ok(Self {
            file_type: FileType::try_from(xdr::read_u32(buf)?)?,
            mode: xdr::read_u32(buf)?,
            nlink: xdr::read_u32(buf)?,
            uid: xdr::read_u32(buf)?,
            gid: xdr::read_u32(buf)?,
            size: xdr::read_u64(buf)?,
            used: xdr::read_u64(buf)?,
            rdev: (xdr::read_u32(buf)?, xdr::read_u32(buf)?),
            fsid: xdr::read_u64(buf)?,
            fileid: xdr::read_u64(buf)?,
            atime: NfsTime::decode(buf)?,
            mtime: NfsTime::decode(buf)?,
            ctime: NfsTime::decode(buf)?,
        })
    }
}

/// `wcc_attr`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WccAttr {
    pub size: u64,
    pub mtime: NfsTime,
    pub ctime: NfsTime,
}

impl WccAttr {
    pub fn encode(&self, buf: &mut impl BufMut) {
        xdr::write_u64(buf, self.size);
        self.mtime.encode(buf);
        self.ctime.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, XdrError> {
        Ok(Self {
            size: xdr::read_u64(buf)?,
            mtime: NfsTime::decode(buf)?,
            ctime: NfsTime::decode(buf)?,
        })
    }
}

/// `wcc_data`: optional pre-op attributes, optional post-op attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WccData {
    pub before: Option<WccAttr>,
    pub after: Option<FileAttr>,
}

impl WccData {
    pub fn encode(&self, buf: &mut impl BufMut) {
        match &self.before {
            Some(attr) => {
                xdr::write_bool(buf, true);
                attr.encode(buf);
            }
            None => xdr::write_bool(buf, false),
        }
        match &self.after {
            Some(attr) => {
                xdr::write_bool(buf, true);
                attr.encode(buf);
            }
            None => xdr::write_bool(buf, false),
        }
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, XdrError> {
        let before = if xdr::read_bool(buf)? {
            Some(WccAttr::decode(buf)?)
        } else {
            None
        };
        let after = if xdr::read_bool(buf)? {
            Some(FileAttr::decode(buf)?)
        } else {
            None
        };
        Ok(Self { before, after })
    }
}

/// Current attributes of the object at `path`, or `None` if stat fails
pub fn try_stat(backend: &dyn Backend, path: &[String]) -> Option<FileAttr> {
    let joined = backend.join(path);
    match backend.stat(&joined) {
        Ok(meta) => Some(FileAttr::from_metadata(&meta, &joined)),
        Err(e) => {
            tracing::debug!(path = %joined, error = %e, "post-op stat failed");
            None
        }
    }
}

fn path_fileid(path: &str) -> u64 {
    let digest = Sha256::digest(path.as_bytes());
    let mut id = [0u8; 8];
    id.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(id)
}

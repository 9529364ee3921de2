//! NFSv3 status codes and the error type handlers return

use std::fmt;
use std::io;

/// `nfsstat3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NfsStatus {
    Ok = 0,
    Perm = 1,
    NoEnt = 2,
    Io = 5,
    NxIo = 6,
    Access = 13,
    Exist = 17,
    XDev = 18,
    NoDev = 19,
    NotDir = 20,
    IsDir = 21,
    Inval = 22,
    FBig = 27,
    NoSpc = 28,
    RoFs = 30,
    MLink = 31,
    NameTooLong = 63,
    NotEmpty = 66,
    DQuot = 69,
    Stale = 70,
    Remote = 71,
    BadHandle = 10001,
    NotSync = 10002,
    BadCookie = 10003,
    NotSupp = 10004,
    TooSmall = 10005,
    ServerFault = 10006,
    BadType = 10007,
    Jukebox = 10008,
}

impl NfsStatus {
    const ALL: [NfsStatus; 29] = [
        NfsStatus::Ok,
        NfsStatus::Perm,
        NfsStatus::NoEnt,
        NfsStatus::Io,
        NfsStatus::NxIo,
        NfsStatus::Access,
        NfsStatus::Exist,
        NfsStatus::XDev,
        NfsStatus::NoDev,
        NfsStatus::NotDir,
        NfsStatus::IsDir,
        NfsStatus::Inval,
        NfsStatus::FBig,
        NfsStatus::NoSpc,
        NfsStatus::RoFs,
        NfsStatus::MLink,
        NfsStatus::NameTooLong,
        NfsStatus::NotEmpty,
        NfsStatus::DQuot,
        NfsStatus::Stale,
        NfsStatus::Remote,
        NfsStatus::BadHandle,
        NfsStatus::NotSync,
        NfsStatus::BadCookie,
        NfsStatus::NotSupp,
        NfsStatus::TooSmall,
        NfsStatus::ServerFault,
        NfsStatus::BadType,
        NfsStatus::Jukebox,
    ];

    /// Wire value
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// Protocol name, e.g. `NFS3ERR_STALE`
    pub fn name(self) -> &'static str {
        match self {
            NfsStatus::Ok => "NFS3_OK",
            NfsStatus::Perm => "NFS3ERR_PERM",
            NfsStatus::NoEnt => "NFS3ERR_NOENT",
            NfsStatus::Io => "NFS3ERR_IO",
            NfsStatus::NxIo => "NFS3ERR_NXIO",
            NfsStatus::Access => "NFS3ERR_ACCES",
            NfsStatus::Exist => "NFS3ERR_EXIST",
            NfsStatus::XDev => "NFS3ERR_XDEV",
            NfsStatus::NoDev => "NFS3ERR_NODEV",
            NfsStatus::NotDir => "NFS3ERR_NOTDIR",
            NfsStatus::IsDir => "NFS3ERR_ISDIR",
            NfsStatus::Inval => "NFS3ERR_INVAL",
            NfsStatus::FBig => "NFS3ERR_FBIG",
            NfsStatus::NoSpc => "NFS3ERR_NOSPC",
            NfsStatus::RoFs => "NFS3ERR_ROFS",
            NfsStatus::MLink => "NFS3ERR_MLINK",
            NfsStatus::NameTooLong => "NFS3ERR_NAMETOOLONG",
            NfsStatus::NotEmpty => "NFS3ERR_NOTEMPTY",
            NfsStatus::DQuot => "NFS3ERR_DQUOT",
            NfsStatus::Stale => "NFS3ERR_STALE",
            NfsStatus::Remote => "NFS3ERR_REMOTE",
            NfsStatus::BadHandle => "NFS3ERR_BADHANDLE",
            NfsStatus::NotSync => "NFS3ERR_NOT_SYNC",
            NfsStatus::BadCookie => "NFS3ERR_BAD_COOKIE",
            NfsStatus::NotSupp => "NFS3ERR_NOTSUPP",
            NfsStatus::TooSmall => "NFS3ERR_TOOSMALL",
            NfsStatus::ServerFault => "NFS3ERR_SERVERFAULT",
            NfsStatus::BadType => "NFS3ERR_BADTYPE",
            NfsStatus::Jukebox => "NFS3ERR_JUKEBOX",
        }
    }
}

impl fmt::Display for NfsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-OK status plus whatever caused it
#[derive(Debug, thiserror::Error)]
#[error("{status}")]
pub struct NfsError {
    pub status: NfsStatus,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl NfsError {
    pub fn new(status: NfsStatus) -> Self {
        Self {
            status,
            source: None,
        }
    }

    pub fn with_source(
        status: NfsStatus,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            status,
            source: Some(source.into()),
        }
    }

    /// Failed stat: a missing path is `NOENT`, anything else `IO`
    pub fn from_stat(err: io::Error) -> Self {
        let status = match err.kind() {
            io::ErrorKind::NotFound => NfsStatus::NoEnt,
            _ => NfsStatus::Io,
        };
        Self::with_source(status, err)
    }

    /// Failed mutation: also maps permission errors to `ACCES`
    pub fn from_mutation(err: io::Error) -> Self {
        let status = match err.kind() {
            io::ErrorKind::NotFound => NfsStatus::NoEnt,
            io::ErrorKind::PermissionDenied => NfsStatus::Access,
            _ => NfsStatus::Io,
        };
        Self::with_source(status, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_codes_round_trip() {
        for status in NfsStatus::ALL {
            assert_eq!(NfsStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(NfsStatus::from_code(3), None);
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(NfsStatus::Stale.code(), 70);
        assert_eq!(NfsStatus::NotSupp.code(), 10004);
        assert_eq!(NfsStatus::ServerFault.code(), 10006);
    }

    #[test]
    fn test_display() {
        assert_eq!(NfsStatus::RoFs.to_string(), "NFS3ERR_ROFS");
        assert_eq!(NfsError::new(NfsStatus::Stale).to_string(), "NFS3ERR_STALE");
    }

    #[test]
    fn test_stat_mapping() {
        let err = NfsError::from_stat(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.status, NfsStatus::NoEnt);
        assert!(err.source().is_some());

        let err = NfsError::from_stat(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.status, NfsStatus::Io);
    }

    #[test]
    fn test_mutation_mapping() {
        let cases = [
            (io::ErrorKind::NotFound, NfsStatus::NoEnt),
            (io::ErrorKind::PermissionDenied, NfsStatus::Access),
            (io::ErrorKind::Other, NfsStatus::Io),
        ];
        for (kind, status) in cases {
            assert_eq!(NfsError::from_mutation(io::Error::from(kind)).status, status);
        }
    }
}

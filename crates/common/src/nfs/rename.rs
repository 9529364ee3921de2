//! RENAME (NFSv3 procedure 14)
//!
//! Everything up to the backend rename fails fast without touching the
//! backend. Once the backend rename has gone through the call is committed:
//! handle retargeting and reply encoding never undo it, and a failure to
//! deliver the reply is reported as `SERVERFAULT` only.

use std::io::Write;

use bytes::{Buf, BufMut, BytesMut};

use crate::backend::{same_backend, Backend, BackendRef};
use crate::handles::HandleManager;

use super::attr::{try_stat, FileAttr, WccAttr, WccData};
use super::xdr::{self, XdrError};
use super::{NfsError, NfsStatus, RequestContext};

/// Longest filename accepted for a rename
pub const PATH_NAME_MAX: usize = 255;

/// Largest `nfs_fh3` on the wire
pub const FHSIZE: usize = 64;

/// Names longer than this are rejected while decoding
const FILENAME_WIRE_MAX: usize = 4096;

/// `diropargs3`: a directory handle and a name inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirOpArgs {
    pub dir: Vec<u8>,
    pub name: String,
}

impl DirOpArgs {
    pub fn new(dir: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, XdrError> {
        Ok(Self {
            dir: xdr::read_opaque(buf, FHSIZE)?,
            name: xdr::read_string(buf, FILENAME_WIRE_MAX)?,
        })
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        xdr::write_opaque(buf, &self.dir);
        xdr::write_string(buf, &self.name);
    }
}

/// `RENAME3args`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameArgs {
    pub from: DirOpArgs,
    pub to: DirOpArgs,
}

impl RenameArgs {
    pub fn decode(buf: &mut impl Buf) -> Result<Self, XdrError> {
        Ok(Self {
            from: DirOpArgs::decode(buf)?,
            to: DirOpArgs::decode(buf)?,
        })
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        self.from.encode(buf);
        self.to.encode(buf);
    }
}

/// WCC data for both directories of a successful rename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOk {
    pub from_dir_wcc: WccData,
    pub to_dir_wcc: WccData,
}

/// `RENAME3res`
///
/// Error replies carry two empty WCC blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameReply {
    pub status: NfsStatus,
    pub from_dir_wcc: WccData,
    pub to_dir_wcc: WccData,
}

impl RenameReply {
    pub fn ok(ok: RenameOk) -> Self {
        Self {
            status: NfsStatus::Ok,
            from_dir_wcc: ok.from_dir_wcc,
            to_dir_wcc: ok.to_dir_wcc,
        }
    }

    pub fn error(status: NfsStatus) -> Self {
        Self {
            status,
            from_dir_wcc: WccData::default(),
            to_dir_wcc: WccData::default(),
        }
    }

    pub fn encode(&self, buf: &mut impl BufMut) {
        xdr::write_u32(buf, self.status.code());
        self.from_dir_wcc.encode(buf);
        self.to_dir_wcc.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, XdrError> {
        let code = xdr::read_u32(buf)?;
        let status = NfsStatus::from_code(code).ok_or(XdrError::InvalidEnum {
            name: "nfsstat3",
            value: code,
        })?;
        Ok(Self {
            status,
            from_dir_wcc: WccData::decode(buf)?,
            to_dir_wcc: WccData::decode(buf)?,
        })
    }
}

/// Rename `from.dir/from.name` to `to.dir/to.name`
///
/// # Arguments
///
/// * `ctx` - Request context; its deadline is only checked before any work
/// * `handles` - The export's handle manager
/// * `args` - Decoded request
///
/// # Returns
///
/// * `Ok(RenameOk)` - WCC data for the source then destination directory
/// * `Err(NfsError)` - The status to reply with, plus its cause
pub fn rename(
    ctx: &RequestContext,
    handles: &dyn HandleManager,
    args: &RenameArgs,
) -> Result<RenameOk, NfsError> {
    if ctx.is_expired() {
        return Err(NfsError::with_source(
            NfsStatus::Jukebox,
            "request deadline passed before rename started",
        ));
    }

    let from = handles
        .from_handle(&args.from.dir)
        .map_err(|e| NfsError::with_source(NfsStatus::Stale, e))?;
    let to = handles
        .from_handle(&args.to.dir)
        .map_err(|e| NfsError::with_source(NfsStatus::Stale, e))?;

    if !same_backend(from.backend.as_ref(), to.backend.as_ref()) {
        return Err(NfsError::with_source(
            NfsStatus::NotSupp,
            "source and destination are on different backends",
        ));
    }
    let backend = from.backend;

    if backend.is_read_only() {
        return Err(NfsError::with_source(
            NfsStatus::RoFs,
            "backend is read-only",
        ));
    }

    for name in [&args.from.name, &args.to.name] {
        if name.len() > PATH_NAME_MAX {
            return Err(NfsError::with_source(
                NfsStatus::NameTooLong,
                format!("name of {} bytes exceeds {}", name.len(), PATH_NAME_MAX),
            ));
        }
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(NfsError::with_source(
                NfsStatus::Inval,
                format!("invalid name {:?}", name),
            ));
        }
    }

    let from_dir_before = stat_dir(backend.as_ref(), &from.path)?;
    let to_dir_before = stat_dir(backend.as_ref(), &to.path)?;

    let mut old_path = from.path.clone();
    old_path.push(args.from.name.clone());
    let mut new_path = to.path.clone();
    new_path.push(args.to.name.clone());

    let from_loc = backend.join(&old_path);
    let to_loc = backend.join(&new_path);
    backend
        .rename(&from_loc, &to_loc)
        .map_err(NfsError::from_mutation)?;
    tracing::debug!(from = %from_loc, to = %to_loc, "renamed");

    retarget(handles, &backend, &old_path, &new_path);

    Ok(RenameOk {
        from_dir_wcc: WccData {
            before: Some(from_dir_before),
            after: try_stat(backend.as_ref(), &from.path),
        },
        to_dir_wcc: WccData {
            before: Some(to_dir_before),
            after: try_stat(backend.as_ref(), &to.path),
        },
    })
}

/// Decode a RENAME request, run it and write the reply to `sink`
///
/// The reply (success or error) is always attempted. The returned error is
/// for the dispatcher's logs; when the rename itself succeeded but the reply
/// could not be written it is `SERVERFAULT`.
pub fn handle_rename(
    ctx: &RequestContext,
    handles: &dyn HandleManager,
    request: &[u8],
    sink: &mut impl Write,
) -> Result<(), NfsError> {
    let mut body = request;
    // Both sides are decoded before either handle is resolved, so a truncated
    // request is INVAL even when the source handle is also stale.
    let result = RenameArgs::decode(&mut body)
        .map_err(|e| NfsError::with_source(NfsStatus::Inval, e))
        .and_then(|args| rename(ctx, handles, &args));

    let reply = match &result {
        Ok(ok) => RenameReply::ok(ok.clone()),
        Err(e) => RenameReply::error(e.status),
    };
    let mut buf = BytesMut::new();
    reply.encode(&mut buf);

    if let Err(e) = sink.write_all(&buf) {
        return match result {
            Ok(_) => {
                tracing::error!(error = %e, "rename committed but reply could not be written");
                Err(NfsError::with_source(NfsStatus::ServerFault, e))
            }
            Err(original) => Err(original),
        };
    }

    result.map(|_| ())
}

fn stat_dir(backend: &dyn Backend, path: &[String]) -> Result<WccAttr, NfsError> {
    let joined = backend.join(path);
    let meta = backend.stat(&joined).map_err(NfsError::from_stat)?;
    if !meta.is_dir() {
        return Err(NfsError::with_source(
            NfsStatus::NotDir,
            format!("{} is not a directory", joined),
        ));
    }
    Ok(FileAttr::from_metadata(&meta, &joined).as_wcc())
}

/// Move handles for the old path over to the new one
fn retarget(
    handles: &dyn HandleManager,
    backend: &BackendRef,
    old_path: &[String],
    new_path: &[String],
) {
    if let Some(bulk) = handles.bulk_retarget() {
        bulk.update_handles_by_path(backend, old_path, new_path);
        return;
    }

    let handle = handles.to_handle(backend, old_path);
    if let Err(e) = handles.update_handle(backend, &handle, new_path) {
        tracing::warn!(%handle, error = %e, "could not retarget handle after rename, invalidating it");
        handles.invalidate_handle(&handle);
    }
}

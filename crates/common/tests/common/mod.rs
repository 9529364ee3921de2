//! Shared setup for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use bytes::BytesMut;

use ::common::backend::{BackendRef, MemoryBackend};
use ::common::handles::{CachingHandler, FileHandle, HandleManager};
use ::common::nfs::{DirOpArgs, RenameArgs};

/// Split a slash-separated path into components
pub fn path(p: &str) -> Vec<String> {
    p.split('/')
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// In-memory export holding `/docs/readme.txt` and `/a/c.txt`
pub fn setup_export(limit: usize) -> (MemoryBackend, BackendRef, Arc<CachingHandler>) {
    let fs = MemoryBackend::new();
    fs.create_dir("/docs").unwrap();
    fs.create_file("/docs/readme.txt", 64).unwrap();
    fs.create_dir("/a").unwrap();
    fs.create_file("/a/c.txt", 8).unwrap();
    fs.create_dir("/dest").unwrap();

    let backend: BackendRef = Arc::new(fs.clone());
    let handler = Arc::new(CachingHandler::new(limit));
    (fs, backend, handler)
}

pub fn handle_for(handler: &CachingHandler, backend: &BackendRef, p: &str) -> FileHandle {
    handler.to_handle(backend, &path(p))
}

/// Encoded RENAME3args
pub fn rename_request(
    from_dir: &FileHandle,
    from_name: &str,
    to_dir: &FileHandle,
    to_name: &str,
) -> Vec<u8> {
    let args = RenameArgs {
        from: DirOpArgs::new(from_dir.to_vec(), from_name),
        to: DirOpArgs::new(to_dir.to_vec(), to_name),
    };
    let mut buf = BytesMut::new();
    args.encode(&mut buf);
    buf.to_vec()
}

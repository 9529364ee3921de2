//! Stable NFS file handles for storage backends without inodes
//!
//! NFS is stateless: every request names its target with an opaque handle
//! that has to keep resolving across unrelated requests, including after the
//! object behind it is renamed. Most backends have no device + inode pair to
//! build such handles from, so this crate keeps the mapping itself.
//!
//! # Architecture
//!
//! - [`backend`]: the storage collaborator (`Backend`) plus in-memory and
//!   local-directory implementations
//! - [`handles`]: the bounded handle cache, the cookie verifier cache and the
//!   `CachingHandler` that protocol handlers talk to
//! - [`nfs`]: status codes, XDR primitives, attributes and the RENAME handler

pub mod backend;
pub mod handles;
pub mod nfs;

//! NFSv3 protocol pieces
//!
//! Only what the handle layer and RENAME need: status codes, XDR primitives,
//! attributes / WCC data, and the RENAME handler itself. RPC framing and the
//! other procedures live with the dispatcher.

pub mod attr;
pub mod rename;
mod status;
pub mod xdr;

pub use attr::{try_stat, FileAttr, FileType, NfsTime, WccAttr, WccData};
pub use rename::{handle_rename, rename, DirOpArgs, RenameArgs, RenameOk, RenameReply};
pub use status::{NfsError, NfsStatus};

use std::time::{Duration, Instant};

/// Per-request state handed to procedure handlers
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Past this point the request should not be started
    pub deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

//! Export state built from configuration
//!
//! One `ExportState` owns the backend for the configured root and the
//! `CachingHandler` shared by every request against it.

use std::path::PathBuf;
use std::sync::Arc;

use common::backend::{BackendRef, LocalBackend};
use common::handles::{CachingHandler, FileHandle, HandleManager};
use common::nfs::xdr::XdrError;
use common::nfs::{handle_rename, DirOpArgs, NfsError, RenameArgs, RenameReply, RequestContext};

use crate::service_config::Config;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("export root {0} does not exist")]
    MissingRoot(PathBuf),
    #[error("export root {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to resolve export root {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("path {0:?} has no final component to rename")]
    NoName(String),
    #[error("rename reply could not be decoded: {0}")]
    Reply(#[from] XdrError),
}

/// Result of a rename driven through the handle layer
#[derive(Debug)]
pub struct RenameOutcome {
    pub reply: RenameReply,
    /// Why the rename failed, when it did
    pub error: Option<NfsError>,
    pub from_dir: FileHandle,
    pub to_dir: FileHandle,
}

#[derive(Debug, Clone)]
pub struct ExportState {
    pub config: Config,
    pub root: PathBuf,
    pub backend: BackendRef,
    pub handler: Arc<CachingHandler>,
}

impl ExportState {
    /// Validate the export root and build its backend and caches
    pub fn from_config(config: Config) -> Result<Self, StateError> {
        let configured = config.export.root.clone();
        if !configured.exists() {
            return Err(StateError::MissingRoot(configured));
        }
        if !configured.is_dir() {
            return Err(StateError::NotADirectory(configured));
        }
        let root = configured
            .canonicalize()
            .map_err(|source| StateError::Canonicalize {
                path: configured.clone(),
                source,
            })?;

        let backend: BackendRef = Arc::new(LocalBackend::new(
            root.clone(),
            config.export.read_only,
        ));
        let handler = Arc::new(CachingHandler::with_verifier_limit(
            config.cache.handle_limit,
            config.cache.verifier_limit,
        ));

        tracing::info!(
            root = %root.display(),
            read_only = config.export.read_only,
            backend = %backend.id(),
            handle_limit = config.cache.handle_limit,
            verifier_limit = config.cache.verifier_limit,
            "export ready"
        );

        Ok(Self {
            config,
            root,
            backend,
            handler,
        })
    }

    /// Handle for a slash-separated path relative to the export root
    pub fn handle_for(&self, path: &str) -> FileHandle {
        self.handler.to_handle(&self.backend, &split_path(path))
    }

    /// Rename `from` to `to`, both relative to the export root
    ///
    /// The request goes through the same encode / handle / decode path a
    /// client's RENAME would. A failed rename is not an `Err` here: its status
    /// is in the returned reply.
    pub fn rename(&self, from: &str, to: &str) -> Result<RenameOutcome, StateError> {
        let (from_parent, from_name) = split_parent(from)?;
        let (to_parent, to_name) = split_parent(to)?;

        let from_dir = self.handler.to_handle(&self.backend, &from_parent);
        let to_dir = self.handler.to_handle(&self.backend, &to_parent);
        let request = encode_request(&from_dir, &from_name, &to_dir, &to_name);

        let mut sink = Vec::new();
        let error = handle_rename(
            &RequestContext::new(),
            &*self.handler,
            &request,
            &mut sink,
        )
        .err();
        if let Some(e) = &error {
            tracing::debug!(from, to, status = %e.status, "rename refused");
        }

        let reply = RenameReply::decode(&mut sink.as_slice())?;
        Ok(RenameOutcome {
            reply,
            error,
            from_dir,
            to_dir,
        })
    }
}

fn encode_request(
    from_dir: &FileHandle,
    from_name: &str,
    to_dir: &FileHandle,
    to_name: &str,
) -> Vec<u8> {
    let args = RenameArgs {
        from: DirOpArgs::new(from_dir.to_vec(), from_name),
        to: DirOpArgs::new(to_dir.to_vec(), to_name),
    };
    let mut buf = Vec::new();
    args.encode(&mut buf);
    buf
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_parent(path: &str) -> Result<(Vec<String>, String), StateError> {
    let mut components = split_path(path);
    let name = components
        .pop()
        .ok_or_else(|| StateError::NoName(path.to_string()))?;
    Ok((components, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parent() {
        let (parent, name) = split_parent("docs/notes/a.txt").unwrap();
        assert_eq!(parent, vec!["docs".to_string(), "notes".to_string()]);
        assert_eq!(name, "a.txt");

        let (parent, name) = split_parent("/top").unwrap();
        assert!(parent.is_empty());
        assert_eq!(name, "top");

        assert!(matches!(split_parent("/"), Err(StateError::NoName(_))));
    }

    #[test]
    fn test_missing_root() {
        let mut config = Config::default();
        config.export.root = PathBuf::from("/definitely/not/here");
        assert!(matches!(
            ExportState::from_config(config),
            Err(StateError::MissingRoot(_))
        ));
    }
}

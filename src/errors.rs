//! Typed failures surfaced by the repository core
//!
//! Core operations return `anyhow::Result` so that I/O failures can carry
//! context, but every failure the caller is expected to act on is raised as
//! a [`RepositoryError`] at the root of the error chain. Use
//! [`RepositoryError::find`] to recover it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// No object with that id exists in the object store.
    #[error("object {0} not found")]
    ObjectNotFound(String),

    /// The stored bytes do not hash back to the object's id or cannot be decoded.
    #[error("object {id} is corrupt: {reason}")]
    ObjectCorrupt { id: String, reason: String },

    #[error("pathspec '{0}' did not match any files")]
    FileNotFound(PathBuf),

    #[error("'{0}' is a directory")]
    PathIsDirectory(PathBuf),

    /// A path given to the working tree resolves to somewhere outside it.
    #[error("'{0}' is outside repository")]
    PathOutsideRepository(PathBuf),

    #[error("invalid object id '{0}'")]
    InvalidObjectId(String),

    #[error("short object id {0} is ambiguous")]
    AmbiguousObjectId(String),

    #[error("object {id} is a {actual}, not a {expected}")]
    UnexpectedObjectKind {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("unknown revision or ref '{0}'")]
    UnknownRef(String),

    /// Symbolic refs did not reach a direct ref within the hop limit.
    #[error("symbolic ref '{0}' is too deeply nested or cyclic")]
    RefCycle(String),

    #[error("branch '{0}' not found")]
    BranchNotFound(String),

    #[error("'{0}' is not a valid branch name")]
    InvalidBranchName(String),

    /// Index header, entries or checksum trailer could not be verified.
    #[error("index file is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("config key '{0}' not found")]
    ConfigKeyNotFound(String),

    #[error("not a nogit repository: {0}")]
    NotARepository(PathBuf),

    #[error("operation requires a working tree")]
    BareRepository,

    #[error("unsupported transport for '{0}': only local repositories can be cloned")]
    UnsupportedTransport(String),

    #[error("remote {0} already exists")]
    RemoteExists(String),

    #[error("'{0}' is not a valid remote name")]
    InvalidRemoteName(String),

    #[error("destination path '{0}' already exists and is not an empty directory")]
    DestinationExists(PathBuf),
}

impl RepositoryError {
    /// Locate the typed failure inside an `anyhow` error, looking through
    /// any context layers that were attached on the way up.
    pub fn find(error: &anyhow::Error) -> Option<&RepositoryError> {
        error
            .downcast_ref::<RepositoryError>()
            .or_else(|| error.chain().find_map(|cause| cause.downcast_ref()))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RepositoryError::FileNotFound(_)
            | RepositoryError::PathIsDirectory(_)
            | RepositoryError::ConfigKeyNotFound(_) => 1,
            _ => 128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn find_looks_through_context_layers() {
        let result: anyhow::Result<()> = Err(RepositoryError::RefCycle("HEAD".into()).into());
        let error = result
            .context("while resolving HEAD")
            .context("while running log")
            .unwrap_err();

        assert_eq!(
            RepositoryError::find(&error),
            Some(&RepositoryError::RefCycle("HEAD".into()))
        );
    }

    #[test]
    fn find_returns_none_for_foreign_errors() {
        let error = anyhow::anyhow!("plain failure");
        assert!(RepositoryError::find(&error).is_none());
    }
}

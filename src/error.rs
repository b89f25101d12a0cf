//! Error taxonomy for indexing and search operations.
//!
//! The first three variants are expected runtime conditions: they end the
//! current operation and are shown to the user as a status line. The rest
//! are genuine failures.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a project: {0}")]
    NotAProject(PathBuf),

    #[error("index is locked by another writer, try again later: {0}")]
    IndexLocked(PathBuf),

    #[error("no index found at {0}, run `phrasedex index` first")]
    IndexMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt index: {0}")]
    Corrupt(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] globset::Error),
}

impl Error {
    /// Conditions that are reported and retried rather than treated as failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NotAProject(_) | Error::IndexLocked(_) | Error::IndexMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_variants() {
        assert!(Error::IndexLocked(PathBuf::from("/tmp/x")).is_recoverable());
        assert!(Error::IndexMissing(PathBuf::from("/tmp/x")).is_recoverable());
        assert!(Error::NotAProject(PathBuf::from("/tmp/x")).is_recoverable());
        assert!(!Error::Corrupt("bad header".into()).is_recoverable());
    }

    #[test]
    fn test_missing_index_message_has_hint() {
        let msg = Error::IndexMissing(PathBuf::from("/p")).to_string();
        assert!(msg.contains("phrasedex index"));
    }
}

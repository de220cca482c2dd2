//! Package engine contract consumed by the pkgbridge ABI layer.
//!
//! The bridge treats the package engine as a black box: a target system with a
//! resolution pool, a repository manager, and a set of report channels through
//! which the engine asks questions and announces progress. This crate defines
//! that contract (`PackageEngine`, `RepoManager`, the report traits and their
//! engine-side default decisions) and ships `MemoryEngine`, a small in-memory
//! engine driven by a TOML world description.

pub mod engine;
pub mod lock;
pub mod memory;
pub mod options;
pub mod progress;
pub mod report;
pub mod types;
pub mod url;
pub mod world;

pub use engine::{EngineProvider, PackageEngine, RepoManager};
pub use lock::TargetLock;
pub use memory::{MemoryEngine, MemoryProvider};
pub use options::{KeyRingPolicy, RepoManagerOptions};
pub use progress::ProgressData;
pub use report::Reports;
pub use types::{
    CommitPolicy, CommitResult, DownloadMode, KeyContext, MountPoint, Pattern, PatternData,
    PublicKey, RepoInfo, ResKind, ResStatus, ServiceInfo, TransactBy,
};
pub use world::MemoryWorld;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("target error: {0}")]
    Target(String),
    #[error("target at {0} is locked by another process")]
    Locked(String),
    #[error("no target initialized")]
    NoTarget,
    #[error("repository '{0}' not found")]
    RepoNotFound(String),
    #[error("repository '{0}' already exists")]
    RepoAlreadyExists(String),
    #[error("service '{0}' not found")]
    ServiceNotFound(String),
    #[error("service '{0}' already exists")]
    ServiceAlreadyExists(String),
    #[error("malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },
    #[error("signature verification failed for {0}")]
    Signature(String),
    #[error("checksum verification failed for {0}")]
    Checksum(String),
    #[error("cache for repository '{0}' is missing, refresh and build it first")]
    CacheMissing(String),
    #[error("operation aborted: {0}")]
    Aborted(String),
    #[error("commit failed: {0}")]
    Commit(String),
    #[error("invalid key file {path}: {reason}")]
    KeyFile { path: String, reason: String },
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_entity() {
        let e = EngineError::RepoNotFound("oss".to_owned());
        assert_eq!(e.to_string(), "repository 'oss' not found");

        let e = EngineError::MalformedUrl {
            url: "no-scheme".to_owned(),
            reason: "missing scheme".to_owned(),
        };
        assert!(e.to_string().contains("no-scheme"));
        assert!(e.to_string().contains("missing scheme"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: EngineError = io.into();
        assert!(e.to_string().starts_with("engine I/O error"));
    }
}

//! Safe client for the pkgbridge C ABI.
//!
//! [`Session`] owns the process-wide context and exposes every entry point
//! as a method returning [`ClientResult`]. Callbacks are plain Rust traits
//! (see [`callbacks`]); a panic inside one is caught at the boundary and
//! answered conservatively.
//!
//! A session is neither `Send` nor `Sync`: the engine behind it must be
//! driven from one thread.

#![allow(unsafe_code)]

pub mod callbacks;
mod helpers;
mod session;
mod types;

pub use callbacks::DownloadProgress;
pub use session::Session;
pub use types::{MountPoint, PatternInfo, Repository, ResolvableKind, ResolvableSelected};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Failure reported through the status channel.
    #[error("{0}")]
    Bridge(String),
    #[error("Operation aborted")]
    Aborted,
    #[error("{what} contains an interior NUL byte")]
    InteriorNul { what: &'static str },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Install the bridge's stderr log subscriber (`PKGBRIDGE_LOG`).
pub fn init_logging() -> bool {
    pkgbridge_abi::ffi::init_logging()
}

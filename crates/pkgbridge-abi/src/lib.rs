//! C ABI bridge over the pkgbridge package engine.
//!
//! The engine talks in report traits, rich enums and `Result`s. Callers on
//! the other side of the boundary see plain data instead: flat callback
//! structs with one user-data pointer per slot, ABI-stable enums, and a
//! [`Status`] written by every fallible entry point.
//!
//! Ownership across the boundary follows two rules. Text handed to a
//! callback is borrowed for the duration of that call. Text and arrays
//! returned to the caller are owned by the caller and go back through the
//! matching `free_*` entry point.
//!
//! All entry points must be called from one thread at a time. The bridge
//! does not lock; callers serialize access themselves.

#![allow(unsafe_code)]

pub mod abi;
pub mod adapters;
pub mod callbacks;
pub mod context;
pub mod ffi;
pub mod logging;
pub mod provider;
pub mod registration;
pub mod status;
pub mod strings;
pub mod tables;
pub mod throttle;

pub use context::Context;
pub use registration::{Adapters, CallbackScope, Group};
pub use status::{Status, StatusState};
pub use strings::{BorrowedStr, OwnedStr};
pub use throttle::{ProgressThrottle, ThrottlePolicy};

use pkgbridge_engine::{EngineError, ResKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("target already initialized; call free_context first")]
    AlreadyInitialized,
    #[error("Internal Error: Repo manager is not initialized.")]
    ManagerNotInitialized,
    #[error("Cannot {action} repo with alias {alias}. Repo not found.")]
    RepoNotFound {
        action: &'static str,
        alias: String,
    },
    #[error("Cannot refresh service with alias {0}. Service not found.")]
    ServiceNotFound(String),
    #[error("Failed to find {kind} with name '{name}'")]
    ResolvableNotFound { kind: ResKind, name: String },
    #[error("Internal Error: Package tag is empty.")]
    EmptyPackageTag,
    #[error("Internal Error: Mount point not found.")]
    MountPointNotFound,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("internal error: {0}")]
    Panic(String),
}

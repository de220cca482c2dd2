//! Translation between engine enumerations and their ABI counterparts.
//!
//! Each mapping is a table of pairs plus the value used when a lookup misses.
//! Engine enumerations are non-exhaustive, so every engine-to-ABI table needs
//! a fallback; caller answers arrive as raw integers and need one too.

use std::ffi::c_uint;
use std::fmt::Debug;

use pkgbridge_engine::report::{
    Action, CheckPackageResult, DownloadError, InstallError, KeyTrust, PreloadError,
    ResolvableError,
};
use pkgbridge_engine::{ResKind, TransactBy};
use tracing::warn;

use crate::abi::{
    AbiEnum, DownloadProgressError, DownloadResolvableError, DownloadResolvableFileError,
    GpgCheckPackageResult, GpgKeyTrust, InstallPackageError, OptionalProblemResponse,
    ProblemResponse, ResolvableKind, ResolvableSelected,
};

/// A total mapping `F -> T`.
#[derive(Debug)]
pub struct EnumTable<F: 'static, T: 'static> {
    name: &'static str,
    pairs: &'static [(F, T)],
    fallback: T,
}

impl<F, T> EnumTable<F, T>
where
    F: Copy + PartialEq + Debug,
    T: Copy + PartialEq + Debug,
{
    pub const fn new(name: &'static str, pairs: &'static [(F, T)], fallback: T) -> Self {
        Self {
            name,
            pairs,
            fallback,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fallback(&self) -> T {
        self.fallback
    }

    pub fn lookup(&self, from: F) -> Option<T> {
        self.pairs
            .iter()
            .find(|(f, _)| *f == from)
            .map(|&(_, t)| t)
    }

    pub fn forward(&self, from: F) -> T {
        self.lookup(from).unwrap_or_else(|| {
            warn!(table = self.name, value = ?from, fallback = ?self.fallback, "unmapped enumerant");
            self.fallback
        })
    }

    /// First source value mapping to `to`.
    pub fn backward(&self, to: T) -> Option<F> {
        self.pairs
            .iter()
            .find(|(_, t)| *t == to)
            .map(|&(f, _)| f)
    }
}

impl<F, T> EnumTable<F, T>
where
    F: AbiEnum + PartialEq + Debug,
    T: Copy + PartialEq + Debug,
{
    /// Decode a raw caller answer and map it.
    pub fn forward_raw(&self, raw: c_uint) -> T {
        match F::from_raw(raw) {
            Some(from) => self.forward(from),
            None => {
                warn!(table = self.name, raw, fallback = ?self.fallback, "caller returned an invalid value");
                self.fallback
            }
        }
    }
}

/// A partial mapping for entry-point arguments: a miss is an invalid
/// argument, not a fallback.
#[derive(Debug)]
pub struct Selector<F: 'static, T: 'static> {
    name: &'static str,
    pairs: &'static [(F, T)],
}

impl<F, T> Selector<F, T>
where
    F: AbiEnum + PartialEq,
    T: Copy,
{
    pub const fn new(name: &'static str, pairs: &'static [(F, T)]) -> Self {
        Self { name, pairs }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, from: F) -> Option<T> {
        self.pairs
            .iter()
            .find(|(f, _)| *f == from)
            .map(|&(_, t)| t)
    }

    pub fn get_raw(&self, raw: c_uint) -> Option<T> {
        F::from_raw(raw).and_then(|from| self.get(from))
    }
}

pub static DOWNLOAD_ERROR: EnumTable<DownloadError, DownloadProgressError> = EnumTable::new(
    "download error",
    &[
        (DownloadError::NoError, DownloadProgressError::NoError),
        (DownloadError::NotFound, DownloadProgressError::NotFound),
        (DownloadError::Io, DownloadProgressError::Io),
        (DownloadError::AccessDenied, DownloadProgressError::AccessDenied),
        (DownloadError::Error, DownloadProgressError::Error),
    ],
    DownloadProgressError::Error,
);

pub static RESOLVABLE_ERROR: EnumTable<ResolvableError, DownloadResolvableError> = EnumTable::new(
    "resolvable error",
    &[
        (ResolvableError::NoError, DownloadResolvableError::NoError),
        (ResolvableError::NotFound, DownloadResolvableError::NotFound),
        (ResolvableError::Io, DownloadResolvableError::Io),
        (ResolvableError::Invalid, DownloadResolvableError::Invalid),
    ],
    DownloadResolvableError::Invalid,
);

pub static PRELOAD_ERROR: EnumTable<PreloadError, DownloadResolvableFileError> = EnumTable::new(
    "preload error",
    &[
        (PreloadError::NoError, DownloadResolvableFileError::NoError),
        (PreloadError::NotFound, DownloadResolvableFileError::NotFound),
        (PreloadError::Io, DownloadResolvableFileError::Io),
        (PreloadError::AccessDenied, DownloadResolvableFileError::AccessDenied),
        (PreloadError::Error, DownloadResolvableFileError::Error),
    ],
    DownloadResolvableFileError::Error,
);

pub static CHECK_RESULT: EnumTable<CheckPackageResult, GpgCheckPackageResult> = EnumTable::new(
    "package check result",
    &[
        (CheckPackageResult::Ok, GpgCheckPackageResult::Ok),
        (CheckPackageResult::NotFound, GpgCheckPackageResult::NotFound),
        (CheckPackageResult::Fail, GpgCheckPackageResult::Fail),
        (CheckPackageResult::NotTrusted, GpgCheckPackageResult::NotTrusted),
        (CheckPackageResult::NoKey, GpgCheckPackageResult::NoKey),
        (CheckPackageResult::Error, GpgCheckPackageResult::Error),
        (CheckPackageResult::NoSig, GpgCheckPackageResult::NoSig),
    ],
    GpgCheckPackageResult::Error,
);

pub static INSTALL_ERROR: EnumTable<InstallError, InstallPackageError> = EnumTable::new(
    "install error",
    &[
        (InstallError::NoError, InstallPackageError::NoError),
        (InstallError::NotFound, InstallPackageError::NotFound),
        (InstallError::Io, InstallPackageError::Io),
        (InstallError::Invalid, InstallPackageError::Invalid),
    ],
    InstallPackageError::Invalid,
);

pub static PROBLEM_ACTION: EnumTable<ProblemResponse, Action> = EnumTable::new(
    "problem response",
    &[
        (ProblemResponse::Retry, Action::Retry),
        (ProblemResponse::Abort, Action::Abort),
        (ProblemResponse::Ignore, Action::Ignore),
    ],
    Action::Abort,
);

/// `None` leaves the engine's own handling in place.
pub static OPTIONAL_ACTION: EnumTable<OptionalProblemResponse, Option<Action>> = EnumTable::new(
    "optional problem response",
    &[
        (OptionalProblemResponse::Retry, Some(Action::Retry)),
        (OptionalProblemResponse::Abort, Some(Action::Abort)),
        (OptionalProblemResponse::Ignore, Some(Action::Ignore)),
        (OptionalProblemResponse::None, None),
    ],
    Some(Action::Abort),
);

pub static KEY_TRUST: EnumTable<GpgKeyTrust, KeyTrust> = EnumTable::new(
    "key trust",
    &[
        (GpgKeyTrust::Reject, KeyTrust::DontTrust),
        (GpgKeyTrust::Temporary, KeyTrust::TrustTemporarily),
        (GpgKeyTrust::Import, KeyTrust::TrustAndImport),
    ],
    KeyTrust::DontTrust,
);

pub static KIND: Selector<ResolvableKind, ResKind> = Selector::new(
    "resolvable kind",
    &[
        (ResolvableKind::Product, ResKind::Product),
        (ResolvableKind::Patch, ResKind::Patch),
        (ResolvableKind::Package, ResKind::Package),
        (ResolvableKind::SrcPackage, ResKind::SrcPackage),
        (ResolvableKind::Pattern, ResKind::Pattern),
    ],
);

/// Who a selection request acts for. `NotSelected` is handled before the
/// lookup; `UserRemoved` is a state, never a causer.
pub static CAUSER: Selector<ResolvableSelected, TransactBy> = Selector::new(
    "selection causer",
    &[
        (ResolvableSelected::SolverSelected, TransactBy::Solver),
        (ResolvableSelected::ApplicationSelected, TransactBy::ApplHigh),
        (ResolvableSelected::UserSelected, TransactBy::User),
    ],
);

/// Selection state reported for `(to be installed, transact by)`.
pub static SELECTION: EnumTable<(bool, TransactBy), ResolvableSelected> = EnumTable::new(
    "selection state",
    &[
        ((true, TransactBy::User), ResolvableSelected::UserSelected),
        ((true, TransactBy::ApplHigh), ResolvableSelected::ApplicationSelected),
        ((true, TransactBy::ApplLow), ResolvableSelected::ApplicationSelected),
        ((true, TransactBy::Solver), ResolvableSelected::SolverSelected),
        ((false, TransactBy::User), ResolvableSelected::UserRemoved),
        ((false, TransactBy::ApplHigh), ResolvableSelected::NotSelected),
        ((false, TransactBy::ApplLow), ResolvableSelected::NotSelected),
        ((false, TransactBy::Solver), ResolvableSelected::NotSelected),
    ],
    ResolvableSelected::NotSelected,
);

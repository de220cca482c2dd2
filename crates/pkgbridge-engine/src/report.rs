//! Report channels through which the engine announces progress and asks for
//! decisions.
//!
//! Every channel is a trait whose provided methods are the engine's own
//! behavior when nobody is listening. A receiver overrides only what it wants
//! to see; a receiver that wants to defer a decision back to the engine calls
//! the matching function in [`defaults`].
//!
//! The engine-side enumerations are `#[non_exhaustive]`: they evolve with the
//! engine, independently of any consumer.

use serde::Deserialize;
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::progress::ProgressData;
use crate::types::{KeyContext, PublicKey};

/// Reaction to a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Action {
    Retry,
    Abort,
    Ignore,
}

impl Action {
    pub const ALL: &'static [Self] = &[Self::Retry, Self::Abort, Self::Ignore];
}

/// Failure of a single file download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DownloadError {
    NoError,
    NotFound,
    Io,
    AccessDenied,
    Error,
}

impl DownloadError {
    pub const ALL: &'static [Self] = &[
        Self::NoError,
        Self::NotFound,
        Self::Io,
        Self::AccessDenied,
        Self::Error,
    ];
}

/// Failure while providing a resolvable for installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ResolvableError {
    NoError,
    NotFound,
    Io,
    Invalid,
}

impl ResolvableError {
    pub const ALL: &'static [Self] = &[Self::NoError, Self::NotFound, Self::Io, Self::Invalid];
}

/// Outcome of preloading one package file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PreloadError {
    NoError,
    NotFound,
    Io,
    AccessDenied,
    Error,
}

impl PreloadError {
    pub const ALL: &'static [Self] = &[
        Self::NoError,
        Self::NotFound,
        Self::Io,
        Self::AccessDenied,
        Self::Error,
    ];
}

/// Result of the package database signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum CheckPackageResult {
    Ok,
    NotFound,
    Fail,
    NotTrusted,
    NoKey,
    Error,
    NoSig,
}

impl CheckPackageResult {
    pub const ALL: &'static [Self] = &[
        Self::Ok,
        Self::NotFound,
        Self::Fail,
        Self::NotTrusted,
        Self::NoKey,
        Self::Error,
        Self::NoSig,
    ];
}

impl fmt::Display for CheckPackageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "signature is OK",
            Self::NotFound => "signature is of unknown type",
            Self::Fail => "signature does not verify",
            Self::NotTrusted => "signature is OK but the key is not trusted",
            Self::NoKey => "public key is unavailable",
            Self::Error => "file does not exist or cannot be opened",
            Self::NoSig => "file has no signature",
        };
        f.write_str(text)
    }
}

/// Decision about a key the key ring does not know yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KeyTrust {
    DontTrust,
    TrustTemporarily,
    TrustAndImport,
}

impl KeyTrust {
    pub const ALL: &'static [Self] = &[
        Self::DontTrust,
        Self::TrustTemporarily,
        Self::TrustAndImport,
    ];
}

/// Failure while installing a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InstallError {
    NoError,
    NotFound,
    Io,
    Invalid,
}

impl InstallError {
    pub const ALL: &'static [Self] = &[Self::NoError, Self::NotFound, Self::Io, Self::Invalid];
}

/// Signature check outcome handed to [`DownloadResolvableReport::pkg_gpg_check`].
/// A receiver may set `action`; leaving it `None` keeps the engine's own
/// handling of a failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgGpgCheck<'a> {
    pub resolvable: &'a str,
    pub repo_url: &'a str,
    pub result: CheckPackageResult,
    pub action: Option<Action>,
}

/// What the engine does when nobody answers.
pub mod defaults {
    use super::{Action, KeyTrust};
    use crate::progress::ProgressData;
    use crate::types::{KeyContext, PublicKey};

    pub fn progress(_task: &ProgressData) -> bool {
        true
    }

    pub fn problem() -> Action {
        Action::Abort
    }

    pub fn accept_key(_key: &PublicKey, context: &KeyContext) -> KeyTrust {
        if context.policy.trust_key_temporarily {
            KeyTrust::TrustTemporarily
        } else if context.policy.trust_and_import_key {
            KeyTrust::TrustAndImport
        } else {
            KeyTrust::DontTrust
        }
    }

    pub fn accept_unsigned_file(_file: &str, context: &KeyContext) -> bool {
        context.policy.accept_unsigned_file
    }

    pub fn accept_unknown_key(_file: &str, _id: &str, context: &KeyContext) -> bool {
        context.policy.accept_unknown_key
    }

    pub fn accept_verification_failed(
        _file: &str,
        _key: &PublicKey,
        context: &KeyContext,
    ) -> bool {
        context.policy.accept_verification_failed
    }

    pub fn accept_digest() -> bool {
        false
    }
}

pub trait ProgressReport {
    fn start(&self, _task: &ProgressData) {}

    /// Return false to ask the engine to stop the task.
    fn progress(&self, task: &ProgressData) -> bool {
        defaults::progress(task)
    }

    fn finish(&self, _task: &ProgressData) {}
}

pub trait DownloadProgressReport {
    fn start(&self, _url: &str, _local_file: &Path) {}

    fn progress(&self, _value: i32, _url: &str, _bps_avg: f64, _bps_current: f64) -> bool {
        true
    }

    fn problem(&self, _url: &str, _error: DownloadError, _description: &str) -> Action {
        defaults::problem()
    }

    fn finish(&self, _url: &str, _error: DownloadError, _reason: &str) {}
}

pub trait DownloadResolvableReport {
    fn problem(&self, _resolvable: &str, _error: ResolvableError, _description: &str) -> Action {
        defaults::problem()
    }

    fn pkg_gpg_check(&self, _check: &mut PkgGpgCheck<'_>) {}
}

pub trait CommitPreloadReport {
    fn start(&self) {}

    fn file_done(
        &self,
        _local_file: &Path,
        _error: PreloadError,
        _url: Option<&str>,
        _description: Option<&str>,
    ) {
    }
}

pub trait KeyRingReport {
    fn accept_key(&self, key: &PublicKey, context: &KeyContext) -> KeyTrust {
        defaults::accept_key(key, context)
    }

    fn accept_unsigned_file(&self, file: &str, context: &KeyContext) -> bool {
        defaults::accept_unsigned_file(file, context)
    }

    fn accept_unknown_key(&self, file: &str, id: &str, context: &KeyContext) -> bool {
        defaults::accept_unknown_key(file, id, context)
    }

    fn accept_verification_failed(
        &self,
        file: &str,
        key: &PublicKey,
        context: &KeyContext,
    ) -> bool {
        defaults::accept_verification_failed(file, key, context)
    }
}

pub trait DigestReport {
    fn accept_no_digest(&self, _file: &Path) -> bool {
        defaults::accept_digest()
    }

    fn accept_unknown_digest(&self, _file: &Path, _name: &str) -> bool {
        defaults::accept_digest()
    }

    fn accept_wrong_digest(&self, _file: &Path, _requested: &str, _found: &str) -> bool {
        defaults::accept_digest()
    }
}

pub trait PatchScriptReport {
    fn problem(&self, _description: &str) -> Action {
        defaults::problem()
    }
}

pub trait InstallResolvableReport {
    fn start(&self, _resolvable: &str) {}

    fn problem(&self, _resolvable: &str, _error: InstallError, _description: &str) -> Action {
        defaults::problem()
    }

    fn finish(&self, _resolvable: &str, _error: InstallError, _install_info: &str) {}
}

/// Receiver that keeps every engine default.
#[derive(Debug, Default)]
pub struct DefaultReceiver;

impl ProgressReport for DefaultReceiver {}
impl DownloadProgressReport for DefaultReceiver {}
impl DownloadResolvableReport for DefaultReceiver {}
impl CommitPreloadReport for DefaultReceiver {}
impl KeyRingReport for DefaultReceiver {}
impl DigestReport for DefaultReceiver {}
impl PatchScriptReport for DefaultReceiver {}
impl InstallResolvableReport for DefaultReceiver {}

/// One report channel: at most one connected receiver, otherwise the defaults.
pub struct ReportSlot<R: ?Sized> {
    receiver: RefCell<Option<Rc<R>>>,
    fallback: Rc<R>,
}

impl<R: ?Sized> ReportSlot<R> {
    pub fn new(fallback: Rc<R>) -> Self {
        Self {
            receiver: RefCell::new(None),
            fallback,
        }
    }

    pub fn connect(&self, receiver: Rc<R>) {
        *self.receiver.borrow_mut() = Some(receiver);
    }

    pub fn disconnect(&self) {
        self.receiver.borrow_mut().take();
    }

    pub fn is_connected(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    /// Receiver to dispatch the next event to. The slot is not borrowed while
    /// the receiver runs, so a receiver may connect or disconnect others.
    pub fn get(&self) -> Rc<R> {
        self.receiver
            .borrow()
            .clone()
            .unwrap_or_else(|| Rc::clone(&self.fallback))
    }
}

/// All report channels of one engine instance.
pub struct Reports {
    pub progress: ReportSlot<dyn ProgressReport>,
    pub download_progress: ReportSlot<dyn DownloadProgressReport>,
    pub download_resolvable: ReportSlot<dyn DownloadResolvableReport>,
    pub commit_preload: ReportSlot<dyn CommitPreloadReport>,
    pub key_ring: ReportSlot<dyn KeyRingReport>,
    pub digest: ReportSlot<dyn DigestReport>,
    pub patch_script: ReportSlot<dyn PatchScriptReport>,
    pub install_resolvable: ReportSlot<dyn InstallResolvableReport>,
}

impl Default for Reports {
    fn default() -> Self {
        let receiver = Rc::new(DefaultReceiver);
        Self {
            progress: ReportSlot::new(receiver.clone()),
            download_progress: ReportSlot::new(receiver.clone()),
            download_resolvable: ReportSlot::new(receiver.clone()),
            commit_preload: ReportSlot::new(receiver.clone()),
            key_ring: ReportSlot::new(receiver.clone()),
            digest: ReportSlot::new(receiver.clone()),
            patch_script: ReportSlot::new(receiver.clone()),
            install_resolvable: ReportSlot::new(receiver),
        }
    }
}

impl Reports {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::KeyRingPolicy;
    use std::cell::Cell;

    fn key() -> PublicKey {
        PublicKey {
            id: "ABCD".to_owned(),
            name: "Example".to_owned(),
            fingerprint: "00ABCD".to_owned(),
        }
    }

    #[test]
    fn default_key_decision_follows_policy() {
        let mut context = KeyContext::default();
        assert_eq!(defaults::accept_key(&key(), &context), KeyTrust::DontTrust);

        context.policy = KeyRingPolicy {
            trust_and_import_key: true,
            ..KeyRingPolicy::default()
        };
        assert_eq!(defaults::accept_key(&key(), &context), KeyTrust::TrustAndImport);

        context.policy.trust_key_temporarily = true;
        assert_eq!(
            defaults::accept_key(&key(), &context),
            KeyTrust::TrustTemporarily
        );
    }

    #[test]
    fn unanswered_problems_abort() {
        let receiver = DefaultReceiver;
        assert_eq!(
            DownloadProgressReport::problem(&receiver, "u", DownloadError::Io, "d"),
            Action::Abort
        );
        assert_eq!(PatchScriptReport::problem(&receiver, "d"), Action::Abort);
        assert!(!receiver.accept_no_digest(Path::new("/f")));
    }

    struct Counting(Cell<u32>);

    impl ProgressReport for Counting {
        fn progress(&self, _task: &ProgressData) -> bool {
            self.0.set(self.0.get() + 1);
            false
        }
    }

    #[test]
    fn slot_dispatches_to_connected_receiver() {
        let reports = Reports::new();
        let task = ProgressData::new("t");
        assert!(reports.progress.get().progress(&task));

        let counting = Rc::new(Counting(Cell::new(0)));
        reports.progress.connect(counting.clone());
        assert!(reports.progress.is_connected());
        assert!(!reports.progress.get().progress(&task));
        assert_eq!(counting.0.get(), 1);

        reports.progress.disconnect();
        assert!(!reports.progress.is_connected());
        assert!(reports.progress.get().progress(&task));
        assert_eq!(counting.0.get(), 1);
    }
}

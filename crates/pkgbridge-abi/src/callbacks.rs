//! Flat callback structs supplied by the caller.
//!
//! Every slot carries its own user-data pointer. A missing slot (null
//! function pointer) keeps the engine's own behavior for that event. Every
//! string argument is borrowed and valid only until the callback returns.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::ptr;

use crate::abi::{
    DownloadProgressError, DownloadResolvableError, DownloadResolvableFileError,
    GpgCheckPackageResult, InstallPackageError, ProgressData,
};

/// Generic progress. Returning false asks the engine to stop.
pub type ProgressCallback =
    Option<unsafe extern "C" fn(data: ProgressData<'_>, user_data: *mut c_void) -> bool>;

/// Stage reporting during target initialization.
pub type InitProgressCallback = Option<
    unsafe extern "C" fn(text: *const c_char, stage: c_uint, total: c_uint, user_data: *mut c_void),
>;

pub type DownloadStartCallback = Option<
    unsafe extern "C" fn(url: *const c_char, local_file: *const c_char, user_data: *mut c_void),
>;
pub type DownloadProgressCallback = Option<
    unsafe extern "C" fn(
        value: c_int,
        url: *const c_char,
        bps_avg: f64,
        bps_current: f64,
        user_data: *mut c_void,
    ) -> bool,
>;
/// Returns a `ProblemResponse` value.
pub type DownloadProblemCallback = Option<
    unsafe extern "C" fn(
        url: *const c_char,
        error: DownloadProgressError,
        description: *const c_char,
        user_data: *mut c_void,
    ) -> c_uint,
>;
pub type DownloadFinishCallback = Option<
    unsafe extern "C" fn(
        url: *const c_char,
        error: DownloadProgressError,
        reason: *const c_char,
        user_data: *mut c_void,
    ),
>;

/// Single file downloads (repository metadata).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DownloadProgressCallbacks {
    pub start: DownloadStartCallback,
    pub start_data: *mut c_void,
    pub progress: DownloadProgressCallback,
    pub progress_data: *mut c_void,
    pub problem: DownloadProblemCallback,
    pub problem_data: *mut c_void,
    pub finish: DownloadFinishCallback,
    pub finish_data: *mut c_void,
}

impl Default for DownloadProgressCallbacks {
    fn default() -> Self {
        Self {
            start: None,
            start_data: ptr::null_mut(),
            progress: None,
            progress_data: ptr::null_mut(),
            problem: None,
            problem_data: ptr::null_mut(),
            finish: None,
            finish_data: ptr::null_mut(),
        }
    }
}

pub type PreloadStartCallback = Option<unsafe extern "C" fn(user_data: *mut c_void)>;
/// Returns a `ProblemResponse` value.
pub type ResolvableProblemCallback = Option<
    unsafe extern "C" fn(
        resolvable: *const c_char,
        error: DownloadResolvableError,
        description: *const c_char,
        user_data: *mut c_void,
    ) -> c_uint,
>;
/// Returns an `OptionalProblemResponse` value.
pub type GpgCheckCallback = Option<
    unsafe extern "C" fn(
        resolvable: *const c_char,
        repo_url: *const c_char,
        result: GpgCheckPackageResult,
        user_data: *mut c_void,
    ) -> c_uint,
>;
pub type FileFinishCallback = Option<
    unsafe extern "C" fn(
        url: *const c_char,
        local_path: *const c_char,
        error: DownloadResolvableFileError,
        details: *const c_char,
        user_data: *mut c_void,
    ),
>;

/// Package downloads during commit: preload notifications and download
/// problems, one logical stream.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DownloadResolvableCallbacks {
    pub start_preload: PreloadStartCallback,
    pub start_preload_data: *mut c_void,
    pub problem: ResolvableProblemCallback,
    pub problem_data: *mut c_void,
    pub gpg_check: GpgCheckCallback,
    pub gpg_check_data: *mut c_void,
    pub file_finish: FileFinishCallback,
    pub file_finish_data: *mut c_void,
}

impl Default for DownloadResolvableCallbacks {
    fn default() -> Self {
        Self {
            start_preload: None,
            start_preload_data: ptr::null_mut(),
            problem: None,
            problem_data: ptr::null_mut(),
            gpg_check: None,
            gpg_check_data: ptr::null_mut(),
            file_finish: None,
            file_finish_data: ptr::null_mut(),
        }
    }
}

/// Returns a `GpgKeyTrust` value.
pub type AcceptKeyCallback = Option<
    unsafe extern "C" fn(
        key_id: *const c_char,
        key_name: *const c_char,
        key_fingerprint: *const c_char,
        repository_alias: *const c_char,
        user_data: *mut c_void,
    ) -> c_uint,
>;
pub type UnsignedFileCallback = Option<
    unsafe extern "C" fn(
        file: *const c_char,
        repository_alias: *const c_char,
        user_data: *mut c_void,
    ) -> bool,
>;
pub type UnknownKeyCallback = Option<
    unsafe extern "C" fn(
        file: *const c_char,
        key_id: *const c_char,
        repository_alias: *const c_char,
        user_data: *mut c_void,
    ) -> bool,
>;
pub type VerificationFailedCallback = Option<
    unsafe extern "C" fn(
        file: *const c_char,
        key_id: *const c_char,
        key_name: *const c_char,
        key_fingerprint: *const c_char,
        repository_alias: *const c_char,
        user_data: *mut c_void,
    ) -> bool,
>;
pub type ChecksumMissingCallback =
    Option<unsafe extern "C" fn(file: *const c_char, user_data: *mut c_void) -> bool>;
pub type ChecksumWrongCallback = Option<
    unsafe extern "C" fn(
        file: *const c_char,
        expected: *const c_char,
        actual: *const c_char,
        user_data: *mut c_void,
    ) -> bool,
>;
pub type ChecksumUnknownCallback = Option<
    unsafe extern "C" fn(
        file: *const c_char,
        checksum: *const c_char,
        user_data: *mut c_void,
    ) -> bool,
>;

/// Key trust and digest decisions.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SecurityCallbacks {
    pub accept_key: AcceptKeyCallback,
    pub accept_key_data: *mut c_void,
    pub unsigned_file: UnsignedFileCallback,
    pub unsigned_file_data: *mut c_void,
    pub unknown_key: UnknownKeyCallback,
    pub unknown_key_data: *mut c_void,
    pub verification_failed: VerificationFailedCallback,
    pub verification_failed_data: *mut c_void,
    pub checksum_missing: ChecksumMissingCallback,
    pub checksum_missing_data: *mut c_void,
    pub checksum_wrong: ChecksumWrongCallback,
    pub checksum_wrong_data: *mut c_void,
    pub checksum_unknown: ChecksumUnknownCallback,
    pub checksum_unknown_data: *mut c_void,
}

impl Default for SecurityCallbacks {
    fn default() -> Self {
        Self {
            accept_key: None,
            accept_key_data: ptr::null_mut(),
            unsigned_file: None,
            unsigned_file_data: ptr::null_mut(),
            unknown_key: None,
            unknown_key_data: ptr::null_mut(),
            verification_failed: None,
            verification_failed_data: ptr::null_mut(),
            checksum_missing: None,
            checksum_missing_data: ptr::null_mut(),
            checksum_wrong: None,
            checksum_wrong_data: ptr::null_mut(),
            checksum_unknown: None,
            checksum_unknown_data: ptr::null_mut(),
        }
    }
}

/// Returns a `ProblemResponse` value.
pub type ScriptProblemCallback =
    Option<unsafe extern "C" fn(description: *const c_char, user_data: *mut c_void) -> c_uint>;
pub type PackageStartCallback =
    Option<unsafe extern "C" fn(package: *const c_char, user_data: *mut c_void)>;
/// Returns a `ProblemResponse` value.
pub type PackageProblemCallback = Option<
    unsafe extern "C" fn(
        package: *const c_char,
        error: InstallPackageError,
        description: *const c_char,
        user_data: *mut c_void,
    ) -> c_uint,
>;
pub type PackageFinishCallback = Option<
    unsafe extern "C" fn(
        package: *const c_char,
        error: InstallPackageError,
        install_info: *const c_char,
        user_data: *mut c_void,
    ),
>;

/// Package installation and patch scripts.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InstallCallbacks {
    pub script_problem: ScriptProblemCallback,
    pub script_problem_data: *mut c_void,
    pub package_start: PackageStartCallback,
    pub package_start_data: *mut c_void,
    pub package_problem: PackageProblemCallback,
    pub package_problem_data: *mut c_void,
    pub package_finish: PackageFinishCallback,
    pub package_finish_data: *mut c_void,
}

impl Default for InstallCallbacks {
    fn default() -> Self {
        Self {
            script_problem: None,
            script_problem_data: ptr::null_mut(),
            package_start: None,
            package_start_data: ptr::null_mut(),
            package_problem: None,
            package_problem_data: ptr::null_mut(),
            package_finish: None,
            package_finish_data: ptr::null_mut(),
        }
    }
}

//! Rust-side callbacks and the trampolines that hand them to the bridge.
//!
//! Each trait has default methods with conservative answers. A trampoline
//! receives a pointer to the implementor as its user data, so the callback
//! struct built from a trait object is only valid while that borrow lives.
//! Panics are caught in the trampoline and answered conservatively: abort,
//! reject, or stop.

pub mod install;
pub mod pkg_download;
pub mod security;

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};

use pkgbridge_abi::abi::{self, AbiEnum};
use pkgbridge_abi::callbacks::{DownloadProgressCallbacks, InitProgressCallback, ProgressCallback};
use tracing::error;

use crate::helpers::{as_c_void, string_from_ptr};

pub use pkgbridge_abi::abi::{DownloadProgressError, ProblemResponse};

/// Run a callback, answering `fallback` if it panics.
pub(crate) fn guard<R>(callback: &'static str, fallback: R, f: impl FnOnce() -> R) -> R {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        error!(callback, "callback panicked, answering conservatively");
        fallback
    })
}

/// Single file downloads, such as repository metadata.
pub trait DownloadProgress {
    fn start(&self, _url: &str, _local_file: &str) {}

    /// Return false to abort the download.
    fn progress(&self, _value: i32, _url: &str, _bps_avg: f64, _bps_current: f64) -> bool {
        true
    }

    fn problem(&self, _url: &str, _error: DownloadProgressError, _description: &str) -> ProblemResponse {
        ProblemResponse::Abort
    }

    fn finish(&self, _url: &str, _error: DownloadProgressError, _reason: &str) {}
}

/// Progress that does nothing and never aborts.
pub struct EmptyDownloadProgress;

impl DownloadProgress for EmptyDownloadProgress {}

unsafe extern "C" fn download_start<T: DownloadProgress>(
    url: *const c_char,
    local_file: *const c_char,
    user_data: *mut c_void,
) {
    let report = &*user_data.cast::<T>();
    let (url, local_file) = (string_from_ptr(url), string_from_ptr(local_file));
    guard("download start", (), || report.start(&url, &local_file));
}

unsafe extern "C" fn download_progress<T: DownloadProgress>(
    value: c_int,
    url: *const c_char,
    bps_avg: f64,
    bps_current: f64,
    user_data: *mut c_void,
) -> bool {
    let report = &*user_data.cast::<T>();
    let url = string_from_ptr(url);
    guard("download progress", false, || {
        report.progress(value, &url, bps_avg, bps_current)
    })
}

unsafe extern "C" fn download_problem<T: DownloadProgress>(
    url: *const c_char,
    error: DownloadProgressError,
    description: *const c_char,
    user_data: *mut c_void,
) -> c_uint {
    let report = &*user_data.cast::<T>();
    let (url, description) = (string_from_ptr(url), string_from_ptr(description));
    guard("download problem", ProblemResponse::Abort, || {
        report.problem(&url, error, &description)
    })
    .as_raw()
}

unsafe extern "C" fn download_finish<T: DownloadProgress>(
    url: *const c_char,
    error: DownloadProgressError,
    reason: *const c_char,
    user_data: *mut c_void,
) {
    let report = &*user_data.cast::<T>();
    let (url, reason) = (string_from_ptr(url), string_from_ptr(reason));
    guard("download finish", (), || report.finish(&url, error, &reason));
}

/// Callback struct dispatching to `report`. Valid while `report` is.
pub(crate) fn download_callbacks<T: DownloadProgress>(report: &T) -> DownloadProgressCallbacks {
    let data = as_c_void(report);
    DownloadProgressCallbacks {
        start: Some(download_start::<T>),
        start_data: data,
        progress: Some(download_progress::<T>),
        progress_data: data,
        problem: Some(download_problem::<T>),
        problem_data: data,
        finish: Some(download_finish::<T>),
        finish_data: data,
    }
}

unsafe extern "C" fn progress_trampoline<F>(data: abi::ProgressData<'_>, user_data: *mut c_void) -> bool
where
    F: FnMut(i64, String) -> bool,
{
    let closure = &mut *user_data.cast::<F>();
    let name = data.name.to_string_lossy().into_owned();
    guard("progress", false, || closure(data.value, name))
}

/// Generic progress slot calling `closure(value, task name)`.
pub(crate) fn progress_callback<F>(_closure: &F) -> ProgressCallback
where
    F: FnMut(i64, String) -> bool,
{
    Some(progress_trampoline::<F>)
}

unsafe extern "C" fn init_trampoline<F>(
    text: *const c_char,
    stage: c_uint,
    total: c_uint,
    user_data: *mut c_void,
) where
    F: FnMut(String, u32, u32),
{
    let closure = &mut *user_data.cast::<F>();
    let text = string_from_ptr(text);
    guard("init progress", (), || closure(text, stage, total));
}

pub(crate) fn init_callback<F>(_closure: &F) -> InitProgressCallback
where
    F: FnMut(String, u32, u32),
{
    Some(init_trampoline::<F>)
}

/// Progress closure that ignores everything and continues.
pub fn empty_progress(_value: i64, _text: String) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgbridge_abi::strings::c_text;
    use pkgbridge_abi::BorrowedStr;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        values: RefCell<Vec<i32>>,
    }

    impl DownloadProgress for Recorder {
        fn progress(&self, value: i32, _url: &str, _bps_avg: f64, _bps_current: f64) -> bool {
            self.values.borrow_mut().push(value);
            value < 50
        }

        fn problem(&self, _url: &str, _error: DownloadProgressError, _description: &str) -> ProblemResponse {
            panic!("no answer");
        }
    }

    #[test]
    fn download_trampolines_reach_the_trait() {
        let recorder = Recorder::default();
        let callbacks = download_callbacks(&recorder);
        let url = c_text("https://download.example.org/oss");
        unsafe {
            let progress = callbacks.progress.unwrap();
            assert!(progress(10, url.as_ptr(), 0.0, 0.0, callbacks.progress_data));
            assert!(!progress(60, url.as_ptr(), 0.0, 0.0, callbacks.progress_data));
            let problem = callbacks.problem.unwrap();
            let answer = problem(
                url.as_ptr(),
                DownloadProgressError::Io,
                std::ptr::null(),
                callbacks.problem_data,
            );
            assert_eq!(answer, ProblemResponse::Abort.as_raw());
        }
        assert_eq!(*recorder.values.borrow(), [10, 60]);
    }

    #[test]
    fn progress_closure_sees_task_names() {
        let mut seen = Vec::new();
        let mut closure = |value: i64, name: String| {
            seen.push((value, name));
            true
        };
        let callback = progress_callback(&closure).unwrap();
        let name = c_text("Refreshing");
        let data = abi::ProgressData {
            value: 40,
            name: BorrowedStr::new(&name),
        };
        assert!(unsafe { callback(data, (&raw mut closure).cast()) });
        assert_eq!(seen, [(40, "Refreshing".to_owned())]);
    }

    #[test]
    fn panicking_progress_stops() {
        let mut closure = |_value: i64, _name: String| -> bool { panic!("boom") };
        let callback = progress_callback(&closure).unwrap();
        let name = c_text("Refreshing");
        let data = abi::ProgressData {
            value: 1,
            name: BorrowedStr::new(&name),
        };
        assert!(!unsafe { callback(data, (&raw mut closure).cast()) });
    }
}

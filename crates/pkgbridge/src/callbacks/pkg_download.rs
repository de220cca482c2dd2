//! Package downloads during commit.
//!
//! Packages are preloaded first, then verified. The preload phase reports
//! its start and one result per file; the verification phase reports the
//! signature check of every package, including successful ones.

use std::ffi::{c_char, c_uint, c_void};

use pkgbridge_abi::abi::{AbiEnum, OptionalProblemResponse};
use pkgbridge_abi::callbacks::DownloadResolvableCallbacks;

use super::guard;
use crate::helpers::{as_c_void, string_from_ptr};

pub use pkgbridge_abi::abi::{
    DownloadResolvableError as DownloadError, DownloadResolvableFileError as PreloadError,
    GpgCheckPackageResult as GpgCheckResult, ProblemResponse,
};

pub trait Callback {
    fn start_preload(&self) {}

    fn problem(&self, _name: &str, _error: DownloadError, _description: &str) -> ProblemResponse {
        ProblemResponse::Abort
    }

    /// Called after the signature check of each package. `None` leaves the
    /// decision to the engine, which asks [`Callback::problem`] for failed
    /// checks.
    fn gpg_check(
        &self,
        _resolvable_name: &str,
        _repo_url: &str,
        _check_result: GpgCheckResult,
    ) -> Option<ProblemResponse> {
        None
    }

    fn finish_preload(&self, _url: &str, _local_path: &str, _error: PreloadError, _details: &str) {}
}

pub struct EmptyCallback;

impl Callback for EmptyCallback {}

fn optional_response(response: Option<ProblemResponse>) -> OptionalProblemResponse {
    match response {
        Some(ProblemResponse::Retry) => OptionalProblemResponse::Retry,
        Some(ProblemResponse::Abort) => OptionalProblemResponse::Abort,
        Some(ProblemResponse::Ignore) => OptionalProblemResponse::Ignore,
        None => OptionalProblemResponse::None,
    }
}

unsafe extern "C" fn start_preload<T: Callback>(user_data: *mut c_void) {
    let report = &*user_data.cast::<T>();
    guard("start preload", (), || report.start_preload());
}

unsafe extern "C" fn problem<T: Callback>(
    name: *const c_char,
    error: DownloadError,
    description: *const c_char,
    user_data: *mut c_void,
) -> c_uint {
    let report = &*user_data.cast::<T>();
    let (name, description) = (string_from_ptr(name), string_from_ptr(description));
    guard("package download problem", ProblemResponse::Abort, || {
        report.problem(&name, error, &description)
    })
    .as_raw()
}

unsafe extern "C" fn gpg_check<T: Callback>(
    name: *const c_char,
    repo_url: *const c_char,
    result: GpgCheckResult,
    user_data: *mut c_void,
) -> c_uint {
    let report = &*user_data.cast::<T>();
    let (name, repo_url) = (string_from_ptr(name), string_from_ptr(repo_url));
    let answer = guard("gpg check", Some(ProblemResponse::Abort), || {
        report.gpg_check(&name, &repo_url, result)
    });
    optional_response(answer).as_raw()
}

unsafe extern "C" fn file_finish<T: Callback>(
    url: *const c_char,
    local_path: *const c_char,
    error: PreloadError,
    details: *const c_char,
    user_data: *mut c_void,
) {
    let report = &*user_data.cast::<T>();
    let url = string_from_ptr(url);
    let local_path = string_from_ptr(local_path);
    let details = string_from_ptr(details);
    guard("preload finish", (), || {
        report.finish_preload(&url, &local_path, error, &details);
    });
}

pub(crate) fn callbacks<T: Callback>(report: &T) -> DownloadResolvableCallbacks {
    let data = as_c_void(report);
    DownloadResolvableCallbacks {
        start_preload: Some(start_preload::<T>),
        start_preload_data: data,
        problem: Some(problem::<T>),
        problem_data: data,
        gpg_check: Some(gpg_check::<T>),
        gpg_check_data: data,
        file_finish: Some(file_finish::<T>),
        file_finish_data: data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgbridge_abi::strings::c_text;

    struct Picky;

    impl Callback for Picky {
        fn gpg_check(&self, name: &str, _repo_url: &str, result: GpgCheckResult) -> Option<ProblemResponse> {
            match result {
                GpgCheckResult::Ok => None,
                _ if name == "vim" => Some(ProblemResponse::Ignore),
                _ => panic!("unexpected package {name}"),
            }
        }
    }

    #[test]
    fn gpg_answers_are_optional() {
        let picky = Picky;
        let callbacks = callbacks(&picky);
        let check = callbacks.gpg_check.unwrap();
        let url = c_text("https://download.example.org/oss");
        let ask = |name: &str, result| {
            let name = c_text(name);
            unsafe { check(name.as_ptr(), url.as_ptr(), result, callbacks.gpg_check_data) }
        };
        assert_eq!(ask("vim", GpgCheckResult::Ok), OptionalProblemResponse::None.as_raw());
        assert_eq!(ask("vim", GpgCheckResult::NoKey), OptionalProblemResponse::Ignore.as_raw());
        assert_eq!(ask("emacs", GpgCheckResult::Fail), OptionalProblemResponse::Abort.as_raw());
    }

    #[test]
    fn defaults_abort_problems() {
        let callbacks = callbacks(&EmptyCallback);
        let problem = callbacks.problem.unwrap();
        let name = c_text("vim");
        let answer = unsafe {
            problem(name.as_ptr(), DownloadError::Io, std::ptr::null(), callbacks.problem_data)
        };
        assert_eq!(answer, ProblemResponse::Abort.as_raw());
    }
}

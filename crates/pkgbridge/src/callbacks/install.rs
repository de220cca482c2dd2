//! Package installation and patch scripts during commit.

use std::ffi::{c_char, c_uint, c_void};

use pkgbridge_abi::abi::AbiEnum;
use pkgbridge_abi::callbacks::InstallCallbacks;

use super::guard;
use crate::helpers::{as_c_void, string_from_ptr};

pub use pkgbridge_abi::abi::{InstallPackageError as InstallError, ProblemResponse};

pub trait Callback {
    fn script_problem(&self, _description: &str) -> ProblemResponse {
        ProblemResponse::Abort
    }

    fn package_start(&self, _package: &str) {}

    fn package_problem(&self, _package: &str, _error: InstallError, _description: &str) -> ProblemResponse {
        ProblemResponse::Abort
    }

    fn package_finish(&self, _package: &str, _error: InstallError, _install_info: &str) {}
}

pub struct EmptyCallback;

impl Callback for EmptyCallback {}

unsafe extern "C" fn script_problem<T: Callback>(description: *const c_char, user_data: *mut c_void) -> c_uint {
    let report = &*user_data.cast::<T>();
    let description = string_from_ptr(description);
    guard("script problem", ProblemResponse::Abort, || {
        report.script_problem(&description)
    })
    .as_raw()
}

unsafe extern "C" fn package_start<T: Callback>(package: *const c_char, user_data: *mut c_void) {
    let report = &*user_data.cast::<T>();
    let package = string_from_ptr(package);
    guard("package start", (), || report.package_start(&package));
}

unsafe extern "C" fn package_problem<T: Callback>(
    package: *const c_char,
    error: InstallError,
    description: *const c_char,
    user_data: *mut c_void,
) -> c_uint {
    let report = &*user_data.cast::<T>();
    let (package, description) = (string_from_ptr(package), string_from_ptr(description));
    guard("package problem", ProblemResponse::Abort, || {
        report.package_problem(&package, error, &description)
    })
    .as_raw()
}

unsafe extern "C" fn package_finish<T: Callback>(
    package: *const c_char,
    error: InstallError,
    install_info: *const c_char,
    user_data: *mut c_void,
) {
    let report = &*user_data.cast::<T>();
    let (package, info) = (string_from_ptr(package), string_from_ptr(install_info));
    guard("package finish", (), || report.package_finish(&package, error, &info));
}

pub(crate) fn callbacks<T: Callback>(report: &T) -> InstallCallbacks {
    let data = as_c_void(report);
    InstallCallbacks {
        script_problem: Some(script_problem::<T>),
        script_problem_data: data,
        package_start: Some(package_start::<T>),
        package_start_data: data,
        package_problem: Some(package_problem::<T>),
        package_problem_data: data,
        package_finish: Some(package_finish::<T>),
        package_finish_data: data,
    }
}

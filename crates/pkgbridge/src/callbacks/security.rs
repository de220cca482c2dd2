//! Key trust and digest decisions.
//!
//! Every default rejects. A caller that wants the engine's own key ring
//! policy instead passes no security callbacks at all.

use std::ffi::{c_char, c_uint, c_void};

use pkgbridge_abi::abi::AbiEnum;
use pkgbridge_abi::callbacks::SecurityCallbacks;

use super::guard;
use crate::helpers::{as_c_void, string_from_ptr};

pub use pkgbridge_abi::abi::GpgKeyTrust;

/// Decision for one of the answer labels of a key trust question.
pub fn parse_key_trust(answer: &str) -> Option<GpgKeyTrust> {
    match answer {
        "Skip" => Some(GpgKeyTrust::Reject),
        "Temporary" => Some(GpgKeyTrust::Temporary),
        "Trust" => Some(GpgKeyTrust::Import),
        _ => None,
    }
}

pub trait Callback {
    fn accept_key(
        &self,
        _key_id: &str,
        _key_name: &str,
        _key_fingerprint: &str,
        _repository_alias: &str,
    ) -> GpgKeyTrust {
        GpgKeyTrust::Reject
    }

    /// Return true to accept the file.
    fn unsigned_file(&self, _file: &str, _repository_alias: &str) -> bool {
        false
    }

    fn unknown_key(&self, _file: &str, _key_id: &str, _repository_alias: &str) -> bool {
        false
    }

    fn verification_failed(
        &self,
        _file: &str,
        _key_id: &str,
        _key_name: &str,
        _key_fingerprint: &str,
        _repository_alias: &str,
    ) -> bool {
        false
    }

    fn checksum_missing(&self, _file: &str) -> bool {
        false
    }

    fn checksum_wrong(&self, _file: &str, _expected: &str, _actual: &str) -> bool {
        false
    }

    fn checksum_unknown(&self, _file: &str, _checksum: &str) -> bool {
        false
    }
}

pub struct EmptyCallback;

impl Callback for EmptyCallback {}

unsafe extern "C" fn accept_key<T: Callback>(
    key_id: *const c_char,
    key_name: *const c_char,
    key_fingerprint: *const c_char,
    repository_alias: *const c_char,
    user_data: *mut c_void,
) -> c_uint {
    let report = &*user_data.cast::<T>();
    let id = string_from_ptr(key_id);
    let name = string_from_ptr(key_name);
    let fingerprint = string_from_ptr(key_fingerprint);
    let alias = string_from_ptr(repository_alias);
    guard("accept key", GpgKeyTrust::Reject, || {
        report.accept_key(&id, &name, &fingerprint, &alias)
    })
    .as_raw()
}

unsafe extern "C" fn unsigned_file<T: Callback>(
    file: *const c_char,
    repository_alias: *const c_char,
    user_data: *mut c_void,
) -> bool {
    let report = &*user_data.cast::<T>();
    let (file, alias) = (string_from_ptr(file), string_from_ptr(repository_alias));
    guard("unsigned file", false, || report.unsigned_file(&file, &alias))
}

unsafe extern "C" fn unknown_key<T: Callback>(
    file: *const c_char,
    key_id: *const c_char,
    repository_alias: *const c_char,
    user_data: *mut c_void,
) -> bool {
    let report = &*user_data.cast::<T>();
    let file = string_from_ptr(file);
    let id = string_from_ptr(key_id);
    let alias = string_from_ptr(repository_alias);
    guard("unknown key", false, || report.unknown_key(&file, &id, &alias))
}

unsafe extern "C" fn verification_failed<T: Callback>(
    file: *const c_char,
    key_id: *const c_char,
    key_name: *const c_char,
    key_fingerprint: *const c_char,
    repository_alias: *const c_char,
    user_data: *mut c_void,
) -> bool {
    let report = &*user_data.cast::<T>();
    let file = string_from_ptr(file);
    let id = string_from_ptr(key_id);
    let name = string_from_ptr(key_name);
    let fingerprint = string_from_ptr(key_fingerprint);
    let alias = string_from_ptr(repository_alias);
    guard("verification failed", false, || {
        report.verification_failed(&file, &id, &name, &fingerprint, &alias)
    })
}

unsafe extern "C" fn checksum_missing<T: Callback>(file: *const c_char, user_data: *mut c_void) -> bool {
    let report = &*user_data.cast::<T>();
    let file = string_from_ptr(file);
    guard("checksum missing", false, || report.checksum_missing(&file))
}

unsafe extern "C" fn checksum_wrong<T: Callback>(
    file: *const c_char,
    expected: *const c_char,
    actual: *const c_char,
    user_data: *mut c_void,
) -> bool {
    let report = &*user_data.cast::<T>();
    let file = string_from_ptr(file);
    let expected = string_from_ptr(expected);
    let actual = string_from_ptr(actual);
    guard("checksum wrong", false, || {
        report.checksum_wrong(&file, &expected, &actual)
    })
}

unsafe extern "C" fn checksum_unknown<T: Callback>(
    file: *const c_char,
    checksum: *const c_char,
    user_data: *mut c_void,
) -> bool {
    let report = &*user_data.cast::<T>();
    let (file, checksum) = (string_from_ptr(file), string_from_ptr(checksum));
    guard("checksum unknown", false, || {
        report.checksum_unknown(&file, &checksum)
    })
}

pub(crate) fn callbacks<T: Callback>(report: &T) -> SecurityCallbacks {
    let data = as_c_void(report);
    SecurityCallbacks {
        accept_key: Some(accept_key::<T>),
        accept_key_data: data,
        unsigned_file: Some(unsigned_file::<T>),
        unsigned_file_data: data,
        unknown_key: Some(unknown_key::<T>),
        unknown_key_data: data,
        verification_failed: Some(verification_failed::<T>),
        verification_failed_data: data,
        checksum_missing: Some(checksum_missing::<T>),
        checksum_missing_data: data,
        checksum_wrong: Some(checksum_wrong::<T>),
        checksum_wrong_data: data,
        checksum_unknown: Some(checksum_unknown::<T>),
        checksum_unknown_data: data,
    }
}

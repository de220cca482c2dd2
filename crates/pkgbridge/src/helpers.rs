use std::ffi::{c_char, c_void, CStr, CString};

use pkgbridge_abi::Status;

use crate::{ClientError, ClientResult};

/// Turn a status written by an entry point into a result, releasing its
/// message.
pub(crate) fn status_to_result<T>(mut status: Status, value: T) -> ClientResult<T> {
    if status.is_ok() {
        return Ok(value);
    }
    let message = status
        .error
        .take()
        .unwrap_or_else(|| "unknown error".to_owned());
    Err(ClientError::Bridge(message))
}

pub(crate) fn c_string(text: &str, what: &'static str) -> ClientResult<CString> {
    CString::new(text).map_err(|_| ClientError::InteriorNul { what })
}

/// Copy borrowed callback text. Null reads as empty.
///
/// # Safety
///
/// `ptr` must be null or a NUL-terminated string valid for the call.
pub(crate) unsafe fn string_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

pub(crate) fn as_c_void<T>(value: &T) -> *mut c_void {
    (value as *const T).cast_mut().cast()
}

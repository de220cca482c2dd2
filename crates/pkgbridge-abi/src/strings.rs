//! Text crossing the boundary.
//!
//! Two types keep the ownership split explicit: [`BorrowedStr`] is a view
//! handed to a callback and valid only while that callback runs, and
//! [`OwnedStr`] is a buffer the bridge allocates for the caller, released
//! through exactly one of the `free_*` entry points.

use std::borrow::Cow;
use std::ffi::{c_char, CStr, CString};
use std::marker::PhantomData;
use std::ptr;

use crate::BridgeError;

/// Borrowed, NUL-terminated text. Null reads as the empty string.
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub struct BorrowedStr<'a> {
    ptr: *const c_char,
    _marker: PhantomData<&'a CStr>,
}

impl<'a> BorrowedStr<'a> {
    pub fn new(text: &'a CStr) -> Self {
        Self {
            ptr: text.as_ptr(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `ptr` must be null or point to a NUL-terminated string that stays
    /// valid for `'a`.
    pub unsafe fn from_ptr(ptr: *const c_char) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.ptr
    }

    pub fn to_string_lossy(&self) -> Cow<'a, str> {
        if self.ptr.is_null() {
            return Cow::Borrowed("");
        }
        // SAFETY: non-null and valid for 'a per construction.
        unsafe { CStr::from_ptr(self.ptr) }.to_string_lossy()
    }
}

/// NUL-terminated text allocated with the C allocator and owned by whoever
/// holds it. There is no `Drop`: ownership moves to the caller with the
/// enclosing struct and comes back through a `free_*` call.
#[repr(transparent)]
#[derive(Debug)]
pub struct OwnedStr(*mut c_char);

impl OwnedStr {
    /// Copy `text` into a fresh buffer. Interior NUL bytes are dropped.
    pub fn new(text: &str) -> Self {
        let bytes: Vec<u8> = text.bytes().filter(|&b| b != 0).collect();
        // SAFETY: the buffer has room for the bytes and the terminator.
        unsafe {
            let buffer = libc::malloc(bytes.len() + 1).cast::<u8>();
            if buffer.is_null() {
                return Self::null();
            }
            ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, bytes.len());
            *buffer.add(bytes.len()) = 0;
            Self(buffer.cast())
        }
    }

    pub const fn null() -> Self {
        Self(ptr::null_mut())
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.0
    }

    pub fn to_str(&self) -> Option<Cow<'_, str>> {
        if self.0.is_null() {
            return None;
        }
        // SAFETY: a non-null OwnedStr always holds a terminated buffer.
        Some(unsafe { CStr::from_ptr(self.0) }.to_string_lossy())
    }

    /// Copy the text out and release the buffer.
    pub fn take(&mut self) -> Option<String> {
        let text = self.to_str().map(Cow::into_owned);
        self.free();
        text
    }

    pub fn free(&mut self) {
        if !self.0.is_null() {
            // SAFETY: allocated by libc::malloc in `new`, released once.
            unsafe { libc::free(self.0.cast()) };
            self.0 = ptr::null_mut();
        }
    }
}

impl Default for OwnedStr {
    fn default() -> Self {
        Self::null()
    }
}

/// Text for a callback argument. Interior NUL bytes are dropped.
pub fn c_text(text: &str) -> CString {
    let bytes: Vec<u8> = text.bytes().filter(|&b| b != 0).collect();
    CString::new(bytes).unwrap_or_default()
}

/// Read a required string argument of an entry point.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string valid for `'a`.
pub unsafe fn c_arg<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str, BridgeError> {
    if ptr.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{what} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| BridgeError::InvalidArgument(format!("{what} is not valid UTF-8")))
}

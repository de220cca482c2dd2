//! The status channel: every entry point that can fail writes exactly one
//! [`Status`] through its out-pointer.

use std::borrow::Cow;
use std::error::Error;

use crate::strings::OwnedStr;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    Succeeded = 0,
    Failed = 1,
}

/// Outcome of one operation. `error` is null on success and owns a
/// non-empty message on failure; release it with `free_status`.
#[repr(C)]
#[derive(Debug)]
pub struct Status {
    pub state: StatusState,
    pub error: OwnedStr,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            state: StatusState::Succeeded,
            error: OwnedStr::null(),
        }
    }

    pub fn fail(message: &str) -> Self {
        let message = if message.is_empty() {
            "unknown error"
        } else {
            message
        };
        Self {
            state: StatusState::Failed,
            error: OwnedStr::new(message),
        }
    }

    pub fn from_error(error: &dyn Error) -> Self {
        Self::fail(&error.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.state == StatusState::Succeeded
    }

    pub fn message(&self) -> Option<Cow<'_, str>> {
        self.error.to_str()
    }

    /// Free the message. Only the first call releases anything.
    pub fn release(&mut self) {
        self.error.free();
    }

    /// Hand the status to the caller. Without an out-pointer the message is
    /// released here.
    ///
    /// # Safety
    ///
    /// `out` must be null or valid for writes. A previous message at `out` is
    /// overwritten, not freed.
    pub unsafe fn write_to(self, out: *mut Status) {
        if out.is_null() {
            let mut status = self;
            status.release();
            return;
        }
        out.write(self);
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

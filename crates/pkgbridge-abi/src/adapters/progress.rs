use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;

use pkgbridge_engine::report::{defaults, ProgressReport};
use pkgbridge_engine::ProgressData;

use crate::abi;
use crate::callbacks::ProgressCallback;
use crate::strings::{c_text, BorrowedStr};

/// Generic task progress. Start, progress and finish all reach the same
/// caller function; only the answer to `progress` matters to the engine.
#[derive(Debug)]
pub struct ProgressAdapter {
    callback: Cell<ProgressCallback>,
    user_data: Cell<*mut c_void>,
}

impl ProgressAdapter {
    pub fn new() -> Self {
        Self {
            callback: Cell::new(None),
            user_data: Cell::new(ptr::null_mut()),
        }
    }

    /// Adapter for a single call that takes its progress receiver directly.
    pub fn with_callback(callback: ProgressCallback, user_data: *mut c_void) -> Self {
        let adapter = Self::new();
        adapter.set(callback, user_data);
        adapter
    }

    pub fn set(&self, callback: ProgressCallback, user_data: *mut c_void) {
        self.callback.set(callback);
        self.user_data.set(user_data);
    }

    pub fn clear(&self) {
        self.set(None, ptr::null_mut());
    }

    pub fn is_set(&self) -> bool {
        self.callback.get().is_some()
    }

    fn send(&self, task: &ProgressData) -> Option<bool> {
        let callback = self.callback.get()?;
        let name = c_text(task.name());
        let data = abi::ProgressData {
            value: task.report_value(),
            name: BorrowedStr::new(&name),
        };
        // SAFETY: the caller keeps `user_data` valid while the callback is set.
        Some(unsafe { callback(data, self.user_data.get()) })
    }
}

impl Default for ProgressAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReport for ProgressAdapter {
    fn start(&self, task: &ProgressData) {
        self.send(task);
    }

    fn progress(&self, task: &ProgressData) -> bool {
        self.send(task).unwrap_or_else(|| defaults::progress(task))
    }

    fn finish(&self, task: &ProgressData) {
        self.send(task);
    }
}

use std::cell::Cell;
use std::path::Path;

use pkgbridge_engine::report::{defaults, Action, DownloadError, DownloadProgressReport};

use super::Binding;
use crate::callbacks::DownloadProgressCallbacks;
use crate::strings::c_text;
use crate::tables::{DOWNLOAD_ERROR, PROBLEM_ACTION};
use crate::throttle::{ProgressThrottle, ThrottlePolicy};

/// Single file downloads, with throttled progress.
#[derive(Debug)]
pub struct DownloadAdapter {
    pub binding: Binding<DownloadProgressCallbacks>,
    policy: ThrottlePolicy,
    throttle: Cell<ProgressThrottle>,
}

impl DownloadAdapter {
    pub fn new() -> Self {
        Self::with_policy(ThrottlePolicy::default())
    }

    pub fn with_policy(policy: ThrottlePolicy) -> Self {
        Self {
            binding: Binding::new("download progress"),
            policy,
            throttle: Cell::new(ProgressThrottle::new(policy)),
        }
    }
}

impl Default for DownloadAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadProgressReport for DownloadAdapter {
    fn start(&self, url: &str, local_file: &Path) {
        // Every download starts a fresh stream, listened to or not.
        self.throttle.set(ProgressThrottle::new(self.policy));
        let Some((start, data)) = self.binding.slot(|c| (c.start, c.start_data)) else {
            return;
        };
        let url = c_text(url);
        let local_file = c_text(&local_file.to_string_lossy());
        // SAFETY: slot and data come from the registered struct.
        unsafe { start(url.as_ptr(), local_file.as_ptr(), data) };
    }

    fn progress(&self, value: i32, url: &str, bps_avg: f64, bps_current: f64) -> bool {
        let Some((progress, data)) = self.binding.slot(|c| (c.progress, c.progress_data)) else {
            return true;
        };
        let mut throttle = self.throttle.get();
        let forward = throttle.check(value);
        self.throttle.set(throttle);
        if !forward {
            return true;
        }
        let url = c_text(url);
        // SAFETY: as above.
        unsafe { progress(value, url.as_ptr(), bps_avg, bps_current, data) }
    }

    fn problem(&self, url: &str, error: DownloadError, description: &str) -> Action {
        let Some((problem, data)) = self.binding.slot(|c| (c.problem, c.problem_data)) else {
            return defaults::problem();
        };
        let url = c_text(url);
        let description = c_text(description);
        // SAFETY: as above.
        let raw = unsafe {
            problem(
                url.as_ptr(),
                DOWNLOAD_ERROR.forward(error),
                description.as_ptr(),
                data,
            )
        };
        PROBLEM_ACTION.forward_raw(raw)
    }

    fn finish(&self, url: &str, error: DownloadError, reason: &str) {
        let Some((finish, data)) = self.binding.slot(|c| (c.finish, c.finish_data)) else {
            return;
        };
        let url = c_text(url);
        let reason = c_text(reason);
        // SAFETY: as above.
        unsafe { finish(url.as_ptr(), DOWNLOAD_ERROR.forward(error), reason.as_ptr(), data) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::DownloadProgressError;
    use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
    use std::time::Duration;

    #[derive(Default)]
    struct Seen {
        values: Vec<c_int>,
        finished: Vec<(DownloadProgressError, String)>,
    }

    unsafe extern "C" fn on_progress(
        value: c_int,
        _url: *const c_char,
        _bps_avg: f64,
        _bps_current: f64,
        user_data: *mut c_void,
    ) -> bool {
        (*user_data.cast::<Seen>()).values.push(value);
        true
    }

    unsafe extern "C" fn on_problem(
        _url: *const c_char,
        _error: DownloadProgressError,
        _description: *const c_char,
        user_data: *mut c_void,
    ) -> c_uint {
        *user_data.cast::<c_uint>()
    }

    unsafe extern "C" fn on_finish(
        _url: *const c_char,
        error: DownloadProgressError,
        reason: *const c_char,
        user_data: *mut c_void,
    ) {
        let reason = CStr::from_ptr(reason).to_string_lossy().into_owned();
        (*user_data.cast::<Seen>()).finished.push((error, reason));
    }

    fn slow_policy() -> ThrottlePolicy {
        ThrottlePolicy {
            interval: Duration::from_secs(3600),
            ..ThrottlePolicy::default()
        }
    }

    #[test]
    fn progress_is_throttled_per_download() {
        let mut seen = Seen::default();
        let callbacks = DownloadProgressCallbacks {
            progress: Some(on_progress),
            progress_data: (&raw mut seen).cast(),
            ..DownloadProgressCallbacks::default()
        };
        let adapter = DownloadAdapter::with_policy(slow_policy());
        unsafe { adapter.binding.bind(&callbacks) };

        adapter.start("https://example.org/repomd.xml", Path::new("/tmp/repomd.xml"));
        for value in [3, 5, 7, 50, 100] {
            assert!(adapter.progress(value, "u", 0.0, 0.0));
        }
        adapter.start("https://example.org/primary.xml", Path::new("/tmp/primary.xml"));
        adapter.progress(6, "u", 0.0, 0.0);
        adapter.binding.clear();

        assert_eq!(seen.values, [5, 50, 100, 6]);
    }

    #[test]
    fn problem_answers_are_translated() {
        let mut answer: c_uint = 2;
        let callbacks = DownloadProgressCallbacks {
            problem: Some(on_problem),
            problem_data: (&raw mut answer).cast(),
            ..DownloadProgressCallbacks::default()
        };
        let adapter = DownloadAdapter::new();
        unsafe { adapter.binding.bind(&callbacks) };
        assert_eq!(adapter.problem("u", DownloadError::Io, "d"), Action::Ignore);
        answer = 9;
        assert_eq!(adapter.problem("u", DownloadError::Io, "d"), Action::Abort);
        adapter.binding.clear();
    }

    #[test]
    fn unbound_adapter_keeps_engine_behavior() {
        let adapter = DownloadAdapter::new();
        adapter.start("u", Path::new("/f"));
        assert!(adapter.progress(50, "u", 0.0, 0.0));
        assert_eq!(
            adapter.problem("u", DownloadError::NotFound, "d"),
            defaults::problem()
        );

        unsafe { adapter.binding.bind(std::ptr::null()) };
        assert_eq!(adapter.problem("u", DownloadError::NotFound, "d"), Action::Abort);
        adapter.binding.clear();
    }

    #[test]
    fn finish_carries_reason() {
        let mut seen = Seen::default();
        let callbacks = DownloadProgressCallbacks {
            finish: Some(on_finish),
            finish_data: (&raw mut seen).cast(),
            ..DownloadProgressCallbacks::default()
        };
        let adapter = DownloadAdapter::new();
        unsafe { adapter.binding.bind(&callbacks) };
        adapter.finish("u", DownloadError::AccessDenied, "403 Forbidden");
        adapter.binding.clear();
        assert_eq!(
            seen.finished,
            [(DownloadProgressError::AccessDenied, "403 Forbidden".to_owned())]
        );
    }
}

use std::path::Path;

use pkgbridge_engine::report::{
    defaults, Action, CommitPreloadReport, DownloadResolvableReport, PkgGpgCheck, PreloadError,
    ResolvableError,
};

use super::Binding;
use crate::callbacks::DownloadResolvableCallbacks;
use crate::strings::c_text;
use crate::tables::{CHECK_RESULT, OPTIONAL_ACTION, PRELOAD_ERROR, PROBLEM_ACTION, RESOLVABLE_ERROR};

/// Package downloads during a commit. The engine reports download problems
/// and preloaded files on two channels; both are served from one struct.
#[derive(Debug)]
pub struct ResolvableAdapter {
    pub binding: Binding<DownloadResolvableCallbacks>,
}

impl ResolvableAdapter {
    pub fn new() -> Self {
        Self {
            binding: Binding::new("resolvable download"),
        }
    }
}

impl Default for ResolvableAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadResolvableReport for ResolvableAdapter {
    fn problem(&self, resolvable: &str, error: ResolvableError, description: &str) -> Action {
        let Some((problem, data)) = self.binding.slot(|c| (c.problem, c.problem_data)) else {
            return defaults::problem();
        };
        let resolvable = c_text(resolvable);
        let description = c_text(description);
        // SAFETY: slot and data come from the registered struct.
        let raw = unsafe {
            problem(
                resolvable.as_ptr(),
                RESOLVABLE_ERROR.forward(error),
                description.as_ptr(),
                data,
            )
        };
        PROBLEM_ACTION.forward_raw(raw)
    }

    fn pkg_gpg_check(&self, check: &mut PkgGpgCheck<'_>) {
        let Some((gpg_check, data)) = self.binding.slot(|c| (c.gpg_check, c.gpg_check_data)) else {
            return;
        };
        let resolvable = c_text(check.resolvable);
        let repo_url = c_text(check.repo_url);
        // SAFETY: as above.
        let raw = unsafe {
            gpg_check(
                resolvable.as_ptr(),
                repo_url.as_ptr(),
                CHECK_RESULT.forward(check.result),
                data,
            )
        };
        if let Some(action) = OPTIONAL_ACTION.forward_raw(raw) {
            check.action = Some(action);
        }
    }
}

impl CommitPreloadReport for ResolvableAdapter {
    fn start(&self) {
        if let Some((start, data)) = self
            .binding
            .slot(|c| (c.start_preload, c.start_preload_data))
        {
            // SAFETY: as above.
            unsafe { start(data) };
        }
    }

    fn file_done(
        &self,
        local_file: &Path,
        error: PreloadError,
        url: Option<&str>,
        description: Option<&str>,
    ) {
        let Some((file_finish, data)) = self
            .binding
            .slot(|c| (c.file_finish, c.file_finish_data))
        else {
            return;
        };
        let url = c_text(url.unwrap_or_default());
        let local_path = c_text(&local_file.to_string_lossy());
        let details = c_text(description.unwrap_or_default());
        // SAFETY: as above.
        unsafe {
            file_finish(
                url.as_ptr(),
                local_path.as_ptr(),
                PRELOAD_ERROR.forward(error),
                details.as_ptr(),
                data,
            );
        }
    }
}

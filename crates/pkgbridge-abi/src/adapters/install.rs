use pkgbridge_engine::report::{
    defaults, Action, InstallError, InstallResolvableReport, PatchScriptReport,
};

use super::Binding;
use crate::callbacks::InstallCallbacks;
use crate::strings::c_text;
use crate::tables::{INSTALL_ERROR, PROBLEM_ACTION};

/// Package installation and patch script problems.
#[derive(Debug)]
pub struct InstallAdapter {
    pub binding: Binding<InstallCallbacks>,
}

impl InstallAdapter {
    pub fn new() -> Self {
        Self {
            binding: Binding::new("install"),
        }
    }
}

impl Default for InstallAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchScriptReport for InstallAdapter {
    fn problem(&self, description: &str) -> Action {
        let Some((script_problem, data)) = self
            .binding
            .slot(|c| (c.script_problem, c.script_problem_data))
        else {
            return defaults::problem();
        };
        let description = c_text(description);
        // SAFETY: slot and data come from the registered struct.
        let raw = unsafe { script_problem(description.as_ptr(), data) };
        PROBLEM_ACTION.forward_raw(raw)
    }
}

impl InstallResolvableReport for InstallAdapter {
    fn start(&self, resolvable: &str) {
        if let Some((package_start, data)) = self
            .binding
            .slot(|c| (c.package_start, c.package_start_data))
        {
            let package = c_text(resolvable);
            // SAFETY: as above.
            unsafe { package_start(package.as_ptr(), data) };
        }
    }

    fn problem(&self, resolvable: &str, error: InstallError, description: &str) -> Action {
        let Some((package_problem, data)) = self
            .binding
            .slot(|c| (c.package_problem, c.package_problem_data))
        else {
            return defaults::problem();
        };
        let package = c_text(resolvable);
        let description = c_text(description);
        // SAFETY: as above.
        let raw = unsafe {
            package_problem(
                package.as_ptr(),
                INSTALL_ERROR.forward(error),
                description.as_ptr(),
                data,
            )
        };
        PROBLEM_ACTION.forward_raw(raw)
    }

    fn finish(&self, resolvable: &str, error: InstallError, install_info: &str) {
        if let Some((package_finish, data)) = self
            .binding
            .slot(|c| (c.package_finish, c.package_finish_data))
        {
            let package = c_text(resolvable);
            let install_info = c_text(install_info);
            // SAFETY: as above.
            unsafe {
                package_finish(
                    package.as_ptr(),
                    INSTALL_ERROR.forward(error),
                    install_info.as_ptr(),
                    data,
                );
            }
        }
    }
}

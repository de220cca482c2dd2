//! Registration of callback groups with the engine's report channels.
//!
//! A group is registered for the span of one operation. [`CallbackScope`]
//! ties that span to a Rust scope: whatever it registered is unregistered
//! when it drops, on success, on error, and while unwinding.

use std::ffi::c_void;
use std::rc::Rc;

use pkgbridge_engine::Reports;
use tracing::debug;

use crate::adapters::{
    DownloadAdapter, InstallAdapter, ProgressAdapter, ResolvableAdapter, SecurityAdapter,
};
use crate::callbacks::{
    DownloadProgressCallbacks, DownloadResolvableCallbacks, InstallCallbacks, ProgressCallback,
    SecurityCallbacks,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    DownloadProgress,
    DownloadResolvable,
    Security,
    Install,
}

/// The adapters of one context and the report channels they serve.
pub struct Adapters {
    progress: Rc<ProgressAdapter>,
    download: Rc<DownloadAdapter>,
    resolvable: Rc<ResolvableAdapter>,
    security: Rc<SecurityAdapter>,
    install: Rc<InstallAdapter>,
    reports: Rc<Reports>,
}

impl Adapters {
    pub fn new(reports: Rc<Reports>) -> Self {
        Self {
            progress: Rc::new(ProgressAdapter::new()),
            download: Rc::new(DownloadAdapter::new()),
            resolvable: Rc::new(ResolvableAdapter::new()),
            security: Rc::new(SecurityAdapter::new()),
            install: Rc::new(InstallAdapter::new()),
            reports,
        }
    }

    /// # Safety
    ///
    /// `callbacks` must be null or stay valid until the group is unset.
    pub unsafe fn set_download(&self, callbacks: *const DownloadProgressCallbacks) {
        self.download.binding.bind(callbacks);
        self.reports.download_progress.connect(self.download.clone());
        debug!("download progress callbacks registered");
    }

    /// Serves both the resolvable download and the commit preload channel.
    ///
    /// # Safety
    ///
    /// As for [`Adapters::set_download`].
    pub unsafe fn set_resolvable(&self, callbacks: *const DownloadResolvableCallbacks) {
        self.resolvable.binding.bind(callbacks);
        self.reports
            .download_resolvable
            .connect(self.resolvable.clone());
        self.reports.commit_preload.connect(self.resolvable.clone());
        debug!("resolvable download callbacks registered");
    }

    /// Serves both the key ring and the digest channel.
    ///
    /// # Safety
    ///
    /// As for [`Adapters::set_download`].
    pub unsafe fn set_security(&self, callbacks: *const SecurityCallbacks) {
        self.security.binding.bind(callbacks);
        self.reports.key_ring.connect(self.security.clone());
        self.reports.digest.connect(self.security.clone());
        debug!("security callbacks registered");
    }

    /// Serves both the patch script and the package install channel.
    ///
    /// # Safety
    ///
    /// As for [`Adapters::set_download`].
    pub unsafe fn set_install(&self, callbacks: *const InstallCallbacks) {
        self.install.binding.bind(callbacks);
        self.reports.patch_script.connect(self.install.clone());
        self.reports
            .install_resolvable
            .connect(self.install.clone());
        debug!("install callbacks registered");
    }

    /// Clear the group's pointer, then stop dispatching to it.
    pub fn unset(&self, group: Group) {
        match group {
            Group::DownloadProgress => {
                self.download.binding.clear();
                self.reports.download_progress.disconnect();
            }
            Group::DownloadResolvable => {
                self.resolvable.binding.clear();
                self.reports.download_resolvable.disconnect();
                self.reports.commit_preload.disconnect();
            }
            Group::Security => {
                self.security.binding.clear();
                self.reports.key_ring.disconnect();
                self.reports.digest.disconnect();
            }
            Group::Install => {
                self.install.binding.clear();
                self.reports.patch_script.disconnect();
                self.reports.install_resolvable.disconnect();
            }
        }
        debug!(?group, "callbacks unregistered");
    }

    pub fn is_registered(&self, group: Group) -> bool {
        match group {
            Group::DownloadProgress => self.download.binding.is_bound(),
            Group::DownloadResolvable => self.resolvable.binding.is_bound(),
            Group::Security => self.security.binding.is_bound(),
            Group::Install => self.install.binding.is_bound(),
        }
    }

    /// Generic progress stays registered until replaced or unset.
    pub fn set_progress(&self, callback: ProgressCallback, user_data: *mut c_void) {
        self.progress.set(callback, user_data);
        self.reports.progress.connect(self.progress.clone());
    }

    pub fn unset_progress(&self) {
        self.progress.clear();
        self.reports.progress.disconnect();
    }

    pub fn progress_registered(&self) -> bool {
        self.progress.is_set()
    }
}

/// Callback groups registered for the lifetime of the scope.
pub struct CallbackScope<'a> {
    adapters: &'a Adapters,
    groups: Vec<Group>,
}

impl<'a> CallbackScope<'a> {
    pub fn new(adapters: &'a Adapters) -> Self {
        Self {
            adapters,
            groups: Vec::with_capacity(3),
        }
    }

    /// # Safety
    ///
    /// `callbacks` must be null or outlive the scope.
    pub unsafe fn download(mut self, callbacks: *const DownloadProgressCallbacks) -> Self {
        self.adapters.set_download(callbacks);
        self.groups.push(Group::DownloadProgress);
        self
    }

    /// # Safety
    ///
    /// As for [`CallbackScope::download`].
    pub unsafe fn resolvable(mut self, callbacks: *const DownloadResolvableCallbacks) -> Self {
        self.adapters.set_resolvable(callbacks);
        self.groups.push(Group::DownloadResolvable);
        self
    }

    /// # Safety
    ///
    /// As for [`CallbackScope::download`].
    pub unsafe fn security(mut self, callbacks: *const SecurityCallbacks) -> Self {
        self.adapters.set_security(callbacks);
        self.groups.push(Group::Security);
        self
    }

    /// # Safety
    ///
    /// As for [`CallbackScope::download`].
    pub unsafe fn install(mut self, callbacks: *const InstallCallbacks) -> Self {
        self.adapters.set_install(callbacks);
        self.groups.push(Group::Install);
        self
    }
}

impl Drop for CallbackScope<'_> {
    fn drop(&mut self) {
        for group in self.groups.drain(..).rev() {
            self.adapters.unset(group);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgbridge_engine::report::{Action, DownloadError};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::path::Path;

    #[test]
    fn scope_unsets_in_reverse() {
        let reports = Rc::new(Reports::new());
        let adapters = Adapters::new(reports.clone());
        let security = SecurityCallbacks::default();
        {
            let _scope = unsafe {
                CallbackScope::new(&adapters)
                    .download(std::ptr::null())
                    .security(&security)
            };
            assert!(adapters.is_registered(Group::DownloadProgress));
            assert!(adapters.is_registered(Group::Security));
            assert!(reports.key_ring.is_connected());
            assert!(reports.digest.is_connected());
        }
        for group in [Group::DownloadProgress, Group::Security] {
            assert!(!adapters.is_registered(group));
        }
        assert!(!reports.download_progress.is_connected());
        assert!(!reports.key_ring.is_connected());
    }

    #[test]
    fn double_registration_unwinds_the_scope() {
        let reports = Rc::new(Reports::new());
        let adapters = Adapters::new(reports.clone());
        let result = catch_unwind(AssertUnwindSafe(|| unsafe {
            let _scope = CallbackScope::new(&adapters)
                .install(std::ptr::null())
                .download(std::ptr::null())
                .download(std::ptr::null());
        }));
        assert!(result.is_err());
        assert!(!adapters.is_registered(Group::Install));
        assert!(!adapters.is_registered(Group::DownloadProgress));
        assert!(!reports.install_resolvable.is_connected());
    }

    #[test]
    fn unset_group_falls_back_to_engine() {
        let reports = Rc::new(Reports::new());
        let adapters = Adapters::new(reports.clone());
        unsafe { adapters.set_download(std::ptr::null()) };
        let channel = reports.download_progress.get();
        adapters.unset(Group::DownloadProgress);
        // A receiver handed out before the unset no longer sees a struct.
        channel.start("u", Path::new("/f"));
        assert_eq!(
            reports
                .download_progress
                .get()
                .problem("u", DownloadError::Io, "d"),
            Action::Abort
        );
    }

    #[test]
    fn progress_callback_toggles() {
        let reports = Rc::new(Reports::new());
        let adapters = Adapters::new(reports.clone());
        adapters.set_progress(None, std::ptr::null_mut());
        assert!(reports.progress.is_connected());
        assert!(!adapters.progress_registered());
        adapters.unset_progress();
        assert!(!reports.progress.is_connected());
    }
}

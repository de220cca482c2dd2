use std::borrow::Cow;
use std::ffi::{c_char, c_uint, CString};

use pkgbridge_abi::abi::{self, AbiEnum, PatternNames};
use pkgbridge_abi::{ffi, Context, Status};
use tracing::debug;

use crate::callbacks::{self, install, pkg_download, security, DownloadProgress};
use crate::helpers::{c_string, status_to_result};
use crate::types::{MountPoint, PatternInfo, Repository, ResolvableKind, ResolvableSelected};
use crate::{ClientError, ClientResult};

/// The engine context of this process. Only one session can exist at a
/// time; dropping it releases the target.
#[derive(Debug)]
pub struct Session {
    ptr: *mut Context,
}

impl Session {
    /// Attach the target at `root`. `progress` receives the stage text, the
    /// stage index and the stage count.
    pub fn init_target<F>(root: &str, progress: F) -> ClientResult<Self>
    where
        F: FnMut(String, u32, u32),
    {
        let mut closure = progress;
        let callback = callbacks::init_callback(&closure);
        let root = c_string(root, "root")?;
        let mut status = Status::default();
        let ptr = unsafe {
            ffi::init_target(root.as_ptr(), &mut status, callback, (&raw mut closure).cast())
        };
        status_to_result(status, ())?;
        Ok(Self { ptr })
    }

    pub fn switch_target(&self, root: &str) -> ClientResult<()> {
        let root = c_string(root, "root")?;
        let mut status = Status::default();
        unsafe { ffi::switch_target(self.ptr, root.as_ptr(), &mut status) };
        status_to_result(status, ())
    }

    /// Run `op` with `progress` receiving the engine's generic progress
    /// reports, then unregister it.
    pub fn with_progress<F, R>(&self, progress: F, op: impl FnOnce(&Self) -> R) -> R
    where
        F: FnMut(i64, String) -> bool,
    {
        struct Unset(*mut Context);
        impl Drop for Unset {
            fn drop(&mut self) {
                unsafe { ffi::unset_progress_callback(self.0) };
            }
        }

        let mut closure = progress;
        let callback = callbacks::progress_callback(&closure);
        unsafe { ffi::set_progress_callback(self.ptr, callback, (&raw mut closure).cast()) };
        let _unset = Unset(self.ptr);
        op(self)
    }

    pub fn list_repositories(&self) -> ClientResult<Vec<Repository>> {
        let mut status = Status::default();
        let mut list = unsafe { ffi::list_repositories(self.ptr, &mut status) };
        let repos = if list.repos.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(list.repos, list.size as usize) }
                .iter()
                .map(|repo| Repository {
                    enabled: repo.enabled,
                    url: owned(&repo.url),
                    alias: owned(&repo.alias),
                    user_name: owned(&repo.user_name),
                    service_name: owned(&repo.service_name),
                })
                .collect()
        };
        unsafe { ffi::free_repository_list(&mut list) };
        status_to_result(status, repos)
    }

    pub fn add_repository<F>(&self, alias: &str, url: &str, progress: F) -> ClientResult<()>
    where
        F: FnMut(i64, String) -> bool,
    {
        let mut closure = progress;
        let callback = callbacks::progress_callback(&closure);
        let alias = c_string(alias, "alias")?;
        let url = c_string(url, "url")?;
        let mut status = Status::default();
        unsafe {
            ffi::add_repository(
                self.ptr,
                alias.as_ptr(),
                url.as_ptr(),
                &mut status,
                callback,
                (&raw mut closure).cast(),
            );
        }
        status_to_result(status, ())
    }

    pub fn disable_repository(&self, alias: &str) -> ClientResult<()> {
        let alias = c_string(alias, "alias")?;
        let mut status = Status::default();
        unsafe { ffi::disable_repository(self.ptr, alias.as_ptr(), &mut status) };
        status_to_result(status, ())
    }

    pub fn set_repository_url(&self, alias: &str, url: &str) -> ClientResult<()> {
        let alias = c_string(alias, "alias")?;
        let url = c_string(url, "url")?;
        let mut status = Status::default();
        unsafe { ffi::set_repository_url(self.ptr, alias.as_ptr(), url.as_ptr(), &mut status) };
        status_to_result(status, ())
    }

    pub fn remove_repository<F>(&self, alias: &str, progress: F) -> ClientResult<()>
    where
        F: FnMut(i64, String) -> bool,
    {
        let mut closure = progress;
        let callback = callbacks::progress_callback(&closure);
        let alias = c_string(alias, "alias")?;
        let mut status = Status::default();
        unsafe {
            ffi::remove_repository(
                self.ptr,
                alias.as_ptr(),
                &mut status,
                callback,
                (&raw mut closure).cast(),
            );
        }
        status_to_result(status, ())
    }

    /// Refresh metadata. Key and digest questions get the engine's key
    /// ring policy.
    pub fn refresh_repository(&self, alias: &str, progress: &impl DownloadProgress) -> ClientResult<()> {
        let download = callbacks::download_callbacks(progress);
        self.refresh(alias, &download, std::ptr::null())
    }

    /// Refresh metadata, asking `security` about keys and digests.
    pub fn refresh_repository_with_security(
        &self,
        alias: &str,
        progress: &impl DownloadProgress,
        security: &impl security::Callback,
    ) -> ClientResult<()> {
        let download = callbacks::download_callbacks(progress);
        let security = security::callbacks(security);
        self.refresh(alias, &download, &security)
    }

    fn refresh(
        &self,
        alias: &str,
        download: *const pkgbridge_abi::callbacks::DownloadProgressCallbacks,
        security: *const pkgbridge_abi::callbacks::SecurityCallbacks,
    ) -> ClientResult<()> {
        let alias = c_string(alias, "alias")?;
        let mut status = Status::default();
        unsafe { ffi::refresh_repository(self.ptr, alias.as_ptr(), &mut status, download, security) };
        status_to_result(status, ())
    }

    pub fn create_repo_cache<F>(&self, alias: &str, progress: F) -> ClientResult<()>
    where
        F: FnMut(i64, String) -> bool,
    {
        let mut closure = progress;
        let callback = callbacks::progress_callback(&closure);
        let alias = c_string(alias, "alias")?;
        let mut status = Status::default();
        unsafe {
            ffi::build_repository_cache(
                self.ptr,
                alias.as_ptr(),
                &mut status,
                callback,
                (&raw mut closure).cast(),
            );
        }
        status_to_result(status, ())
    }

    pub fn load_repo_cache(&self, alias: &str) -> ClientResult<()> {
        let alias = c_string(alias, "alias")?;
        let mut status = Status::default();
        unsafe { ffi::load_repository_cache(self.ptr, alias.as_ptr(), &mut status) };
        status_to_result(status, ())
    }

    pub fn add_service(&self, alias: &str, url: &str) -> ClientResult<()> {
        let alias = c_string(alias, "alias")?;
        let url = c_string(url, "url")?;
        let mut status = Status::default();
        unsafe { ffi::add_service(self.ptr, alias.as_ptr(), url.as_ptr(), &mut status) };
        status_to_result(status, ())
    }

    /// Bring in the repositories the service lists. They show up in
    /// [`Session::list_repositories`] with `service_name` set.
    pub fn refresh_service(&self, alias: &str) -> ClientResult<()> {
        let alias = c_string(alias, "alias")?;
        let mut status = Status::default();
        unsafe { ffi::refresh_service(self.ptr, alias.as_ptr(), &mut status) };
        status_to_result(status, ())
    }

    /// Refresh, build and load every enabled repository. `progress`
    /// receives a percentage and a step description; returning false stops
    /// before the next step with [`ClientError::Aborted`].
    pub fn load_source<F>(&self, progress: F) -> ClientResult<()>
    where
        F: Fn(i64, String) -> bool,
    {
        let repos = self.list_repositories()?;
        let enabled: Vec<&Repository> = repos.iter().filter(|r| r.enabled).collect();
        let mut steps = Steps::new(enabled.len() * 3);

        for repo in enabled {
            steps.report(&progress, format!("Refreshing repository {}", repo.alias))?;
            self.refresh_repository(&repo.alias, &callbacks::EmptyDownloadProgress)?;
            steps.report(&progress, format!("Creating repository cache for {}", repo.alias))?;
            self.create_repo_cache(&repo.alias, callbacks::empty_progress)?;
            steps.report(&progress, format!("Loading repository cache for {}", repo.alias))?;
            self.load_repo_cache(&repo.alias)?;
        }
        progress(100, "Loading repositories finished".to_owned());
        Ok(())
    }

    pub fn select_resolvable(
        &self,
        name: &str,
        kind: ResolvableKind,
        who: ResolvableSelected,
    ) -> ClientResult<()> {
        let name = c_string(name, "name")?;
        let (kind, who) = raw_selection(kind, who);
        let mut status = Status::default();
        unsafe { ffi::resolvable_select(self.ptr, name.as_ptr(), kind, who, &mut status) };
        status_to_result(status, ())
    }

    pub fn unselect_resolvable(
        &self,
        name: &str,
        kind: ResolvableKind,
        who: ResolvableSelected,
    ) -> ClientResult<()> {
        let name = c_string(name, "name")?;
        let (kind, who) = raw_selection(kind, who);
        let mut status = Status::default();
        unsafe { ffi::resolvable_unselect(self.ptr, name.as_ptr(), kind, who, &mut status) };
        status_to_result(status, ())
    }

    pub fn reset_resolvables(&self) {
        unsafe { ffi::resolvable_reset_all(self.ptr) };
    }

    /// False when the solver left problems unresolved.
    pub fn run_solver(&self, only_required: bool) -> ClientResult<bool> {
        let mut status = Status::default();
        let solved = unsafe { ffi::run_solver(self.ptr, only_required, &mut status) };
        status_to_result(status, solved)
    }

    pub fn packages_to_install(&self) -> ClientResult<u32> {
        let mut status = Status::default();
        let count = unsafe { ffi::packages_to_install(self.ptr, &mut status) };
        status_to_result(status, count)
    }

    pub fn is_package_selected(&self, tag: &str) -> ClientResult<bool> {
        let tag = c_string(tag, "tag")?;
        let mut status = Status::default();
        let selected = unsafe { ffi::is_package_selected(self.ptr, tag.as_ptr(), &mut status) };
        status_to_result(status, selected)
    }

    pub fn is_package_available(&self, tag: &str) -> ClientResult<bool> {
        let tag = c_string(tag, "tag")?;
        let mut status = Status::default();
        let available = unsafe { ffi::is_package_available(self.ptr, tag.as_ptr(), &mut status) };
        status_to_result(status, available)
    }

    /// Details of the named patterns; unknown names are left out.
    pub fn patterns_info(&self, names: &[&str]) -> ClientResult<Vec<PatternInfo>> {
        let c_names = names
            .iter()
            .map(|name| c_string(name, "pattern name"))
            .collect::<ClientResult<Vec<CString>>>()?;
        let pointers: Vec<*const c_char> = c_names.iter().map(|name| name.as_ptr()).collect();
        let request = PatternNames {
            names: pointers.as_ptr(),
            size: count(pointers.len())?,
        };
        let mut status = Status::default();
        let mut infos = unsafe { ffi::get_patterns_info(self.ptr, request, &mut status) };
        let patterns = if infos.infos.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(infos.infos, infos.size as usize) }
                .iter()
                .map(|info| PatternInfo {
                    name: owned(&info.name),
                    category: owned(&info.category),
                    icon: owned(&info.icon),
                    description: owned(&info.description),
                    summary: owned(&info.summary),
                    order: owned(&info.order),
                    selected: info.selected.into(),
                })
                .collect()
        };
        unsafe { ffi::free_pattern_infos(&mut infos) };
        status_to_result(status, patterns)
    }

    pub fn import_gpg_key(&self, file_path: &str) -> ClientResult<()> {
        let path = c_string(file_path, "key path")?;
        let mut status = Status::default();
        unsafe { ffi::import_gpg_key(self.ptr, path.as_ptr(), &mut status) };
        status_to_result(status, ())
    }

    /// Space the pending transaction uses below each mount point.
    pub fn count_disk_usage(&self, mut mount_points: Vec<MountPoint>) -> ClientResult<Vec<MountPoint>> {
        // The C strings must outlive the call.
        let directories = mount_points
            .iter()
            .map(|mp| c_string(&mp.directory, "mount point directory"))
            .collect::<ClientResult<Vec<_>>>()?;
        let filesystems = mount_points
            .iter()
            .map(|mp| c_string(&mp.filesystem, "filesystem"))
            .collect::<ClientResult<Vec<_>>>()?;
        let mut raw: Vec<abi::MountPoint> = mount_points
            .iter()
            .zip(directories.iter().zip(&filesystems))
            .map(|(mp, (directory, filesystem))| abi::MountPoint {
                directory: directory.as_ptr(),
                filesystem: filesystem.as_ptr(),
                grow_only: mp.grow_only,
                used_size: 0,
            })
            .collect();

        let mut status = Status::default();
        let size = count(raw.len())?;
        unsafe { ffi::get_space_usage(self.ptr, &mut status, raw.as_mut_ptr(), size) };
        status_to_result(status, ())?;
        for (mount_point, computed) in mount_points.iter_mut().zip(&raw) {
            mount_point.used_size = computed.used_size;
        }
        Ok(mount_points)
    }

    /// Install the pending transaction. `Ok(false)` means it finished but
    /// some problems were ignored.
    pub fn commit(
        &self,
        download: &impl pkg_download::Callback,
        security: &impl security::Callback,
        install: &impl install::Callback,
    ) -> ClientResult<bool> {
        let download = pkg_download::callbacks(download);
        let security = security::callbacks(security);
        let install = install::callbacks(install);
        let mut status = Status::default();
        let no_error = unsafe { ffi::commit(self.ptr, &mut status, &download, &security, &install) };
        status_to_result(status, no_error)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("releasing session");
        unsafe { ffi::free_context(self.ptr) };
    }
}

fn owned(text: &pkgbridge_abi::OwnedStr) -> String {
    text.to_str().map(Cow::into_owned).unwrap_or_default()
}

fn count(len: usize) -> ClientResult<c_uint> {
    c_uint::try_from(len).map_err(|_| ClientError::Bridge(format!("too many entries: {len}")))
}

fn raw_selection(kind: ResolvableKind, who: ResolvableSelected) -> (c_uint, c_uint) {
    let kind: abi::ResolvableKind = kind.into();
    let who: abi::ResolvableSelected = who.into();
    (kind.as_raw(), who.as_raw())
}

/// Percent bookkeeping for a fixed number of equal steps.
struct Steps {
    percent: f64,
    step: f64,
}

impl Steps {
    fn new(total: usize) -> Self {
        Self {
            percent: 0.0,
            step: if total == 0 { 0.0 } else { 100.0 / total as f64 },
        }
    }

    /// Announce the next step; false from `progress` aborts.
    fn report(&mut self, progress: &impl Fn(i64, String) -> bool, text: String) -> ClientResult<()> {
        let current = self.percent.floor() as i64;
        self.percent += self.step;
        if progress(current, text) {
            Ok(())
        } else {
            Err(ClientError::Aborted)
        }
    }
}

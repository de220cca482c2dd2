use std::ffi::{c_char, c_void};

use pkgbridge_engine::RepoInfo;

use super::{context_mut, context_ref, guarded};
use crate::abi::{Repository, RepositoryList};
use crate::adapters::ProgressAdapter;
use crate::callbacks::{DownloadProgressCallbacks, ProgressCallback, SecurityCallbacks};
use crate::status::Status;
use crate::strings::{c_arg, OwnedStr};
use crate::Context;

fn repository(info: &RepoInfo) -> Repository {
    Repository {
        enabled: info.enabled,
        url: OwnedStr::new(&info.url),
        alias: OwnedStr::new(&info.alias),
        user_name: OwnedStr::new(&info.as_user_string()),
        service_name: OwnedStr::new(&info.service),
    }
}

/// Known repositories. Release with [`free_repository_list`].
#[no_mangle]
pub unsafe extern "C" fn list_repositories(
    ctx: *mut Context,
    status: *mut Status,
) -> RepositoryList {
    guarded(status, RepositoryList::empty(), || {
        let repos = context_ref(ctx)?.list_repositories()?;
        Ok(RepositoryList::new(repos.iter().map(repository).collect()))
    })
}

#[no_mangle]
pub unsafe extern "C" fn free_repository_list(list: *mut RepositoryList) {
    if let Some(list) = list.as_mut() {
        list.release();
    }
}

#[no_mangle]
pub unsafe extern "C" fn add_repository(
    ctx: *mut Context,
    alias: *const c_char,
    url: *const c_char,
    status: *mut Status,
    progress: ProgressCallback,
    user_data: *mut c_void,
) {
    guarded(status, (), || {
        let context = context_mut(ctx)?;
        let progress = ProgressAdapter::with_callback(progress, user_data);
        context.add_repository(c_arg(alias, "alias")?, c_arg(url, "url")?, &progress)
    });
}

#[no_mangle]
pub unsafe extern "C" fn disable_repository(
    ctx: *mut Context,
    alias: *const c_char,
    status: *mut Status,
) {
    guarded(status, (), || {
        context_mut(ctx)?.disable_repository(c_arg(alias, "alias")?)
    });
}

#[no_mangle]
pub unsafe extern "C" fn set_repository_url(
    ctx: *mut Context,
    alias: *const c_char,
    url: *const c_char,
    status: *mut Status,
) {
    guarded(status, (), || {
        context_mut(ctx)?.set_repository_url(c_arg(alias, "alias")?, c_arg(url, "url")?)
    });
}

#[no_mangle]
pub unsafe extern "C" fn remove_repository(
    ctx: *mut Context,
    alias: *const c_char,
    status: *mut Status,
    progress: ProgressCallback,
    user_data: *mut c_void,
) {
    guarded(status, (), || {
        let context = context_mut(ctx)?;
        let progress = ProgressAdapter::with_callback(progress, user_data);
        context.remove_repository(c_arg(alias, "alias")?, &progress)
    });
}

/// Refresh metadata with `download` and `security` registered for the call.
/// Either may be null, which keeps the engine's default answers.
#[no_mangle]
pub unsafe extern "C" fn refresh_repository(
    ctx: *mut Context,
    alias: *const c_char,
    status: *mut Status,
    download: *const DownloadProgressCallbacks,
    security: *const SecurityCallbacks,
) {
    guarded(status, (), || {
        context_mut(ctx)?.refresh_repository(c_arg(alias, "alias")?, download, security)
    });
}

#[no_mangle]
pub unsafe extern "C" fn build_repository_cache(
    ctx: *mut Context,
    alias: *const c_char,
    status: *mut Status,
    progress: ProgressCallback,
    user_data: *mut c_void,
) {
    guarded(status, (), || {
        let context = context_mut(ctx)?;
        let progress = ProgressAdapter::with_callback(progress, user_data);
        context.build_repository_cache(c_arg(alias, "alias")?, &progress)
    });
}

#[no_mangle]
pub unsafe extern "C" fn load_repository_cache(
    ctx: *mut Context,
    alias: *const c_char,
    status: *mut Status,
) {
    guarded(status, (), || {
        context_mut(ctx)?.load_repository_cache(c_arg(alias, "alias")?)
    });
}

#[no_mangle]
pub unsafe extern "C" fn add_service(
    ctx: *mut Context,
    alias: *const c_char,
    url: *const c_char,
    status: *mut Status,
) {
    guarded(status, (), || {
        context_mut(ctx)?.add_service(c_arg(alias, "alias")?, c_arg(url, "url")?)
    });
}

/// Refresh a service; repositories it lists come back from
/// [`list_repositories`] with their `service_name` set.
#[no_mangle]
pub unsafe extern "C" fn refresh_service(
    ctx: *mut Context,
    alias: *const c_char,
    status: *mut Status,
) {
    guarded(status, (), || {
        context_mut(ctx)?.refresh_service(c_arg(alias, "alias")?)
    });
}

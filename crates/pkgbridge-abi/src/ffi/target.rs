use std::ffi::{c_char, c_void};
use std::path::Path;
use std::ptr;

use pkgbridge_engine::url;
use tracing::debug;

use super::{contained, context_mut, guarded};
use crate::callbacks::{InitProgressCallback, ProgressCallback};
use crate::logging;
use crate::status::Status;
use crate::strings::{c_arg, c_text};
use crate::Context;

/// Create the process-wide context for the target at `root`. Returns null
/// on failure, including when a context already exists.
#[no_mangle]
pub unsafe extern "C" fn init_target(
    root: *const c_char,
    status: *mut Status,
    progress: InitProgressCallback,
    user_data: *mut c_void,
) -> *mut Context {
    guarded(status, ptr::null_mut(), || {
        let root = c_arg(root, "root")?;
        let context = Context::initialize(Path::new(root), |text, stage, total| {
            if let Some(callback) = progress {
                let text = c_text(text);
                callback(text.as_ptr(), stage, total, user_data);
            }
        })?;
        Ok(Box::into_raw(Box::new(context)))
    })
}

#[no_mangle]
pub unsafe extern "C" fn switch_target(ctx: *mut Context, root: *const c_char, status: *mut Status) {
    guarded(status, (), || {
        let context = context_mut(ctx)?;
        context.switch_target(Path::new(c_arg(root, "root")?))
    });
}

/// Release the context. Null is ignored. A panic while releasing is logged
/// and the context slot is freed regardless.
#[no_mangle]
pub unsafe extern "C" fn free_context(ctx: *mut Context) {
    if !ctx.is_null() {
        let context = Box::from_raw(ctx);
        contained("free_context", move || drop(context));
    }
}

/// Release the message of a status. Safe to call on a succeeded status and
/// more than once.
#[no_mangle]
pub unsafe extern "C" fn free_status(status: *mut Status) {
    if let Some(status) = status.as_mut() {
        status.release();
    }
}

#[no_mangle]
pub unsafe extern "C" fn set_progress_callback(
    ctx: *mut Context,
    progress: ProgressCallback,
    user_data: *mut c_void,
) {
    if let Some(context) = ctx.as_ref() {
        context.adapters().set_progress(progress, user_data);
    }
}

#[no_mangle]
pub unsafe extern "C" fn unset_progress_callback(ctx: *mut Context) {
    if let Some(context) = ctx.as_ref() {
        context.adapters().unset_progress();
    }
}

/// Whether `url` names a local medium. Malformed URLs fail.
#[no_mangle]
pub unsafe extern "C" fn is_local_url(url: *const c_char, status: *mut Status) -> bool {
    guarded(status, false, || {
        Ok(url::scheme_is_local(c_arg(url, "url")?)?)
    })
}

#[no_mangle]
pub unsafe extern "C" fn import_gpg_key(
    ctx: *mut Context,
    path: *const c_char,
    status: *mut Status,
) {
    guarded(status, (), || {
        let context = context_mut(ctx)?;
        context.import_gpg_key(Path::new(c_arg(path, "path")?))
    });
}

/// Install a stderr log subscriber filtered by `PKGBRIDGE_LOG`. Returns
/// false if a subscriber was already installed.
#[no_mangle]
pub extern "C" fn init_logging() -> bool {
    let installed = logging::install_subscriber("warn");
    debug!(installed, "logging initialized");
    installed
}

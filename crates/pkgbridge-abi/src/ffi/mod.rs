//! Flat `extern "C"` entry points.
//!
//! Every fallible entry point takes a `*mut Status` out-pointer and writes
//! exactly one status before returning. Panics never cross the boundary:
//! they are caught and reported as a failed status, and the function returns
//! its neutral value (null, false, zero, or an empty list).
//!
//! # Safety
//!
//! Pointers passed in must be null or valid for the duration of the call.
//! Context handles come from [`init_target`] and stay valid until
//! [`free_context`]. Callback structs must outlive the call they are passed
//! to. Calls must not overlap.

#![allow(clippy::missing_safety_doc)]

mod repositories;
mod resolvables;
mod target;
mod transaction;

pub use repositories::{
    add_repository, add_service, build_repository_cache, disable_repository,
    free_repository_list, list_repositories, load_repository_cache, refresh_repository,
    refresh_service, remove_repository, set_repository_url,
};
pub use resolvables::{
    free_pattern_infos, get_patterns_info, get_space_usage, is_package_available,
    is_package_selected, packages_to_install, resolvable_reset_all, resolvable_select,
    resolvable_unselect, run_solver,
};
pub use target::{
    free_context, free_status, import_gpg_key, init_logging, init_target, is_local_url,
    set_progress_callback, switch_target, unset_progress_callback,
};
pub use transaction::commit;

use std::any::Any;
use std::ffi::c_uint;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::slice;

use tracing::{debug, error};

use crate::status::Status;
use crate::{BridgeError, Context};

/// Run `op`, write its outcome to `status` and return its value, or
/// `fallback` when it failed or panicked.
pub(crate) unsafe fn guarded<T>(
    status: *mut Status,
    fallback: T,
    op: impl FnOnce() -> Result<T, BridgeError>,
) -> T {
    let (outcome, value) = match catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => (Status::ok(), value),
        Ok(Err(err)) => {
            debug!(error = %err, "operation failed");
            (Status::from_error(&err), fallback)
        }
        Err(payload) => {
            let err = BridgeError::Panic(panic_message(payload.as_ref()));
            error!(error = %err, "panic caught at the boundary");
            (Status::from_error(&err), fallback)
        }
    };
    outcome.write_to(status);
    value
}

/// Run `op` where no status can be written. A panic is logged and reported
/// as `false`.
pub(crate) fn contained(what: &'static str, op: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(op)) {
        Ok(()) => true,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(what, error = %message, "panic caught at the boundary");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_owned()
    }
}

pub(crate) unsafe fn context_mut<'a>(ctx: *mut Context) -> Result<&'a mut Context, BridgeError> {
    ctx.as_mut()
        .ok_or_else(|| BridgeError::InvalidArgument("context is null".to_owned()))
}

pub(crate) unsafe fn context_ref<'a>(ctx: *const Context) -> Result<&'a Context, BridgeError> {
    ctx.as_ref()
        .ok_or_else(|| BridgeError::InvalidArgument("context is null".to_owned()))
}

/// View a caller-owned array. A null array is only accepted when empty.
pub(crate) unsafe fn array_mut<'a, T>(
    items: *mut T,
    size: c_uint,
    what: &'static str,
) -> Result<&'a mut [T], BridgeError> {
    if size == 0 {
        return Ok(&mut []);
    }
    if items.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{what} is null")));
    }
    Ok(slice::from_raw_parts_mut(items, size as usize))
}

pub(crate) unsafe fn array<'a, T>(
    items: *const T,
    size: c_uint,
    what: &'static str,
) -> Result<&'a [T], BridgeError> {
    if size == 0 {
        return Ok(&[]);
    }
    if items.is_null() {
        return Err(BridgeError::InvalidArgument(format!("{what} is null")));
    }
    Ok(slice::from_raw_parts(items, size as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_become_failed_status() {
        let mut status = Status::ok();
        let value = unsafe {
            guarded(&mut status, 7, || -> Result<i32, BridgeError> {
                panic!("boom");
            })
        };
        assert_eq!(value, 7);
        assert_eq!(status.message().as_deref(), Some("internal error: boom"));
        status.release();
    }

    #[test]
    fn errors_return_fallback() {
        let mut status = Status::ok();
        let value = unsafe {
            guarded(&mut status, false, || Err(BridgeError::EmptyPackageTag))
        };
        assert!(!value);
        assert!(!status.is_ok());
        status.release();

        let value = unsafe { guarded(&mut status, 0, || Ok(3)) };
        assert_eq!(value, 3);
        assert!(status.is_ok());
    }

    #[test]
    fn panicking_drop_is_contained_and_fields_still_drop() {
        use std::cell::Cell;

        struct Released<'a>(&'a Cell<bool>);
        impl Drop for Released<'_> {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }
        struct Unloading<'a> {
            _slot: Released<'a>,
        }
        impl Drop for Unloading<'_> {
            fn drop(&mut self) {
                panic!("unload failed");
            }
        }

        let released = Cell::new(false);
        let value = Box::new(Unloading {
            _slot: Released(&released),
        });
        assert!(!contained("free_context", move || drop(value)));
        assert!(released.get());
        assert!(contained("free_context", || {}));
    }

    #[test]
    fn null_arrays_need_zero_size() {
        let empty = unsafe { array::<u8>(std::ptr::null(), 0, "names") }.unwrap();
        assert!(empty.is_empty());
        let err = unsafe { array::<u8>(std::ptr::null(), 2, "names") }.unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: names is null");
    }
}

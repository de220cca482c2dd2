use super::{context_mut, guarded};
use crate::callbacks::{DownloadResolvableCallbacks, InstallCallbacks, SecurityCallbacks};
use crate::status::Status;
use crate::Context;

/// Install the pending transaction with all three groups registered for the
/// call. Returns the engine's "no error" flag; any group may be null.
#[no_mangle]
pub unsafe extern "C" fn commit(
    ctx: *mut Context,
    status: *mut Status,
    download: *const DownloadResolvableCallbacks,
    security: *const SecurityCallbacks,
    install: *const InstallCallbacks,
) -> bool {
    guarded(status, false, || {
        context_mut(ctx)?.commit(download, security, install)
    })
}

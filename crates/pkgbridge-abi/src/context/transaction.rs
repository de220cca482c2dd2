use pkgbridge_engine::{CommitPolicy, DownloadMode};
use tracing::info;

use super::Context;
use crate::callbacks::{DownloadResolvableCallbacks, InstallCallbacks, SecurityCallbacks};
use crate::registration::CallbackScope;
use crate::BridgeError;

impl Context {
    /// Install the pending transaction. Packages are downloaded in advance.
    /// `Ok(false)` means the commit finished with ignored errors.
    ///
    /// # Safety
    ///
    /// Every pointer must be null or valid until the call returns.
    pub unsafe fn commit(
        &mut self,
        download: *const DownloadResolvableCallbacks,
        security: *const SecurityCallbacks,
        install: *const InstallCallbacks,
    ) -> Result<bool, BridgeError> {
        let _callbacks = CallbackScope::new(&self.adapters)
            .resolvable(download)
            .security(security)
            .install(install);
        let policy = CommitPolicy {
            download_mode: DownloadMode::InAdvance,
        };
        let result = self.engine.commit(&policy)?;
        info!(no_error = result.no_error, "commit done");
        Ok(result.no_error)
    }
}

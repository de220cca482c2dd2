use pkgbridge_engine::report::ProgressReport;
use pkgbridge_engine::{url, EngineError, RepoInfo, RepoManager, ServiceInfo};

use super::Context;
use crate::callbacks::{DownloadProgressCallbacks, SecurityCallbacks};
use crate::registration::CallbackScope;
use crate::BridgeError;

fn manager(
    slot: &mut Option<Box<dyn RepoManager>>,
) -> Result<&mut (dyn RepoManager + 'static), BridgeError> {
    slot.as_deref_mut()
        .ok_or(BridgeError::ManagerNotInitialized)
}

fn known(manager: &dyn RepoManager, alias: &str) -> Result<RepoInfo, BridgeError> {
    manager
        .get_repo(alias)
        .ok_or_else(|| EngineError::RepoNotFound(alias.to_owned()).into())
}

impl Context {
    pub fn list_repositories(&self) -> Result<Vec<RepoInfo>, BridgeError> {
        let manager = self
            .repo_manager
            .as_deref()
            .ok_or(BridgeError::ManagerNotInitialized)?;
        Ok(manager.known_repositories())
    }

    pub fn add_repository(
        &mut self,
        alias: &str,
        url: &str,
        progress: &dyn ProgressReport,
    ) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        manager.add_repository(RepoInfo::new(alias, url), progress)?;
        Ok(())
    }

    pub fn disable_repository(&mut self, alias: &str) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        let mut info = known(manager, alias)?;
        info.enabled = false;
        manager.modify_repository(alias, info)?;
        Ok(())
    }

    pub fn set_repository_url(&mut self, alias: &str, url: &str) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        let mut info = known(manager, alias)?;
        url::parse(url)?;
        info.url = url.to_owned();
        manager.modify_repository(alias, info)?;
        Ok(())
    }

    pub fn remove_repository(
        &mut self,
        alias: &str,
        progress: &dyn ProgressReport,
    ) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        manager.remove_repository(alias, progress)?;
        Ok(())
    }

    /// Download fresh metadata with the download and security groups
    /// registered for the duration of the call.
    ///
    /// # Safety
    ///
    /// Both pointers must be null or valid until the call returns.
    pub unsafe fn refresh_repository(
        &mut self,
        alias: &str,
        download: *const DownloadProgressCallbacks,
        security: *const SecurityCallbacks,
    ) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        let info = manager
            .get_repo(alias)
            .ok_or_else(|| BridgeError::RepoNotFound {
                action: "refresh",
                alias: alias.to_owned(),
            })?;
        let _callbacks = CallbackScope::new(&self.adapters)
            .download(download)
            .security(security);
        manager.refresh_metadata(&info)?;
        Ok(())
    }

    pub fn build_repository_cache(
        &mut self,
        alias: &str,
        progress: &dyn ProgressReport,
    ) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        let info = manager
            .get_repo(alias)
            .ok_or_else(|| BridgeError::RepoNotFound {
                action: "load",
                alias: alias.to_owned(),
            })?;
        manager.build_cache(&info, progress)?;
        Ok(())
    }

    pub fn load_repository_cache(&mut self, alias: &str) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        let info = manager
            .get_repo(alias)
            .ok_or_else(|| BridgeError::RepoNotFound {
                action: "load",
                alias: alias.to_owned(),
            })?;
        manager.load_from_cache(&info)?;
        Ok(())
    }

    pub fn add_service(&mut self, alias: &str, url: &str) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        manager.add_service(ServiceInfo::new(alias, url))?;
        Ok(())
    }

    /// Sync the repositories listed by the service's index.
    pub fn refresh_service(&mut self, alias: &str) -> Result<(), BridgeError> {
        let manager = manager(&mut self.repo_manager)?;
        let service = manager
            .get_service(alias)
            .ok_or_else(|| BridgeError::ServiceNotFound(alias.to_owned()))?;
        manager.refresh_service(&service)?;
        Ok(())
    }
}

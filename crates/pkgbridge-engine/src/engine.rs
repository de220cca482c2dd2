use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::options::RepoManagerOptions;
use crate::report::{ProgressReport, Reports};
use crate::types::{
    CommitPolicy, CommitResult, MountPoint, Pattern, PublicKey, RepoInfo, ResKind, ResStatus,
    ServiceInfo, TransactBy,
};
use crate::EngineError;

/// The package engine: one target system and its resolution pool.
///
/// Engines are single-threaded. Report channels fire synchronously on the
/// calling thread while an operation runs.
pub trait PackageEngine {
    fn name(&self) -> &str;

    /// Report channels shared by the engine and its repository managers.
    fn reports(&self) -> Rc<Reports>;

    /// Repository manager working below the given root.
    fn repo_manager(&self, options: RepoManagerOptions)
        -> Result<Box<dyn RepoManager>, EngineError>;

    /// Attach the target at `root`, replacing any target attached before.
    fn initialize_target(&mut self, root: &Path) -> Result<(), EngineError>;

    /// Read the installed packages of the attached target into the pool.
    fn load_target(&mut self) -> Result<(), EngineError>;

    fn unload_target(&mut self);

    fn target_root(&self) -> Option<PathBuf>;

    /// Repositories whose resolvables are loaded in the pool.
    fn pool_repos(&self) -> Vec<RepoInfo>;

    /// Replace the pool's copy of a repository definition. Unknown aliases
    /// are ignored.
    fn update_pool_repo(&mut self, info: RepoInfo);

    fn status(&self, kind: ResKind, name: &str) -> Option<ResStatus>;

    fn set_to_install(&mut self, kind: ResKind, name: &str, by: TransactBy) -> bool;

    fn unset(&mut self, kind: ResKind, name: &str, by: TransactBy) -> bool;

    /// Drop every pending transaction in the pool.
    fn reset_all(&mut self);

    /// Run the solver. `Ok(false)` means it ran but left problems unsolved.
    fn resolve_pool(&mut self, only_requires: bool) -> Result<bool, EngineError>;

    /// Status of every package providing `capability`.
    fn what_provides(&self, capability: &str) -> Vec<ResStatus>;

    fn count_to_install(&self) -> usize;

    fn pattern(&self, name: &str) -> Option<Pattern>;

    fn import_key(&mut self, key_file: &Path, trusted: bool) -> Result<PublicKey, EngineError>;

    fn commit(&mut self, policy: &CommitPolicy) -> Result<CommitResult, EngineError>;

    /// Space the pending transaction needs on each mount point.
    fn disk_usage(&self, mount_points: &[MountPoint]) -> Result<Vec<MountPoint>, EngineError>;
}

/// Manager of the known repositories and their metadata caches.
pub trait RepoManager {
    fn options(&self) -> &RepoManagerOptions;

    fn known_repositories(&self) -> Vec<RepoInfo>;

    fn get_repo(&self, alias: &str) -> Option<RepoInfo>;

    fn add_repository(
        &mut self,
        info: RepoInfo,
        progress: &dyn ProgressReport,
    ) -> Result<(), EngineError>;

    fn modify_repository(&mut self, alias: &str, info: RepoInfo) -> Result<(), EngineError>;

    fn remove_repository(
        &mut self,
        alias: &str,
        progress: &dyn ProgressReport,
    ) -> Result<(), EngineError>;

    /// Download fresh metadata, verifying signatures and checksums.
    fn refresh_metadata(&mut self, info: &RepoInfo) -> Result<(), EngineError>;

    fn build_cache(
        &mut self,
        info: &RepoInfo,
        progress: &dyn ProgressReport,
    ) -> Result<(), EngineError>;

    /// Load the repository's resolvables from its cache into the pool.
    fn load_from_cache(&mut self, info: &RepoInfo) -> Result<(), EngineError>;

    fn known_services(&self) -> Vec<ServiceInfo>;

    fn get_service(&self, alias: &str) -> Option<ServiceInfo>;

    fn add_service(&mut self, info: ServiceInfo) -> Result<(), EngineError>;

    /// Read the service index and bring the known repositories in line
    /// with it: listed repositories are added or updated, repositories the
    /// index no longer lists are removed. An enabled flag set locally
    /// survives a refresh.
    fn refresh_service(&mut self, info: &ServiceInfo) -> Result<(), EngineError>;
}

/// Source of engine instances.
pub trait EngineProvider {
    fn engine(&self) -> Result<Box<dyn PackageEngine>, EngineError>;
}

//! The engine context: one per process, created by [`Context::initialize`]
//! and torn down by dropping it.

mod repositories;
mod resolvables;
mod transaction;

pub use resolvables::selection_state;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use pkgbridge_engine::{PackageEngine, RepoManager, RepoManagerOptions};
use tracing::{debug, info};

use crate::provider;
use crate::registration::{Adapters, Group};
use crate::BridgeError;

static CONTEXT_IN_USE: AtomicBool = AtomicBool::new(false);

/// Claim on the process-wide context slot, released on drop.
#[derive(Debug)]
struct SlotGuard(());

impl SlotGuard {
    fn claim() -> Result<Self, BridgeError> {
        CONTEXT_IN_USE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(()))
            .map_err(|_| BridgeError::AlreadyInitialized)
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        CONTEXT_IN_USE.store(false, Ordering::Release);
    }
}

pub struct Context {
    engine: Box<dyn PackageEngine>,
    repo_manager: Option<Box<dyn RepoManager>>,
    adapters: Adapters,
    // Dropped last, after the target is unloaded.
    _slot: SlotGuard,
}

impl Context {
    /// Attach the target at `root` and read its installed packages.
    /// `progress` receives `(stage text, stage, stage count)`.
    pub fn initialize(
        root: &Path,
        mut progress: impl FnMut(&str, u32, u32),
    ) -> Result<Self, BridgeError> {
        let slot = SlotGuard::claim()?;
        let engine = provider::engine()?;
        let adapters = Adapters::new(engine.reports());
        let mut context = Self {
            engine,
            repo_manager: None,
            adapters,
            _slot: slot,
        };

        context.replace_repo_manager(RepoManagerOptions::new(root))?;
        progress("Initializing the Target System", 0, 2);
        context.engine.initialize_target(root)?;
        progress("Reading Installed Packages", 1, 2);
        context.engine.load_target()?;
        info!(root = %root.display(), engine = context.engine.name(), "context initialized");
        Ok(context)
    }

    /// Whether a context is alive in this process.
    pub fn is_initialized() -> bool {
        CONTEXT_IN_USE.load(Ordering::Acquire)
    }

    /// Repository managers cannot change their options; a new one replaces
    /// the old, which is gone even if creating the new one fails.
    fn replace_repo_manager(&mut self, options: RepoManagerOptions) -> Result<(), BridgeError> {
        self.repo_manager = None;
        self.repo_manager = Some(self.engine.repo_manager(options)?);
        Ok(())
    }

    /// Move the context to the target at `root` and keep downloaded packages
    /// below the new root.
    pub fn switch_target(&mut self, root: &Path) -> Result<(), BridgeError> {
        let packages_prefix = RepoManagerOptions::new(root).packages_cache_path;
        let repos: Vec<_> = self
            .engine
            .pool_repos()
            .into_iter()
            .map(|mut repo| {
                repo.packages_path = Some(packages_prefix.join(repo.escaped_alias()));
                repo
            })
            .collect();

        self.engine.initialize_target(root)?;
        for repo in repos {
            if let Some(path) = &repo.packages_path {
                info!(alias = %repo.alias, path = %path.display(), "package cache moved");
            }
            self.engine.update_pool_repo(repo);
        }
        Ok(())
    }

    pub fn engine(&self) -> &dyn PackageEngine {
        self.engine.as_ref()
    }

    pub fn adapters(&self) -> &Adapters {
        &self.adapters
    }

    pub fn is_registered(&self, group: Group) -> bool {
        self.adapters.is_registered(group)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.adapters.unset_progress();
        self.engine.unload_target();
        self.repo_manager = None;
        debug!("context released");
    }
}

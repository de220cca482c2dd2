//! In-memory package engine.
//!
//! `MemoryEngine` keeps its resolution pool in memory and takes repository
//! contents from a [`MemoryWorld`]. Known repositories, metadata caches and
//! the target lock live on disk below the target root, so repository state
//! survives a new engine instance on the same root.

mod commit;
mod pool;
mod repos;

pub use repos::MemoryRepoManager;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

use crate::engine::{EngineProvider, PackageEngine, RepoManager};
use crate::lock::TargetLock;
use crate::options::RepoManagerOptions;
use crate::progress::ProgressData;
use crate::report::Reports;
use crate::types::{
    CommitPolicy, CommitResult, MountPoint, Pattern, PublicKey, RepoInfo, ResKind, ResStatus,
    TransactBy,
};
use crate::world::{CommitFaults, MemoryWorld, RemoteRepo, RemoteService};
use crate::EngineError;
use pool::PoolItem;

/// Environment variable naming a TOML world file for [`MemoryProvider::from_env`].
pub const WORLD_ENV: &str = "PKGBRIDGE_WORLD";

#[derive(Debug)]
struct Target {
    root: PathBuf,
    _lock: TargetLock,
}

/// State shared by an engine and the repository managers it hands out.
#[derive(Debug)]
pub(crate) struct MemorySystem {
    world: MemoryWorld,
    target: Option<Target>,
    pool: Vec<PoolItem>,
    pool_repos: BTreeMap<String, RepoInfo>,
    trusted_keys: BTreeSet<String>,
    faults: CommitFaults,
}

impl MemorySystem {
    fn new(world: MemoryWorld) -> Self {
        let faults = world.faults.clone();
        Self {
            world,
            target: None,
            pool: Vec::new(),
            pool_repos: BTreeMap::new(),
            trusted_keys: BTreeSet::new(),
            faults,
        }
    }

    pub(crate) fn remote(&self, url: &str) -> Option<RemoteRepo> {
        self.world.remote(url).cloned()
    }

    pub(crate) fn service(&self, url: &str) -> Option<RemoteService> {
        self.world.service(url).cloned()
    }

    pub(crate) fn load_repo(&mut self, info: RepoInfo, remote: &RemoteRepo) {
        self.remove_repo(&info.alias);
        for spec in &remote.packages {
            self.pool.push(PoolItem::package(spec, Some(&info.alias)));
        }
        for spec in &remote.patterns {
            self.pool.push(PoolItem::pattern(spec, &info.alias));
        }
        debug!(alias = %info.alias, items = remote.packages.len() + remote.patterns.len(), "repository loaded into pool");
        self.pool_repos.insert(info.alias.clone(), info);
    }

    pub(crate) fn remove_repo(&mut self, alias: &str) {
        self.pool.retain(|item| item.repo.as_deref() != Some(alias));
        self.pool_repos.remove(alias);
    }
}

pub struct MemoryEngine {
    system: Rc<RefCell<MemorySystem>>,
    reports: Rc<Reports>,
}

impl MemoryEngine {
    pub fn new(world: MemoryWorld) -> Self {
        Self {
            system: Rc::new(RefCell::new(MemorySystem::new(world))),
            reports: Rc::new(Reports::new()),
        }
    }

    fn with_item<R>(
        &self,
        kind: ResKind,
        name: &str,
        f: impl FnOnce(&mut PoolItem) -> R,
    ) -> Option<R> {
        let mut system = self.system.borrow_mut();
        let index = pool::selectable(&system.pool, kind, name)?;
        Some(f(&mut system.pool[index]))
    }
}

impl PackageEngine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    fn reports(&self) -> Rc<Reports> {
        Rc::clone(&self.reports)
    }

    fn repo_manager(
        &self,
        options: RepoManagerOptions,
    ) -> Result<Box<dyn RepoManager>, EngineError> {
        let manager = MemoryRepoManager::open(
            options,
            Rc::clone(&self.system),
            Rc::clone(&self.reports),
        )?;
        Ok(Box::new(manager))
    }

    fn initialize_target(&mut self, root: &Path) -> Result<(), EngineError> {
        if !root.is_absolute() {
            return Err(EngineError::Target(format!(
                "{} is not an absolute path",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Err(EngineError::Target(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut system = self.system.borrow_mut();
        if system.target.as_ref().is_some_and(|t| t.root == root) {
            system.target = None;
        }
        let lock = TargetLock::try_acquire(&RepoManagerOptions::new(root).lock_path)?;
        system.target = Some(Target {
            root: root.to_path_buf(),
            _lock: lock,
        });
        info!(root = %root.display(), "target initialized");
        Ok(())
    }

    fn load_target(&mut self) -> Result<(), EngineError> {
        let installed = {
            let mut system = self.system.borrow_mut();
            if system.target.is_none() {
                return Err(EngineError::NoTarget);
            }
            system.pool.retain(|item| item.repo.is_some());
            system.world.installed.clone()
        };

        let report = self.reports.progress.get();
        let mut task = ProgressData::with_value("Reading installed packages", 0);
        report.start(&task);
        let total = installed.len().max(1) as i64;
        for (done, spec) in installed.iter().enumerate() {
            self.system
                .borrow_mut()
                .pool
                .push(PoolItem::package(spec, None));
            task.set_value((done as i64 + 1) * 100 / total);
            if !report.progress(&task) {
                return Err(EngineError::Aborted("reading installed packages".to_owned()));
            }
        }
        task.set_value(100);
        report.finish(&task);
        debug!(count = installed.len(), "installed packages loaded");
        Ok(())
    }

    fn unload_target(&mut self) {
        let mut system = self.system.borrow_mut();
        if let Some(target) = system.target.take() {
            debug!(root = %target.root.display(), "target unloaded");
        }
        system.pool.retain(|item| item.repo.is_some());
    }

    fn target_root(&self) -> Option<PathBuf> {
        self.system
            .borrow()
            .target
            .as_ref()
            .map(|t| t.root.clone())
    }

    fn pool_repos(&self) -> Vec<RepoInfo> {
        self.system.borrow().pool_repos.values().cloned().collect()
    }

    fn update_pool_repo(&mut self, info: RepoInfo) {
        let mut system = self.system.borrow_mut();
        if let Some(existing) = system.pool_repos.get_mut(&info.alias) {
            *existing = info;
        }
    }

    fn status(&self, kind: ResKind, name: &str) -> Option<ResStatus> {
        self.with_item(kind, name, |item| item.status)
    }

    fn set_to_install(&mut self, kind: ResKind, name: &str, by: TransactBy) -> bool {
        self.with_item(kind, name, |item| item.status.set_to_install(by))
            .unwrap_or(false)
    }

    fn unset(&mut self, kind: ResKind, name: &str, by: TransactBy) -> bool {
        self.with_item(kind, name, |item| item.status.unset(by))
            .unwrap_or(false)
    }

    fn reset_all(&mut self) {
        for item in &mut self.system.borrow_mut().pool {
            item.status.reset();
        }
    }

    fn resolve_pool(&mut self, only_requires: bool) -> Result<bool, EngineError> {
        let mut system = self.system.borrow_mut();
        if system.target.is_none() {
            return Err(EngineError::NoTarget);
        }
        Ok(pool::resolve(&mut system.pool, only_requires))
    }

    fn what_provides(&self, capability: &str) -> Vec<ResStatus> {
        self.system
            .borrow()
            .pool
            .iter()
            .filter(|item| item.provides_capability(capability))
            .map(|item| item.status)
            .collect()
    }

    fn count_to_install(&self) -> usize {
        self.system
            .borrow()
            .pool
            .iter()
            .filter(|item| item.status.is_to_be_installed())
            .count()
    }

    fn pattern(&self, name: &str) -> Option<Pattern> {
        let system = self.system.borrow();
        let index = pool::selectable(&system.pool, ResKind::Pattern, name)?;
        let item = &system.pool[index];
        Some(Pattern {
            name: item.name.clone(),
            data: item.pattern.clone().unwrap_or_default(),
            status: item.status,
        })
    }

    fn import_key(&mut self, key_file: &Path, trusted: bool) -> Result<PublicKey, EngineError> {
        let key_error = |reason: String| EngineError::KeyFile {
            path: key_file.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(key_file).map_err(|e| key_error(e.to_string()))?;
        let key: PublicKey = toml::from_str(&content).map_err(|e| key_error(e.to_string()))?;
        if trusted {
            self.system.borrow_mut().trusted_keys.insert(key.id.clone());
        }
        info!(id = %key.id, name = %key.name, trusted, "key imported");
        Ok(key)
    }

    fn commit(&mut self, policy: &CommitPolicy) -> Result<CommitResult, EngineError> {
        commit::run(&self.system, &self.reports, policy)
    }

    fn disk_usage(&self, mount_points: &[MountPoint]) -> Result<Vec<MountPoint>, EngineError> {
        let mut usage = mount_points.to_vec();
        for mount_point in &mut usage {
            mount_point.used_size = 0;
        }

        let system = self.system.borrow();
        for item in system.pool.iter().filter(|i| i.status.is_to_be_installed()) {
            let dir = Path::new(&item.install_dir);
            let best = usage
                .iter()
                .enumerate()
                .filter(|(_, mp)| dir.starts_with(&mp.directory))
                .max_by_key(|(_, mp)| mp.directory.len())
                .map(|(i, _)| i);
            if let Some(i) = best {
                usage[i].used_size += item.size;
            }
        }
        Ok(usage)
    }
}

/// Hands out [`MemoryEngine`]s built from one world description.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    world: MemoryWorld,
}

impl MemoryProvider {
    pub fn new(world: MemoryWorld) -> Self {
        Self { world }
    }

    /// World from the file named by `PKGBRIDGE_WORLD`, or an empty world.
    pub fn from_env() -> Result<Self, EngineError> {
        match std::env::var_os(WORLD_ENV) {
            Some(path) => Ok(Self::new(MemoryWorld::load(Path::new(&path))?)),
            None => Ok(Self::default()),
        }
    }
}

impl EngineProvider for MemoryProvider {
    fn engine(&self) -> Result<Box<dyn PackageEngine>, EngineError> {
        Ok(Box::new(MemoryEngine::new(self.world.clone())))
    }
}

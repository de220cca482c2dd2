use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::MemorySystem;
use crate::engine::RepoManager;
use crate::options::RepoManagerOptions;
use crate::progress::ProgressData;
use crate::report::{Action, DownloadError, KeyTrust, ProgressReport, Reports};
use crate::types::{KeyContext, RepoInfo, ServiceInfo};
use crate::url;
use crate::world::{ChecksumFault, RemoteRepo};
use crate::EngineError;

const MAX_ATTEMPTS: u32 = 3;
const RAW_MARKER: &str = "repomd.xml";
const SOLV_MARKER: &str = "solv";

/// Repository manager persisting one `.repo` file per alias.
pub struct MemoryRepoManager {
    options: RepoManagerOptions,
    repos: BTreeMap<String, RepoInfo>,
    services: BTreeMap<String, ServiceInfo>,
    system: Rc<RefCell<MemorySystem>>,
    reports: Rc<Reports>,
}

/// Read every `*.<extension>` definition file in `dir`. A missing directory
/// holds nothing.
fn read_definitions<T: DeserializeOwned>(
    dir: &Path,
    extension: &str,
) -> Result<Vec<T>, EngineError> {
    let mut found = Vec::new();
    if !dir.is_dir() {
        return Ok(found);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        let definition = toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        found.push(definition);
    }
    Ok(found)
}

/// Replace `path` atomically with the TOML form of `definition`.
fn write_definition(path: &Path, definition: &impl Serialize) -> Result<(), EngineError> {
    let dir = path
        .parent()
        .ok_or_else(|| EngineError::Config(format!("{} has no parent", path.display())))?;
    std::fs::create_dir_all(dir)?;
    let content = toml::to_string(definition).map_err(|e| EngineError::Config(e.to_string()))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| EngineError::Io(e.error))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<(), EngineError> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Run a task under a progress report; the closure reports values in between.
fn with_task<T>(
    progress: &dyn ProgressReport,
    name: &str,
    body: impl FnOnce(&mut dyn FnMut(i64) -> bool) -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    let mut task = ProgressData::with_value(name, 0);
    progress.start(&task);
    let result = body(&mut |value| {
        task.set_value(value);
        progress.progress(&task)
    });
    progress.finish(&ProgressData::with_value(name, 100));
    result
}

impl MemoryRepoManager {
    pub(crate) fn open(
        options: RepoManagerOptions,
        system: Rc<RefCell<MemorySystem>>,
        reports: Rc<Reports>,
    ) -> Result<Self, EngineError> {
        let repos: BTreeMap<_, _> = read_definitions::<RepoInfo>(&options.known_repos_path, "repo")?
            .into_iter()
            .map(|info| (info.alias.clone(), info))
            .collect();
        let services: BTreeMap<_, _> =
            read_definitions::<ServiceInfo>(&options.known_services_path, "service")?
                .into_iter()
                .map(|info| (info.alias.clone(), info))
                .collect();
        debug!(
            repos = repos.len(),
            services = services.len(),
            dir = %options.known_repos_path.display(),
            "known repositories read"
        );

        Ok(Self {
            options,
            repos,
            services,
            system,
            reports,
        })
    }

    fn repo_or_err(&self, alias: &str) -> Result<&RepoInfo, EngineError> {
        self.repos
            .get(alias)
            .ok_or_else(|| EngineError::RepoNotFound(alias.to_owned()))
    }

    fn save(&self, info: &RepoInfo) -> Result<(), EngineError> {
        write_definition(&self.options.repo_file(&info.escaped_alias()), info)
    }

    /// Drop a repository's caches, definition file and pool contents.
    fn forget(&mut self, info: &RepoInfo) -> Result<(), EngineError> {
        remove_if_exists(&self.raw_dir(info))?;
        remove_if_exists(&self.solv_dir(info))?;
        remove_if_exists(&self.options.repo_file(&info.escaped_alias()))?;
        self.system.borrow_mut().remove_repo(&info.alias);
        self.repos.remove(&info.alias);
        Ok(())
    }

    fn raw_dir(&self, info: &RepoInfo) -> PathBuf {
        self.options.raw_cache_path.join(info.escaped_alias())
    }

    fn solv_dir(&self, info: &RepoInfo) -> PathBuf {
        self.options.solv_cache_path.join(info.escaped_alias())
    }

    fn download_metadata(
        &self,
        info: &RepoInfo,
        remote: Option<&RemoteRepo>,
        local: &Path,
    ) -> Result<(), EngineError> {
        let report = self.reports.download_progress.get();
        let mut failures = remote.map_or(0, |r| r.download_failures);
        let mut attempts = 0;

        loop {
            attempts += 1;
            report.start(&info.url, local);
            let problem = match remote {
                None => Some((
                    DownloadError::NotFound,
                    format!("File '{RAW_MARKER}' not found on medium '{}'", info.url),
                )),
                Some(_) if failures > 0 => {
                    failures -= 1;
                    Some((DownloadError::Io, "Connection reset by peer".to_owned()))
                }
                Some(_) => None,
            };
            let Some((error, description)) = problem else {
                break;
            };

            match report.problem(&info.url, error, &description) {
                Action::Retry if attempts < MAX_ATTEMPTS => {
                    debug!(url = %info.url, attempts, "retrying metadata download");
                }
                _ => {
                    report.finish(&info.url, error, &description);
                    return Err(EngineError::Download {
                        url: info.url.clone(),
                        reason: description,
                    });
                }
            }
        }

        for value in 0..=100 {
            let rate = f64::from(value) * 1024.0;
            if !report.progress(value, &info.url, rate, rate) {
                report.finish(&info.url, DownloadError::Error, "Download interrupted");
                return Err(EngineError::Aborted(format!("download of {}", info.url)));
            }
        }
        report.finish(&info.url, DownloadError::NoError, "");
        Ok(())
    }

    fn verify_signature(
        &self,
        info: &RepoInfo,
        remote: &RemoteRepo,
        local: &Path,
    ) -> Result<(), EngineError> {
        let context = KeyContext {
            repo_alias: info.alias.clone(),
            policy: self.system.borrow().world.key_ring,
        };
        let key_ring = self.reports.key_ring.get();
        let file = local.display().to_string();
        let rejected = || EngineError::Signature(file.clone());

        let Some(key) = &remote.key else {
            return if key_ring.accept_unsigned_file(&file, &context) {
                Ok(())
            } else {
                Err(rejected())
            };
        };

        let known = self.system.borrow().trusted_keys.contains(&key.id);
        if !known {
            match key_ring.accept_key(key, &context) {
                KeyTrust::TrustAndImport => {
                    info!(id = %key.id, name = %key.name, "key imported into key ring");
                    self.system.borrow_mut().trusted_keys.insert(key.id.clone());
                }
                KeyTrust::TrustTemporarily => {
                    debug!(id = %key.id, "key trusted for this operation");
                }
                KeyTrust::DontTrust => {
                    if !key_ring.accept_unknown_key(&file, &key.id, &context) {
                        return Err(rejected());
                    }
                }
            }
        }

        if remote.bad_signature && !key_ring.accept_verification_failed(&file, key, &context) {
            return Err(rejected());
        }
        Ok(())
    }

    fn verify_checksum(&self, remote: &RemoteRepo, local: &Path) -> Result<(), EngineError> {
        let digest = self.reports.digest.get();
        let accepted = match remote.checksum {
            None => true,
            Some(ChecksumFault::Missing) => digest.accept_no_digest(local),
            Some(ChecksumFault::Wrong) => digest.accept_wrong_digest(
                local,
                "sha256:9f86d081884c7d659a2feaa0c55ad015",
                "sha256:60303ae22b998861bce3b28f33eec1be",
            ),
            Some(ChecksumFault::Unknown) => digest.accept_unknown_digest(local, "whirlpool"),
        };
        if accepted {
            Ok(())
        } else {
            Err(EngineError::Checksum(local.display().to_string()))
        }
    }
}

impl RepoManager for MemoryRepoManager {
    fn options(&self) -> &RepoManagerOptions {
        &self.options
    }

    fn known_repositories(&self) -> Vec<RepoInfo> {
        self.repos.values().cloned().collect()
    }

    fn get_repo(&self, alias: &str) -> Option<RepoInfo> {
        self.repos.get(alias).cloned()
    }

    fn add_repository(
        &mut self,
        info: RepoInfo,
        progress: &dyn ProgressReport,
    ) -> Result<(), EngineError> {
        let name = format!("Adding repository '{}'", info.as_user_string());
        with_task(progress, &name, |step| {
            if info.alias.is_empty() {
                return Err(EngineError::Config("repository alias is empty".to_owned()));
            }
            if self.repos.contains_key(&info.alias) {
                return Err(EngineError::RepoAlreadyExists(info.alias.clone()));
            }
            url::parse(&info.url)?;
            if !step(50) {
                return Err(EngineError::Aborted(name.clone()));
            }
            self.save(&info)?;
            info!(alias = %info.alias, url = %info.url, "repository added");
            self.repos.insert(info.alias.clone(), info.clone());
            step(100);
            Ok(())
        })
    }

    fn modify_repository(&mut self, alias: &str, info: RepoInfo) -> Result<(), EngineError> {
        let old = self.repo_or_err(alias)?.clone();
        url::parse(&info.url)?;
        if old.alias != info.alias {
            if self.repos.contains_key(&info.alias) {
                return Err(EngineError::RepoAlreadyExists(info.alias.clone()));
            }
            remove_if_exists(&self.options.repo_file(&old.escaped_alias()))?;
        }
        self.save(&info)?;
        self.repos.remove(alias);
        self.repos.insert(info.alias.clone(), info);
        Ok(())
    }

    fn remove_repository(
        &mut self,
        alias: &str,
        progress: &dyn ProgressReport,
    ) -> Result<(), EngineError> {
        let info = self.repo_or_err(alias)?.clone();
        let name = format!("Removing repository '{}'", info.as_user_string());
        with_task(progress, &name, |step| {
            step(50);
            self.forget(&info)?;
            info!(alias, "repository removed");
            step(100);
            Ok(())
        })
    }

    fn refresh_metadata(&mut self, info: &RepoInfo) -> Result<(), EngineError> {
        let remote = self.system.borrow().remote(&info.url);
        let raw_dir = self.raw_dir(info);
        let local = raw_dir.join(RAW_MARKER);

        self.download_metadata(info, remote.as_ref(), &local)?;
        let Some(remote) = remote else {
            return Err(EngineError::Download {
                url: info.url.clone(),
                reason: "metadata unavailable".to_owned(),
            });
        };
        self.verify_signature(info, &remote, &local)?;
        self.verify_checksum(&remote, &local)?;

        std::fs::create_dir_all(&raw_dir)?;
        std::fs::write(&local, &info.url)?;
        info!(alias = %info.alias, "repository metadata refreshed");
        Ok(())
    }

    fn build_cache(
        &mut self,
        info: &RepoInfo,
        progress: &dyn ProgressReport,
    ) -> Result<(), EngineError> {
        if !self.raw_dir(info).join(RAW_MARKER).is_file() {
            return Err(EngineError::CacheMissing(info.alias.clone()));
        }
        let name = format!("Building repository '{}' cache", info.as_user_string());
        with_task(progress, &name, |step| {
            for value in [0, 50, 100] {
                if !step(value) {
                    return Err(EngineError::Aborted(name.clone()));
                }
            }
            let solv_dir = self.solv_dir(info);
            std::fs::create_dir_all(&solv_dir)?;
            std::fs::write(solv_dir.join(SOLV_MARKER), &info.url)?;
            Ok(())
        })
    }

    fn load_from_cache(&mut self, info: &RepoInfo) -> Result<(), EngineError> {
        if !self.solv_dir(info).join(SOLV_MARKER).is_file() {
            return Err(EngineError::CacheMissing(info.alias.clone()));
        }
        // Loading has no receiver of its own; it reports to the generic channel.
        let progress = self.reports.progress.get();
        let name = format!("Loading {}", info.as_user_string());
        with_task(progress.as_ref(), &name, |_| {
            let mut system = self.system.borrow_mut();
            let Some(remote) = system.remote(&info.url) else {
                return Err(EngineError::Download {
                    url: info.url.clone(),
                    reason: "metadata unavailable".to_owned(),
                });
            };
            let mut pooled = info.clone();
            pooled.packages_path = Some(
                self.options
                    .packages_cache_path
                    .join(info.escaped_alias()),
            );
            system.load_repo(pooled, &remote);
            Ok(())
        })
    }

    fn known_services(&self) -> Vec<ServiceInfo> {
        self.services.values().cloned().collect()
    }

    fn get_service(&self, alias: &str) -> Option<ServiceInfo> {
        self.services.get(alias).cloned()
    }

    fn add_service(&mut self, info: ServiceInfo) -> Result<(), EngineError> {
        if info.alias.is_empty() {
            return Err(EngineError::Config("service alias is empty".to_owned()));
        }
        if self.services.contains_key(&info.alias) {
            return Err(EngineError::ServiceAlreadyExists(info.alias.clone()));
        }
        url::parse(&info.url)?;
        write_definition(&self.options.service_file(&info.escaped_alias()), &info)?;
        info!(alias = %info.alias, url = %info.url, "service added");
        self.services.insert(info.alias.clone(), info);
        Ok(())
    }

    fn refresh_service(&mut self, service: &ServiceInfo) -> Result<(), EngineError> {
        if !self.services.contains_key(&service.alias) {
            return Err(EngineError::ServiceNotFound(service.alias.clone()));
        }
        let index = self.system.borrow().service(&service.url);
        let Some(index) = index else {
            return Err(EngineError::Download {
                url: service.url.clone(),
                reason: "service index unavailable".to_owned(),
            });
        };

        let mut listed = Vec::with_capacity(index.repos.len());
        for repo in &index.repos {
            let mut info = RepoInfo::new(&service.repo_alias(&repo.alias), &repo.url);
            url::parse(&info.url)?;
            info.name.clone_from(&repo.name);
            info.service.clone_from(&service.alias);
            match self.repos.get(&info.alias) {
                Some(known) if known.service != service.alias => {
                    return Err(EngineError::RepoAlreadyExists(info.alias));
                }
                Some(known) => info.enabled = known.enabled,
                None => {}
            }
            listed.push(info);
        }

        let stale: Vec<RepoInfo> = self
            .repos
            .values()
            .filter(|repo| repo.service == service.alias)
            .filter(|repo| !listed.iter().any(|info| info.alias == repo.alias))
            .cloned()
            .collect();
        for repo in &stale {
            self.forget(repo)?;
            debug!(alias = %repo.alias, service = %service.alias, "repository dropped by service");
        }
        for info in listed {
            self.save(&info)?;
            self.repos.insert(info.alias.clone(), info);
        }
        info!(alias = %service.alias, removed = stale.len(), "service refreshed");
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk locations the repository manager uses below a target root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoManagerOptions {
    pub root: PathBuf,
    pub known_repos_path: PathBuf,
    pub known_services_path: PathBuf,
    pub raw_cache_path: PathBuf,
    pub solv_cache_path: PathBuf,
    pub packages_cache_path: PathBuf,
    pub lock_path: PathBuf,
}

impl RepoManagerOptions {
    pub fn new(root: &Path) -> Self {
        let cache = root.join("var/cache/zypp");
        Self {
            root: root.to_path_buf(),
            known_repos_path: root.join("etc/zypp/repos.d"),
            known_services_path: root.join("etc/zypp/services.d"),
            raw_cache_path: cache.join("raw"),
            solv_cache_path: cache.join("solv"),
            packages_cache_path: cache.join("packages"),
            lock_path: root.join("run/zypp.pid"),
        }
    }

    pub fn repo_file(&self, escaped_alias: &str) -> PathBuf {
        self.known_repos_path.join(format!("{escaped_alias}.repo"))
    }

    pub fn service_file(&self, escaped_alias: &str) -> PathBuf {
        self.known_services_path.join(format!("{escaped_alias}.service"))
    }
}

/// Engine-wide defaults for key ring questions nobody answers explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyRingPolicy {
    pub accept_unsigned_file: bool,
    pub accept_unknown_key: bool,
    pub accept_verification_failed: bool,
    pub trust_key_temporarily: bool,
    pub trust_and_import_key: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_root() {
        let opts = RepoManagerOptions::new(Path::new("/mnt"));
        assert_eq!(opts.known_repos_path, Path::new("/mnt/etc/zypp/repos.d"));
        assert_eq!(
            opts.packages_cache_path,
            Path::new("/mnt/var/cache/zypp/packages")
        );
        assert_eq!(opts.repo_file("oss"), Path::new("/mnt/etc/zypp/repos.d/oss.repo"));
        assert_eq!(
            opts.service_file("sles"),
            Path::new("/mnt/etc/zypp/services.d/sles.service")
        );
        assert!(opts.lock_path.starts_with("/mnt"));
    }

    #[test]
    fn policy_defaults_reject_everything() {
        let policy: KeyRingPolicy = toml::from_str("").unwrap();
        assert_eq!(policy, KeyRingPolicy::default());
        assert!(!policy.accept_unknown_key);

        let policy: KeyRingPolicy = toml::from_str("trust_key_temporarily = true").unwrap();
        assert!(policy.trust_key_temporarily);
        assert!(toml::from_str::<KeyRingPolicy>("bogus = 1").is_err());
    }
}

//! World description for the in-memory engine: which remote repositories
//! exist, what they contain, and which faults they inject.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::options::KeyRingPolicy;
use crate::report::CheckPackageResult;
use crate::types::{PatternData, PublicKey, ResKind};
use crate::EngineError;

fn default_install_dir() -> String {
    "/usr".to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default)]
    pub kind: ResKind,
    #[serde(default)]
    pub size: i64,
    #[serde(default = "default_install_dir")]
    pub install_dir: String,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub recommends: Vec<String>,
    #[serde(default)]
    pub provides: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatternSpec {
    pub name: String,
    #[serde(flatten)]
    pub data: PatternData,
    #[serde(default)]
    pub requires: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumFault {
    Missing,
    Wrong,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteRepo {
    pub url: String,
    #[serde(default)]
    pub name: String,
    /// Signing key; metadata of a repository without one is unsigned.
    #[serde(default)]
    pub key: Option<PublicKey>,
    #[serde(default)]
    pub bad_signature: bool,
    #[serde(default)]
    pub checksum: Option<ChecksumFault>,
    /// Number of failed metadata downloads before one succeeds.
    #[serde(default)]
    pub download_failures: u32,
    #[serde(default)]
    pub packages: Vec<PackageSpec>,
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
}

/// A repository listed by a service index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceRepo {
    pub alias: String,
    pub url: String,
    #[serde(default)]
    pub name: String,
}

/// A service index reachable at `url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteService {
    pub url: String,
    #[serde(default)]
    pub repos: Vec<ServiceRepo>,
}

/// Faults injected into a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommitFaults {
    /// Package name to number of failed downloads before one succeeds.
    pub download_failures: BTreeMap<String, u32>,
    /// Signature check result per package; unlisted packages check fine.
    pub gpg_check: BTreeMap<String, CheckPackageResult>,
    /// Packages whose first installation attempt fails.
    pub install_problem: Vec<String>,
    /// Patch scripts whose first run fails, by description.
    pub script_problem: Vec<String>,
    /// Raised as an engine error once preloading finished.
    pub commit_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryWorld {
    pub key_ring: KeyRingPolicy,
    pub installed: Vec<PackageSpec>,
    pub remotes: Vec<RemoteRepo>,
    pub services: Vec<RemoteService>,
    pub faults: CommitFaults,
}

impl MemoryWorld {
    pub fn from_toml(content: &str) -> Result<Self, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn remote(&self, url: &str) -> Option<&RemoteRepo> {
        self.remotes.iter().find(|r| r.url == url)
    }

    pub fn service(&self, url: &str) -> Option<&RemoteService> {
        self.services.iter().find(|s| s.url == url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_world() {
        let world = MemoryWorld::from_toml(
            r#"
[key_ring]
accept_unknown_key = true

[[installed]]
name = "glibc"
size = 4096

[[remotes]]
url = "https://download.example.org/oss"
name = "Main Repository"
key = { id = "29B700A4", name = "Example Signing Key", fingerprint = "AD48 5664 E901 B867" }
checksum = "wrong"

[[remotes.packages]]
name = "vim"
size = 2048
requires = ["glibc"]

[[remotes.patterns]]
name = "base"
summary = "Minimal base system"
order = "1000"
requires = ["vim"]

[faults]
commit_error = "rpm database is corrupt"
gpg_check = { vim = "no_key" }
"#,
        )
        .unwrap();

        assert!(world.key_ring.accept_unknown_key);
        assert_eq!(world.installed[0].install_dir, "/usr");
        let remote = world.remote("https://download.example.org/oss").unwrap();
        assert_eq!(remote.checksum, Some(ChecksumFault::Wrong));
        assert_eq!(remote.patterns[0].data.summary, "Minimal base system");
        assert_eq!(remote.packages[0].kind, ResKind::Package);
        assert_eq!(
            world.faults.gpg_check.get("vim"),
            Some(&CheckPackageResult::NoKey)
        );
    }

    #[test]
    fn services_list_their_repositories() {
        let world = MemoryWorld::from_toml(
            r#"
[[services]]
url = "https://scc.example.com/sles"
repos = [{ alias = "basesystem", url = "https://download.example.org/oss", name = "Basesystem" }]
"#,
        )
        .unwrap();
        let service = world.service("https://scc.example.com/sles").unwrap();
        assert_eq!(service.repos[0].alias, "basesystem");
        assert_eq!(service.repos[0].name, "Basesystem");
        assert!(world.service("https://download.example.org/oss").is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = MemoryWorld::from_toml("[[remotes]]\nurl = \"dir:/r\"\nmirror = true\n");
        assert!(matches!(err, Err(EngineError::Config(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.toml");
        std::fs::write(&path, "[[installed]]\nname = \"bash\"\n").unwrap();
        let world = MemoryWorld::load(&path).unwrap();
        assert_eq!(world.installed.len(), 1);
        assert!(MemoryWorld::load(&dir.path().join("missing.toml")).is_err());
    }
}

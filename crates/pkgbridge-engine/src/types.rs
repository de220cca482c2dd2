use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::options::KeyRingPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResKind {
    #[default]
    Package,
    SrcPackage,
    Pattern,
    Product,
    Patch,
}

impl ResKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResKind::Package => "package",
            ResKind::SrcPackage => "srcpackage",
            ResKind::Pattern => "pattern",
            ResKind::Product => "product",
            ResKind::Patch => "patch",
        }
    }
}

impl fmt::Display for ResKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who last decided a resolvable's transaction. Ordered by precedence: a
/// causer can neither override nor undo a decision made by a higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TransactBy {
    #[default]
    Solver,
    ApplLow,
    ApplHigh,
    User,
}

/// Transaction status of one pool item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResStatus {
    installed: bool,
    to_install: bool,
    transact_by: TransactBy,
}

impl ResStatus {
    pub fn installed() -> Self {
        Self {
            installed: true,
            ..Self::default()
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn is_to_be_installed(&self) -> bool {
        self.to_install && !self.installed
    }

    pub fn transact_by(&self) -> TransactBy {
        self.transact_by
    }

    /// Mark for installation on behalf of `by`. Returns false when a higher
    /// causer already decided this item.
    pub fn set_to_install(&mut self, by: TransactBy) -> bool {
        if by < self.transact_by {
            return false;
        }
        self.to_install = true;
        self.transact_by = by;
        true
    }

    /// Withdraw the transaction on behalf of `by`. The causer is remembered so
    /// a user decision to drop an item stays visible.
    pub fn unset(&mut self, by: TransactBy) -> bool {
        if by < self.transact_by {
            return false;
        }
        self.to_install = false;
        self.transact_by = by;
        true
    }

    pub fn mark_installed(&mut self) {
        self.installed = true;
        self.to_install = false;
        self.transact_by = TransactBy::Solver;
    }

    pub fn reset(&mut self) {
        self.to_install = false;
        self.transact_by = TransactBy::Solver;
    }
}

fn default_true() -> bool {
    true
}

/// A repository definition as persisted by the repository manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoInfo {
    pub alias: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service: String,
    #[serde(skip)]
    pub packages_path: Option<PathBuf>,
}

impl RepoInfo {
    pub fn new(alias: &str, url: &str) -> Self {
        Self {
            alias: alias.to_owned(),
            url: url.to_owned(),
            enabled: true,
            name: String::new(),
            service: String::new(),
            packages_path: None,
        }
    }

    /// Alias usable as a single path component.
    pub fn escaped_alias(&self) -> String {
        self.alias.replace('/', "_")
    }

    /// Label to show to a person: the name when set, the alias otherwise.
    pub fn as_user_string(&self) -> &str {
        if self.name.is_empty() {
            &self.alias
        } else {
            &self.name
        }
    }
}

/// A repository index service. Refreshing it brings the repositories its
/// index lists into the repository manager, tagged with the service alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceInfo {
    pub alias: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ServiceInfo {
    pub fn new(alias: &str, url: &str) -> Self {
        Self {
            alias: alias.to_owned(),
            url: url.to_owned(),
            enabled: true,
        }
    }

    pub fn escaped_alias(&self) -> String {
        self.alias.replace('/', "_")
    }

    /// Alias of a repository this service lists as `repo`.
    pub fn repo_alias(&self, repo: &str) -> String {
        format!("{}:{repo}", self.alias)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternData {
    pub category: String,
    pub description: String,
    pub icon: String,
    pub summary: String,
    pub order: String,
}

/// Snapshot of a pattern in the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub data: PatternData,
    pub status: ResStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicKey {
    pub id: String,
    pub name: String,
    pub fingerprint: String,
}

/// What the key ring knows about the origin of a signed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyContext {
    pub repo_alias: String,
    pub policy: KeyRingPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub directory: String,
    pub filesystem: String,
    pub grow_only: bool,
    pub used_size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    #[default]
    InAdvance,
    AsNeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitPolicy {
    pub download_mode: DownloadMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitResult {
    pub no_error: bool,
}

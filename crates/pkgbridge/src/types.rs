use serde::Serialize;

use pkgbridge_abi::abi;
use pkgbridge_abi::ffi;
use pkgbridge_abi::Status;

use crate::helpers::{c_string, status_to_result};
use crate::ClientResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub enabled: bool,
    pub url: String,
    pub alias: String,
    pub user_name: String,
    pub service_name: String,
}

impl Repository {
    /// Whether the URL points to a local medium. Fails for malformed URLs.
    pub fn is_local(&self) -> ClientResult<bool> {
        let url = c_string(&self.url, "url")?;
        let mut status = Status::default();
        let local = unsafe { ffi::is_local_url(url.as_ptr(), &mut status) };
        status_to_result(status, local)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountPoint {
    pub directory: String,
    pub filesystem: String,
    pub grow_only: bool,
    pub used_size: i64,
}

impl MountPoint {
    pub fn new(directory: impl Into<String>, filesystem: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            filesystem: filesystem.into(),
            grow_only: false,
            used_size: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternInfo {
    pub name: String,
    pub category: String,
    pub icon: String,
    pub description: String,
    pub summary: String,
    pub order: String,
    pub selected: ResolvableSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvableKind {
    Product,
    Patch,
    Package,
    SrcPackage,
    Pattern,
}

impl From<ResolvableKind> for abi::ResolvableKind {
    fn from(kind: ResolvableKind) -> Self {
        match kind {
            ResolvableKind::Product => Self::Product,
            ResolvableKind::Patch => Self::Patch,
            ResolvableKind::Package => Self::Package,
            ResolvableKind::SrcPackage => Self::SrcPackage,
            ResolvableKind::Pattern => Self::Pattern,
        }
    }
}

/// Who selected a resolvable. As a request argument `Not` means nobody
/// and does nothing; `UserRemoved` only appears in reported state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvableSelected {
    Not,
    User,
    Application,
    Solver,
    UserRemoved,
}

impl From<abi::ResolvableSelected> for ResolvableSelected {
    fn from(value: abi::ResolvableSelected) -> Self {
        match value {
            abi::ResolvableSelected::NotSelected => Self::Not,
            abi::ResolvableSelected::UserSelected => Self::User,
            abi::ResolvableSelected::ApplicationSelected => Self::Application,
            abi::ResolvableSelected::SolverSelected => Self::Solver,
            abi::ResolvableSelected::UserRemoved => Self::UserRemoved,
        }
    }
}

impl From<ResolvableSelected> for abi::ResolvableSelected {
    fn from(value: ResolvableSelected) -> Self {
        match value {
            ResolvableSelected::Not => Self::NotSelected,
            ResolvableSelected::User => Self::UserSelected,
            ResolvableSelected::Application => Self::ApplicationSelected,
            ResolvableSelected::Solver => Self::SolverSelected,
            ResolvableSelected::UserRemoved => Self::UserRemoved,
        }
    }
}

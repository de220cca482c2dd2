use tracing::debug;

use crate::types::{PatternData, ResKind, ResStatus, TransactBy};
use crate::world::{PackageSpec, PatternSpec};

#[derive(Debug, Clone)]
pub(crate) struct PoolItem {
    pub kind: ResKind,
    pub name: String,
    pub repo: Option<String>,
    pub size: i64,
    pub install_dir: String,
    pub requires: Vec<String>,
    pub recommends: Vec<String>,
    pub provides: Vec<String>,
    pub status: ResStatus,
    pub pattern: Option<PatternData>,
}

impl PoolItem {
    pub fn package(spec: &PackageSpec, repo: Option<&str>) -> Self {
        Self {
            kind: spec.kind,
            name: spec.name.clone(),
            repo: repo.map(str::to_owned),
            size: spec.size,
            install_dir: spec.install_dir.clone(),
            requires: spec.requires.clone(),
            recommends: spec.recommends.clone(),
            provides: spec.provides.clone(),
            status: if repo.is_none() {
                ResStatus::installed()
            } else {
                ResStatus::default()
            },
            pattern: None,
        }
    }

    pub fn pattern(spec: &PatternSpec, repo: &str) -> Self {
        Self {
            kind: ResKind::Pattern,
            name: spec.name.clone(),
            repo: Some(repo.to_owned()),
            size: 0,
            install_dir: String::new(),
            requires: spec.requires.clone(),
            recommends: Vec::new(),
            provides: Vec::new(),
            status: ResStatus::default(),
            pattern: Some(spec.data.clone()),
        }
    }

    pub fn provides_capability(&self, capability: &str) -> bool {
        self.kind == ResKind::Package
            && (self.name == capability || self.provides.iter().any(|p| p == capability))
    }

    fn is_present(&self) -> bool {
        self.status.is_installed() || self.status.is_to_be_installed()
    }
}

/// Index of the item a selection of `kind`/`name` applies to: an available
/// candidate when there is one, the installed item otherwise.
pub(crate) fn selectable(pool: &[PoolItem], kind: ResKind, name: &str) -> Option<usize> {
    let mut matching = pool
        .iter()
        .enumerate()
        .filter(|(_, item)| item.kind == kind && item.name == name);
    let first = matching.next()?;
    if !first.1.status.is_installed() {
        return Some(first.0);
    }
    Some(
        matching
            .find(|(_, item)| !item.status.is_installed())
            .map_or(first.0, |(i, _)| i),
    )
}

/// Mark providers for every requirement of the items to be installed.
/// Returns false when some requirement has no provider at all.
pub(crate) fn resolve(pool: &mut [PoolItem], only_requires: bool) -> bool {
    for item in pool.iter_mut() {
        if item.status.is_to_be_installed() && item.status.transact_by() == TransactBy::Solver {
            item.status.reset();
        }
    }

    let mut queue: Vec<usize> = (0..pool.len())
        .filter(|&i| pool[i].status.is_to_be_installed())
        .collect();
    let mut satisfied = true;

    while let Some(index) = queue.pop() {
        let mut needs: Vec<(String, bool)> = pool[index]
            .requires
            .iter()
            .map(|c| (c.clone(), true))
            .collect();
        if !only_requires {
            needs.extend(pool[index].recommends.iter().map(|c| (c.clone(), false)));
        }

        for (capability, required) in needs {
            if pool
                .iter()
                .any(|p| p.provides_capability(&capability) && p.is_present())
            {
                continue;
            }
            let candidate = pool.iter().position(|p| {
                p.provides_capability(&capability)
                    && !p.status.is_installed()
                    && p.status.transact_by() == TransactBy::Solver
            });
            match candidate {
                Some(c) => {
                    pool[c].status.set_to_install(TransactBy::Solver);
                    queue.push(c);
                }
                None if required => {
                    debug!(requirement = %capability, by = %pool[index].name, "nothing provides requirement");
                    satisfied = false;
                }
                None => {}
            }
        }
    }

    satisfied
}

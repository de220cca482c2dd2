use std::path::Path;

use pkgbridge_engine::{MountPoint, Pattern, ResKind, ResStatus, TransactBy};
use tracing::{debug, info};

use super::Context;
use crate::abi::ResolvableSelected;
use crate::tables::{CAUSER, SELECTION};
use crate::BridgeError;

/// Selection state of a pool item as the caller sees it.
pub fn selection_state(status: &ResStatus) -> ResolvableSelected {
    SELECTION.forward((status.is_to_be_installed(), status.transact_by()))
}

fn causer(who: ResolvableSelected) -> Result<TransactBy, BridgeError> {
    CAUSER.get(who).ok_or_else(|| {
        BridgeError::InvalidArgument(format!("{who:?} cannot cause a selection"))
    })
}

impl Context {
    fn ensure_exists(&self, kind: ResKind, name: &str) -> Result<(), BridgeError> {
        match self.engine.status(kind, name) {
            Some(_) => Ok(()),
            None => Err(BridgeError::ResolvableNotFound {
                kind,
                name: name.to_owned(),
            }),
        }
    }

    /// Mark a resolvable for installation on behalf of `who`. Selecting on
    /// behalf of nobody is a no-op.
    pub fn select(
        &mut self,
        name: &str,
        kind: ResKind,
        who: ResolvableSelected,
    ) -> Result<(), BridgeError> {
        if who == ResolvableSelected::NotSelected {
            return Ok(());
        }
        let by = causer(who)?;
        self.ensure_exists(kind, name)?;
        if !self.engine.set_to_install(kind, name, by) {
            debug!(%kind, name, ?by, "selection kept by a higher causer");
        }
        Ok(())
    }

    /// Withdraw a selection made on behalf of `who`.
    pub fn unselect(
        &mut self,
        name: &str,
        kind: ResKind,
        who: ResolvableSelected,
    ) -> Result<(), BridgeError> {
        if who == ResolvableSelected::NotSelected {
            return Ok(());
        }
        let by = causer(who)?;
        self.ensure_exists(kind, name)?;
        if !self.engine.unset(kind, name, by) {
            debug!(%kind, name, ?by, "selection kept by a higher causer");
        }
        Ok(())
    }

    pub fn reset_all(&mut self) {
        info!("Resetting status of all resolvables");
        self.engine.reset_all();
    }

    /// `Ok(false)`: the solver ran but left problems unresolved.
    pub fn run_solver(&mut self, only_required: bool) -> Result<bool, BridgeError> {
        Ok(self.engine.resolve_pool(only_required)?)
    }

    pub fn packages_to_install(&self) -> usize {
        self.engine.count_to_install()
    }

    fn package_check(&self, tag: &str, selected: bool) -> Result<bool, BridgeError> {
        if tag.is_empty() {
            return Err(BridgeError::EmptyPackageTag);
        }
        let providers = self.engine.what_provides(tag);
        if selected {
            Ok(providers.iter().any(ResStatus::is_to_be_installed))
        } else {
            Ok(!providers.is_empty())
        }
    }

    pub fn is_package_available(&self, tag: &str) -> Result<bool, BridgeError> {
        self.package_check(tag, false)
    }

    pub fn is_package_selected(&self, tag: &str) -> Result<bool, BridgeError> {
        self.package_check(tag, true)
    }

    /// Patterns with the given names, in request order. Unknown names are
    /// left out.
    pub fn patterns<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<Pattern> {
        names
            .into_iter()
            .filter_map(|name| {
                let pattern = self.engine.pattern(name);
                if pattern.is_none() {
                    debug!(name, "pattern not found");
                }
                pattern
            })
            .collect()
    }

    /// Fill in `used_size` of every mount point.
    pub fn space_usage(&self, mount_points: &mut [MountPoint]) -> Result<(), BridgeError> {
        let computed = self.engine.disk_usage(mount_points)?;
        for mount_point in mount_points.iter_mut() {
            let usage = computed
                .iter()
                .find(|c| c.directory == mount_point.directory)
                .ok_or(BridgeError::MountPointNotFound)?;
            mount_point.used_size = usage.used_size;
        }
        Ok(())
    }

    /// Import a key file into the key ring as trusted.
    pub fn import_gpg_key(&mut self, path: &Path) -> Result<(), BridgeError> {
        self.engine.import_key(path, true)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn causer_rejects_states() {
        assert_eq!(
            causer(ResolvableSelected::UserSelected).unwrap(),
            TransactBy::User
        );
        let err = causer(ResolvableSelected::UserRemoved).unwrap_err();
        assert!(err.to_string().starts_with("invalid argument"));
    }

    #[test]
    fn installed_items_read_not_selected() {
        assert_eq!(
            selection_state(&ResStatus::installed()),
            ResolvableSelected::NotSelected
        );
        let mut status = ResStatus::default();
        status.set_to_install(TransactBy::ApplHigh);
        assert_eq!(
            selection_state(&status),
            ResolvableSelected::ApplicationSelected
        );
        status.unset(TransactBy::User);
        assert_eq!(selection_state(&status), ResolvableSelected::UserRemoved);
    }
}

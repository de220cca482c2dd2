use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::MemorySystem;
use crate::report::{
    Action, CheckPackageResult, InstallError, PkgGpgCheck, PreloadError, Reports,
    ResolvableError,
};
use crate::types::{CommitPolicy, CommitResult, DownloadMode, ResKind};
use crate::EngineError;

/// Attempts per problem before a further retry counts as abort.
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug)]
struct Pending {
    index: usize,
    name: String,
    url: String,
    local_file: PathBuf,
}

fn pending_packages(system: &MemorySystem) -> Vec<Pending> {
    let mut pending: Vec<Pending> = system
        .pool
        .iter()
        .enumerate()
        .filter(|(_, item)| item.kind == ResKind::Package && item.status.is_to_be_installed())
        .map(|(index, item)| {
            let repo = item.repo.as_deref().and_then(|a| system.pool_repos.get(a));
            let url = repo.map(|r| r.url.clone()).unwrap_or_default();
            let local_file = repo
                .and_then(|r| r.packages_path.clone())
                .unwrap_or_default()
                .join(format!("{}.rpm", item.name));
            Pending {
                index,
                name: item.name.clone(),
                url,
                local_file,
            }
        })
        .collect();
    pending.sort_by(|a, b| a.name.cmp(&b.name));
    pending
}

fn take_download_failure(system: &RefCell<MemorySystem>, name: &str) -> bool {
    let mut system = system.borrow_mut();
    match system.faults.download_failures.get_mut(name) {
        Some(left) if *left > 0 => {
            *left -= 1;
            true
        }
        _ => false,
    }
}

fn take_listed(list: &mut Vec<String>, name: &str) -> bool {
    match list.iter().position(|n| n == name) {
        Some(i) => {
            list.remove(i);
            true
        }
        None => false,
    }
}

/// Download one package. `Ok(false)` means the package was skipped.
fn provide(
    system: &RefCell<MemorySystem>,
    reports: &Reports,
    item: &Pending,
    preload: bool,
) -> Result<bool, EngineError> {
    let problems = reports.download_resolvable.get();
    let preload_report = reports.commit_preload.get();
    let done = |error: PreloadError, description: Option<&str>| {
        if preload {
            preload_report.file_done(&item.local_file, error, Some(&item.url), description);
        }
    };

    let mut attempts = 0;
    loop {
        attempts += 1;
        if !take_download_failure(system, &item.name) {
            done(PreloadError::NoError, None);
            return Ok(true);
        }
        let description = format!("Download of {} from {} failed", item.name, item.url);
        match problems.problem(&item.name, ResolvableError::NotFound, &description) {
            Action::Retry if attempts < MAX_ATTEMPTS => {
                debug!(package = %item.name, attempts, "retrying download");
            }
            Action::Ignore => {
                done(PreloadError::NotFound, Some(&description));
                return Ok(false);
            }
            _ => {
                done(PreloadError::NotFound, Some(&description));
                return Err(EngineError::Aborted(description));
            }
        }
    }
}

fn verify(
    system: &RefCell<MemorySystem>,
    reports: &Reports,
    item: &Pending,
) -> Result<(), EngineError> {
    let result = system
        .borrow()
        .faults
        .gpg_check
        .get(&item.name)
        .copied()
        .unwrap_or(CheckPackageResult::Ok);
    let report = reports.download_resolvable.get();

    let mut attempts = 0;
    loop {
        attempts += 1;
        let mut check = PkgGpgCheck {
            resolvable: &item.name,
            repo_url: &item.url,
            result,
            action: None,
        };
        report.pkg_gpg_check(&mut check);
        if result == CheckPackageResult::Ok {
            return Ok(());
        }

        let description = format!("Signature check of {} failed: {result}", item.name);
        let action = match check.action {
            Some(action) => action,
            None => report.problem(&item.name, ResolvableError::Invalid, &description),
        };
        match action {
            Action::Retry if attempts < MAX_ATTEMPTS => {}
            Action::Ignore => {
                warn!(package = %item.name, %result, "installing package with failed signature check");
                return Ok(());
            }
            _ => return Err(EngineError::Aborted(description)),
        }
    }
}

/// Install one package. `Ok(false)` means installation failed and was ignored.
fn install(
    system: &RefCell<MemorySystem>,
    reports: &Reports,
    item: &Pending,
) -> Result<bool, EngineError> {
    let report = reports.install_resolvable.get();
    report.start(&item.name);

    let mut attempts = 0;
    loop {
        attempts += 1;
        let failed = take_listed(&mut system.borrow_mut().faults.install_problem, &item.name);
        if !failed {
            system.borrow_mut().pool[item.index].status.mark_installed();
            let info = format!("{} installed from {}", item.name, item.local_file.display());
            report.finish(&item.name, InstallError::NoError, &info);
            return Ok(true);
        }

        let description = format!(
            "Installation of {} failed: cpio archive could not be extracted",
            item.name
        );
        match report.problem(&item.name, InstallError::Io, &description) {
            Action::Retry if attempts < MAX_ATTEMPTS => {}
            Action::Ignore => {
                report.finish(&item.name, InstallError::Io, &description);
                return Ok(false);
            }
            _ => {
                report.finish(&item.name, InstallError::Io, &description);
                return Err(EngineError::Aborted(description));
            }
        }
    }
}

pub(super) fn run(
    system: &RefCell<MemorySystem>,
    reports: &Reports,
    policy: &CommitPolicy,
) -> Result<CommitResult, EngineError> {
    let pending = {
        let system = system.borrow();
        if system.target.is_none() {
            return Err(EngineError::NoTarget);
        }
        pending_packages(&system)
    };
    let preload = policy.download_mode == DownloadMode::InAdvance;
    info!(packages = pending.len(), preload, "commit started");

    let mut no_error = true;
    let mut skipped = BTreeSet::new();

    if preload {
        reports.commit_preload.get().start();
    }
    for item in &pending {
        if !provide(system, reports, item, preload)? {
            skipped.insert(item.index);
            no_error = false;
        }
    }

    if let Some(message) = system.borrow_mut().faults.commit_error.take() {
        return Err(EngineError::Commit(message));
    }

    for item in pending.iter().filter(|i| !skipped.contains(&i.index)) {
        verify(system, reports, item)?;
    }

    for item in pending.iter().filter(|i| !skipped.contains(&i.index)) {
        if !install(system, reports, item)? {
            no_error = false;
        }
    }

    let scripts = std::mem::take(&mut system.borrow_mut().faults.script_problem);
    let report = reports.patch_script.get();
    for description in scripts {
        match report.problem(&description) {
            Action::Retry => debug!(script = %description, "patch script succeeded on retry"),
            Action::Ignore => no_error = false,
            _ => return Err(EngineError::Aborted(description)),
        }
    }

    for item in &mut system.borrow_mut().pool {
        if item.kind != ResKind::Package && item.status.is_to_be_installed() {
            item.status.mark_installed();
        }
    }

    info!(no_error, "commit finished");
    Ok(CommitResult { no_error })
}

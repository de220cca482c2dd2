//! The safe client over the in-memory engine.

use std::cell::RefCell;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pkgbridge::callbacks::{install, pkg_download, security, EmptyDownloadProgress};
use pkgbridge::{ClientError, MountPoint, ResolvableKind, ResolvableSelected, Session};
use pkgbridge_abi::provider;
use pkgbridge_engine::{MemoryProvider, MemoryWorld};
use tempfile::TempDir;

const OSS: &str = "https://download.example.org/oss";
const SIGNED: &str = "https://signed.example.org/repo";
const SERVICE: &str = "https://scc.example.com/sles";

static SERIAL: Mutex<()> = Mutex::new(());

fn world(extra: &str) -> MemoryWorld {
    MemoryWorld::from_toml(&format!(
        r#"
[key_ring]
accept_unsigned_file = true

[[installed]]
name = "glibc"
size = 100

[[remotes]]
url = "{OSS}"
name = "Main Repository"

[[remotes.packages]]
name = "vim"
size = 30
requires = ["vim-data", "glibc"]

[[remotes.packages]]
name = "vim-data"
size = 20
install_dir = "/usr/share"

[[remotes.patterns]]
name = "enhanced_base"
summary = "Enhanced Base System"
category = "Base Technologies"
order = "1030"
requires = ["vim"]

[[remotes]]
url = "{SIGNED}"
key = {{ id = "29B700A4", name = "Signing Key", fingerprint = "AD48 5664" }}

{extra}
"#
    ))
    .unwrap()
}

struct Fixture {
    session: Session,
    _root: TempDir,
    _serial: MutexGuard<'static, ()>,
}

impl Fixture {
    fn new(extra: &str) -> Self {
        let serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        provider::install(MemoryProvider::new(world(extra)));
        let root = tempfile::tempdir().unwrap();
        let session = Session::init_target(root.path().to_str().unwrap(), |_, _, _| {}).unwrap();
        Self {
            session,
            _root: root,
            _serial: serial,
        }
    }

    fn load_oss(&self) {
        self.session
            .add_repository("oss", OSS, pkgbridge::callbacks::empty_progress)
            .unwrap();
        self.session.load_source(|_, _| true).unwrap();
    }

    fn select_vim(&self) {
        self.session
            .select_resolvable("vim", ResolvableKind::Package, ResolvableSelected::User)
            .unwrap();
        assert!(self.session.run_solver(true).unwrap());
    }
}

#[test]
fn init_reports_stages_and_refuses_a_second_session() {
    let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    provider::install(MemoryProvider::new(world("")));
    let root = tempfile::tempdir().unwrap();
    let mut stages = Vec::new();
    let session = Session::init_target(root.path().to_str().unwrap(), |text, stage, total| {
        stages.push((text, stage, total));
    })
    .unwrap();
    assert_eq!(stages.len(), 2);
    assert!(stages.iter().all(|(_, _, total)| *total == 2));

    let other = tempfile::tempdir().unwrap();
    let err = Session::init_target(other.path().to_str().unwrap(), |_, _, _| {}).unwrap_err();
    assert!(err.to_string().contains("already initialized"), "{err}");

    drop(session);
    let again = Session::init_target(other.path().to_str().unwrap(), |_, _, _| {}).unwrap();
    drop(again);
    provider::reset();
}

#[test]
fn interior_nul_is_refused_before_the_call() {
    let fixture = Fixture::new("");
    let err = fixture.session.disable_repository("o\0ss").unwrap_err();
    assert!(matches!(err, ClientError::InteriorNul { what: "alias" }));
}

#[test]
fn load_source_walks_enabled_repositories() {
    let fixture = Fixture::new("");
    let session = &fixture.session;
    session.add_repository("oss", OSS, |_, _| true).unwrap();
    session.add_repository("signed", SIGNED, |_, _| true).unwrap();
    session.disable_repository("signed").unwrap();

    let seen = RefCell::new(Vec::new());
    session
        .load_source(|percent, text| {
            seen.borrow_mut().push((percent, text));
            true
        })
        .unwrap();

    let seen = seen.into_inner();
    let percents: Vec<i64> = seen.iter().map(|(p, _)| *p).collect();
    assert_eq!(percents, [0, 33, 66, 100]);
    assert_eq!(seen[0].1, "Refreshing repository oss");
    assert_eq!(seen[1].1, "Creating repository cache for oss");
    assert_eq!(seen[2].1, "Loading repository cache for oss");
    assert_eq!(seen[3].1, "Loading repositories finished");
    assert!(session.is_package_available("vim").unwrap());
}

#[test]
fn load_source_stops_when_progress_says_so() {
    let fixture = Fixture::new("");
    fixture.session.add_repository("oss", OSS, |_, _| true).unwrap();
    let calls = RefCell::new(0);
    let err = fixture
        .session
        .load_source(|_, _| {
            *calls.borrow_mut() += 1;
            false
        })
        .unwrap_err();
    assert!(matches!(err, ClientError::Aborted));
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn repositories_serialize_for_clients() {
    let fixture = Fixture::new("");
    fixture.session.add_repository("oss", OSS, |_, _| true).unwrap();
    let repos = fixture.session.list_repositories().unwrap();
    assert_eq!(repos.len(), 1);
    assert!(!repos[0].is_local().unwrap());

    let json = serde_json::to_value(&repos[0]).unwrap();
    assert_eq!(json["alias"], "oss");
    assert_eq!(json["url"], OSS);
    assert_eq!(json["enabled"], true);

    fixture.session.set_repository_url("oss", "dir:///srv/oss").unwrap();
    let repos = fixture.session.list_repositories().unwrap();
    assert!(repos[0].is_local().unwrap());

    fixture.session.remove_repository("oss", |_, _| true).unwrap();
    assert!(fixture.session.list_repositories().unwrap().is_empty());
}

#[test]
fn service_repositories_name_their_service() {
    let fixture = Fixture::new(&format!(
        "[[services]]\nurl = \"{SERVICE}\"\nrepos = [{{ alias = \"oss\", url = \"{OSS}\", name = \"Main\" }}]\n"
    ));
    let session = &fixture.session;
    let err = session.add_service("broken", "https://exa mple.org").unwrap_err();
    assert!(err.to_string().starts_with("malformed URL"), "{err}");
    let err = session.refresh_service("sles").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot refresh service with alias sles. Service not found."
    );

    session.add_service("sles", SERVICE).unwrap();
    session.refresh_service("sles").unwrap();
    let repos = session.list_repositories().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].alias, "sles:oss");
    assert_eq!(repos[0].service_name, "sles");
    assert_eq!(repos[0].user_name, "Main");

    session.load_source(|_, _| true).unwrap();
    assert!(session.is_package_available("vim").unwrap());
}

#[test]
fn failures_carry_the_bridge_message() {
    let fixture = Fixture::new("");
    let err = fixture
        .session
        .refresh_repository("missing", &EmptyDownloadProgress)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot refresh repo with alias missing. Repo not found."
    );
}

#[test]
fn patterns_and_disk_usage() {
    let fixture = Fixture::new("");
    fixture.load_oss();
    let session = &fixture.session;
    session
        .select_resolvable("enhanced_base", ResolvableKind::Pattern, ResolvableSelected::User)
        .unwrap();
    assert!(session.run_solver(false).unwrap());
    assert_eq!(session.packages_to_install().unwrap(), 3);
    assert!(session.is_package_selected("vim-data").unwrap());

    let patterns = session.patterns_info(&["missing", "enhanced_base"]).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].summary, "Enhanced Base System");
    assert_eq!(patterns[0].selected, ResolvableSelected::User);

    let usage = session
        .count_disk_usage(vec![MountPoint::new("/", "btrfs"), MountPoint::new("/usr", "")])
        .unwrap();
    assert_eq!(usage[0].used_size, 0);
    assert_eq!(usage[1].used_size, 50);

    session
        .unselect_resolvable("enhanced_base", ResolvableKind::Pattern, ResolvableSelected::User)
        .unwrap();
    session.reset_resolvables();
    assert_eq!(session.packages_to_install().unwrap(), 0);
}

#[derive(Default)]
struct Recorder {
    preloads: RefCell<u32>,
    preloaded: RefCell<Vec<String>>,
    started: RefCell<Vec<String>>,
    failed: RefCell<Vec<String>>,
}

impl pkg_download::Callback for Recorder {
    fn start_preload(&self) {
        *self.preloads.borrow_mut() += 1;
    }

    fn finish_preload(&self, _url: &str, local_path: &str, error: pkg_download::PreloadError, _details: &str) {
        assert_eq!(error, pkg_download::PreloadError::NoError);
        self.preloaded.borrow_mut().push(local_path.to_owned());
    }
}

impl install::Callback for Recorder {
    fn package_start(&self, package: &str) {
        self.started.borrow_mut().push(package.to_owned());
    }

    fn package_finish(&self, package: &str, error: install::InstallError, _install_info: &str) {
        if error != install::InstallError::NoError {
            self.failed.borrow_mut().push(package.to_owned());
        }
    }
}

#[test]
fn commit_reaches_the_callbacks() {
    let fixture = Fixture::new("");
    fixture.load_oss();
    fixture.select_vim();

    let recorder = Recorder::default();
    let no_error = fixture
        .session
        .commit(&recorder, &security::EmptyCallback, &recorder)
        .unwrap();
    assert!(no_error);
    assert_eq!(*recorder.preloads.borrow(), 1);
    assert_eq!(recorder.preloaded.borrow().len(), 2);
    assert_eq!(*recorder.started.borrow(), ["vim", "vim-data"]);
    assert!(recorder.failed.borrow().is_empty());
}

struct Unsteady;

impl install::Callback for Unsteady {
    fn package_problem(&self, package: &str, _error: install::InstallError, _description: &str) -> install::ProblemResponse {
        panic!("no answer for {package}");
    }
}

struct Tolerant;

impl install::Callback for Tolerant {
    fn package_problem(&self, _package: &str, _error: install::InstallError, _description: &str) -> install::ProblemResponse {
        install::ProblemResponse::Ignore
    }
}

#[test]
fn panicking_install_callback_aborts_the_commit() {
    let fixture = Fixture::new("[faults]\ninstall_problem = [\"vim\"]\n");
    fixture.load_oss();
    fixture.select_vim();

    let err = fixture
        .session
        .commit(&pkg_download::EmptyCallback, &security::EmptyCallback, &Unsteady)
        .unwrap_err();
    assert!(err.to_string().starts_with("operation aborted: Installation of vim failed"), "{err}");
}

#[test]
fn ignored_install_problem_reports_errors() {
    let fixture = Fixture::new("[faults]\ninstall_problem = [\"vim\"]\n");
    fixture.load_oss();
    fixture.select_vim();

    let no_error = fixture
        .session
        .commit(&pkg_download::EmptyCallback, &security::EmptyCallback, &Tolerant)
        .unwrap();
    assert!(!no_error);
}

#[test]
fn failed_commit_keeps_the_message() {
    let fixture = Fixture::new("[faults]\ncommit_error = \"rpm database is locked\"\n");
    fixture.load_oss();
    fixture.select_vim();
    let err = fixture
        .session
        .commit(&pkg_download::EmptyCallback, &security::EmptyCallback, &install::EmptyCallback)
        .unwrap_err();
    assert_eq!(err.to_string(), "commit failed: rpm database is locked");
}

struct Trusting {
    asked: RefCell<Vec<String>>,
}

impl security::Callback for Trusting {
    fn accept_key(&self, key_id: &str, _key_name: &str, _key_fingerprint: &str, repository_alias: &str) -> security::GpgKeyTrust {
        self.asked.borrow_mut().push(format!("{repository_alias}:{key_id}"));
        security::parse_key_trust("Trust").unwrap()
    }
}

#[test]
fn signed_repository_asks_about_its_key() {
    let fixture = Fixture::new("");
    let session = &fixture.session;
    session.add_repository("signed", SIGNED, |_, _| true).unwrap();

    // Default answers reject the unknown key.
    let err = session
        .refresh_repository_with_security("signed", &EmptyDownloadProgress, &security::EmptyCallback)
        .unwrap_err();
    assert!(err.to_string().contains("signature"), "{err}");

    let trusting = Trusting {
        asked: RefCell::new(Vec::new()),
    };
    session
        .refresh_repository_with_security("signed", &EmptyDownloadProgress, &trusting)
        .unwrap();
    assert_eq!(*trusting.asked.borrow(), ["signed:29B700A4"]);
}

#[test]
fn generic_progress_is_scoped() {
    let fixture = Fixture::new("");
    let session = &fixture.session;
    session.add_repository("oss", OSS, |_, _| true).unwrap();
    session.refresh_repository("oss", &EmptyDownloadProgress).unwrap();
    session.create_repo_cache("oss", |_, _| true).unwrap();

    let seen = RefCell::new(Vec::new());
    session
        .with_progress(
            |value, name| {
                seen.borrow_mut().push((value, name));
                true
            },
            |session| session.load_repo_cache("oss"),
        )
        .unwrap();
    assert_eq!(
        *seen.borrow(),
        [(0, "Loading oss".to_owned()), (100, "Loading oss".to_owned())]
    );

    // Unregistered once the closure is done.
    session.load_repo_cache("oss").unwrap();
    assert_eq!(seen.borrow().len(), 2);
}

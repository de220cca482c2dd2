//! Repository lifecycle and commit against the in-memory engine.

use pkgbridge_engine::report::{
    Action, DownloadError, DownloadProgressReport, InstallError, InstallResolvableReport,
    KeyRingReport, KeyTrust, ProgressReport,
};
use pkgbridge_engine::{
    CommitPolicy, DownloadMode, EngineError, KeyContext, MemoryEngine, MemoryWorld,
    PackageEngine, ProgressData, PublicKey, RepoInfo, RepoManagerOptions, ResKind, ServiceInfo,
    TransactBy,
};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

const OSS: &str = "https://download.example.org/oss";
const SERVICE: &str = "https://scc.example.com/sles";

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
requires = ["vim"]

{extra}
"#
    ))
    .unwrap()
}

struct Quiet;
impl ProgressReport for Quiet {}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<String>>,
    answer: Option<Action>,
}

impl Recorder {
    fn answering(answer: Action) -> Self {
        Self {
            answer: Some(answer),
            ..Self::default()
        }
    }

    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl ProgressReport for Recorder {
    fn start(&self, task: &ProgressData) {
        self.push(format!("start {}", task.name()));
    }

    fn finish(&self, task: &ProgressData) {
        self.push(format!("finish {}", task.report_value()));
    }
}

impl DownloadProgressReport for Recorder {
    fn start(&self, url: &str, _local_file: &Path) {
        self.push(format!("start {url}"));
    }

    fn problem(&self, _url: &str, error: DownloadError, _description: &str) -> Action {
        self.push(format!("problem {error:?}"));
        self.answer.unwrap_or(Action::Abort)
    }

    fn finish(&self, _url: &str, error: DownloadError, _reason: &str) {
        self.push(format!("finish {error:?}"));
    }
}

impl InstallResolvableReport for Recorder {
    fn start(&self, resolvable: &str) {
        self.push(format!("install {resolvable}"));
    }

    fn problem(&self, resolvable: &str, error: InstallError, _description: &str) -> Action {
        self.push(format!("problem {resolvable} {error:?}"));
        self.answer.unwrap_or(Action::Abort)
    }

    fn finish(&self, resolvable: &str, error: InstallError, _install_info: &str) {
        self.push(format!("finish {resolvable} {error:?}"));
    }
}

fn engine_at(root: &Path, world: MemoryWorld) -> MemoryEngine {
    let mut engine = MemoryEngine::new(world);
    engine.initialize_target(root).unwrap();
    engine.load_target().unwrap();
    engine
}

#[test]
fn repositories_persist_across_managers() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_at(dir.path(), world(""));
    let options = RepoManagerOptions::new(dir.path());

    let mut manager = engine.repo_manager(options.clone()).unwrap();
    let mut repo = RepoInfo::new("oss", OSS);
    repo.name = "Main".to_owned();
    let progress = Recorder::default();
    manager.add_repository(repo.clone(), &progress).unwrap();
    assert_eq!(
        progress.events(),
        ["start Adding repository 'Main'", "finish 100"]
    );
    assert!(options.repo_file("oss").is_file());
    assert!(matches!(
        manager.add_repository(repo, &Quiet),
        Err(EngineError::RepoAlreadyExists(_))
    ));
    assert!(matches!(
        manager.add_repository(RepoInfo::new("bad", "no scheme"), &Quiet),
        Err(EngineError::MalformedUrl { .. })
    ));

    let reopened = engine.repo_manager(options.clone()).unwrap();
    let known = reopened.known_repositories();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].name, "Main");

    let mut disabled = known[0].clone();
    disabled.enabled = false;
    manager.modify_repository("oss", disabled).unwrap();
    let reopened = engine.repo_manager(options.clone()).unwrap();
    assert!(!reopened.get_repo("oss").unwrap().enabled);

    manager.remove_repository("oss", &Quiet).unwrap();
    assert!(!options.repo_file("oss").exists());
    assert!(matches!(
        manager.remove_repository("oss", &Quiet),
        Err(EngineError::RepoNotFound(_))
    ));
}

fn service_world(repos: &str) -> MemoryWorld {
    world(&format!("[[services]]\nurl = \"{SERVICE}\"\nrepos = [{repos}]\n"))
}

#[test]
fn service_refresh_follows_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let options = RepoManagerOptions::new(dir.path());
    let both = format!(
        r#"{{ alias = "oss", url = "{OSS}", name = "Main" }}, {{ alias = "updates", url = "https://download.example.org/update" }}"#
    );
    {
        let engine = engine_at(dir.path(), service_world(&both));
        let mut manager = engine.repo_manager(options.clone()).unwrap();
        let service = ServiceInfo::new("sles", SERVICE);
        manager.add_service(service.clone()).unwrap();
        assert!(options.service_file("sles").is_file());
        assert!(matches!(
            manager.add_service(service.clone()),
            Err(EngineError::ServiceAlreadyExists(_))
        ));
        assert!(matches!(
            manager.add_service(ServiceInfo::new("bad", "https://exa mple.org")),
            Err(EngineError::MalformedUrl { .. })
        ));
        assert!(matches!(
            manager.refresh_service(&ServiceInfo::new("other", SERVICE)),
            Err(EngineError::ServiceNotFound(_))
        ));

        manager.refresh_service(&service).unwrap();
        let known = manager.known_repositories();
        let aliases: Vec<&str> = known.iter().map(|r| r.alias.as_str()).collect();
        assert_eq!(aliases, ["sles:oss", "sles:updates"]);
        assert!(known.iter().all(|r| r.service == "sles"));
        assert_eq!(known[0].name, "Main");

        let mut disabled = known[0].clone();
        disabled.enabled = false;
        manager.modify_repository("sles:oss", disabled).unwrap();
    }

    let only_oss = format!(r#"{{ alias = "oss", url = "{OSS}" }}"#);
    let engine = engine_at(dir.path(), service_world(&only_oss));
    let mut manager = engine.repo_manager(options.clone()).unwrap();
    assert_eq!(manager.known_services().len(), 1);
    let service = manager.get_service("sles").unwrap();
    manager.refresh_service(&service).unwrap();
    let known = manager.known_repositories();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].alias, "sles:oss");
    assert!(!known[0].enabled);
    assert!(!options.repo_file("sles:updates").exists());
}

#[test]
fn unknown_medium_reports_not_found_until_retries_run_out() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_at(dir.path(), world(""));
    let reports = engine.reports();
    let mut manager = engine
        .repo_manager(RepoManagerOptions::new(dir.path()))
        .unwrap();
    let repo = RepoInfo::new("gone", "https://nowhere.example.org/repo");
    manager.add_repository(repo.clone(), &Quiet).unwrap();

    let recorder = Rc::new(Recorder::answering(Action::Retry));
    reports.download_progress.connect(recorder.clone());
    let err = manager.refresh_metadata(&repo).unwrap_err();
    assert!(matches!(err, EngineError::Download { .. }));

    let events = recorder.events();
    assert_eq!(events.iter().filter(|e| e.starts_with("start")).count(), 3);
    assert_eq!(events.last().map(String::as_str), Some("finish NotFound"));
}

#[test]
fn cache_steps_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_at(dir.path(), world(""));
    let mut manager = engine
        .repo_manager(RepoManagerOptions::new(dir.path()))
        .unwrap();
    let repo = RepoInfo::new("oss", OSS);
    manager.add_repository(repo.clone(), &Quiet).unwrap();

    assert!(matches!(
        manager.build_cache(&repo, &Quiet),
        Err(EngineError::CacheMissing(_))
    ));
    assert!(matches!(
        manager.load_from_cache(&repo),
        Err(EngineError::CacheMissing(_))
    ));

    manager.refresh_metadata(&repo).unwrap();
    manager.build_cache(&repo, &Quiet).unwrap();
    let loading = Rc::new(Recorder::default());
    engine.reports().progress.connect(loading.clone());
    manager.load_from_cache(&repo).unwrap();
    assert_eq!(loading.events(), ["start Loading oss", "finish 100"]);

    let pooled = engine.pool_repos();
    assert_eq!(pooled.len(), 1);
    assert_eq!(
        pooled[0].packages_path.as_deref(),
        Some(dir.path().join("var/cache/zypp/packages/oss").as_path())
    );
    assert!(engine.status(ResKind::Package, "vim").is_some());
    assert_eq!(
        engine.pattern("enhanced_base").unwrap().data.summary,
        "Enhanced Base System"
    );
}

struct RejectAll;

impl KeyRingReport for RejectAll {
    fn accept_unsigned_file(&self, _file: &str, _context: &KeyContext) -> bool {
        false
    }

    fn accept_key(&self, _key: &PublicKey, _context: &KeyContext) -> KeyTrust {
        KeyTrust::DontTrust
    }
}

#[test]
fn signature_refusal_fails_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_at(dir.path(), world(""));
    engine.reports().key_ring.connect(Rc::new(RejectAll));
    let mut manager = engine
        .repo_manager(RepoManagerOptions::new(dir.path()))
        .unwrap();
    let repo = RepoInfo::new("oss", OSS);
    manager.add_repository(repo.clone(), &Quiet).unwrap();

    assert!(matches!(
        manager.refresh_metadata(&repo),
        Err(EngineError::Signature(_))
    ));
}

#[test]
fn commit_installs_selection_and_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_at(
        dir.path(),
        world("[faults]\ninstall_problem = [\"vim\"]\n"),
    );
    let mut manager = engine
        .repo_manager(RepoManagerOptions::new(dir.path()))
        .unwrap();
    let repo = RepoInfo::new("oss", OSS);
    manager.add_repository(repo.clone(), &Quiet).unwrap();
    manager.refresh_metadata(&repo).unwrap();
    manager.build_cache(&repo, &Quiet).unwrap();
    manager.load_from_cache(&repo).unwrap();

    assert!(engine.set_to_install(ResKind::Pattern, "enhanced_base", TransactBy::User));
    assert!(engine.resolve_pool(false).unwrap());
    assert_eq!(engine.count_to_install(), 3);

    let recorder = Rc::new(Recorder::answering(Action::Retry));
    engine.reports().install_resolvable.connect(recorder.clone());
    let result = engine
        .commit(&CommitPolicy {
            download_mode: DownloadMode::InAdvance,
        })
        .unwrap();
    assert!(result.no_error);
    assert_eq!(
        recorder.events(),
        [
            "install vim",
            "problem vim Io",
            "finish vim NoError",
            "install vim-data",
            "finish vim-data NoError",
        ]
    );
    assert!(engine.status(ResKind::Package, "vim").unwrap().is_installed());
    assert!(engine
        .status(ResKind::Pattern, "enhanced_base")
        .unwrap()
        .is_installed());
}

#[test]
fn commit_error_surfaces_after_preload() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_at(
        dir.path(),
        world("[faults]\ncommit_error = \"rpm database is locked\"\n"),
    );
    assert!(matches!(
        engine.commit(&CommitPolicy::default()),
        Err(EngineError::Commit(_))
    ));
    // The fault fires once.
    assert!(engine.commit(&CommitPolicy::default()).unwrap().no_error);
}

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use loom_bridge::{
    CompileSession, FileKind, FileManager, FileObject, Location, ManifoldFileManager,
    VfsFileManager,
};
use loom_config::LoomConfig;
use loom_core::{ContributorKind, Diagnostic, Severity};
use loom_producer::{
    ContributeRequest, DiagnosticSink, Model, Module, ModuleLayout, ProducerDiagnostic,
    ResourceProducer, ResourceTypes, SimpleModel, TypeProducer,
};
use loom_srcgen::{ClassKind, Modifiers, SrcClass, SrcField, SrcType};
use loom_vfs::{
    CachingMode, FileChange, Fragment, ManualClock, ManualFileWatcher, MemoryFs, Vfs, VfsPath,
    WatchEvent,
};
use pretty_assertions::assert_eq;

/// Renders `<name>.widget` as a class with one `String` field per line.
struct Widgets {
    contributions: Arc<AtomicUsize>,
}

impl Widgets {
    fn new() -> Self {
        Self {
            contributions: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ResourceTypes for Widgets {
    type Model = SimpleModel;

    fn id(&self) -> &str {
        "widgets"
    }

    fn handles_file_extension(&self, extension: &str) -> bool {
        extension == "widget"
    }

    fn create_model(&self, _module: &Module, fqn: &str, files: BTreeSet<VfsPath>) -> SimpleModel {
        SimpleModel::new(fqn, files)
    }

    fn contribute(
        &self,
        module: &Module,
        request: &ContributeRequest,
        _existing: Option<&str>,
        model: &SimpleModel,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<String> {
        self.contributions.fetch_add(1, Ordering::SeqCst);
        let mut class = SrcClass::new(&request.fqn, ClassKind::Class);
        class.set_modifiers(Modifiers::PUBLIC);
        for file in model.files() {
            let text = module.vfs().read_to_string(file).ok()?;
            for line in text.lines().filter(|line| !line.is_empty()) {
                if let Some(rest) = line.strip_prefix('!') {
                    sink.report(
                        Some(file),
                        Diagnostic::error("WIDGET_BAD_LINE", rest.trim(), None),
                    );
                    continue;
                }
                class.add_field(SrcField::new(line, SrcType::new("String")));
            }
        }
        class.render().ok()
    }
}

/// Appends a marker comment to existing sources that have a `.mark` file.
struct Marker;

impl ResourceTypes for Marker {
    type Model = SimpleModel;

    fn id(&self) -> &str {
        "marker"
    }

    fn contributor_kind(&self) -> ContributorKind {
        ContributorKind::Supplemental
    }

    fn handles_file_extension(&self, extension: &str) -> bool {
        extension == "mark"
    }

    fn create_model(&self, _module: &Module, fqn: &str, files: BTreeSet<VfsPath>) -> SimpleModel {
        SimpleModel::new(fqn, files)
    }

    fn contribute(
        &self,
        _module: &Module,
        _request: &ContributeRequest,
        existing: Option<&str>,
        _model: &SimpleModel,
        _sink: &mut dyn DiagnosticSink,
    ) -> Option<String> {
        Some(format!("{}// marked\n", existing?))
    }
}

/// Claims `.ghost` files and counts how often it is asked about a name.
struct Ghosts {
    lookups: Arc<AtomicUsize>,
}

impl TypeProducer for Ghosts {
    fn id(&self) -> &str {
        "ghosts"
    }

    fn contributor_kind(&self) -> ContributorKind {
        ContributorKind::Primary
    }

    fn handles_file_extension(&self, extension: &str) -> bool {
        extension == "ghost"
    }

    fn is_type(&self, module: &Module, fqn: &str) -> bool {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        !self.find_files_for_type(module, fqn).is_empty()
    }

    fn types_for_file(&self, module: &Module, file: &VfsPath) -> Vec<String> {
        if file.extension() != "ghost" {
            return Vec::new();
        }
        module.path_cache().names_for_file(file)
    }

    fn find_files_for_type(&self, module: &Module, fqn: &str) -> Vec<VfsPath> {
        module.path_cache().files_for("ghost", fqn)
    }

    fn type_names(&self, module: &Module) -> Vec<String> {
        module
            .path_cache()
            .extension_cache("ghost")
            .map(|cache| cache.fqns())
            .unwrap_or_default()
    }

    fn contribute(
        &self,
        _module: &Module,
        request: &ContributeRequest,
        _existing: Option<&str>,
        _sink: &mut dyn DiagnosticSink,
    ) -> Option<String> {
        let simple = loom_core::name::simple_name(&request.fqn);
        Some(format!("class {simple} {{}}\n"))
    }
}

struct Fixture {
    fs: Arc<MemoryFs>,
    vfs: Arc<Vfs>,
    session: CompileSession,
}

const SRC: &str = "/project/src";

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        Self::with_config(LoomConfig::default(), files)
    }

    fn with_config(config: LoomConfig, files: &[(&str, &str)]) -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        let fs = Arc::new(MemoryFs::new(clock.clone()));
        fs.create_dir_all(&VfsPath::local(SRC));
        for (path, content) in files {
            fs.write_file(&file(path), *content);
        }
        let vfs = Arc::new(Vfs::with_clock(fs.clone(), CachingMode::NoCaching, clock));
        let session = CompileSession::with_vfs(config, Arc::clone(&vfs));
        Self { fs, vfs, session }
    }

    fn add_app(&mut self) -> Arc<Module> {
        let layout = ModuleLayout::new("app")
            .with_source_root(VfsPath::local(SRC))
            .with_output(VfsPath::local("/project/out"));
        self.session.add_module(layout, &[]).unwrap()
    }

    fn manager(&self) -> &ManifoldFileManager<VfsFileManager> {
        self.session.file_manager("app").unwrap()
    }

    fn source(&self, fqn: &str) -> Option<FileObject> {
        self.manager()
            .file_for_input(&Location::SourcePath, fqn, FileKind::Source)
            .unwrap()
    }

    fn generated_content(&self, fqn: &str) -> Option<String> {
        self.source(fqn)
            .and_then(|file| file.as_generated().map(|generated| generated.content.clone()))
    }
}

fn file(relative: &str) -> VfsPath {
    VfsPath::local(SRC).join(relative).unwrap()
}

fn sources() -> BTreeSet<FileKind> {
    BTreeSet::from([FileKind::Source])
}

fn binary_names(manager: &dyn FileManager, location: &Location, files: &[FileObject]) -> Vec<String> {
    let mut names: Vec<String> = files
        .iter()
        .filter_map(|file| manager.infer_binary_name(location, file))
        .collect();
    names.sort();
    names
}

#[test]
fn widget_follows_its_file_through_delete_and_recreate() {
    let mut fixture = Fixture::new(&[("pkg/Foo.widget", "name\n")]);
    fixture.add_app();
    let widgets = Widgets::new();
    let contributions = Arc::clone(&widgets.contributions);
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(widgets)))
        .unwrap();

    let first = fixture.generated_content("pkg.Foo").expect("pkg.Foo is generated");
    assert!(first.contains("public class Foo {"), "{first}");
    assert!(first.contains("String name;"), "{first}");

    // Served from the cache.
    let again = fixture.source("pkg.Foo").unwrap();
    assert_eq!(again.as_generated().unwrap().content, first);
    assert_eq!(contributions.load(Ordering::SeqCst), 1);

    let widget = file("pkg/Foo.widget");
    assert!(fixture.fs.remove(&widget));
    let requests = fixture.session.apply_change(&FileChange::deleted(widget.clone()));
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].types, vec!["pkg.Foo"]);
    assert_eq!(fixture.source("pkg.Foo"), None);

    fixture.fs.write_file(&widget, "name\n");
    fixture.session.apply_change(&FileChange::created(widget));
    assert_eq!(fixture.generated_content("pkg.Foo"), Some(first));
    assert_eq!(contributions.load(Ordering::SeqCst), 2);
}

#[test]
fn modification_replaces_the_cached_source() {
    let mut fixture = Fixture::new(&[("pkg/Foo.widget", "alpha\n")]);
    fixture.add_app();
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(Widgets::new())))
        .unwrap();
    assert!(fixture.generated_content("pkg.Foo").unwrap().contains("String alpha;"));

    let widget = file("pkg/Foo.widget");
    fixture.fs.write_file(&widget, "beta\n");
    fixture.session.apply_change(&FileChange::modified(widget));

    let text = fixture.generated_content("pkg.Foo").unwrap();
    assert!(text.contains("String beta;"), "{text}");
    assert!(!text.contains("alpha"), "{text}");
}

#[test]
fn misses_are_cached_until_a_creation_names_the_type() {
    let mut fixture = Fixture::new(&[]);
    fixture.add_app();
    let lookups = Arc::new(AtomicUsize::new(0));
    fixture
        .session
        .register_producer(
            "app",
            Arc::new(Ghosts {
                lookups: Arc::clone(&lookups),
            }),
        )
        .unwrap();

    assert_eq!(fixture.source("pkg.Ghost"), None);
    let after_first = lookups.load(Ordering::SeqCst);
    assert!(after_first > 0);
    assert_eq!(fixture.source("pkg.Ghost"), None);
    assert_eq!(lookups.load(Ordering::SeqCst), after_first);

    let ghost = file("pkg/Ghost.ghost");
    fixture.fs.write_file(&ghost, "");
    let requests = fixture.session.apply_change(&FileChange::created(ghost));
    assert_eq!(requests[0].types, vec!["pkg.Ghost"]);
    assert_eq!(
        fixture.generated_content("pkg.Ghost").as_deref(),
        Some("class Ghost {}\n")
    );
}

#[test]
fn listings_splice_generated_sources_behind_real_ones() {
    let mut fixture = Fixture::new(&[
        ("pkg/Foo.widget", "name\n"),
        ("pkg/Real.widget", "shadowed\n"),
        ("pkg/Real.java", "package pkg;\nclass Real {}\n"),
        ("pkg/sub/Bar.widget", "size\n"),
    ]);
    fixture.add_app();
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(Widgets::new())))
        .unwrap();
    let manager = fixture.manager();
    let location = Location::SourcePath;

    let flat = manager.list(&location, "pkg", &sources(), false).unwrap();
    assert_eq!(binary_names(manager, &location, &flat), vec!["pkg.Foo", "pkg.Real"]);
    let real = flat
        .iter()
        .find(|file| file.simple_name() == "Real")
        .unwrap();
    assert!(matches!(real, FileObject::Regular(_)));

    let deep = manager.list(&location, "pkg", &sources(), true).unwrap();
    assert_eq!(
        binary_names(manager, &location, &deep),
        vec!["pkg.Foo", "pkg.Real", "pkg.sub.Bar"]
    );

    let classes = manager
        .list(&location, "pkg", &BTreeSet::from([FileKind::Class]), true)
        .unwrap();
    assert!(classes.is_empty());
}

#[test]
fn listing_diagnostics_are_positioned_in_the_resource() {
    let mut fixture = Fixture::new(&[("pkg/Foo.widget", "name\n!broken line\n")]);
    fixture.add_app();
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(Widgets::new())))
        .unwrap();
    let manager = fixture.manager();
    manager
        .list(&Location::SourcePath, "pkg", &sources(), false)
        .unwrap();

    let diagnostics = manager.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].code, "WIDGET_BAD_LINE");
    assert_eq!(diagnostics[0].message, "broken line");
    assert_eq!(
        diagnostics[0].uri.as_deref(),
        Some("file:///project/src/pkg/Foo.widget")
    );
    assert!(manager.take_diagnostics().is_empty());
}

#[test]
fn class_output_of_generated_types_stays_in_memory() {
    let mut fixture = Fixture::new(&[("pkg/Foo.widget", "name\n")]);
    fixture.add_app();
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(Widgets::new())))
        .unwrap();
    let generated = fixture.source("pkg.Foo").unwrap();
    let manager = fixture.manager();

    let class = manager
        .file_for_output(&Location::ClassOutput, "pkg.Foo", FileKind::Class, Some(&generated))
        .unwrap();
    assert!(matches!(class, FileObject::InMemoryClass(_)));
    manager.write(&class, b"\xCA\xFE").unwrap();
    assert_eq!(manager.find_compiled_file("pkg.Foo").unwrap().bytes(), b"\xCA\xFE".to_vec());

    manager
        .file_for_output(&Location::ClassOutput, "pkg.Foo$Inner", FileKind::Class, Some(&generated))
        .unwrap();
    assert!(manager.find_compiled_file("pkg.Foo$Inner").is_some());
    assert!(manager.find_compiled_file("pkg.Foo.Inner").is_some());
    assert_eq!(manager.compiled_files().len(), 2);

    // Plain sources still compile to disk.
    let plain = manager
        .file_for_output(&Location::ClassOutput, "pkg.Plain", FileKind::Class, None)
        .unwrap();
    match plain {
        FileObject::Regular(file) => {
            assert_eq!(file.path, VfsPath::local("/project/out/pkg/Plain.class"))
        }
        other => panic!("expected a regular file, got {other:?}"),
    }

    let widget = file("pkg/Foo.widget");
    fixture.fs.write_file(&widget, "other\n");
    fixture.session.apply_change(&FileChange::modified(widget));
    let manager = fixture.manager();
    assert!(manager.find_compiled_file("pkg.Foo").is_none());
    assert!(manager.find_compiled_file("pkg.Foo$Inner").is_none());
    assert!(manager.find_compiled_file("pkg.Foo.Inner").is_none());
}

#[test]
fn classes_of_amended_sources_are_not_retained() {
    let mut fixture = Fixture::new(&[
        ("pkg/Real.java", "package pkg;\nclass Real {}\n"),
        ("pkg/Real.mark", ""),
    ]);
    fixture.add_app();
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(Marker)))
        .unwrap();
    let manager = fixture.manager();

    let mut diagnostics: Vec<ProducerDiagnostic> = Vec::new();
    let amended = manager
        .find_generated_file("pkg.Real", &Location::SourcePath, manager.module(), &mut diagnostics)
        .unwrap();
    assert!(!amended.primary);
    assert_eq!(amended.content, "package pkg;\nclass Real {}\n// marked\n");

    let sibling = FileObject::Generated(amended);
    let class = manager
        .file_for_output(&Location::ClassOutput, "pkg.Real", FileKind::Class, Some(&sibling))
        .unwrap();
    assert!(matches!(class, FileObject::InMemoryClass(_)));
    assert!(manager.find_compiled_file("pkg.Real").is_none());
}

#[test]
fn runtime_mode_keeps_every_class_in_memory() {
    let mut fixture = Fixture::new(&[]);
    fixture.add_app();
    let manager = fixture.manager();

    let outer = manager.push_runtime_mode();
    let inner = manager.push_runtime_mode();
    assert_eq!((outer, inner), (0, 1));
    assert!(manager.is_runtime_mode());

    let class = manager
        .file_for_output(&Location::ClassOutput, "pkg.Plain", FileKind::Class, None)
        .unwrap();
    assert!(matches!(class, FileObject::InMemoryClass(_)));
    assert!(manager.find_compiled_file("pkg.Plain").is_some());

    manager.pop_runtime_mode(inner);
    manager.pop_runtime_mode(outer);
    assert!(!manager.is_runtime_mode());
}

#[test]
#[should_panic(expected = "runtime mode unbalanced")]
fn popping_runtime_mode_out_of_order_panics() {
    let mut fixture = Fixture::new(&[]);
    fixture.add_app();
    let manager = fixture.manager();
    let outer = manager.push_runtime_mode();
    manager.push_runtime_mode();
    manager.pop_runtime_mode(outer);
}

#[test]
fn incremental_builds_only_regenerate_changed_resources() {
    let mut config = LoomConfig::default();
    config.compile.changed_files = vec![PathBuf::from("/project/src/pkg/Foo.widget")];
    let mut fixture = Fixture::with_config(
        config,
        &[
            ("pkg/Foo.widget", "name\n"),
            ("pkg/Bar.widget", "size\n"),
            ("pkg/Host.java", "package pkg;\nclass Host {}\n"),
            ("pkg/Real.java", "package pkg;\nclass Real {}\n"),
            ("pkg/Real.mark", ""),
        ],
    );
    fixture.vfs.add_fragment(Fragment::new(
        file("pkg/Host.java"),
        "Inline.widget",
        13,
        "count\n",
    ));
    fixture.add_app();
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(Widgets::new())))
        .unwrap();
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(Marker)))
        .unwrap();
    let manager = fixture.manager();
    assert!(manager.options().is_incremental());

    let lookup = |fqn: &str| {
        let mut diagnostics: Vec<ProducerDiagnostic> = Vec::new();
        manager.find_generated_file(fqn, &Location::SourcePath, manager.module(), &mut diagnostics)
    };
    assert!(lookup("pkg.Foo").is_some());
    assert!(lookup("pkg.Bar").is_none());
    assert!(lookup("pkg.Inline").is_some());
    assert!(lookup("pkg.Real").is_some());
}

#[test]
fn watcher_events_refresh_the_session() {
    let mut fixture = Fixture::new(&[]);
    fixture.add_app();
    fixture
        .session
        .register_producer("app", Arc::new(ResourceProducer::new(Widgets::new())))
        .unwrap();
    let mut watcher = ManualFileWatcher::new();
    let handle = watcher.handle();

    assert_eq!(fixture.source("pkg.Late"), None);
    let late = file("pkg/Late.widget");
    fixture.fs.write_file(&late, "when\n");
    handle.push_changes(vec![FileChange::created(late)]).unwrap();
    assert_eq!(fixture.session.poll_watcher(&mut watcher).unwrap(), 1);
    assert!(fixture.generated_content("pkg.Late").unwrap().contains("String when;"));

    // Written without an event; only a rescan finds it.
    fixture.fs.write_file(&file("pkg/Quiet.widget"), "hush\n");
    assert_eq!(fixture.source("pkg.Quiet"), None);
    handle.push(WatchEvent::Rescan).unwrap();
    assert_eq!(fixture.session.poll_watcher(&mut watcher).unwrap(), 0);
    assert!(fixture.generated_content("pkg.Quiet").is_some());
}

#[test]
fn dependency_types_are_listed_and_modular_class_paths_hide_primaries() {
    let mut config = LoomConfig::default();
    config.compile.modular = true;
    let mut fixture = Fixture::with_config(config, &[("pkg/Foo.widget", "name\n")]);
    fixture.fs.write_file(&VfsPath::local("/lib/src/lib/Gen.widget"), "id\n");

    let lib = ModuleLayout::new("lib").with_source_root(VfsPath::local("/lib/src"));
    fixture.session.add_module(lib, &[]).unwrap();
    let app = ModuleLayout::new("app").with_source_root(VfsPath::local(SRC));
    fixture.session.add_module(app, &["lib"]).unwrap();
    for module in ["lib", "app"] {
        fixture
            .session
            .register_producer(module, Arc::new(ResourceProducer::new(Widgets::new())))
            .unwrap();
    }
    let manager = fixture.manager();

    let patched = manager
        .list(&Location::PatchModule("lib".into()), "lib", &sources(), false)
        .unwrap();
    assert_eq!(patched.len(), 1);
    let generated = patched[0].as_generated().unwrap();
    assert_eq!(generated.fqn, "lib.Gen");
    assert_eq!(generated.module, "lib");

    let on_class_path = manager
        .list(&Location::ClassPath, "pkg", &sources(), false)
        .unwrap();
    assert!(on_class_path.is_empty());
}

#[test]
fn dependency_changes_refresh_dependent_file_managers() {
    let mut fixture = Fixture::new(&[]);
    let gen = VfsPath::local("/lib/src/lib/Gen.widget");
    fixture.fs.write_file(&gen, "id\n");

    let lib = ModuleLayout::new("lib").with_source_root(VfsPath::local("/lib/src"));
    fixture.session.add_module(lib, &[]).unwrap();
    let app = ModuleLayout::new("app").with_source_root(VfsPath::local(SRC));
    fixture.session.add_module(app, &["lib"]).unwrap();
    fixture
        .session
        .register_producer("lib", Arc::new(ResourceProducer::new(Widgets::new())))
        .unwrap();

    let listed_content = |fixture: &Fixture| -> Vec<String> {
        fixture
            .manager()
            .list(&Location::SourcePath, "lib", &sources(), false)
            .unwrap()
            .iter()
            .filter_map(|file| file.as_generated().map(|generated| generated.content.clone()))
            .collect()
    };
    let before = listed_content(&fixture);
    assert_eq!(before.len(), 1);
    assert!(before[0].contains("String id;"), "{}", before[0]);

    fixture.fs.write_file(&gen, "changed\n");
    let requests = fixture.session.apply_change(&FileChange::modified(gen));
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].module, "lib");
    assert_eq!(requests[0].types, vec!["lib.Gen"]);

    let after = listed_content(&fixture);
    assert_eq!(after.len(), 1);
    assert!(after[0].contains("String changed;"), "{}", after[0]);
    assert!(!after[0].contains("String id;"), "{}", after[0]);
}

#[test]
fn modules_must_exist_before_they_are_depended_on() {
    let mut fixture = Fixture::new(&[]);
    let err = fixture
        .session
        .add_module(ModuleLayout::new("app"), &["missing"])
        .unwrap_err();
    assert_eq!(err.to_string(), "unknown module: missing");

    fixture.add_app();
    let err = fixture
        .session
        .add_module(ModuleLayout::new("app"), &[])
        .unwrap_err();
    assert_eq!(err.to_string(), "module app is already part of the session");
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use loom_bootstrap::{
    insert_bootstrap, Bootstrap, BootstrapOptions, Bootstraps, OnceBootstrap, BOOTSTRAP_CALL,
};
use loom_config::CompileConfig;
use loom_srcgen::{ClassKind, Modifiers, SrcClass, SrcStatementBlock, SrcType};
use pretty_assertions::assert_eq;

#[test]
fn bootstrap_block_renders_before_existing_static_blocks() {
    let mut class = SrcClass::new("com.example.Widget", ClassKind::Class);
    class
        .set_modifiers(Modifiers::PUBLIC)
        .add_static_block(SrcStatementBlock::new().statement("init();"));

    assert!(insert_bootstrap(&mut class, &BootstrapOptions::default()));
    assert!(!insert_bootstrap(&mut class, &BootstrapOptions::default()));
    assert_eq!(class.static_blocks().len(), 2);
    assert_eq!(class.static_blocks()[0].statements().to_vec(), vec![BOOTSTRAP_CALL.to_string()]);

    let source = class.render().unwrap();
    let boot = source
        .find("  static {\n    manifold.rt.api.IBootstrap.dasBoot();\n  }\n")
        .expect("bootstrap block rendered");
    let init = source.find("    init();").expect("existing block rendered");
    assert!(boot < init);
}

#[test]
fn no_bootstrap_config_disables_insertion() {
    let config: CompileConfig = CompileConfig {
        no_bootstrap: true,
        ..CompileConfig::default()
    };
    let mut class = SrcClass::new("com.example.Widget", ClassKind::Class);
    assert!(!insert_bootstrap(&mut class, &BootstrapOptions::from_config(&config)));
    assert!(class.static_blocks().is_empty());
}

#[test]
fn host_implementations_and_enums() {
    let options = BootstrapOptions::default();
    let mut host = SrcClass::new("com.example.Host", ClassKind::Class);
    host.add_interface(SrcType::new("manifold.api.host.IManifoldHost"));
    assert!(!insert_bootstrap(&mut host, &options));

    let mut color = SrcClass::new("com.example.Color", ClassKind::Enum);
    assert!(insert_bootstrap(&mut color, &options));
}

struct Flag(AtomicBool);

impl Bootstrap for Flag {
    fn boot(&self) -> bool {
        self.0.store(true, Ordering::SeqCst);
        true
    }
}

#[test]
fn global_registry_boots_registered_hooks() {
    let flag = Arc::new(Flag(AtomicBool::new(false)));
    let once = Arc::new(OnceBootstrap::new("runtime", || true));
    Bootstraps::global().register(flag.clone());
    Bootstraps::global().register(once.clone());

    assert!(Bootstraps::global().das_boot());
    assert!(flag.0.load(Ordering::SeqCst));
    assert!(once.is_booted());
    assert_eq!(once.name(), "runtime");
}

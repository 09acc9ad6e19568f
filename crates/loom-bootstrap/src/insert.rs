use loom_config::CompileConfig;
use loom_srcgen::{ClassKind, SrcClass, SrcStatementBlock};

/// Statement of the inserted static block.
pub const BOOTSTRAP_CALL: &str = "manifold.rt.api.IBootstrap.dasBoot();";

/// Annotation that keeps a class free of the bootstrap block.
pub const NO_BOOTSTRAP_ANNOTATION: &str = "NoBootstrap";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOptions {
    pub enabled: bool,
}

impl BootstrapOptions {
    pub fn from_config(config: &CompileConfig) -> Self {
        Self {
            enabled: !config.no_bootstrap,
        }
    }
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Prepends `static { IBootstrap.dasBoot(); }` to `class`. Returns whether a block was inserted.
///
/// Only top-level classes get one; interfaces, annotation types, classes annotated
/// `@NoBootstrap`, host implementations and classes that already boot are left alone.
pub fn insert_bootstrap(class: &mut SrcClass, options: &BootstrapOptions) -> bool {
    if !options.enabled || !class.is_top_level() {
        return false;
    }
    if matches!(class.kind(), ClassKind::Interface | ClassKind::Annotation) {
        return false;
    }
    if class.has_annotation(NO_BOOTSTRAP_ANNOTATION) || is_host(class) || already_boots(class) {
        return false;
    }
    class.insert_static_block(0, SrcStatementBlock::new().statement(BOOTSTRAP_CALL));
    tracing::debug!(target: "loom.bootstrap", class = %class.name(), "inserted bootstrap block");
    true
}

fn is_host(class: &SrcClass) -> bool {
    class
        .interfaces()
        .iter()
        .any(|iface| iface.name().contains("ManifoldHost"))
}

fn already_boots(class: &SrcClass) -> bool {
    class.static_blocks().iter().any(|block| {
        block
            .statements()
            .iter()
            .any(|s| s.contains("IBootstrap") && s.contains(".dasBoot"))
    })
}

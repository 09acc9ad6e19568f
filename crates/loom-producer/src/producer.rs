use loom_core::{ContributorKind, RefreshKind};
use loom_vfs::VfsPath;

use crate::diagnostics::DiagnosticSink;
use crate::extension::ExtensionProducer;
use crate::module::Module;

/// Parameters of one [`TypeProducer::contribute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributeRequest {
    pub fqn: String,
    /// Name of the compiler location the request came from, when known.
    pub location: Option<String>,
    /// Produce declarations only; bodies may be stubbed.
    pub gen_stubs: bool,
}

/// A resource change and every qualified name it affects, before and after the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub module: String,
    pub file: VfsPath,
    pub types: Vec<String>,
    pub kind: RefreshKind,
}

/// A pluggable source of types.
///
/// Every call receives the owning module; producers never store it. Implementations keep their
/// own caches behind interior mutability and must tolerate refresh notifications between calls.
pub trait TypeProducer: Send + Sync {
    /// Unique within a module.
    fn id(&self) -> &str;

    fn contributor_kind(&self) -> ContributorKind;

    fn init(&self, _module: &Module) {}

    fn handles_file_extension(&self, extension: &str) -> bool;

    fn handles_file(&self, _module: &Module, file: &VfsPath) -> bool {
        self.handles_file_extension(&file.extension())
    }

    /// Type name `file` contributes to, given the name its path implies.
    fn type_name_for_file(
        &self,
        _module: &Module,
        default_fqn: &str,
        _file: &VfsPath,
    ) -> Option<String> {
        Some(default_fqn.to_string())
    }

    /// Whether this producer claims `fqn`, top-level or nested.
    fn is_type(&self, module: &Module, fqn: &str) -> bool;

    fn is_top_level_type(&self, module: &Module, fqn: &str) -> bool {
        self.is_type(module, fqn)
    }

    fn is_package(&self, _module: &Module, _package: &str) -> bool {
        false
    }

    fn is_inner_type(&self, _module: &Module, _top_level: &str, _relative_inner: &str) -> bool {
        false
    }

    fn types_for_file(&self, module: &Module, file: &VfsPath) -> Vec<String>;

    fn find_files_for_type(&self, module: &Module, fqn: &str) -> Vec<VfsPath>;

    /// Every top-level name this producer currently claims.
    fn type_names(&self, module: &Module) -> Vec<String>;

    /// Source for `request.fqn`. Supplemental producers amend `existing`; primary producers
    /// receive `None`.
    fn contribute(
        &self,
        module: &Module,
        request: &ContributeRequest,
        existing: Option<&str>,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<String>;

    /// Called after the path cache has seen the change and before any compiler-side cache.
    fn refreshed_file(&self, _module: &Module, _request: &RefreshRequest) {}

    /// Called once all producers have processed `request`.
    fn refreshed_types(&self, _module: &Module, _request: &RefreshRequest) {}

    /// Everything may have changed.
    fn refreshed(&self, _module: &Module) {}

    /// Whether claimed types come from resource files the build tool tracks.
    fn is_file_backed(&self) -> bool {
        true
    }

    fn as_extension_producer(&self) -> Option<&dyn ExtensionProducer> {
        None
    }
}

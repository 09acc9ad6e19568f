use std::collections::BTreeSet;
use std::iter;
use std::sync::Arc;

use loom_config::CompileConfig;
use loom_core::ContributorKind;
use loom_path_cache::{FqnCache, NamespaceChild, NamespaceChildKind};
use loom_producer::{
    ContributeRequest, DiagnosticSink, Module, ProducerDiagnostic, RefreshListener,
    RefreshRequest,
};
use loom_vfs::VfsPath;
use parking_lot::Mutex;

use crate::error::BridgeError;
use crate::file_manager::FileManager;
use crate::file_object::{FileKind, FileObject, GeneratedFileObject, InMemoryClass};
use crate::line_offsets::{LineOffsets, ResolvedDiagnostic};
use crate::location::{HostModule, Location, PatchLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// The host compiler may write class files to disk.
    pub from_compiler: bool,
    /// Class files of primary generated types go to disk.
    pub static_compile: bool,
    /// The host module system is active.
    pub modular: bool,
    /// Resources changed since the last build; non-empty means incremental compilation.
    pub changed_files: BTreeSet<VfsPath>,
}

impl BridgeOptions {
    pub fn from_config(config: &CompileConfig) -> Self {
        Self {
            from_compiler: config.from_compiler,
            static_compile: config.static_compile,
            modular: config.modular,
            changed_files: config
                .changed_files
                .iter()
                .map(|path| VfsPath::local(path.clone()))
                .collect(),
        }
    }

    pub fn is_incremental(&self) -> bool {
        !self.changed_files.is_empty()
    }
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::from_config(&CompileConfig::default())
    }
}

#[derive(Debug, Clone)]
enum Cached {
    Hit(Arc<GeneratedFileObject>),
    Miss,
}

/// File manager decorator that serves synthesized sources from a module's producers.
///
/// Generated files are cached per qualified name, misses included; class output of generated
/// types is kept in memory unless it may go to disk. Both caches drop the names a
/// [`RefreshRequest`] carries, whatever its kind.
pub struct ManifoldFileManager<F> {
    delegate: F,
    module: Arc<Module>,
    options: BridgeOptions,
    host_modules: Vec<HostModule>,
    generated: Mutex<FqnCache<Cached>>,
    classes: Mutex<FqnCache<Arc<InMemoryClass>>>,
    location_stack: Mutex<Vec<String>>,
    runtime_mode: Mutex<usize>,
    line_offsets: LineOffsets,
    pending: Mutex<Vec<ProducerDiagnostic>>,
}

impl<F: FileManager> ManifoldFileManager<F> {
    pub fn new(delegate: F, module: Arc<Module>, options: BridgeOptions) -> Self {
        Self {
            delegate,
            module,
            options,
            host_modules: Vec::new(),
            generated: Mutex::new(FqnCache::new()),
            classes: Mutex::new(FqnCache::new()),
            location_stack: Mutex::new(Vec::new()),
            runtime_mode: Mutex::new(0),
            line_offsets: LineOffsets::new(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The host's modules, used to infer which module a patch location belongs to.
    pub fn with_host_modules(mut self, modules: Vec<HostModule>) -> Self {
        self.host_modules = modules;
        self
    }

    pub fn delegate(&self) -> &F {
        &self.delegate
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// A real file from the delegate, else the generated source for `fqn`.
    pub fn source_file_for_input(
        &self,
        location: &Location,
        fqn: &str,
        kind: FileKind,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<FileObject> {
        match self.delegate.file_for_input(location, fqn, kind) {
            Ok(Some(file)) => return Some(file),
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(target: "loom.bridge", fqn, error = %err, "delegate lookup failed");
            }
        }
        let module = Arc::clone(&self.module);
        self.find_generated_file(&fqn.replace('$', "."), location, &module, sink)
            .map(FileObject::Generated)
    }

    /// Generated source for `fqn`, answered from the cache when possible.
    ///
    /// A miss is cached as well; it stays until a refresh names `fqn`.
    pub fn find_generated_file(
        &self,
        fqn: &str,
        location: &Location,
        module: &Module,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<Arc<GeneratedFileObject>> {
        if let Some(cached) = self.generated.lock().get(fqn).cloned() {
            return match cached {
                Cached::Hit(file) => Some(file),
                Cached::Miss => None,
            };
        }

        if self.is_filtered_from_incremental_compilation(module, fqn) {
            tracing::trace!(target: "loom.bridge", fqn, "unchanged; compiled class is used");
            return None;
        }

        let request = ContributeRequest {
            fqn: fqn.to_string(),
            location: Some(location.to_string()),
            gen_stubs: false,
        };
        let existing = existing_source(module, fqn);
        self.push_location(location);
        let produced = module.produce_file(&request, existing.as_deref(), sink);
        self.pop_location(location);

        let cached = match produced {
            Some(file) => Cached::Hit(Arc::new(GeneratedFileObject {
                fqn: fqn.to_string(),
                module: module.name().to_string(),
                content: file.content,
                primary: file.primary.is_some(),
                resource_files: file.resource_files,
            })),
            None => {
                tracing::debug!(target: "loom.bridge", fqn, "miss recorded");
                Cached::Miss
            }
        };
        self.generated.lock().add(fqn, cached.clone());
        match cached {
            Cached::Hit(file) => Some(file),
            Cached::Miss => None,
        }
    }

    pub fn find_compiled_file(&self, fqn: &str) -> Option<Arc<InMemoryClass>> {
        self.classes.lock().get(fqn).cloned()
    }

    /// Every class kept in memory, once each.
    pub fn compiled_files(&self) -> Vec<Arc<InMemoryClass>> {
        let mut out: Vec<Arc<InMemoryClass>> = Vec::new();
        self.classes.lock().visit_depth_first(|node| {
            if let Some(class) = node.value() {
                if !out.iter().any(|seen| Arc::ptr_eq(seen, class)) {
                    out.push(Arc::clone(class));
                }
            }
            true
        });
        out
    }

    pub fn remove(&self, fqn: &str) {
        self.classes.lock().remove(fqn);
    }

    /// Enters runtime mode, in which no class file goes to disk. Returns the depth to hand back
    /// to [`ManifoldFileManager::pop_runtime_mode`].
    pub fn push_runtime_mode(&self) -> usize {
        let mut mode = self.runtime_mode.lock();
        let previous = *mode;
        *mode += 1;
        previous
    }

    /// # Panics
    ///
    /// When pushes and pops are not balanced.
    pub fn pop_runtime_mode(&self, check: usize) {
        let balanced = {
            let mut mode = self.runtime_mode.lock();
            match mode.checked_sub(1) {
                Some(next) => {
                    *mode = next;
                    next == check
                }
                None => false,
            }
        };
        if !balanced {
            tracing::error!(target: "loom.bridge", check, "runtime mode unbalanced");
            panic!("runtime mode unbalanced");
        }
    }

    pub fn is_runtime_mode(&self) -> bool {
        *self.runtime_mode.lock() > 0
    }

    /// Module of the innermost location currently producing a file.
    pub fn current_module(&self) -> Option<String> {
        self.location_stack.lock().last().cloned()
    }

    /// Diagnostics reported by producers during listings and lookups since the last call,
    /// positioned in their physical files.
    pub fn take_diagnostics(&self) -> Vec<ResolvedDiagnostic> {
        let pending = std::mem::take(&mut *self.pending.lock());
        pending
            .iter()
            .map(|reported| self.resolve_diagnostic(reported))
            .collect()
    }

    pub fn resolve_diagnostic(&self, reported: &ProducerDiagnostic) -> ResolvedDiagnostic {
        self.line_offsets.resolve(self.module.vfs(), reported)
    }

    /// Drops every cache.
    pub fn clear(&self) {
        self.generated.lock().clear();
        self.classes.lock().clear();
        self.line_offsets.clear();
        self.pending.lock().clear();
    }

    fn push_location(&self, location: &Location) {
        let module = self.infer_module(location);
        self.location_stack.lock().push(module);
    }

    fn pop_location(&self, location: &Location) {
        let expected = self.infer_module(location);
        let top = self.location_stack.lock().pop();
        if top.as_deref() != Some(expected.as_str()) {
            tracing::error!(
                target: "loom.bridge",
                expected = %expected,
                found = ?top,
                "location stack not balanced"
            );
            panic!("location stack not balanced: expected {expected}, found {top:?}");
        }
    }

    fn infer_module(&self, location: &Location) -> String {
        if !self.options.modular {
            return self.module.name().to_string();
        }
        match location {
            Location::Module(name) | Location::PatchModule(name) => name.clone(),
            Location::Patch(patch) => patch
                .infer_module_name(&self.host_modules)
                .unwrap_or_else(|| self.module.name().to_string()),
            _ => self.module.name().to_string(),
        }
    }

    /// Under incremental compilation, names no changed file contributes to are left to their
    /// existing class files.
    fn is_filtered_from_incremental_compilation(&self, module: &Module, fqn: &str) -> bool {
        if !self.options.is_incremental() {
            return false;
        }
        for producer in module.producers() {
            let in_memory_only = producer.contributor_kind() == ContributorKind::Supplemental
                || !producer.is_file_backed();
            if in_memory_only && producer.is_type(module, fqn) {
                return false;
            }
            if producer
                .find_files_for_type(module, fqn)
                .iter()
                .any(VfsPath::is_fragment)
            {
                return false;
            }
            let changed = self.options.changed_files.iter().any(|file| {
                producer
                    .types_for_file(module, file)
                    .iter()
                    .any(|name| name == fqn)
            });
            if changed {
                return false;
            }
        }
        true
    }

    fn ok_to_write_class_file(&self, kind: FileKind, sibling: Option<&FileObject>) -> bool {
        if self.is_runtime_mode() || !self.options.from_compiler {
            return false;
        }
        if kind != FileKind::Class {
            return true;
        }
        match sibling.and_then(FileObject::as_generated) {
            None => true,
            Some(generated) => self.options.static_compile && generated.primary,
        }
    }

    fn namespace_children(&self, package: &str) -> Vec<(NamespaceChild, Arc<Module>)> {
        let mut seen: BTreeSet<(String, NamespaceChildKind)> = BTreeSet::new();
        let mut out = Vec::new();
        for module in iter::once(&self.module).chain(self.module.dependencies()) {
            for child in module.children_of_namespace(package) {
                if seen.insert((child.fqn.clone(), child.kind)) {
                    out.push((child, Arc::clone(module)));
                }
            }
        }
        out
    }

    fn generated_in(
        &self,
        location: &Location,
        package: &str,
        listed: &BTreeSet<String>,
        patchables: Option<&[FileObject]>,
        recurse: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<FileObject> {
        let mut out = Vec::new();
        for (child, module) in self.namespace_children(package) {
            if listed.contains(&child.fqn) {
                continue;
            }
            match child.kind {
                NamespaceChildKind::Namespace => {
                    if recurse {
                        out.extend(
                            self.generated_in(location, &child.fqn, listed, patchables, recurse, sink),
                        );
                    }
                }
                NamespaceChildKind::Type => {
                    let Some(generated) =
                        self.find_generated_file(&child.fqn, location, &module, sink)
                    else {
                        continue;
                    };
                    let file = FileObject::Generated(generated);
                    if self.is_source_ok(&file, location)
                        && self.is_correct_module(&module, location, patchables, &file, &child.fqn)
                    {
                        out.push(file);
                    }
                }
            }
        }
        out
    }

    /// On the class path of a modular build only extension sources may appear.
    fn is_source_ok(&self, file: &FileObject, location: &Location) -> bool {
        *location != Location::ClassPath
            || !self.options.modular
            || file.as_generated().is_some_and(|generated| !generated.primary)
    }

    fn is_correct_module(
        &self,
        module: &Module,
        location: &Location,
        patchables: Option<&[FileObject]>,
        file: &FileObject,
        fqn: &str,
    ) -> bool {
        let is_primary = |p: &dyn loom_producer::TypeProducer| {
            p.contributor_kind() == ContributorKind::Primary
        };
        if !matches!(location, Location::PatchModule(_)) {
            return !self.options.modular
                || !self.module.find_type_producers_for(fqn, is_primary).is_empty();
        }

        // A dependency's type that was not compiled there is compiled here.
        if !module.find_type_producers_for(fqn, is_primary).is_empty() {
            return true;
        }
        let Some(patchables) = patchables else {
            return true;
        };
        let Some(binary_name) = self.infer_binary_name(location, file) else {
            return false;
        };
        patchables
            .iter()
            .any(|candidate| self.infer_binary_name(location, candidate).as_ref() == Some(&binary_name))
    }
}

fn existing_source(module: &Module, fqn: &str) -> Option<String> {
    let file = module.path_cache().files_for("java", fqn).into_iter().next()?;
    module.vfs().read_to_string(&file).ok()
}

fn remove_class(classes: &mut FqnCache<Arc<InMemoryClass>>, fqn: &str) {
    classes.remove(fqn);
    let nested_prefix = format!("{fqn}$");
    for name in classes.fqns() {
        if name.starts_with(&nested_prefix) {
            classes.remove(&name);
        }
    }
}

impl<F: FileManager> FileManager for ManifoldFileManager<F> {
    fn list(
        &self,
        location: &Location,
        package: &str,
        kinds: &BTreeSet<FileKind>,
        recurse: bool,
    ) -> Result<Vec<FileObject>, BridgeError> {
        let mut files = self.delegate.list(location, package, kinds, recurse)?;
        if !kinds.contains(&FileKind::Source) || !location.may_hold_generated_sources() {
            return Ok(files);
        }

        let patchables = match location {
            Location::PatchModule(name) => Some(self.delegate.list(
                &Location::Module(name.clone()),
                package,
                &BTreeSet::from([FileKind::Class, FileKind::Source]),
                recurse,
            )?),
            _ => None,
        };
        let listed: BTreeSet<String> = files
            .iter()
            .filter(|file| file.kind() == FileKind::Source)
            .filter_map(|file| self.infer_binary_name(location, file))
            .collect();

        let mut diagnostics: Vec<ProducerDiagnostic> = Vec::new();
        let generated = self.generated_in(
            location,
            package,
            &listed,
            patchables.as_deref(),
            recurse,
            &mut diagnostics,
        );
        self.pending.lock().extend(diagnostics);
        files.extend(generated);
        Ok(files)
    }

    fn file_for_input(
        &self,
        location: &Location,
        binary_name: &str,
        kind: FileKind,
    ) -> Result<Option<FileObject>, BridgeError> {
        if kind != FileKind::Source {
            return self.delegate.file_for_input(location, binary_name, kind);
        }
        let mut diagnostics: Vec<ProducerDiagnostic> = Vec::new();
        let file = self.source_file_for_input(location, binary_name, kind, &mut diagnostics);
        self.pending.lock().extend(diagnostics);
        Ok(file)
    }

    fn file_for_output(
        &self,
        location: &Location,
        class_name: &str,
        kind: FileKind,
        sibling: Option<&FileObject>,
    ) -> Result<FileObject, BridgeError> {
        if self.ok_to_write_class_file(kind, sibling) {
            return self
                .delegate
                .file_for_output(location, class_name, kind, sibling);
        }

        let class = Arc::new(InMemoryClass::new(class_name, kind));
        // Stubbed classes of non-primary sources, e.g. extended types, are not kept.
        let retain = sibling
            .and_then(FileObject::as_generated)
            .map_or(true, |generated| generated.primary);
        if retain {
            let mut classes = self.classes.lock();
            classes.add(class_name, Arc::clone(&class));
            let dotted = class_name.replace('$', ".");
            if dotted != class_name {
                classes.add(&dotted, Arc::clone(&class));
            }
        }
        Ok(FileObject::InMemoryClass(class))
    }

    fn write(&self, file: &FileObject, bytes: &[u8]) -> Result<(), BridgeError> {
        match file {
            FileObject::InMemoryClass(class) => {
                class.set_bytes(bytes);
                Ok(())
            }
            _ => self.delegate.write(file, bytes),
        }
    }

    fn infer_binary_name(&self, location: &Location, file: &FileObject) -> Option<String> {
        match file {
            FileObject::Generated(generated) => Some(
                loom_core::name::strip_extension(&generated.name()).replace('/', "."),
            ),
            FileObject::InMemoryClass(class) => Some(class.class_name.clone()),
            FileObject::Regular(_) => self.delegate.infer_binary_name(location, file),
        }
    }

    fn has_location(&self, location: &Location) -> bool {
        (*location == Location::PatchModulePath && self.options.modular)
            || self.delegate.has_location(location)
    }

    fn location_for_module(
        &self,
        location: &Location,
        module: &str,
    ) -> Result<Option<Location>, BridgeError> {
        if *location == Location::PatchModulePath {
            return Ok(Some(Location::PatchModule(module.to_string())));
        }
        self.delegate.location_for_module(location, module)
    }

    fn location_for_file(
        &self,
        location: &Location,
        file: &FileObject,
    ) -> Result<Option<Location>, BridgeError> {
        if let (Location::PatchModulePath, FileObject::Generated(generated)) = (location, file) {
            return Ok(Some(Location::Patch(PatchLocation::for_generated(generated))));
        }
        self.delegate.location_for_file(location, file)
    }

    fn infer_module_name(&self, location: &Location) -> Option<String> {
        if let Location::Patch(patch) = location {
            if let Some(name) = patch.infer_module_name(&self.host_modules) {
                return Some(name);
            }
        }
        self.delegate.infer_module_name(location)
    }

    fn is_same_file(&self, a: &FileObject, b: &FileObject) -> bool {
        if a.as_generated().is_some() || b.as_generated().is_some() {
            return a == b;
        }
        self.delegate.is_same_file(a, b)
    }
}

impl<F: FileManager> RefreshListener for ManifoldFileManager<F> {
    fn refreshed_types(&self, request: &RefreshRequest) {
        {
            let mut classes = self.classes.lock();
            let mut generated = self.generated.lock();
            // Creation too: the new file may answer a cached miss.
            for fqn in &request.types {
                remove_class(&mut classes, fqn);
                generated.remove(fqn);
            }
        }
        self.line_offsets.invalidate(&request.file);
        tracing::trace!(
            target: "loom.bridge",
            module = %request.module,
            types = request.types.len(),
            "file manager caches refreshed"
        );
    }

    fn refreshed(&self) {
        self.generated.lock().clear();
        self.classes.lock().clear();
        self.line_offsets.clear();
    }
}

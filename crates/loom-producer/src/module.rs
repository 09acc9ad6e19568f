use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Weak};

use loom_core::{ContributorKind, Diagnostic, RefreshKind};
use loom_path_cache::{NamespaceChild, NamespaceChildKind, PathCache};
use loom_srcgen::InnerSupplementer;
use loom_vfs::{Vfs, VfsPath};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::diagnostics::{DiagnosticSink, ProducerDiagnostic};
use crate::producer::{ContributeRequest, RefreshRequest, TypeProducer};

/// Diagnostic code for a name claimed by more than one primary producer.
pub const PRIMARY_CONFLICT: &str = "LOOM_PRIMARY_CONFLICT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    pub name: String,
    pub source_path: Vec<VfsPath>,
    pub class_path: Vec<VfsPath>,
    pub output_path: Option<VfsPath>,
}

impl ModuleLayout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_path: Vec::new(),
            class_path: Vec::new(),
            output_path: None,
        }
    }

    pub fn with_source_root(mut self, root: VfsPath) -> Self {
        self.source_path.push(root);
        self
    }

    pub fn with_class_root(mut self, root: VfsPath) -> Self {
        self.class_path.push(root);
        self
    }

    pub fn with_output(mut self, output: VfsPath) -> Self {
        self.output_path = Some(output);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    DuplicateId { module: String, id: String },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::DuplicateId { module, id } => {
                write!(f, "duplicate type producer id in module {module}: {id}")
            }
        }
    }
}

impl std::error::Error for RegisterError {}

/// Observer of module refreshes, notified after every producer has seen the change.
pub trait RefreshListener: Send + Sync {
    fn refreshed_types(&self, request: &RefreshRequest);

    fn refreshed(&self) {}
}

/// Source produced for one top-level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub fqn: String,
    pub content: String,
    /// Id of the primary producer; `None` when only supplemental producers amended existing
    /// source.
    pub primary: Option<String>,
    pub supplementals: Vec<String>,
    /// Resource files the contributing producers read.
    pub resource_files: Vec<VfsPath>,
}

/// One build module: its roots, its path cache, and the producers registered for it.
pub struct Module {
    layout: ModuleLayout,
    vfs: Arc<Vfs>,
    dependencies: Vec<Arc<Module>>,
    path_cache: RwLock<PathCache>,
    producers: RwLock<Vec<Arc<dyn TypeProducer>>>,
    listeners: RwLock<Vec<Weak<dyn RefreshListener>>>,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("layout", &self.layout)
            .field(
                "producers",
                &self
                    .producers
                    .read()
                    .iter()
                    .map(|p| p.id().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Module {
    /// Creates the module and indexes its source and class path.
    pub fn new(layout: ModuleLayout, vfs: Arc<Vfs>, dependencies: Vec<Arc<Module>>) -> Self {
        let roots = layout
            .source_path
            .iter()
            .chain(&layout.class_path)
            .cloned()
            .collect();
        let path_cache = PathCache::build(&vfs, roots);
        Self {
            layout,
            vfs,
            dependencies,
            path_cache: RwLock::new(path_cache),
            producers: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.layout.name
    }

    pub fn layout(&self) -> &ModuleLayout {
        &self.layout
    }

    pub fn source_path(&self) -> &[VfsPath] {
        &self.layout.source_path
    }

    pub fn class_path(&self) -> &[VfsPath] {
        &self.layout.class_path
    }

    pub fn output_path(&self) -> Option<&VfsPath> {
        self.layout.output_path.as_ref()
    }

    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    pub fn dependencies(&self) -> &[Arc<Module>] {
        &self.dependencies
    }

    /// Read access to the path cache. Do not hold the guard across producer calls.
    pub fn path_cache(&self) -> RwLockReadGuard<'_, PathCache> {
        self.path_cache.read()
    }

    /// Snapshot of the registered producers in registration order.
    pub fn producers(&self) -> Vec<Arc<dyn TypeProducer>> {
        self.producers.read().clone()
    }

    pub fn register(&self, producer: Arc<dyn TypeProducer>) -> Result<(), RegisterError> {
        {
            let mut producers = self.producers.write();
            if producers.iter().any(|p| p.id() == producer.id()) {
                return Err(RegisterError::DuplicateId {
                    module: self.name().to_string(),
                    id: producer.id().to_string(),
                });
            }
            producers.push(Arc::clone(&producer));
        }
        producer.init(self);
        tracing::debug!(
            target: "loom.producer",
            module = self.name(),
            producer = producer.id(),
            kind = ?producer.contributor_kind(),
            "type producer registered"
        );
        Ok(())
    }

    pub fn add_refresh_listener(&self, listener: Weak<dyn RefreshListener>) {
        self.listeners.write().push(listener);
    }

    pub fn find_type_producers_for(
        &self,
        fqn: &str,
        filter: impl Fn(&dyn TypeProducer) -> bool,
    ) -> Vec<Arc<dyn TypeProducer>> {
        self.producers()
            .into_iter()
            .filter(|p| filter(p.as_ref()) && p.is_type(self, fqn))
            .collect()
    }

    pub fn find_type_producers_for_file(
        &self,
        file: &VfsPath,
        filter: impl Fn(&dyn TypeProducer) -> bool,
    ) -> Vec<Arc<dyn TypeProducer>> {
        self.producers()
            .into_iter()
            .filter(|p| filter(p.as_ref()) && p.handles_file(self, file))
            .collect()
    }

    /// Names claimed by more than one primary producer, with the claiming producer ids.
    pub fn primary_conflicts(&self) -> BTreeMap<String, Vec<String>> {
        let mut claims: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for producer in self.producers() {
            if producer.contributor_kind() != ContributorKind::Primary {
                continue;
            }
            for fqn in producer.type_names(self) {
                claims.entry(fqn).or_default().push(producer.id().to_string());
            }
        }
        claims.retain(|_, ids| ids.len() > 1);
        claims
    }

    /// Whether some primary producer claims `fqn`.
    pub fn is_type(&self, fqn: &str) -> bool {
        self.producers()
            .iter()
            .any(|p| p.contributor_kind() == ContributorKind::Primary && p.is_type(self, fqn))
    }

    pub fn is_package(&self, package: &str) -> bool {
        self.path_cache().is_package(package)
            || self.producers().iter().any(|p| p.is_package(self, package))
    }

    pub fn types_for_file(&self, file: &VfsPath) -> Vec<String> {
        let names: BTreeSet<String> = self
            .producers()
            .iter()
            .flat_map(|p| p.types_for_file(self, file))
            .collect();
        names.into_iter().collect()
    }

    pub fn extended_types_for_file(&self, file: &VfsPath) -> Vec<String> {
        let names: BTreeSet<String> = self
            .producers()
            .iter()
            .filter_map(|p| {
                p.as_extension_producer()
                    .map(|ext| ext.extended_types_for_file(self, file))
            })
            .flatten()
            .collect();
        names.into_iter().collect()
    }

    /// Direct children of `package` from the path cache and from producer-claimed names.
    pub fn children_of_namespace(&self, package: &str) -> Vec<NamespaceChild> {
        let mut children: BTreeSet<NamespaceChild> =
            self.path_cache().children_of_namespace(package).into_iter().collect();
        for producer in self.producers() {
            for fqn in producer.type_names(self) {
                if let Some(child) = direct_child(package, &fqn) {
                    children.insert(child);
                }
            }
        }
        children.into_iter().collect()
    }

    /// Produces the source of `request.fqn`.
    ///
    /// The single primary producer creates the text, or `existing` is taken as is; every
    /// supplemental producer then amends it in registration order. A name claimed by several
    /// primary producers is reported as [`PRIMARY_CONFLICT`] and nothing is produced.
    pub fn produce_file(
        &self,
        request: &ContributeRequest,
        existing: Option<&str>,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<GeneratedFile> {
        let fqn = request.fqn.as_str();
        let primaries =
            self.find_type_producers_for(fqn, |p| p.contributor_kind() == ContributorKind::Primary);
        if primaries.len() > 1 {
            let ids: Vec<&str> = primaries.iter().map(|p| p.id()).collect();
            tracing::error!(
                target: "loom.producer",
                module = self.name(),
                fqn,
                producers = ?ids,
                "type claimed by more than one primary producer"
            );
            sink.report(
                None,
                Diagnostic::error(
                    PRIMARY_CONFLICT,
                    format!(
                        "type {fqn} is claimed by more than one primary producer: {}",
                        ids.join(", ")
                    ),
                    None,
                ),
            );
            return None;
        }
        let supplementals = self
            .find_type_producers_for(fqn, |p| p.contributor_kind() == ContributorKind::Supplemental);
        if primaries.is_empty() && supplementals.is_empty() {
            return None;
        }

        let mut resource_files = Vec::new();
        let (primary, mut content) = match primaries.first() {
            Some(primary) => {
                resource_files.extend(primary.find_files_for_type(self, fqn));
                let content = primary.contribute(self, request, None, sink)?;
                (Some(primary.id().to_string()), content)
            }
            None => (None, existing?.to_string()),
        };

        let mut applied = Vec::new();
        for supplemental in &supplementals {
            if let Some(amended) = supplemental.contribute(self, request, Some(&content), sink) {
                content = amended;
                applied.push(supplemental.id().to_string());
                resource_files.extend(supplemental.find_files_for_type(self, fqn));
            }
        }
        resource_files.sort();
        resource_files.dedup();

        tracing::trace!(
            target: "loom.producer",
            module = self.name(),
            fqn,
            primary = primary.as_deref().unwrap_or("-"),
            supplementals = applied.len(),
            "source produced"
        );
        Some(GeneratedFile {
            fqn: fqn.to_string(),
            content,
            primary,
            supplementals: applied,
            resource_files,
        })
    }

    pub fn file_created(&self, file: &VfsPath) -> RefreshRequest {
        self.refresh(file, RefreshKind::Creation)
    }

    pub fn file_modified(&self, file: &VfsPath) -> RefreshRequest {
        self.refresh(file, RefreshKind::Modification)
    }

    /// A deleted directory refreshes every file the path cache knew below it.
    pub fn file_deleted(&self, file: &VfsPath) -> RefreshRequest {
        self.refresh(file, RefreshKind::Deletion)
    }

    /// Rescans the roots and tells every producer and listener that anything may have changed.
    pub fn refresh_all(&self) {
        self.path_cache.write().rebuild(&self.vfs);
        for producer in self.producers() {
            producer.refreshed(self);
        }
        for listener in self.live_listeners() {
            listener.refreshed();
        }
    }

    /// Runs one change through the module: path cache first, then each producer's file
    /// bookkeeping, then type-level notifications, then listeners.
    fn refresh(&self, path: &VfsPath, kind: RefreshKind) -> RefreshRequest {
        let before = self.cached_files_at(path);
        let old_types: Vec<(VfsPath, Vec<String>)> = before
            .iter()
            .map(|file| (file.clone(), self.types_for_file(file)))
            .collect();

        {
            let mut path_cache = self.path_cache.write();
            match kind {
                RefreshKind::Creation => path_cache.file_created(&self.vfs, path),
                RefreshKind::Modification => path_cache.file_modified(path),
                RefreshKind::Deletion => path_cache.file_deleted(path),
            };
        }

        let after = match kind {
            RefreshKind::Deletion => Vec::new(),
            _ => self.cached_files_at(path),
        };
        let mut touched: BTreeMap<VfsPath, Vec<String>> = old_types.into_iter().collect();
        for file in &after {
            touched.entry(file.clone()).or_default();
        }
        if touched.is_empty() {
            touched.insert(path.clone(), Vec::new());
        }

        let producers = self.producers();
        let mut types: BTreeSet<String> = BTreeSet::new();
        for (file, old) in touched {
            types.extend(old.iter().cloned());
            let request = RefreshRequest {
                module: self.name().to_string(),
                file,
                types: old,
                kind,
            };
            for producer in &producers {
                producer.refreshed_file(self, &request);
            }
        }
        for file in &after {
            types.extend(self.types_for_file(file));
        }

        let request = RefreshRequest {
            module: self.name().to_string(),
            file: path.clone(),
            types: types.into_iter().collect(),
            kind,
        };
        for producer in &producers {
            producer.refreshed_types(self, &request);
        }
        for listener in self.live_listeners() {
            listener.refreshed_types(&request);
        }
        tracing::debug!(
            target: "loom.producer",
            module = self.name(),
            file = %path,
            kind = ?kind,
            types = request.types.len(),
            "module refreshed"
        );
        request
    }

    fn cached_files_at(&self, path: &VfsPath) -> Vec<VfsPath> {
        let path_cache = self.path_cache();
        let mut files: Vec<VfsPath> = path_cache
            .all_files()
            .filter(|file| *file == path || file.is_descendant_of(path))
            .cloned()
            .collect();
        files.sort();
        files
    }

    fn live_listeners(&self) -> Vec<Arc<dyn RefreshListener>> {
        let mut listeners = self.listeners.write();
        listeners.retain(|weak| weak.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }

    /// Applies the supplemental producers of `fqn` to `source`, collecting their diagnostics.
    pub fn supplement(
        &self,
        fqn: &str,
        gen_stubs: bool,
        source: String,
        sink: &mut dyn DiagnosticSink,
    ) -> String {
        let request = ContributeRequest {
            fqn: fqn.to_string(),
            location: None,
            gen_stubs,
        };
        let supplementals = self
            .find_type_producers_for(fqn, |p| p.contributor_kind() == ContributorKind::Supplemental);
        supplementals.iter().fold(source, |content, producer| {
            producer
                .contribute(self, &request, Some(&content), sink)
                .unwrap_or(content)
        })
    }
}

impl InnerSupplementer for Module {
    fn supplement_inner(&self, fqn: &str, binary: bool, source: String) -> String {
        let mut diagnostics: Vec<ProducerDiagnostic> = Vec::new();
        let amended = self.supplement(fqn, binary, source, &mut diagnostics);
        for reported in diagnostics {
            tracing::warn!(
                target: "loom.producer",
                fqn,
                code = reported.diagnostic.code,
                message = %reported.diagnostic.message,
                "diagnostic while supplementing nested type"
            );
        }
        amended
    }
}

fn direct_child(package: &str, fqn: &str) -> Option<NamespaceChild> {
    let rest = if package.is_empty() {
        fqn
    } else {
        fqn.strip_prefix(package)?.strip_prefix('.')?
    };
    if rest.is_empty() {
        return None;
    }
    Some(match rest.split_once('.') {
        None => NamespaceChild {
            fqn: fqn.to_string(),
            kind: NamespaceChildKind::Type,
        },
        Some((head, _)) => NamespaceChild {
            fqn: loom_core::name::join(package, head),
            kind: NamespaceChildKind::Namespace,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_children_of_a_package() {
        assert_eq!(
            direct_child("a", "a.B"),
            Some(NamespaceChild {
                fqn: "a.B".into(),
                kind: NamespaceChildKind::Type
            })
        );
        assert_eq!(
            direct_child("a", "a.b.C"),
            Some(NamespaceChild {
                fqn: "a.b".into(),
                kind: NamespaceChildKind::Namespace
            })
        );
        assert_eq!(direct_child("a", "ab.C"), None);
        assert_eq!(
            direct_child("", "Top"),
            Some(NamespaceChild {
                fqn: "Top".into(),
                kind: NamespaceChildKind::Type
            })
        );
    }
}

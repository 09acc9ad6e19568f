use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use loom_core::{ContributorKind, RefreshKind};
use loom_vfs::VfsPath;
use parking_lot::RwLock;

use crate::diagnostics::DiagnosticSink;
use crate::model::Model;
use crate::module::Module;
use crate::producer::{ContributeRequest, RefreshRequest, TypeProducer};

/// Format-specific half of a file-backed producer; [`ResourceProducer`] supplies the caching.
pub trait ResourceTypes: Send + Sync + 'static {
    type Model: Model;

    fn id(&self) -> &str;

    fn contributor_kind(&self) -> ContributorKind {
        ContributorKind::Primary
    }

    fn handles_file_extension(&self, extension: &str) -> bool;

    /// Further filtering of files with a handled extension, e.g. by content.
    fn handles_file(&self, _module: &Module, _file: &VfsPath) -> bool {
        true
    }

    fn type_name_for_file(
        &self,
        _module: &Module,
        default_fqn: &str,
        _file: &VfsPath,
    ) -> Option<String> {
        Some(default_fqn.to_string())
    }

    /// Extra top-level names backed by `file` besides its own type.
    fn additional_types(&self, _module: &Module, _fqn: &str, _file: &VfsPath) -> Vec<String> {
        Vec::new()
    }

    /// Names claimed without backing files of this producer.
    fn peripheral_types(&self, _module: &Module) -> Vec<String> {
        Vec::new()
    }

    fn create_model(&self, module: &Module, fqn: &str, files: BTreeSet<VfsPath>) -> Self::Model;

    fn is_inner_type(&self, _module: &Module, _model: &Self::Model, _relative_inner: &str) -> bool {
        false
    }

    fn contribute(
        &self,
        module: &Module,
        request: &ContributeRequest,
        existing: Option<&str>,
        model: &Self::Model,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<String>;
}

#[derive(Debug)]
struct ModelCache<M> {
    models: BTreeMap<String, Arc<M>>,
}

impl<M> Clone for ModelCache<M> {
    fn clone(&self) -> Self {
        Self {
            models: self.models.clone(),
        }
    }
}

impl<M: Model> ModelCache<M> {
    fn remove_file(&mut self, file: &VfsPath) {
        self.models.retain(|_, model| {
            if !model.files().contains(file) {
                return true;
            }
            Arc::make_mut(model).remove_file(file);
            !model.files().is_empty()
        });
    }
}

/// File-backed producer over a [`ResourceTypes`].
///
/// The name-to-model map is built lazily from the module's path cache as a whole. Refreshes copy
/// the current snapshot, repair the copy, and swap it in, so readers holding the old snapshot
/// are never disturbed.
pub struct ResourceProducer<R: ResourceTypes> {
    types: R,
    cache: RwLock<Option<Arc<ModelCache<R::Model>>>>,
}

impl<R: ResourceTypes> ResourceProducer<R> {
    pub fn new(types: R) -> Self {
        Self {
            types,
            cache: RwLock::new(None),
        }
    }

    pub fn types(&self) -> &R {
        &self.types
    }

    /// Model of the top-level type `fqn`.
    pub fn model(&self, module: &Module, fqn: &str) -> Option<Arc<R::Model>> {
        self.snapshot(module).models.get(fqn).cloned()
    }

    fn snapshot(&self, module: &Module) -> Arc<ModelCache<R::Model>> {
        if let Some(cache) = self.cache.read().as_ref() {
            return Arc::clone(cache);
        }
        let built = Arc::new(self.build(module));
        let mut slot = self.cache.write();
        Arc::clone(slot.get_or_insert(built))
    }

    fn build(&self, module: &Module) -> ModelCache<R::Model> {
        let candidates: Vec<(String, VfsPath)> = {
            let path_cache = module.path_cache();
            let candidates = path_cache
                .extensions()
                .filter(|ext| self.types.handles_file_extension(ext))
                .filter_map(|ext| path_cache.extension_cache(ext))
                .flat_map(|cache| {
                    cache.fqns().into_iter().flat_map(move |fqn| {
                        cache
                            .get(&fqn)
                            .cloned()
                            .unwrap_or_default()
                            .into_iter()
                            .map(move |file| (fqn.clone(), file))
                    })
                })
                .collect();
            candidates
        };

        let mut cache = ModelCache {
            models: BTreeMap::new(),
        };
        for (fqn, file) in candidates {
            if !self.types.handles_file(module, &file) {
                continue;
            }
            let names = self.names_for(module, &fqn, &file);
            self.add_names(module, &mut cache, names, &file);
        }
        tracing::debug!(
            target: "loom.producer",
            producer = self.types.id(),
            models = cache.models.len(),
            "model cache built"
        );
        cache
    }

    fn names_for(&self, module: &Module, default_fqn: &str, file: &VfsPath) -> Vec<String> {
        let Some(fqn) = self.types.type_name_for_file(module, default_fqn, file) else {
            return Vec::new();
        };
        let mut names = self.types.additional_types(module, &fqn, file);
        names.insert(0, fqn);
        names
    }

    fn names_for_file(&self, module: &Module, file: &VfsPath) -> Vec<String> {
        if !self.handles_file(module, file) {
            return Vec::new();
        }
        let defaults = module.path_cache().names_for_file(file);
        defaults
            .iter()
            .flat_map(|fqn| self.names_for(module, fqn, file))
            .collect()
    }

    fn add_names(
        &self,
        module: &Module,
        cache: &mut ModelCache<R::Model>,
        names: Vec<String>,
        file: &VfsPath,
    ) {
        for name in names {
            match cache.models.get_mut(&name) {
                Some(model) => Arc::make_mut(model).add_file(file.clone()),
                None => {
                    let model = self
                        .types
                        .create_model(module, &name, BTreeSet::from([file.clone()]));
                    cache.models.insert(name, Arc::new(model));
                }
            }
        }
    }

    fn top_level_model(
        &self,
        cache: &ModelCache<R::Model>,
        fqn: &str,
    ) -> Option<(Arc<R::Model>, String)> {
        let mut top = fqn;
        while let Some((outer, _)) = top.rsplit_once('.') {
            top = outer;
            if let Some(model) = cache.models.get(top) {
                return Some((Arc::clone(model), fqn[top.len() + 1..].to_string()));
            }
        }
        None
    }
}

impl<R: ResourceTypes> TypeProducer for ResourceProducer<R> {
    fn id(&self) -> &str {
        self.types.id()
    }

    fn contributor_kind(&self) -> ContributorKind {
        self.types.contributor_kind()
    }

    fn handles_file_extension(&self, extension: &str) -> bool {
        self.types.handles_file_extension(extension)
    }

    fn handles_file(&self, module: &Module, file: &VfsPath) -> bool {
        self.types.handles_file_extension(&file.extension()) && self.types.handles_file(module, file)
    }

    fn type_name_for_file(&self, module: &Module, default_fqn: &str, file: &VfsPath) -> Option<String> {
        self.types.type_name_for_file(module, default_fqn, file)
    }

    fn is_type(&self, module: &Module, fqn: &str) -> bool {
        if self.is_top_level_type(module, fqn) {
            return true;
        }
        let cache = self.snapshot(module);
        self.top_level_model(&cache, fqn)
            .is_some_and(|(model, inner)| self.types.is_inner_type(module, &model, &inner))
    }

    fn is_top_level_type(&self, module: &Module, fqn: &str) -> bool {
        self.snapshot(module).models.contains_key(fqn)
            || self.types.peripheral_types(module).iter().any(|p| p == fqn)
    }

    fn is_package(&self, module: &Module, package: &str) -> bool {
        self.snapshot(module)
            .models
            .keys()
            .any(|fqn| fqn != package && loom_core::name::is_within(fqn, package))
    }

    fn is_inner_type(&self, module: &Module, top_level: &str, relative_inner: &str) -> bool {
        self.model(module, top_level)
            .is_some_and(|model| self.types.is_inner_type(module, &model, relative_inner))
    }

    fn types_for_file(&self, module: &Module, file: &VfsPath) -> Vec<String> {
        self.snapshot(module)
            .models
            .iter()
            .filter(|(_, model)| model.files().contains(file))
            .map(|(fqn, _)| fqn.clone())
            .collect()
    }

    fn find_files_for_type(&self, module: &Module, fqn: &str) -> Vec<VfsPath> {
        let cache = self.snapshot(module);
        let model = match cache.models.get(fqn) {
            Some(model) => Some(Arc::clone(model)),
            None => self.top_level_model(&cache, fqn).map(|(model, _)| model),
        };
        model
            .map(|model| model.files().iter().cloned().collect())
            .unwrap_or_default()
    }

    fn type_names(&self, module: &Module) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot(module).models.keys().cloned().collect();
        names.extend(self.types.peripheral_types(module));
        names.sort();
        names.dedup();
        names
    }

    fn contribute(
        &self,
        module: &Module,
        request: &ContributeRequest,
        existing: Option<&str>,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<String> {
        let model = match self.model(module, &request.fqn) {
            Some(model) => model,
            None if self.types.peripheral_types(module).contains(&request.fqn) => Arc::new(
                self.types
                    .create_model(module, &request.fqn, BTreeSet::new()),
            ),
            None => return None,
        };
        self.types
            .contribute(module, request, existing, &model, sink)
    }

    fn refreshed_file(&self, module: &Module, request: &RefreshRequest) {
        let Some(current) = self.cache.read().clone() else {
            return;
        };
        let file = &request.file;
        let names = match request.kind {
            RefreshKind::Creation | RefreshKind::Modification => self.names_for_file(module, file),
            RefreshKind::Deletion => Vec::new(),
        };

        let mut next = (*current).clone();
        match request.kind {
            RefreshKind::Creation => self.add_names(module, &mut next, names, file),
            RefreshKind::Modification => {
                // The names a file contributes to may change with its content.
                next.remove_file(file);
                self.add_names(module, &mut next, names, file);
            }
            RefreshKind::Deletion => next.remove_file(file),
        }
        tracing::trace!(
            target: "loom.producer",
            producer = self.types.id(),
            file = %file,
            kind = ?request.kind,
            "model cache repaired"
        );
        *self.cache.write() = Some(Arc::new(next));
    }

    fn refreshed(&self, _module: &Module) {
        *self.cache.write() = None;
    }
}

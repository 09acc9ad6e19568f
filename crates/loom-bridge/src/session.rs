use std::collections::BTreeMap;
use std::io;
use std::iter;
use std::sync::Arc;

use loom_config::LoomConfig;
use loom_producer::{Module, ModuleLayout, RefreshListener, RefreshRequest, TypeProducer};
use loom_vfs::{FileChange, FileChangeKind, FileSystem, FileWatcher, Vfs, VfsPath, WatchEvent};

use crate::error::BridgeError;
use crate::manifold::{BridgeOptions, ManifoldFileManager};
use crate::vfs_file_manager::VfsFileManager;

type SessionFileManager = ManifoldFileManager<VfsFileManager>;

/// Everything one build holds: the VFS, its modules and a file manager per module.
///
/// Dropping or [closing](CompileSession::close) the session releases all caches.
pub struct CompileSession {
    config: LoomConfig,
    vfs: Arc<Vfs>,
    modules: BTreeMap<String, Arc<Module>>,
    file_managers: BTreeMap<String, Arc<SessionFileManager>>,
}

impl CompileSession {
    pub fn new(config: LoomConfig, fs: Arc<dyn FileSystem>) -> Self {
        let vfs = Arc::new(Vfs::new(fs, config.vfs.caching));
        Self::with_vfs(config, vfs)
    }

    pub fn with_vfs(config: LoomConfig, vfs: Arc<Vfs>) -> Self {
        tracing::debug!(
            target: "loom.bridge",
            caching = %vfs.caching_mode(),
            incremental = config.compile.is_incremental(),
            "compile session opened"
        );
        Self {
            config,
            vfs,
            modules: BTreeMap::new(),
            file_managers: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &LoomConfig {
        &self.config
    }

    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    /// Adds a module depending on the already added modules named in `dependencies`, together
    /// with the file manager that serves it.
    pub fn add_module(
        &mut self,
        layout: ModuleLayout,
        dependencies: &[&str],
    ) -> Result<Arc<Module>, BridgeError> {
        if self.modules.contains_key(&layout.name) {
            return Err(BridgeError::DuplicateModule(layout.name));
        }
        let dependencies = dependencies
            .iter()
            .map(|name| {
                self.modules
                    .get(*name)
                    .cloned()
                    .ok_or_else(|| BridgeError::UnknownModule((*name).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let delegate = VfsFileManager::for_layout(Arc::clone(&self.vfs), &layout);
        let module = Arc::new(Module::new(layout, Arc::clone(&self.vfs), dependencies));
        let file_manager = Arc::new(ManifoldFileManager::new(
            delegate,
            Arc::clone(&module),
            BridgeOptions::from_config(&self.config.compile),
        ));
        // Sources generated by dependencies are cached here too.
        let listener: Arc<dyn RefreshListener> = file_manager.clone();
        for watched in iter::once(&module).chain(module.dependencies()) {
            watched.add_refresh_listener(Arc::downgrade(&listener));
        }

        let name = module.name().to_string();
        tracing::debug!(target: "loom.bridge", module = %name, "module added");
        self.modules.insert(name.clone(), Arc::clone(&module));
        self.file_managers.insert(name, file_manager);
        Ok(module)
    }

    pub fn register_producer(
        &self,
        module: &str,
        producer: Arc<dyn TypeProducer>,
    ) -> Result<(), BridgeError> {
        let module = self
            .modules
            .get(module)
            .ok_or_else(|| BridgeError::UnknownModule(module.to_string()))?;
        module.register(producer)?;
        Ok(())
    }

    pub fn module(&self, name: &str) -> Option<&Arc<Module>> {
        self.modules.get(name)
    }

    pub fn file_manager(&self, module: &str) -> Option<&Arc<SessionFileManager>> {
        self.file_managers.get(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.values()
    }

    /// Routes one file change to every module whose roots contain it.
    ///
    /// The VFS listing of the parent directory goes first, so the module's path cache sees
    /// the new state; each module then refreshes its producers and file manager.
    pub fn apply_change(&self, change: &FileChange) -> Vec<RefreshRequest> {
        if let Some(parent) = change.path.parent() {
            self.vfs.clear_cache(&parent);
        }
        let mut requests = Vec::new();
        for module in self.modules.values() {
            if !owns(module, &change.path) {
                continue;
            }
            let request = match change.kind {
                FileChangeKind::Created => module.file_created(&change.path),
                FileChangeKind::Modified => module.file_modified(&change.path),
                FileChangeKind::Deleted => module.file_deleted(&change.path),
            };
            requests.push(request);
        }
        if requests.is_empty() {
            tracing::trace!(target: "loom.bridge", path = %change.path, "change outside every module");
        }
        requests
    }

    pub fn apply_changes(&self, changes: &[FileChange]) -> Vec<RefreshRequest> {
        changes
            .iter()
            .flat_map(|change| self.apply_change(change))
            .collect()
    }

    /// Drains `watcher` and applies its events. Returns how many changes were applied.
    ///
    /// A rescan event drops every VFS listing and refreshes every module from scratch.
    pub fn poll_watcher(&self, watcher: &mut dyn FileWatcher) -> io::Result<usize> {
        let mut applied = 0;
        for event in watcher.poll()? {
            match event {
                WatchEvent::Changes { changes } => {
                    self.apply_changes(&changes);
                    applied += changes.len();
                }
                WatchEvent::Rescan => {
                    tracing::info!(target: "loom.bridge", "watcher requested a rescan");
                    self.vfs.clear_caches();
                    for module in self.modules.values() {
                        module.refresh_all();
                    }
                }
            }
        }
        Ok(applied)
    }

    /// Releases every cache held for this build.
    pub fn close(&mut self) {
        for file_manager in self.file_managers.values() {
            file_manager.clear();
        }
        self.file_managers.clear();
        self.modules.clear();
        self.vfs.clear_caches();
        tracing::debug!(target: "loom.bridge", "compile session closed");
    }
}

fn owns(module: &Module, path: &VfsPath) -> bool {
    module
        .source_path()
        .iter()
        .chain(module.class_path())
        .any(|root| path == root || path.is_descendant_of(root))
}

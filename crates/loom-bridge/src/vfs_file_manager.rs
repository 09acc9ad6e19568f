use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use loom_producer::ModuleLayout;
use loom_vfs::{Vfs, VfsPath};

use crate::error::BridgeError;
use crate::file_manager::FileManager;
use crate::file_object::{FileKind, FileObject, RegularFile};
use crate::location::Location;

/// The standard file manager over VFS roots.
#[derive(Debug, Clone)]
pub struct VfsFileManager {
    vfs: Arc<Vfs>,
    source_path: Vec<VfsPath>,
    class_path: Vec<VfsPath>,
    class_output: Option<VfsPath>,
    source_output: Option<VfsPath>,
    modules: BTreeMap<String, Vec<VfsPath>>,
    patches: BTreeMap<String, Vec<VfsPath>>,
}

impl VfsFileManager {
    pub fn new(vfs: Arc<Vfs>) -> Self {
        Self {
            vfs,
            source_path: Vec::new(),
            class_path: Vec::new(),
            class_output: None,
            source_output: None,
            modules: BTreeMap::new(),
            patches: BTreeMap::new(),
        }
    }

    /// Source path, class path and class output of `layout`.
    pub fn for_layout(vfs: Arc<Vfs>, layout: &ModuleLayout) -> Self {
        let mut manager = Self::new(vfs)
            .with_source_path(layout.source_path.clone())
            .with_class_path(layout.class_path.clone());
        manager.class_output = layout.output_path.clone();
        manager
    }

    pub fn with_source_path(mut self, roots: Vec<VfsPath>) -> Self {
        self.source_path = roots;
        self
    }

    pub fn with_class_path(mut self, roots: Vec<VfsPath>) -> Self {
        self.class_path = roots;
        self
    }

    pub fn with_class_output(mut self, root: VfsPath) -> Self {
        self.class_output = Some(root);
        self
    }

    pub fn with_source_output(mut self, root: VfsPath) -> Self {
        self.source_output = Some(root);
        self
    }

    /// Class location of host module `name`.
    pub fn with_module(mut self, name: impl Into<String>, roots: Vec<VfsPath>) -> Self {
        self.modules.insert(name.into(), roots);
        self
    }

    /// Patch roots of host module `name`.
    pub fn with_patch(mut self, name: impl Into<String>, roots: Vec<VfsPath>) -> Self {
        self.patches.insert(name.into(), roots);
        self
    }

    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    fn roots(&self, location: &Location) -> Vec<VfsPath> {
        match location {
            Location::SourcePath => self.source_path.clone(),
            Location::ClassPath => self.class_path.clone(),
            Location::ClassOutput => self.class_output.iter().cloned().collect(),
            Location::SourceOutput => self.source_output.iter().cloned().collect(),
            Location::Module(name) => self.modules.get(name).cloned().unwrap_or_default(),
            Location::PatchModule(name) => self.patches.get(name).cloned().unwrap_or_default(),
            Location::PatchModulePath | Location::Patch(_) => Vec::new(),
        }
    }

    fn list_dir(
        &self,
        dir: &VfsPath,
        relative_dir: &str,
        kinds: &BTreeSet<FileKind>,
        recurse: bool,
        out: &mut Vec<FileObject>,
    ) {
        for file in self.vfs.list_files(dir) {
            let name = file.name();
            let kind = FileKind::of_name(&name);
            if !kinds.contains(&kind) {
                continue;
            }
            out.push(FileObject::Regular(RegularFile {
                relative: join_relative(relative_dir, &name),
                path: file,
                kind,
            }));
        }
        if recurse {
            for sub in self.vfs.list_dirs(dir) {
                let relative = join_relative(relative_dir, &sub.name());
                self.list_dir(&sub, &relative, kinds, recurse, out);
            }
        }
    }
}

fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn package_dir(package: &str) -> String {
    package.replace('.', "/")
}

impl FileManager for VfsFileManager {
    fn list(
        &self,
        location: &Location,
        package: &str,
        kinds: &BTreeSet<FileKind>,
        recurse: bool,
    ) -> Result<Vec<FileObject>, BridgeError> {
        let relative_dir = package_dir(package);
        let mut out = Vec::new();
        for root in self.roots(location) {
            let dir = if relative_dir.is_empty() {
                Some(root)
            } else {
                root.join(&relative_dir)
            };
            if let Some(dir) = dir.filter(|dir| self.vfs.is_dir(dir)) {
                self.list_dir(&dir, &relative_dir, kinds, recurse, &mut out);
            }
        }
        Ok(out)
    }

    fn file_for_input(
        &self,
        location: &Location,
        binary_name: &str,
        kind: FileKind,
    ) -> Result<Option<FileObject>, BridgeError> {
        let relative = format!("{}{}", package_dir(binary_name), kind.extension());
        Ok(self
            .roots(location)
            .iter()
            .filter_map(|root| root.join(&relative))
            .find(|path| self.vfs.is_file(path))
            .map(|path| {
                FileObject::Regular(RegularFile {
                    path,
                    relative: relative.clone(),
                    kind,
                })
            }))
    }

    fn file_for_output(
        &self,
        location: &Location,
        class_name: &str,
        kind: FileKind,
        _sibling: Option<&FileObject>,
    ) -> Result<FileObject, BridgeError> {
        let root = match location {
            Location::ClassOutput => self.class_output.as_ref(),
            Location::SourceOutput => self.source_output.as_ref(),
            _ => None,
        }
        .ok_or_else(|| BridgeError::NoOutputRoot(location.to_string()))?;
        let relative = format!("{}{}", package_dir(class_name), kind.extension());
        let path = root
            .join(&relative)
            .ok_or_else(|| BridgeError::NotWritable(relative.clone()))?;
        Ok(FileObject::Regular(RegularFile {
            path,
            relative,
            kind,
        }))
    }

    fn write(&self, file: &FileObject, bytes: &[u8]) -> Result<(), BridgeError> {
        let FileObject::Regular(regular) = file else {
            return Err(BridgeError::NotWritable(file.name()));
        };
        self.vfs
            .write(&regular.path, bytes)
            .map_err(|source| BridgeError::Io {
                path: regular.path.clone(),
                source,
            })
    }

    fn infer_binary_name(&self, _location: &Location, file: &FileObject) -> Option<String> {
        match file {
            FileObject::Regular(regular) => Some(
                loom_core::name::strip_extension(&regular.relative).replace('/', "."),
            ),
            FileObject::Generated(generated) => Some(generated.fqn.clone()),
            FileObject::InMemoryClass(class) => Some(class.class_name.clone()),
        }
    }

    fn has_location(&self, location: &Location) -> bool {
        !self.roots(location).is_empty()
    }

    fn location_for_module(
        &self,
        location: &Location,
        module: &str,
    ) -> Result<Option<Location>, BridgeError> {
        Ok(match location {
            Location::PatchModulePath if self.patches.contains_key(module) => {
                Some(Location::PatchModule(module.to_string()))
            }
            Location::ClassPath | Location::ClassOutput if self.modules.contains_key(module) => {
                Some(Location::Module(module.to_string()))
            }
            _ => None,
        })
    }

    fn infer_module_name(&self, location: &Location) -> Option<String> {
        match location {
            Location::Module(name) | Location::PatchModule(name) => Some(name.clone()),
            _ => None,
        }
    }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};

use loom_vfs::{Vfs, VfsPath};

use crate::fqn_cache::FqnCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NamespaceChildKind {
    Type,
    Namespace,
}

/// A direct child of a namespace: a type name or a nested namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NamespaceChild {
    pub fqn: String,
    pub kind: NamespaceChildKind,
}

/// Qualified-name index of every resource file below a module's roots.
///
/// A file's name follows from its path relative to the root containing it (`a/b/C.ext` is
/// `a.b.C`). Fragments are named after their own base name inside the enclosing file's package.
#[derive(Debug, Default)]
pub struct PathCache {
    roots: Vec<VfsPath>,
    by_extension: BTreeMap<String, FqnCache<Vec<VfsPath>>>,
    all: FqnCache<Vec<VfsPath>>,
    reverse: HashMap<VfsPath, BTreeSet<String>>,
}

impl PathCache {
    /// Scans `roots` through the VFS.
    pub fn build(vfs: &Vfs, roots: Vec<VfsPath>) -> Self {
        let mut cache = Self {
            roots,
            ..Self::default()
        };
        cache.rebuild(vfs);
        cache
    }

    pub fn roots(&self) -> &[VfsPath] {
        &self.roots
    }

    /// Drops everything and rescans all roots.
    pub fn rebuild(&mut self, vfs: &Vfs) {
        self.by_extension.clear();
        self.all.clear();
        self.reverse.clear();
        for root in self.roots.clone() {
            self.scan_dir(vfs, &root);
        }
        tracing::debug!(
            target: "loom.path_cache",
            roots = self.roots.len(),
            files = self.reverse.len(),
            "path cache built"
        );
    }

    fn scan_dir(&mut self, vfs: &Vfs, dir: &VfsPath) {
        for file in vfs.list_files(dir) {
            self.add_file(&file);
        }
        for child in vfs.list_dirs(dir) {
            self.scan_dir(vfs, &child);
        }
    }

    /// Qualified name `file` maps to, if it lies below one of the roots.
    pub fn qualified_name_for(&self, file: &VfsPath) -> Option<String> {
        if let VfsPath::Fragment(fragment) = file {
            let package = self.package_of_dir(&fragment.enclosing.parent()?)?;
            let base = loom_core::name::strip_extension(&fragment.name);
            return Some(loom_core::name::join(&package, base));
        }
        let package = self.package_of_dir(&file.parent()?)?;
        Some(loom_core::name::join(&package, &file.base_name()))
    }

    fn package_of_dir(&self, dir: &VfsPath) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = dir.clone();
        loop {
            if self.roots.contains(&current) {
                segments.reverse();
                return Some(segments.join("."));
            }
            segments.push(current.name());
            current = current.parent()?;
        }
    }

    fn add_file(&mut self, file: &VfsPath) -> Option<String> {
        let fqn = self.qualified_name_for(file)?;
        let extension = file.extension();
        push_unique(self.by_extension.entry(extension).or_default(), &fqn, file);
        push_unique(&mut self.all, &fqn, file);
        self.reverse
            .entry(file.clone())
            .or_default()
            .insert(fqn.clone());
        Some(fqn)
    }

    fn remove_file(&mut self, file: &VfsPath) -> Vec<String> {
        let Some(names) = self.reverse.remove(file) else {
            return Vec::new();
        };
        let extension = file.extension();
        for fqn in &names {
            if let Some(cache) = self.by_extension.get_mut(&extension) {
                drop_file(cache, fqn, file);
            }
            drop_file(&mut self.all, fqn, file);
        }
        names.into_iter().collect()
    }

    /// Indexes a newly created file, or every file below a newly created directory. Returns the
    /// names that gained a backing file.
    pub fn file_created(&mut self, vfs: &Vfs, path: &VfsPath) -> Vec<String> {
        if vfs.is_dir(path) {
            let before: BTreeSet<VfsPath> = self.reverse.keys().cloned().collect();
            self.scan_dir(vfs, path);
            let mut names: Vec<String> = self
                .reverse
                .iter()
                .filter(|(file, _)| !before.contains(*file))
                .flat_map(|(_, names)| names.iter().cloned())
                .collect();
            names.sort();
            names.dedup();
            return names;
        }
        self.add_file(path).into_iter().collect()
    }

    /// Forgets a deleted file, or every file below a deleted directory. Returns the names that
    /// lost a backing file.
    pub fn file_deleted(&mut self, path: &VfsPath) -> Vec<String> {
        let affected: Vec<VfsPath> = self
            .reverse
            .keys()
            .filter(|file| *file == path || file.is_descendant_of(path))
            .cloned()
            .collect();
        let mut names: Vec<String> = affected
            .iter()
            .flat_map(|file| self.remove_file(file))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Names are derived from paths, so a content change keeps them. Unknown files are indexed.
    pub fn file_modified(&mut self, path: &VfsPath) -> Vec<String> {
        match self.reverse.get(path) {
            Some(names) => names.iter().cloned().collect(),
            None => self.add_file(path).into_iter().collect(),
        }
    }

    /// Names contributed by `file`.
    pub fn names_for_file(&self, file: &VfsPath) -> Vec<String> {
        self.reverse
            .get(file)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Files with extension `extension` backing `fqn`.
    pub fn files_for(&self, extension: &str, fqn: &str) -> Vec<VfsPath> {
        self.by_extension
            .get(extension)
            .and_then(|cache| cache.get(fqn))
            .cloned()
            .unwrap_or_default()
    }

    /// Files of any extension backing `fqn`.
    pub fn all_files_for(&self, fqn: &str) -> Vec<VfsPath> {
        self.all.get(fqn).cloned().unwrap_or_default()
    }

    /// The name index restricted to one extension.
    pub fn extension_cache(&self, extension: &str) -> Option<&FqnCache<Vec<VfsPath>>> {
        self.by_extension.get(extension)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.by_extension.keys().map(String::as_str)
    }

    pub fn all_files(&self) -> impl Iterator<Item = &VfsPath> {
        self.reverse.keys()
    }

    pub fn is_package(&self, package: &str) -> bool {
        package.is_empty()
            || self
                .all
                .get_node(package)
                .is_some_and(|node| !node.is_leaf())
    }

    /// Direct children of `package`. A name that is both a type and a namespace is listed twice.
    pub fn children_of_namespace(&self, package: &str) -> Vec<NamespaceChild> {
        let Some(node) = self.all.get_node(package) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for child in node.children() {
            if child.value().is_some() {
                out.push(NamespaceChild {
                    fqn: child.fqn().to_string(),
                    kind: NamespaceChildKind::Type,
                });
            }
            if !child.is_leaf() {
                out.push(NamespaceChild {
                    fqn: child.fqn().to_string(),
                    kind: NamespaceChildKind::Namespace,
                });
            }
        }
        out
    }
}

fn push_unique(cache: &mut FqnCache<Vec<VfsPath>>, fqn: &str, file: &VfsPath) {
    let files = cache.entry(fqn).value_mut_or_default();
    if !files.contains(file) {
        files.push(file.clone());
    }
}

fn drop_file(cache: &mut FqnCache<Vec<VfsPath>>, fqn: &str, file: &VfsPath) {
    let now_empty = match cache.get_mut(fqn) {
        Some(files) => {
            files.retain(|candidate| candidate != file);
            files.is_empty()
        }
        None => false,
    };
    if now_empty {
        cache.take(fqn);
    }
}

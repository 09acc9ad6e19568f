use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use loom_archive::{Archive, ArchiveEntry};

use crate::error::VfsError;
use crate::path::{ArchivePath, VfsPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Dir,
    File,
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<usize>,
    /// Full entry name relative to the archive root.
    entry: String,
    children: Vec<usize>,
    by_name: HashMap<String, usize>,
    exists: bool,
}

/// A resource name used both as a directory and as a file inside one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConflict {
    pub entry: String,
    pub message: String,
}

/// Eagerly built directory tree of an archive.
///
/// Intermediate directories are materialized on demand while walking entry names; a node only
/// exists once an entry at or below it was seen.
#[derive(Debug)]
pub struct ArchiveTree {
    archive: PathBuf,
    nodes: Vec<Node>,
    conflicts: Vec<ArchiveConflict>,
}

const ROOT: usize = 0;

impl ArchiveTree {
    /// Indexes every entry of the archive at `path`.
    pub fn index(path: &Path) -> Result<Self, VfsError> {
        let entries = Archive::new(path)
            .entries()
            .map_err(|err| VfsError::ArchiveIndex {
                path: path.to_path_buf(),
                message: format!("{err:#}"),
            })?;
        Ok(Self::from_entries(path, entries))
    }

    pub fn from_entries(archive: &Path, entries: impl IntoIterator<Item = ArchiveEntry>) -> Self {
        let mut tree = Self {
            archive: archive.to_path_buf(),
            nodes: vec![Node {
                kind: NodeKind::Dir,
                parent: None,
                entry: String::new(),
                children: Vec::new(),
                by_name: HashMap::new(),
                exists: true,
            }],
            conflicts: Vec::new(),
        };
        for entry in entries {
            tree.process_entry(&entry);
        }
        tree
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn conflicts(&self) -> &[ArchiveConflict] {
        &self.conflicts
    }

    fn process_entry(&mut self, entry: &ArchiveEntry) {
        let components: Vec<&str> = entry
            .name
            .split(['/', '\\'])
            .filter(|c| !c.is_empty())
            .collect();
        let Some((leaf, dirs)) = components.split_last() else {
            return;
        };

        let mut parent = ROOT;
        for dir in dirs {
            match self.get_or_create(parent, dir, NodeKind::Dir) {
                Ok(idx) => parent = idx,
                Err(conflict) => return self.report(conflict),
            }
        }

        let kind = if entry.is_dir {
            NodeKind::Dir
        } else {
            NodeKind::File
        };
        match self.get_or_create(parent, leaf, kind) {
            Ok(idx) => self.set_exists(idx),
            Err(conflict) => self.report(conflict),
        }
    }

    fn report(&mut self, conflict: ArchiveConflict) {
        tracing::warn!(
            target: "loom.vfs",
            archive = %self.archive.display(),
            entry = %conflict.entry,
            "{}",
            conflict.message
        );
        self.conflicts.push(conflict);
    }

    fn get_or_create(
        &mut self,
        parent: usize,
        name: &str,
        kind: NodeKind,
    ) -> Result<usize, ArchiveConflict> {
        if let Some(&idx) = self.nodes[parent].by_name.get(name) {
            let existing = self.nodes[idx].kind;
            if existing != kind {
                let (was, now) = match existing {
                    NodeKind::Dir => ("directory", "file"),
                    NodeKind::File => ("file", "directory"),
                };
                return Err(ArchiveConflict {
                    entry: self.nodes[idx].entry.clone(),
                    message: format!(
                        "resource '{}' is now being accessed as a {now}, but was previously accessed as a {was}",
                        self.nodes[idx].entry
                    ),
                });
            }
            return Ok(idx);
        }

        let entry = if parent == ROOT {
            name.to_string()
        } else {
            format!("{}/{}", self.nodes[parent].entry, name)
        };
        let idx = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            entry,
            children: Vec::new(),
            by_name: HashMap::new(),
            exists: false,
        });
        self.nodes[parent].children.push(idx);
        self.nodes[parent].by_name.insert(name.to_string(), idx);
        Ok(idx)
    }

    fn set_exists(&mut self, idx: usize) {
        let mut current = Some(idx);
        while let Some(idx) = current {
            if self.nodes[idx].exists {
                break;
            }
            self.nodes[idx].exists = true;
            current = self.nodes[idx].parent;
        }
    }

    fn lookup(&self, entry: &str) -> Option<usize> {
        let mut current = ROOT;
        for component in entry.split('/').filter(|c| !c.is_empty()) {
            current = *self.nodes[current].by_name.get(component)?;
        }
        Some(current)
    }

    pub fn exists(&self, entry: &str) -> bool {
        self.lookup(entry).is_some_and(|idx| self.nodes[idx].exists)
    }

    pub fn is_dir(&self, entry: &str) -> bool {
        self.lookup(entry)
            .is_some_and(|idx| self.nodes[idx].exists && self.nodes[idx].kind == NodeKind::Dir)
    }

    pub fn is_file(&self, entry: &str) -> bool {
        self.lookup(entry)
            .is_some_and(|idx| self.nodes[idx].exists && self.nodes[idx].kind == NodeKind::File)
    }

    /// Reads the file `entry`. Names the index does not know as a file are never looked up in
    /// the archive itself.
    pub fn read(&self, entry: &str) -> io::Result<Vec<u8>> {
        if !self.is_file(entry) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no file '{entry}' in {}", self.archive.display()),
            ));
        }
        let entry = entry.trim_start_matches('/');
        Archive::new(&self.archive)
            .read(entry)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, format!("{err:#}")))?
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("'{entry}' vanished from {}", self.archive.display()),
                )
            })
    }

    /// Existing child files of the directory `entry`, in archive order.
    pub fn list_files(&self, entry: &str) -> Vec<VfsPath> {
        self.list(entry, NodeKind::File)
    }

    /// Existing child directories of the directory `entry`, in archive order.
    pub fn list_dirs(&self, entry: &str) -> Vec<VfsPath> {
        self.list(entry, NodeKind::Dir)
    }

    fn list(&self, entry: &str, kind: NodeKind) -> Vec<VfsPath> {
        let Some(idx) = self.lookup(entry) else {
            return Vec::new();
        };
        self.nodes[idx]
            .children
            .iter()
            .map(|&child| &self.nodes[child])
            .filter(|node| node.exists && node.kind == kind)
            .map(|node| {
                VfsPath::Archive(ArchivePath {
                    archive: self.archive.clone(),
                    entry: node.entry.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;

    use super::*;

    fn write_jar(path: &Path, name: &str, contents: &str) {
        let mut jar = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        jar.start_file(name, FileOptions::<()>::default()).unwrap();
        jar.write_all(contents.as_bytes()).unwrap();
        jar.finish().unwrap();
    }

    fn entry(name: &str, is_dir: bool) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_string(),
            is_dir,
        }
    }

    #[test]
    fn leaf_existence_marks_ancestors() {
        let tree = ArchiveTree::from_entries(
            Path::new("/libs/lib.jar"),
            [entry("com/example/Foo.widget", false)],
        );

        assert!(tree.exists("com"));
        assert!(tree.is_dir("com/example"));
        assert!(tree.is_file("com/example/Foo.widget"));
        assert_eq!(
            tree.list_files("com/example"),
            vec![VfsPath::jar("/libs/lib.jar", "com/example/Foo.widget")]
        );
        assert_eq!(tree.list_dirs(""), vec![VfsPath::jar("/libs/lib.jar", "com")]);
    }

    #[test]
    fn dir_file_conflict_is_recorded_and_indexing_continues() {
        let tree = ArchiveTree::from_entries(
            Path::new("/libs/uber.jar"),
            [
                entry("META-INF/", true),
                entry("META-INF", false),
                entry("META-INF/MANIFEST.MF", false),
                entry("a/B.widget", false),
                entry("a/B.widget/C.widget", false),
            ],
        );

        assert_eq!(tree.conflicts().len(), 2);
        assert_eq!(tree.conflicts()[0].entry, "META-INF");
        assert!(tree.conflicts()[0]
            .message
            .contains("now being accessed as a file"));
        assert!(tree.is_file("META-INF/MANIFEST.MF"));
        assert!(tree.is_file("a/B.widget"));
        assert!(!tree.exists("a/B.widget/C.widget"));
    }

    #[test]
    fn reads_indexed_files_of_a_jar() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("widgets.jar");
        write_jar(&jar, "com/example/Foo.widget", "widget Foo");

        let tree = ArchiveTree::index(&jar).unwrap();
        assert_eq!(tree.read("com/example/Foo.widget").unwrap(), b"widget Foo");
        let missing = tree.read("com/example/Missing.widget").unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
        let dir_entry = tree.read("com/example").unwrap_err();
        assert_eq!(dir_entry.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn reads_exploded_directory_archives() {
        let dir = tempfile::tempdir().unwrap();
        let exploded = dir.path().join("exploded.jar");
        std::fs::create_dir_all(exploded.join("com/example")).unwrap();
        std::fs::write(exploded.join("com/example/Foo.widget"), "widget Foo").unwrap();

        let tree = ArchiveTree::index(&exploded).unwrap();
        assert!(tree.is_dir("com/example"));
        assert_eq!(tree.read("com/example/Foo.widget").unwrap(), b"widget Foo");
    }
}

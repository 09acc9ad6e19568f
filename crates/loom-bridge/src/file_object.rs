use std::sync::Arc;

use loom_vfs::VfsPath;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    Source,
    Class,
    Html,
    Other,
}

impl FileKind {
    /// Extension including the dot; empty for [`FileKind::Other`].
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Source => ".java",
            FileKind::Class => ".class",
            FileKind::Html => ".html",
            FileKind::Other => "",
        }
    }

    pub fn of_name(name: &str) -> Self {
        if name.ends_with(".java") {
            FileKind::Source
        } else if name.ends_with(".class") {
            FileKind::Class
        } else if name.ends_with(".html") {
            FileKind::Html
        } else {
            FileKind::Other
        }
    }
}

/// A physical file served by a delegate file manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegularFile {
    pub path: VfsPath,
    /// Path relative to the root it was found under, slash separated.
    pub relative: String,
    pub kind: FileKind,
}

/// Synthesized source handed to the host compiler in place of a physical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFileObject {
    pub fqn: String,
    /// Module whose producers made the source.
    pub module: String,
    pub content: String,
    /// Whether a primary producer created the type.
    pub primary: bool,
    pub resource_files: Vec<VfsPath>,
}

impl GeneratedFileObject {
    /// `a/b/C.java` for `a.b.C`.
    pub fn name(&self) -> String {
        format!("{}.java", self.fqn.replace('.', "/"))
    }

    /// The fragment this source was produced from, if any.
    pub fn fragment(&self) -> Option<&VfsPath> {
        self.resource_files.iter().find(|file| file.is_fragment())
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment().is_some()
    }
}

/// Class output kept in memory instead of written to disk.
#[derive(Debug)]
pub struct InMemoryClass {
    pub class_name: String,
    pub kind: FileKind,
    bytes: Mutex<Vec<u8>>,
}

impl InMemoryClass {
    pub fn new(class_name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            class_name: class_name.into(),
            kind,
            bytes: Mutex::new(Vec::new()),
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn set_bytes(&self, bytes: &[u8]) {
        *self.bytes.lock() = bytes.to_vec();
    }
}

#[derive(Debug, Clone)]
pub enum FileObject {
    Regular(RegularFile),
    Generated(Arc<GeneratedFileObject>),
    InMemoryClass(Arc<InMemoryClass>),
}

impl FileObject {
    pub fn kind(&self) -> FileKind {
        match self {
            FileObject::Regular(file) => file.kind,
            FileObject::Generated(_) => FileKind::Source,
            FileObject::InMemoryClass(class) => class.kind,
        }
    }

    pub fn name(&self) -> String {
        match self {
            FileObject::Regular(file) => file.relative.clone(),
            FileObject::Generated(file) => file.name(),
            FileObject::InMemoryClass(class) => {
                format!("{}{}", class.class_name.replace('.', "/"), class.kind.extension())
            }
        }
    }

    /// Simple name without extension, e.g. `C` for `a/b/C.java`.
    pub fn simple_name(&self) -> String {
        let name = self.name();
        let file_name = name.rsplit('/').next().unwrap_or(&name);
        loom_core::name::strip_extension(file_name).to_string()
    }

    pub fn as_generated(&self) -> Option<&Arc<GeneratedFileObject>> {
        match self {
            FileObject::Generated(file) => Some(file),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&VfsPath> {
        match self {
            FileObject::Regular(file) => Some(&file.path),
            _ => None,
        }
    }
}

impl PartialEq for FileObject {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FileObject::Regular(a), FileObject::Regular(b)) => a == b,
            (FileObject::Generated(a), FileObject::Generated(b)) => a == b,
            (FileObject::InMemoryClass(a), FileObject::InMemoryClass(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for FileObject {}

use std::collections::BTreeSet;

use loom_vfs::VfsPath;

/// The resource files backing one produced type.
pub trait Model: Clone + Send + Sync + 'static {
    fn fqn(&self) -> &str;

    fn files(&self) -> &BTreeSet<VfsPath>;

    fn add_file(&mut self, file: VfsPath);

    fn remove_file(&mut self, file: &VfsPath);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleModel {
    fqn: String,
    files: BTreeSet<VfsPath>,
}

impl SimpleModel {
    pub fn new(fqn: impl Into<String>, files: BTreeSet<VfsPath>) -> Self {
        Self {
            fqn: fqn.into(),
            files,
        }
    }
}

impl Model for SimpleModel {
    fn fqn(&self) -> &str {
        &self.fqn
    }

    fn files(&self) -> &BTreeSet<VfsPath> {
        &self.files
    }

    fn add_file(&mut self, file: VfsPath) {
        self.files.insert(file);
    }

    fn remove_file(&mut self, file: &VfsPath) {
        self.files.remove(file);
    }
}

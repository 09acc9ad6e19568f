use loom_core::RefreshKind;

use crate::path::VfsPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
}

impl From<FileChangeKind> for RefreshKind {
    fn from(kind: FileChangeKind) -> Self {
        match kind {
            FileChangeKind::Created => RefreshKind::Creation,
            FileChangeKind::Modified => RefreshKind::Modification,
            FileChangeKind::Deleted => RefreshKind::Deletion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileChange {
    pub path: VfsPath,
    pub kind: FileChangeKind,
}

impl FileChange {
    pub fn created(path: VfsPath) -> Self {
        Self {
            path,
            kind: FileChangeKind::Created,
        }
    }

    pub fn modified(path: VfsPath) -> Self {
        Self {
            path,
            kind: FileChangeKind::Modified,
        }
    }

    pub fn deleted(path: VfsPath) -> Self {
        Self {
            path,
            kind: FileChangeKind::Deleted,
        }
    }
}

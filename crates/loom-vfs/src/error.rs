use std::path::PathBuf;

use thiserror::Error;

use crate::path::VfsPath;

#[derive(Debug, Error)]
pub enum VfsError {
    /// The archive could not be indexed at all (missing or corrupt).
    #[error("failed to index archive {}: {message}", path.display())]
    ArchiveIndex { path: PathBuf, message: String },
    #[error("{0} is not an archive root")]
    NotAnArchiveRoot(VfsPath),
}

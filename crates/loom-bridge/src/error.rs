use std::io;

use loom_producer::RegisterError;
use loom_vfs::{VfsError, VfsPath};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: VfsPath,
        #[source]
        source: io::Error,
    },
    #[error("location {0} has no output root")]
    NoOutputRoot(String),
    #[error("cannot write to {0}")]
    NotWritable(String),
    #[error("unknown module: {0}")]
    UnknownModule(String),
    #[error("module {0} is already part of the session")]
    DuplicateModule(String),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    Vfs(#[from] VfsError),
}

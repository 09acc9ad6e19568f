use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::path::VfsPath;

/// Backing store abstraction for the VFS.
///
/// Backends only deal with physical resources. Archive trees and file fragments are
/// materialized by [`crate::Vfs`] on top of a backend.
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Reads the file contents as raw bytes.
    fn read_bytes(&self, path: &VfsPath) -> io::Result<Vec<u8>>;

    /// Reads the file contents as UTF-8 text.
    fn read_to_string(&self, path: &VfsPath) -> io::Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    /// Returns whether a path exists.
    fn exists(&self, path: &VfsPath) -> bool;

    fn is_dir(&self, path: &VfsPath) -> bool;

    /// Modification timestamp in milliseconds since the epoch; `0` for a missing path.
    fn modified_millis(&self, path: &VfsPath) -> io::Result<i64>;

    /// Lists directory entries. Implementations may return `ErrorKind::Unsupported`.
    fn read_dir(&self, path: &VfsPath) -> io::Result<Vec<VfsPath>>;

    fn write(&self, path: &VfsPath, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("writes not supported ({path})"),
        ))
    }
}

/// Local OS file system implementation.
///
/// Archive entries are served by the [`crate::Vfs`] archive index, not by this backend.
#[derive(Debug, Clone, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }

    fn read_dir_local(path: &Path) -> io::Result<Vec<VfsPath>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            out.push(VfsPath::Local(entry.path()));
        }
        out.sort();
        Ok(out)
    }
}

fn unsupported(what: &str, path: &VfsPath) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{what} not supported by the backing file system ({path})"),
    )
}

impl FileSystem for LocalFs {
    fn read_bytes(&self, path: &VfsPath) -> io::Result<Vec<u8>> {
        match path {
            VfsPath::Local(path) => fs::read(path),
            VfsPath::Archive(_) => Err(unsupported("archive reads", path)),
            VfsPath::Fragment(_) => Err(unsupported("fragment reads", path)),
        }
    }

    fn read_to_string(&self, path: &VfsPath) -> io::Result<String> {
        match path {
            VfsPath::Local(path) => fs::read_to_string(path),
            VfsPath::Archive(_) => Err(unsupported("archive reads", path)),
            VfsPath::Fragment(_) => Err(unsupported("fragment reads", path)),
        }
    }

    fn exists(&self, path: &VfsPath) -> bool {
        match path {
            VfsPath::Local(path) => path.exists(),
            VfsPath::Archive(_) | VfsPath::Fragment(_) => false,
        }
    }

    fn is_dir(&self, path: &VfsPath) -> bool {
        match path {
            VfsPath::Local(path) => path.is_dir(),
            VfsPath::Archive(_) | VfsPath::Fragment(_) => false,
        }
    }

    fn modified_millis(&self, path: &VfsPath) -> io::Result<i64> {
        match path {
            VfsPath::Local(path) => match fs::metadata(path) {
                Ok(metadata) => {
                    let modified = metadata.modified()?;
                    Ok(modified
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_millis() as i64)
                        .unwrap_or(0))
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
                Err(err) => Err(err),
            },
            VfsPath::Archive(archive) => match fs::metadata(&archive.archive) {
                Ok(metadata) => Ok(metadata
                    .modified()?
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as i64)
                    .unwrap_or(0)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
                Err(err) => Err(err),
            },
            VfsPath::Fragment(_) => Err(unsupported("fragment timestamps", path)),
        }
    }

    fn read_dir(&self, path: &VfsPath) -> io::Result<Vec<VfsPath>> {
        match path {
            VfsPath::Local(path) => Self::read_dir_local(path),
            VfsPath::Archive(_) | VfsPath::Fragment(_) => Err(unsupported("directory listing", path)),
        }
    }

    fn write(&self, path: &VfsPath, bytes: &[u8]) -> io::Result<()> {
        match path {
            VfsPath::Local(local) => {
                if let Some(parent) = local.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(local, bytes)
            }
            VfsPath::Archive(_) | VfsPath::Fragment(_) => Err(unsupported("writes", path)),
        }
    }
}

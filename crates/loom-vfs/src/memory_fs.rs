use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::fs::FileSystem;
use crate::path::VfsPath;

#[derive(Debug, Clone)]
enum Entry {
    File { bytes: Vec<u8>, modified: i64 },
    Dir { modified: i64 },
}

impl Entry {
    fn modified(&self) -> i64 {
        match self {
            Entry::File { modified, .. } | Entry::Dir { modified } => *modified,
        }
    }
}

/// In-memory file system of local paths.
///
/// Creating or deleting a file stamps its parent directory with the clock's current time, the way
/// an OS file system bumps a directory's modification time.
#[derive(Debug)]
pub struct MemoryFs {
    entries: RwLock<BTreeMap<VfsPath, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MemoryFs {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            clock,
        }
    }

    pub fn create_dir_all(&self, path: &VfsPath) {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write();
        Self::ensure_dirs(&mut entries, Some(path.clone()), now);
    }

    /// Creates or replaces a file, creating missing parent directories.
    pub fn write_file(&self, path: &VfsPath, contents: impl Into<Vec<u8>>) {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write();
        let existed = entries.contains_key(path);
        Self::ensure_dirs(&mut entries, path.parent(), now);
        entries.insert(
            path.clone(),
            Entry::File {
                bytes: contents.into(),
                modified: now,
            },
        );
        if !existed {
            Self::touch_parent(&mut entries, path, now);
        }
    }

    /// Removes a file or a directory with all its descendants.
    pub fn remove(&self, path: &VfsPath) -> bool {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write();
        if entries.remove(path).is_none() {
            return false;
        }
        entries.retain(|candidate, _| !candidate.is_descendant_of(path));
        Self::touch_parent(&mut entries, path, now);
        true
    }

    /// Overrides the modification time of an existing entry.
    pub fn set_modified(&self, path: &VfsPath, millis: i64) {
        let mut entries = self.entries.write();
        match entries.get_mut(path) {
            Some(Entry::File { modified, .. }) | Some(Entry::Dir { modified }) => *modified = millis,
            None => {}
        }
    }

    fn ensure_dirs(entries: &mut BTreeMap<VfsPath, Entry>, dir: Option<VfsPath>, now: i64) {
        let mut current = dir;
        while let Some(path) = current {
            if entries.contains_key(&path) {
                break;
            }
            let parent = path.parent();
            entries.insert(path, Entry::Dir { modified: now });
            if let Some(parent) = &parent {
                if let Some(Entry::Dir { modified }) = entries.get_mut(parent) {
                    *modified = now;
                }
            }
            current = parent;
        }
    }

    fn touch_parent(entries: &mut BTreeMap<VfsPath, Entry>, path: &VfsPath, now: i64) {
        if let Some(parent) = path.parent() {
            if let Some(Entry::Dir { modified }) = entries.get_mut(&parent) {
                *modified = now;
            }
        }
    }
}

fn not_found(path: &VfsPath) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such file ({path})"))
}

impl FileSystem for MemoryFs {
    fn read_bytes(&self, path: &VfsPath) -> io::Result<Vec<u8>> {
        match self.entries.read().get(path) {
            Some(Entry::File { bytes, .. }) => Ok(bytes.clone()),
            Some(Entry::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory ({path})"),
            )),
            None => Err(not_found(path)),
        }
    }

    fn exists(&self, path: &VfsPath) -> bool {
        self.entries.read().contains_key(path)
    }

    fn is_dir(&self, path: &VfsPath) -> bool {
        matches!(self.entries.read().get(path), Some(Entry::Dir { .. }))
    }

    fn modified_millis(&self, path: &VfsPath) -> io::Result<i64> {
        Ok(self.entries.read().get(path).map(Entry::modified).unwrap_or(0))
    }

    fn read_dir(&self, path: &VfsPath) -> io::Result<Vec<VfsPath>> {
        let entries = self.entries.read();
        match entries.get(path) {
            Some(Entry::Dir { .. }) => Ok(entries
                .keys()
                .filter(|candidate| candidate.parent().as_ref() == Some(path))
                .cloned()
                .collect()),
            Some(Entry::File { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory ({path})"),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &VfsPath, bytes: &[u8]) -> io::Result<()> {
        self.write_file(path, bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn creating_a_file_bumps_the_parent_timestamp() {
        let clock = Arc::new(ManualClock::new(1_000));
        let fs = MemoryFs::new(clock.clone());
        let dir = VfsPath::local("/src/pkg");
        fs.create_dir_all(&dir);
        assert_eq!(fs.modified_millis(&dir).unwrap(), 1_000);

        clock.set(2_000);
        fs.write_file(&VfsPath::local("/src/pkg/Foo.widget"), "foo");
        assert_eq!(fs.modified_millis(&dir).unwrap(), 2_000);

        clock.set(3_000);
        fs.write_file(&VfsPath::local("/src/pkg/Foo.widget"), "changed");
        assert_eq!(fs.modified_millis(&dir).unwrap(), 2_000);

        assert_eq!(
            fs.read_dir(&dir).unwrap(),
            vec![VfsPath::local("/src/pkg/Foo.widget")]
        );
    }

    #[test]
    fn removing_a_directory_removes_descendants() {
        let fs = MemoryFs::new(Arc::new(ManualClock::new(5)));
        fs.write_file(&VfsPath::local("/a/b/C.widget"), "c");
        assert!(fs.remove(&VfsPath::local("/a/b")));
        assert!(!fs.exists(&VfsPath::local("/a/b/C.widget")));
        assert!(fs.exists(&VfsPath::local("/a")));
        assert_eq!(fs.modified_millis(&VfsPath::local("/a/b")).unwrap(), 0);
    }
}

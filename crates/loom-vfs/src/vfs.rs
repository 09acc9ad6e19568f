use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use loom_core::CachingMode;
use parking_lot::RwLock;

use crate::archive_tree::{ArchiveConflict, ArchiveTree};
use crate::clock::{Clock, SystemClock};
use crate::error::VfsError;
use crate::fragment::Fragment;
use crate::fs::{FileSystem, LocalFs};
use crate::listing::{Decision, Listing};
use crate::path::{normalize_local_path, ArchivePath, VfsPath};

#[derive(Debug, Default)]
struct ListingState {
    mode: CachingMode,
    listings: HashMap<VfsPath, Listing>,
}

/// Uniform view over directories, archives, and in-memory fragments.
///
/// Directory listings of the backing [`FileSystem`] are cached according to the active
/// [`CachingMode`]. Archive trees are indexed once when mounted and are never invalidated;
/// fragments are registered explicitly.
///
/// All listing refreshes and cache clears run under one coarse write lock. Under
/// [`CachingMode::FullCaching`] populated listings are served under the read lock.
#[derive(Debug)]
pub struct Vfs {
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    state: RwLock<ListingState>,
    archives: RwLock<HashMap<PathBuf, Arc<ArchiveTree>>>,
    fragments: RwLock<BTreeMap<VfsPath, Fragment>>,
}

impl Vfs {
    pub fn new(fs: Arc<dyn FileSystem>, mode: CachingMode) -> Self {
        Self::with_clock(fs, mode, Arc::new(SystemClock))
    }

    pub fn with_clock(fs: Arc<dyn FileSystem>, mode: CachingMode, clock: Arc<dyn Clock>) -> Self {
        Self {
            fs,
            clock,
            state: RwLock::new(ListingState {
                mode,
                listings: HashMap::new(),
            }),
            archives: RwLock::new(HashMap::new()),
            fragments: RwLock::new(BTreeMap::new()),
        }
    }

    /// VFS over the local OS file system.
    pub fn local(mode: CachingMode) -> Self {
        Self::new(Arc::new(LocalFs::new()), mode)
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn caching_mode(&self) -> CachingMode {
        self.state.read().mode
    }

    /// Switches the caching mode and drops every cached listing.
    pub fn set_caching_mode(&self, mode: CachingMode) {
        let mut state = self.state.write();
        state.mode = mode;
        state.listings.clear();
        tracing::debug!(target: "loom.vfs", mode = %mode, "caching mode changed");
    }

    /// Drops the cached listing of `dir`.
    pub fn clear_cache(&self, dir: &VfsPath) {
        let mut state = self.state.write();
        if let Some(listing) = state.listings.get_mut(dir) {
            listing.clear();
        }
    }

    /// Drops every cached directory listing.
    pub fn clear_caches(&self) {
        let mut state = self.state.write();
        for listing in state.listings.values_mut() {
            listing.clear();
        }
    }

    /// Indexes the archive at `path` and returns its root.
    ///
    /// Indexing happens at most once per archive; an unreadable archive is an error.
    pub fn mount_archive(&self, path: &Path) -> Result<VfsPath, VfsError> {
        let archive = normalize_local_path(path);
        self.archive_tree(&archive)?;
        Ok(VfsPath::jar(archive, ""))
    }

    pub fn archive_conflicts(&self, archive: &Path) -> Vec<ArchiveConflict> {
        self.archives
            .read()
            .get(&normalize_local_path(archive))
            .map(|tree| tree.conflicts().to_vec())
            .unwrap_or_default()
    }

    fn archive_tree(&self, archive: &Path) -> Result<Arc<ArchiveTree>, VfsError> {
        if let Some(tree) = self.archives.read().get(archive) {
            return Ok(Arc::clone(tree));
        }
        let mut archives = self.archives.write();
        if let Some(tree) = archives.get(archive) {
            return Ok(Arc::clone(tree));
        }
        let tree = Arc::new(ArchiveTree::index(archive)?);
        tracing::debug!(
            target: "loom.vfs",
            archive = %archive.display(),
            conflicts = tree.conflicts().len(),
            "indexed archive"
        );
        archives.insert(archive.to_path_buf(), Arc::clone(&tree));
        Ok(tree)
    }

    fn read_archive_entry(&self, archive: &ArchivePath) -> io::Result<Vec<u8>> {
        let tree = self.archive_tree(&archive.archive).map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidData, err.to_string())
        })?;
        tree.read(&archive.entry)
    }

    /// Archive tree for paths accessed after mounting; an unreadable archive reads as empty.
    fn mounted_tree(&self, archive: &Path) -> Option<Arc<ArchiveTree>> {
        match self.archive_tree(archive) {
            Ok(tree) => Some(tree),
            Err(err) => {
                tracing::warn!(target: "loom.vfs", error = %err, "archive unavailable");
                None
            }
        }
    }

    pub fn add_fragment(&self, fragment: Fragment) -> VfsPath {
        let path = fragment.path();
        self.fragments.write().insert(path.clone(), fragment);
        path
    }

    pub fn remove_fragment(&self, path: &VfsPath) -> Option<Fragment> {
        self.fragments.write().remove(path)
    }

    pub fn fragment(&self, path: &VfsPath) -> Option<Fragment> {
        self.fragments.read().get(path).cloned()
    }

    /// Fragments embedded in `enclosing`.
    pub fn fragments_of(&self, enclosing: &VfsPath) -> Vec<Fragment> {
        self.fragments
            .read()
            .values()
            .filter(|fragment| &fragment.enclosing == enclosing)
            .cloned()
            .collect()
    }

    pub fn exists(&self, path: &VfsPath) -> bool {
        match path {
            VfsPath::Fragment(_) => self.fragments.read().contains_key(path),
            VfsPath::Archive(archive) => self
                .mounted_tree(&archive.archive)
                .is_some_and(|tree| tree.exists(&archive.entry)),
            VfsPath::Local(_) => self.fs.exists(path),
        }
    }

    pub fn is_dir(&self, path: &VfsPath) -> bool {
        match path {
            VfsPath::Fragment(_) => false,
            VfsPath::Archive(archive) => self
                .mounted_tree(&archive.archive)
                .is_some_and(|tree| tree.is_dir(&archive.entry)),
            VfsPath::Local(_) => self.fs.is_dir(path),
        }
    }

    pub fn is_file(&self, path: &VfsPath) -> bool {
        match path {
            VfsPath::Fragment(_) => self.fragments.read().contains_key(path),
            VfsPath::Archive(archive) => self
                .mounted_tree(&archive.archive)
                .is_some_and(|tree| tree.is_file(&archive.entry)),
            VfsPath::Local(_) => self.fs.exists(path) && !self.fs.is_dir(path),
        }
    }

    pub fn read_bytes(&self, path: &VfsPath) -> io::Result<Vec<u8>> {
        match path {
            VfsPath::Fragment(_) => self
                .fragments
                .read()
                .get(path)
                .map(|fragment| fragment.content.clone().into_bytes())
                .ok_or_else(|| not_found(path)),
            VfsPath::Archive(archive) => self.read_archive_entry(archive),
            VfsPath::Local(_) => self.fs.read_bytes(path),
        }
    }

    pub fn read_to_string(&self, path: &VfsPath) -> io::Result<String> {
        match path {
            VfsPath::Fragment(_) => self
                .fragments
                .read()
                .get(path)
                .map(|fragment| fragment.content.clone())
                .ok_or_else(|| not_found(path)),
            VfsPath::Archive(archive) => String::from_utf8(self.read_archive_entry(archive)?)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err)),
            VfsPath::Local(_) => self.fs.read_to_string(path),
        }
    }

    /// Writes through to the backing file system and drops the parent's cached listing.
    pub fn write(&self, path: &VfsPath, bytes: &[u8]) -> io::Result<()> {
        self.fs.write(path, bytes)?;
        if let Some(parent) = path.parent() {
            self.clear_cache(&parent);
        }
        Ok(())
    }

    /// Child files of `dir`, including fragments embedded in files of `dir`.
    pub fn list_files(&self, dir: &VfsPath) -> Vec<VfsPath> {
        let mut files = match dir {
            VfsPath::Fragment(_) => return Vec::new(),
            VfsPath::Archive(archive) => self
                .mounted_tree(&archive.archive)
                .map(|tree| tree.list_files(&archive.entry))
                .unwrap_or_default(),
            VfsPath::Local(_) => self.listing(dir).0,
        };
        let fragments = self.fragments.read();
        files.extend(
            fragments
                .keys()
                .filter(|path| path.parent().as_ref() == Some(dir))
                .cloned(),
        );
        files
    }

    /// Child directories of `dir`.
    pub fn list_dirs(&self, dir: &VfsPath) -> Vec<VfsPath> {
        match dir {
            VfsPath::Fragment(_) => Vec::new(),
            VfsPath::Archive(archive) => self
                .mounted_tree(&archive.archive)
                .map(|tree| tree.list_dirs(&archive.entry))
                .unwrap_or_default(),
            VfsPath::Local(_) => self.listing(dir).1,
        }
    }

    /// Whether `relative` (slash separated) names an existing file below `dir`.
    ///
    /// Under full caching this walks cached listings only.
    pub fn has_child_file(&self, dir: &VfsPath, relative: &str) -> bool {
        if self.caching_mode() != CachingMode::FullCaching || !matches!(dir, VfsPath::Local(_)) {
            return dir.join(relative).is_some_and(|path| self.is_file(&path));
        }

        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        let Some((file, dirs)) = segments.split_last() else {
            return false;
        };
        let mut current = dir.clone();
        for segment in dirs {
            match self
                .list_dirs(&current)
                .into_iter()
                .find(|child| child.name() == *segment)
            {
                Some(child) => current = child,
                None => return false,
            }
        }
        self.list_files(&current)
            .iter()
            .any(|child| child.name() == *file)
    }

    fn listing(&self, dir: &VfsPath) -> (Vec<VfsPath>, Vec<VfsPath>) {
        {
            let state = self.state.read();
            if state.mode == CachingMode::FullCaching {
                if let Some(Listing {
                    files: Some(files),
                    dirs: Some(dirs),
                    ..
                }) = state.listings.get(dir)
                {
                    return (files.clone(), dirs.clone());
                }
            }
        }

        let mut state = self.state.write();
        let mode = state.mode;
        let current = match mode {
            CachingMode::CheckTimestamps | CachingMode::FuzzyTimestamps => {
                self.fs.modified_millis(dir).unwrap_or(0)
            }
            CachingMode::NoCaching | CachingMode::FullCaching => 0,
        };
        let listing = state.listings.entry(dir.clone()).or_default();
        match listing.decide(mode, current) {
            Decision::UseCache => {}
            Decision::Empty => listing.set_empty(),
            Decision::Refresh => {
                let (files, dirs) = self.scan(dir);
                listing.store(files, dirs, current, self.clock.now_millis());
            }
        }
        (
            listing.files.clone().unwrap_or_default(),
            listing.dirs.clone().unwrap_or_default(),
        )
    }

    fn scan(&self, dir: &VfsPath) -> (Vec<VfsPath>, Vec<VfsPath>) {
        let children = match self.fs.read_dir(dir) {
            Ok(children) => children,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                tracing::warn!(target: "loom.vfs", dir = %dir, error = %err, "failed to list directory");
                Vec::new()
            }
        };
        children
            .into_iter()
            .partition::<Vec<_>, _>(|child| !self.fs.is_dir(child))
    }
}

fn not_found(path: &VfsPath) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such fragment: {path}"))
}

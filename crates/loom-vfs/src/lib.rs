//! Virtual file system for the metaprogramming engine.
//!
//! Resources come from three places: plain directories of the backing [`FileSystem`], archive
//! trees indexed once per archive, and in-memory [`Fragment`]s embedded in real files. [`Vfs`]
//! presents all of them through [`VfsPath`] and caches directory listings per [`CachingMode`].

mod archive_tree;
mod change;
mod clock;
mod error;
mod fragment;
mod fs;
mod listing;
mod memory_fs;
mod path;
mod vfs;
mod watch;

pub use archive_tree::{ArchiveConflict, ArchiveTree};
pub use change::{FileChange, FileChangeKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::VfsError;
pub use fragment::Fragment;
pub use fs::{FileSystem, LocalFs};
pub use loom_core::CachingMode;
pub use memory_fs::MemoryFs;
pub use path::{ArchivePath, FragmentPath, VfsPath};
pub use vfs::Vfs;
pub use watch::{FileWatcher, ManualFileWatcher, ManualFileWatcherHandle, WatchEvent};

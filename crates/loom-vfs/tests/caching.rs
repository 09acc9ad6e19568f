use std::sync::Arc;

use loom_vfs::{CachingMode, ManualClock, MemoryFs, Vfs, VfsPath};

struct Fixture {
    clock: Arc<ManualClock>,
    fs: Arc<MemoryFs>,
    vfs: Vfs,
    dir: VfsPath,
}

fn fixture(mode: CachingMode) -> Fixture {
    let clock = Arc::new(ManualClock::new(1_000));
    let fs = Arc::new(MemoryFs::new(clock.clone()));
    let dir = VfsPath::local("/src/com/example");
    fs.write_file(&dir.join("A.widget").unwrap(), "a");
    let vfs = Vfs::with_clock(fs.clone(), mode, clock.clone());
    Fixture {
        clock,
        fs,
        vfs,
        dir,
    }
}

fn names(paths: &[VfsPath]) -> Vec<String> {
    paths.iter().map(VfsPath::name).collect()
}

impl Fixture {
    /// Adds a file while keeping the directory timestamp unchanged, the way a coarse-grained
    /// file system reports two writes in the same tick.
    fn sneak_in(&self, name: &str) {
        self.fs.write_file(&self.dir.join(name).unwrap(), name);
        self.fs.set_modified(&self.dir, 1_000);
    }
}

#[test]
fn fuzzy_timestamps_rescan_when_refreshed_close_to_the_directory_timestamp() {
    let f = fixture(CachingMode::FuzzyTimestamps);
    f.clock.set(1_005);
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget"]);

    f.sneak_in("B.widget");
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget", "B.widget"]);
}

#[test]
fn fuzzy_timestamps_trust_a_refresh_that_is_safely_later() {
    let f = fixture(CachingMode::FuzzyTimestamps);
    f.clock.set(5_000);
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget"]);

    f.sneak_in("B.widget");
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget"]);

    f.vfs.clear_cache(&f.dir);
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget", "B.widget"]);
}

#[test]
fn check_timestamps_trust_an_unchanged_timestamp() {
    let f = fixture(CachingMode::CheckTimestamps);
    f.clock.set(1_005);
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget"]);

    f.sneak_in("B.widget");
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget"]);

    f.clock.set(2_000);
    f.fs.write_file(&f.dir.join("C.widget").unwrap(), "c");
    assert_eq!(
        names(&f.vfs.list_files(&f.dir)),
        ["A.widget", "B.widget", "C.widget"]
    );
}

#[test]
fn check_timestamps_treat_a_vanished_directory_as_empty() {
    let f = fixture(CachingMode::CheckTimestamps);
    assert_eq!(f.vfs.list_files(&f.dir).len(), 1);

    f.fs.remove(&f.dir);
    assert!(f.vfs.list_files(&f.dir).is_empty());
    assert!(f.vfs.list_dirs(&f.dir).is_empty());
}

#[test]
fn full_caching_lists_once_until_cleared() {
    let f = fixture(CachingMode::FullCaching);
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget"]);

    f.clock.set(9_000);
    f.fs.write_file(&f.dir.join("B.widget").unwrap(), "b");
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget"]);
    assert!(!f.vfs.has_child_file(&VfsPath::local("/src"), "com/example/B.widget"));
    assert!(f.vfs.has_child_file(&VfsPath::local("/src"), "com/example/A.widget"));

    f.vfs.clear_caches();
    assert_eq!(names(&f.vfs.list_files(&f.dir)), ["A.widget", "B.widget"]);
    assert!(f.vfs.has_child_file(&VfsPath::local("/src"), "com/example/B.widget"));
}

#[test]
fn no_caching_always_rescans() {
    let f = fixture(CachingMode::NoCaching);
    assert_eq!(f.vfs.list_files(&f.dir).len(), 1);
    f.sneak_in("B.widget");
    assert_eq!(f.vfs.list_files(&f.dir).len(), 2);
}

#[test]
fn switching_modes_drops_cached_listings() {
    let f = fixture(CachingMode::FullCaching);
    assert_eq!(f.vfs.list_files(&f.dir).len(), 1);
    f.sneak_in("B.widget");

    f.vfs.set_caching_mode(CachingMode::NoCaching);
    assert_eq!(f.vfs.caching_mode(), CachingMode::NoCaching);
    assert_eq!(f.vfs.list_files(&f.dir).len(), 2);
}

#[test]
fn directories_and_files_are_listed_separately() {
    let f = fixture(CachingMode::CheckTimestamps);
    let root = VfsPath::local("/src/com");
    f.fs.write_file(&root.join("Top.widget").unwrap(), "top");

    assert_eq!(names(&f.vfs.list_dirs(&root)), ["example"]);
    assert_eq!(names(&f.vfs.list_files(&root)), ["Top.widget"]);
}

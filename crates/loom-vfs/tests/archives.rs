use std::fs::File;
use std::io::Write;

use loom_vfs::{CachingMode, Fragment, Vfs, VfsError, VfsPath};
use zip::write::FileOptions;

fn write_jar(path: &std::path::Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::<()>::default();
    for (name, contents) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn mounted_archive_lists_and_reads_entries() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("widgets.jar");
    write_jar(
        &jar,
        &[
            ("com/example/Button.widget", "button"),
            ("com/example/ui/Panel.widget", "panel"),
        ],
    );

    let vfs = Vfs::local(CachingMode::CheckTimestamps);
    let root = vfs.mount_archive(&jar).unwrap();
    let pkg = root.join("com/example").unwrap();

    assert!(vfs.is_dir(&pkg));
    assert_eq!(
        vfs.list_files(&pkg),
        vec![VfsPath::jar(&jar, "com/example/Button.widget")]
    );
    assert_eq!(
        vfs.list_dirs(&pkg),
        vec![VfsPath::jar(&jar, "com/example/ui")]
    );
    let button = pkg.join("Button.widget").unwrap();
    assert_eq!(vfs.read_to_string(&button).unwrap(), "button");
    assert!(vfs.has_child_file(&root, "com/example/ui/Panel.widget"));
    assert!(!vfs.exists(&pkg.join("Missing.widget").unwrap()));
}

#[test]
fn archive_conflicts_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("uber.jar");
    write_jar(
        &jar,
        &[("META-INF", "oops"), ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0")],
    );

    let vfs = Vfs::local(CachingMode::FullCaching);
    let root = vfs.mount_archive(&jar).unwrap();

    let conflicts = vfs.archive_conflicts(&jar);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].entry, "META-INF");
    assert!(vfs.is_file(&root.join("META-INF").unwrap()));
}

#[test]
fn unreadable_archive_fails_to_mount() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("broken.jar");
    std::fs::write(&jar, b"not a zip").unwrap();

    let vfs = Vfs::local(CachingMode::CheckTimestamps);
    let err = vfs.mount_archive(&jar).unwrap_err();
    assert!(matches!(err, VfsError::ArchiveIndex { .. }));
}

#[test]
fn fragments_are_listed_next_to_their_enclosing_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("com/example");
    std::fs::create_dir_all(&src).unwrap();
    let enclosing = src.join("Queries.java");
    std::fs::write(&enclosing, "class Queries { /*[Top.sql/] select 1 */ }").unwrap();

    let vfs = Vfs::local(CachingMode::CheckTimestamps);
    let fragment = vfs.add_fragment(Fragment::new(
        VfsPath::local(&enclosing),
        "Top.sql",
        26,
        "select 1",
    ));

    let files = vfs.list_files(&VfsPath::local(&src));
    assert_eq!(files, vec![VfsPath::local(&enclosing), fragment.clone()]);
    assert!(vfs.is_file(&fragment));
    assert_eq!(vfs.read_to_string(&fragment).unwrap(), "select 1");
    assert_eq!(fragment.base_name(), "Top");

    assert!(vfs.remove_fragment(&fragment).is_some());
    assert!(!vfs.exists(&fragment));
}

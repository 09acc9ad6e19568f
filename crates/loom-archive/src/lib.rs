//! Reading dependency archives (jars) and exploded archive directories.
//!
//! Archives are indexed eagerly by the VFS, so this crate offers both entry enumeration and
//! best-effort reads of single entries.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use zip::ZipArchive;

/// One entry of an archive, as stored (forward slashes, directories may end with `/`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Clone, Debug)]
pub struct Archive {
    path: PathBuf,
}

impl Archive {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lists every entry of the archive in storage order.
    ///
    /// Exploded directories are walked recursively and listed in file-name order.
    pub fn entries(&self) -> anyhow::Result<Vec<ArchiveEntry>> {
        if self.path.is_dir() {
            let mut out = Vec::new();
            for entry in walkdir::WalkDir::new(&self.path)
                .min_depth(1)
                .sort_by_file_name()
            {
                let entry = entry
                    .with_context(|| format!("failed to walk {}", self.path.display()))?;
                let relative = entry
                    .path()
                    .strip_prefix(&self.path)
                    .with_context(|| format!("entry outside of {}", self.path.display()))?;
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(ArchiveEntry {
                    name,
                    is_dir: entry.file_type().is_dir(),
                });
            }
            return Ok(out);
        }

        let file = File::open(&self.path)
            .with_context(|| format!("failed to open archive {}", self.path.display()))?;
        let mut zip = ZipArchive::new(file)
            .with_context(|| format!("failed to read zip {}", self.path.display()))?;
        let mut out = Vec::with_capacity(zip.len());
        for idx in 0..zip.len() {
            let entry = zip.by_index_raw(idx).with_context(|| {
                format!("failed to read entry #{idx} of {}", self.path.display())
            })?;
            out.push(ArchiveEntry {
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
            });
        }
        Ok(out)
    }

    /// Read a file from the archive.
    ///
    /// Returns `Ok(None)` when the file isn't present.
    pub fn read(&self, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        if self.path.is_dir() {
            let candidate = self.path.join(name);
            if !candidate.is_file() {
                return Ok(None);
            }
            let mut buf = Vec::new();
            File::open(&candidate)
                .with_context(|| format!("failed to open {}", candidate.display()))?
                .read_to_end(&mut buf)
                .with_context(|| format!("failed to read {}", candidate.display()))?;
            return Ok(Some(buf));
        }

        let file = File::open(&self.path)
            .with_context(|| format!("failed to open archive {}", self.path.display()))?;
        let mut zip = ZipArchive::new(file)
            .with_context(|| format!("failed to read zip {}", self.path.display()))?;
        let result = match zip.by_name(name) {
            Ok(mut entry) => {
                let mut buf = Vec::new();
                entry.read_to_end(&mut buf).with_context(|| {
                    format!("failed to read {} from {}", name, self.path.display())
                })?;
                Ok(Some(buf))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(err) => Err(err).with_context(|| {
                format!("failed to read {} from zip {}", name, self.path.display())
            }),
        };
        result
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;

    use super::*;

    fn write_jar(path: &Path, entries: &[(&str, Option<&str>)]) {
        let mut jar = zip::ZipWriter::new(File::create(path).unwrap());
        let options = FileOptions::<()>::default();
        for (name, contents) in entries {
            match contents {
                Some(contents) => {
                    jar.start_file(*name, options).unwrap();
                    jar.write_all(contents.as_bytes()).unwrap();
                }
                None => jar.add_directory(*name, options).unwrap(),
            }
        }
        jar.finish().unwrap();
    }

    #[test]
    fn lists_jar_entries_in_storage_order() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_jar(
            &jar,
            &[
                ("com/", None),
                ("com/example/Foo.widget", Some("foo")),
                ("META-INF/MANIFEST.MF", Some("Manifest-Version: 1.0")),
            ],
        );

        let entries = Archive::new(&jar).entries().unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.is_dir)).collect();
        assert_eq!(
            names,
            vec![
                ("com/", true),
                ("com/example/Foo.widget", false),
                ("META-INF/MANIFEST.MF", false),
            ]
        );
    }

    #[test]
    fn lists_exploded_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("exploded.jar");
        std::fs::create_dir_all(root.join("com/example")).unwrap();
        std::fs::write(root.join("com/example/Foo.widget"), "foo").unwrap();

        let entries = Archive::new(&root).entries().unwrap();
        assert_eq!(
            entries,
            vec![
                ArchiveEntry {
                    name: "com".into(),
                    is_dir: true
                },
                ArchiveEntry {
                    name: "com/example".into(),
                    is_dir: true
                },
                ArchiveEntry {
                    name: "com/example/Foo.widget".into(),
                    is_dir: false
                },
            ]
        );
    }

    #[test]
    fn reads_entries_and_reports_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_jar(&jar, &[("a/B.widget", Some("hello"))]);

        let archive = Archive::new(&jar);
        assert_eq!(archive.read("a/B.widget").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(archive.read("a/Missing.widget").unwrap(), None);
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("broken.jar");
        std::fs::write(&jar, b"definitely not a zip").unwrap();

        assert!(Archive::new(&jar).entries().is_err());
    }
}

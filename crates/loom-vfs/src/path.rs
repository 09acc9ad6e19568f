use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A path that can be resolved by the VFS.
///
/// Resource identity is the path itself: two handles naming the same path are the same resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VfsPath {
    /// A file or directory on the local OS file system.
    Local(PathBuf),
    /// An entry inside an archive such as a `.jar`. The empty entry is the archive root.
    Archive(ArchivePath),
    /// A virtual file embedded in a real source file.
    Fragment(FragmentPath),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchivePath {
    pub archive: PathBuf,
    pub entry: String,
}

impl ArchivePath {
    pub fn is_root(&self) -> bool {
        self.entry.is_empty()
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!/{}", self.archive.display(), self.entry)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentPath {
    pub enclosing: Box<VfsPath>,
    /// File name of the fragment, including its extension (e.g. `Query.sql`).
    pub name: String,
}

impl VfsPath {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::Local(normalize_local_path(&path))
    }

    pub fn jar(archive: impl Into<PathBuf>, entry: impl AsRef<str>) -> Self {
        Self::Archive(ArchivePath {
            archive: normalize_local_path(&archive.into()),
            entry: normalize_archive_entry(entry.as_ref()),
        })
    }

    pub fn fragment(enclosing: VfsPath, name: impl Into<String>) -> Self {
        Self::Fragment(FragmentPath {
            enclosing: Box::new(enclosing),
            name: name.into(),
        })
    }

    pub fn as_local_path(&self) -> Option<&Path> {
        match self {
            VfsPath::Local(path) => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn is_in_archive(&self) -> bool {
        match self {
            VfsPath::Archive(_) => true,
            VfsPath::Fragment(fragment) => fragment.enclosing.is_in_archive(),
            VfsPath::Local(_) => false,
        }
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self, VfsPath::Fragment(_))
    }

    /// The last path segment; the archive's file name for an archive root.
    pub fn name(&self) -> String {
        match self {
            VfsPath::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            VfsPath::Archive(path) if path.is_root() => path
                .archive
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            VfsPath::Archive(path) => match path.entry.rfind('/') {
                Some(idx) => path.entry[idx + 1..].to_string(),
                None => path.entry.clone(),
            },
            VfsPath::Fragment(fragment) => fragment.name.clone(),
        }
    }

    /// Extension after the last `.` of the name, or an empty string.
    pub fn extension(&self) -> String {
        let name = self.name();
        match name.rfind('.') {
            Some(idx) => name[idx + 1..].to_string(),
            None => String::new(),
        }
    }

    /// Name without its extension.
    pub fn base_name(&self) -> String {
        loom_core::name::strip_extension(&self.name()).to_string()
    }

    pub fn parent(&self) -> Option<VfsPath> {
        match self {
            VfsPath::Local(path) => path.parent().map(|p| VfsPath::Local(p.to_path_buf())),
            VfsPath::Archive(path) if path.is_root() => path
                .archive
                .parent()
                .map(|p| VfsPath::Local(p.to_path_buf())),
            VfsPath::Archive(path) => {
                let entry = match path.entry.rfind('/') {
                    Some(idx) => path.entry[..idx].to_string(),
                    None => String::new(),
                };
                Some(VfsPath::Archive(ArchivePath {
                    archive: path.archive.clone(),
                    entry,
                }))
            }
            VfsPath::Fragment(fragment) => fragment.enclosing.parent(),
        }
    }

    /// Resolves `relative` (slash separated) against this directory path.
    ///
    /// Fragments are leaves and cannot be joined.
    pub fn join(&self, relative: &str) -> Option<VfsPath> {
        match self {
            VfsPath::Local(path) => Some(VfsPath::local(path.join(relative))),
            VfsPath::Archive(path) => {
                let relative = normalize_archive_entry(relative);
                let entry = if path.is_root() {
                    relative
                } else if relative.is_empty() {
                    path.entry.clone()
                } else {
                    format!("{}/{}", path.entry, relative)
                };
                Some(VfsPath::Archive(ArchivePath {
                    archive: path.archive.clone(),
                    entry: normalize_archive_entry(&entry),
                }))
            }
            VfsPath::Fragment(_) => None,
        }
    }

    /// Returns `true` if `self` is strictly below `dir`.
    pub fn is_descendant_of(&self, dir: &VfsPath) -> bool {
        let mut current = self.parent();
        while let Some(path) = current {
            if &path == dir {
                return true;
            }
            current = path.parent();
        }
        false
    }

    /// Converts this path into a URI.
    ///
    /// - Local absolute paths use the `file:` scheme.
    /// - Archive paths use `jar:<archive file uri>!/<percent-encoded entry>`.
    /// - Fragments use `<enclosing uri>#<fragment name>`.
    ///
    /// Relative local paths have no URI.
    pub fn to_uri(&self) -> Option<String> {
        match self {
            VfsPath::Local(path) => file_uri(path),
            VfsPath::Archive(path) => {
                let archive_uri = file_uri(&path.archive)?;
                let entry = percent_encode_archive_entry(&path.entry);
                Some(format!("jar:{archive_uri}!/{entry}"))
            }
            VfsPath::Fragment(fragment) => {
                let enclosing = fragment.enclosing.to_uri()?;
                Some(format!("{enclosing}#{}", fragment.name))
            }
        }
    }
}

impl From<PathBuf> for VfsPath {
    fn from(value: PathBuf) -> Self {
        VfsPath::local(value)
    }
}

impl From<&Path> for VfsPath {
    fn from(value: &Path) -> Self {
        VfsPath::local(value.to_path_buf())
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsPath::Local(path) => write!(f, "{}", path.display()),
            VfsPath::Archive(path) => write!(f, "{path}"),
            VfsPath::Fragment(fragment) => write!(f, "{}#{}", fragment.enclosing, fragment.name),
        }
    }
}

fn file_uri(path: &Path) -> Option<String> {
    url::Url::from_file_path(path).ok().map(|url| url.to_string())
}

fn normalize_archive_entry(entry: &str) -> String {
    let entry = if entry.contains('\\') {
        entry.replace('\\', "/")
    } else {
        entry.to_string()
    };
    entry
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn percent_encode_archive_entry(entry: &str) -> String {
    fn is_unreserved(b: u8) -> bool {
        b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
    }

    fn is_sub_delim(b: u8) -> bool {
        matches!(
            b,
            b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'='
        )
    }

    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let keep = |b: u8| is_unreserved(b) || is_sub_delim(b) || matches!(b, b'/' | b':' | b'@');
    if entry.bytes().all(keep) {
        return entry.to_string();
    }

    let mut out = String::with_capacity(entry.len() + 8);
    for b in entry.bytes() {
        if keep(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

pub(crate) fn normalize_local_path(path: &Path) -> PathBuf {
    let mut prefix: Option<OsString> = None;
    let mut has_root = false;
    let mut stack: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix_component) => {
                prefix = Some(prefix_component.as_os_str().to_owned());
            }
            Component::RootDir => has_root = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(last) = stack.last() {
                    if last != ".." {
                        stack.pop();
                        continue;
                    }
                }

                if !has_root {
                    stack.push(OsString::from(".."));
                }
            }
            Component::Normal(segment) => stack.push(segment.to_owned()),
        }
    }

    let mut out = PathBuf::new();
    match (prefix, has_root) {
        (Some(mut prefix), true) => {
            prefix.push(std::path::MAIN_SEPARATOR.to_string());
            out.push(prefix);
        }
        (Some(prefix), false) => out.push(prefix),
        (None, true) => out.push(std::path::MAIN_SEPARATOR.to_string()),
        (None, false) => {}
    }
    out.extend(stack);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_paths_are_lexically_normalized() {
        assert_eq!(
            VfsPath::local("a/./b/../c"),
            VfsPath::Local(PathBuf::from("a/c"))
        );
    }

    #[test]
    fn archive_uri_percent_encodes_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        let path = VfsPath::jar(&jar, "com/my pkg/Foo.widget");

        let uri = path.to_uri().unwrap();
        assert!(uri.starts_with("jar:file:"), "{uri}");
        assert!(uri.ends_with("!/com/my%20pkg/Foo.widget"), "{uri}");
    }

    #[test]
    fn archive_navigation_stays_inside_the_archive() {
        let jar = PathBuf::from("/libs/lib.jar");
        let file = VfsPath::jar(&jar, "/com/example/Foo.widget");

        assert_eq!(file.name(), "Foo.widget");
        assert_eq!(file.extension(), "widget");
        assert_eq!(file.base_name(), "Foo");

        let root = VfsPath::jar(&jar, "");
        assert!(file.is_descendant_of(&root));
        assert_eq!(
            file.parent().and_then(|p| p.parent()).and_then(|p| p.parent()),
            Some(root.clone())
        );
        assert_eq!(root.name(), "lib.jar");
        assert_eq!(root.parent(), Some(VfsPath::Local(PathBuf::from("/libs"))));
        assert_eq!(root.join("com/example/Foo.widget"), Some(file));
    }

    #[test]
    fn fragment_names_and_uris_derive_from_the_enclosing_file() {
        let dir = tempfile::tempdir().unwrap();
        let enclosing = VfsPath::local(dir.path().join("Main.java"));
        let fragment = VfsPath::fragment(enclosing.clone(), "Query.sql");

        assert!(fragment.is_fragment());
        assert_eq!(fragment.extension(), "sql");
        assert_eq!(fragment.parent(), enclosing.parent());
        assert_eq!(
            fragment.to_uri(),
            enclosing.to_uri().map(|uri| format!("{uri}#Query.sql"))
        );
        assert_eq!(fragment.join("x"), None);
    }
}

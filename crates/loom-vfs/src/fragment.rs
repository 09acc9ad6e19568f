use crate::path::VfsPath;

/// A virtual file embedded in a real source file, e.g. a resource literal inside a comment.
///
/// `offset` and `length` locate the fragment's content inside the enclosing file so positions
/// reported against the fragment can be mapped back to the enclosing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub enclosing: VfsPath,
    /// File name including extension, e.g. `Query.sql`.
    pub name: String,
    pub offset: usize,
    pub length: usize,
    pub content: String,
}

impl Fragment {
    pub fn new(
        enclosing: VfsPath,
        name: impl Into<String>,
        offset: usize,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            enclosing,
            name: name.into(),
            offset,
            length: content.len(),
            content,
        }
    }

    pub fn path(&self) -> VfsPath {
        VfsPath::fragment(self.enclosing.clone(), self.name.clone())
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use loom_core::{LineCol, LineIndex, Severity};
use loom_producer::ProducerDiagnostic;
use loom_vfs::{Vfs, VfsPath};
use parking_lot::Mutex;

/// A producer diagnostic positioned in a physical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDiagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    /// URI of the physical file; for a fragment, of its enclosing file.
    pub uri: Option<String>,
    pub offset: usize,
    pub length: usize,
    pub position: Option<LineCol>,
}

/// Line tables of physical files, computed once per file until invalidated.
#[derive(Debug, Default)]
pub struct LineOffsets {
    tables: Mutex<HashMap<VfsPath, Arc<LineIndex>>>,
}

impl LineOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_index(&self, vfs: &Vfs, file: &VfsPath) -> Option<Arc<LineIndex>> {
        if let Some(index) = self.tables.lock().get(file) {
            return Some(Arc::clone(index));
        }
        let text = match vfs.read_to_string(file) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(target: "loom.bridge", file = %file, error = %err, "no line table");
                return None;
            }
        };
        let index = Arc::new(LineIndex::new(&text));
        self.tables
            .lock()
            .insert(file.clone(), Arc::clone(&index));
        Some(index)
    }

    /// Maps `reported` to its physical file. Fragment-relative spans are shifted by the
    /// fragment's offset in the enclosing file.
    pub fn resolve(&self, vfs: &Vfs, reported: &ProducerDiagnostic) -> ResolvedDiagnostic {
        let diagnostic = &reported.diagnostic;
        let mut resolved = ResolvedDiagnostic {
            severity: diagnostic.severity,
            code: diagnostic.code,
            message: diagnostic.message.clone(),
            uri: None,
            offset: 0,
            length: 0,
            position: None,
        };
        let Some(file) = reported.file.as_ref() else {
            return resolved;
        };

        let (physical, span) = match vfs.fragment(file) {
            Some(fragment) => {
                let span = diagnostic
                    .span
                    .map(|span| span.shifted(fragment.offset))
                    .unwrap_or_else(|| {
                        loom_core::Span::new(fragment.offset, fragment.offset + fragment.length)
                    });
                (fragment.enclosing, Some(span))
            }
            None => (file.clone(), diagnostic.span),
        };

        resolved.uri = physical.to_uri();
        if let Some(span) = span {
            resolved.offset = span.start;
            resolved.length = span.len();
            resolved.position = self
                .line_index(vfs, &physical)
                .map(|index| index.line_col(span.start));
        }
        resolved
    }

    pub fn invalidate(&self, file: &VfsPath) {
        let mut tables = self.tables.lock();
        tables.remove(file);
        if let VfsPath::Fragment(fragment) = file {
            tables.remove(fragment.enclosing.as_ref());
        }
    }

    pub fn clear(&self) {
        self.tables.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use loom_core::{Diagnostic, Span};
    use loom_vfs::{CachingMode, Fragment, ManualClock, MemoryFs};

    use super::*;

    fn vfs_with(path: &VfsPath, text: &str) -> (Arc<MemoryFs>, Vfs) {
        let clock = Arc::new(ManualClock::new(1));
        let fs = Arc::new(MemoryFs::new(clock.clone()));
        fs.write_file(path, text);
        let vfs = Vfs::with_clock(fs.clone(), CachingMode::NoCaching, clock);
        (fs, vfs)
    }

    #[test]
    fn fragment_spans_map_into_the_enclosing_file() {
        let enclosing = VfsPath::local("/src/app/Main.java");
        let text = "class Main {\n  /*[Q.sql] select 1 */\n}\n";
        let (_fs, vfs) = vfs_with(&enclosing, text);
        let offset = text.find("select").unwrap();
        let fragment = vfs.add_fragment(Fragment::new(enclosing.clone(), "Q.sql", offset, "select 1"));

        let offsets = LineOffsets::new();
        let resolved = offsets.resolve(
            &vfs,
            &ProducerDiagnostic {
                file: Some(fragment),
                diagnostic: Diagnostic::error("SQL", "bad column", Some(Span::new(7, 8))),
            },
        );
        assert_eq!(resolved.uri, enclosing.to_uri());
        assert_eq!(resolved.offset, offset + 7);
        assert_eq!(resolved.length, 1);
        assert_eq!(resolved.position, Some(LineCol::new(1, 19)));
    }

    #[test]
    fn tables_are_computed_once_until_invalidated() {
        let file = VfsPath::local("/src/a.widget");
        let (fs, vfs) = vfs_with(&file, "one\ntwo\n");
        let offsets = LineOffsets::new();
        assert_eq!(offsets.line_index(&vfs, &file).unwrap().line_count(), 3);

        fs.write_file(&file, "one\n");
        assert_eq!(offsets.line_index(&vfs, &file).unwrap().line_count(), 3);
        offsets.invalidate(&file);
        assert_eq!(offsets.line_index(&vfs, &file).unwrap().line_count(), 2);
    }

    #[test]
    fn diagnostics_without_a_file_have_no_position() {
        let file = VfsPath::local("/src/a.widget");
        let (_fs, vfs) = vfs_with(&file, "");
        let resolved = LineOffsets::new().resolve(
            &vfs,
            &ProducerDiagnostic {
                file: None,
                diagnostic: Diagnostic::warning("W", "general", None),
            },
        );
        assert_eq!(resolved.uri, None);
        assert_eq!(resolved.position, None);
        assert_eq!(resolved.message, "general");
    }
}

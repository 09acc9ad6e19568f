use loom_core::Diagnostic;
use loom_vfs::VfsPath;

/// A diagnostic raised while producing source, attached to the resource it concerns.
///
/// Spans are relative to `file`'s content; for fragments, to the fragment's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerDiagnostic {
    pub file: Option<VfsPath>,
    pub diagnostic: Diagnostic,
}

pub trait DiagnosticSink {
    fn report(&mut self, file: Option<&VfsPath>, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<ProducerDiagnostic> {
    fn report(&mut self, file: Option<&VfsPath>, diagnostic: Diagnostic) {
        self.push(ProducerDiagnostic {
            file: file.cloned(),
            diagnostic,
        });
    }
}

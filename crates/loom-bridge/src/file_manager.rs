use std::collections::BTreeSet;

use crate::error::BridgeError;
use crate::file_object::{FileKind, FileObject};
use crate::location::Location;

/// The host compiler's file manager.
pub trait FileManager: Send + Sync {
    fn list(
        &self,
        location: &Location,
        package: &str,
        kinds: &BTreeSet<FileKind>,
        recurse: bool,
    ) -> Result<Vec<FileObject>, BridgeError>;

    /// The file for `binary_name` (`a.b.C`, nested classes as `a.b.C$D`), if any.
    fn file_for_input(
        &self,
        location: &Location,
        binary_name: &str,
        kind: FileKind,
    ) -> Result<Option<FileObject>, BridgeError>;

    fn file_for_output(
        &self,
        location: &Location,
        class_name: &str,
        kind: FileKind,
        sibling: Option<&FileObject>,
    ) -> Result<FileObject, BridgeError>;

    fn write(&self, file: &FileObject, bytes: &[u8]) -> Result<(), BridgeError>;

    fn infer_binary_name(&self, location: &Location, file: &FileObject) -> Option<String>;

    fn has_location(&self, location: &Location) -> bool;

    fn location_for_module(
        &self,
        location: &Location,
        module: &str,
    ) -> Result<Option<Location>, BridgeError>;

    /// The module location `file` belongs to within `location`.
    fn location_for_file(
        &self,
        _location: &Location,
        _file: &FileObject,
    ) -> Result<Option<Location>, BridgeError> {
        Ok(None)
    }

    fn infer_module_name(&self, location: &Location) -> Option<String>;

    fn is_same_file(&self, a: &FileObject, b: &FileObject) -> bool {
        a == b
    }
}

//! Compiler bridge: a file manager decorator that splices synthesized sources into the host
//! compiler's view of the source and class paths.
//!
//! The host compiler is modelled by the [`FileManager`] trait. [`VfsFileManager`] is the plain
//! delegate over VFS roots; [`ManifoldFileManager`] wraps any delegate and answers lookups the
//! delegate cannot with files produced by the module's type producers. [`CompileSession`] owns
//! everything for one build and routes file changes through the caches in a fixed order.

mod error;
mod file_manager;
mod file_object;
mod line_offsets;
mod location;
mod manifold;
mod session;
mod vfs_file_manager;

pub use error::BridgeError;
pub use file_manager::FileManager;
pub use file_object::{FileKind, FileObject, GeneratedFileObject, InMemoryClass, RegularFile};
pub use line_offsets::{LineOffsets, ResolvedDiagnostic};
pub use location::{HostModule, Location, PatchLocation};
pub use manifold::{BridgeOptions, ManifoldFileManager};
pub use session::CompileSession;
pub use vfs_file_manager::VfsFileManager;

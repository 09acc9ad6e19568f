//! Qualified-name indexes over VFS roots.
//!
//! [`FqnCache`] is a trie keyed by dotted-name segments. [`PathCache`] uses it to map every
//! resource file below a module's roots to the qualified name its path implies, per extension.

mod fqn_cache;
mod path_cache;

pub use fqn_cache::{FqnCache, FqnNode};
pub use path_cache::{NamespaceChild, NamespaceChildKind, PathCache};

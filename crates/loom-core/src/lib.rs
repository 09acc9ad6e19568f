//! Core shared types for Loom.
//!
//! This crate is intentionally small: the vocabulary every other crate agrees on
//! (qualified names, producer kinds, refresh kinds, diagnostics and text positions).

mod diagnostic;
mod kinds;
pub mod name;
mod text;

pub use diagnostic::{Diagnostic, Severity, Span};
pub use kinds::{CachingMode, ContributorKind, ParseCachingModeError, RefreshKind};
pub use text::{LineCol, LineIndex};

//! Source stub model.
//!
//! Producers describe a synthesized type as a [`SrcClass`] tree and render it to source text.
//! Rendering is deterministic: the same tree always renders to the same bytes.

mod class;
mod error;
mod members;
mod modifiers;
mod types;

pub use class::{ClassKind, InnerSupplementer, SrcClass};
pub use error::RenderError;
pub use members::{SrcField, SrcGetProperty, SrcMethod, SrcSetProperty, SrcStatementBlock};
pub use modifiers::Modifiers;
pub use types::{SrcAnnotation, SrcParameter, SrcType};

/// Spaces per nesting level.
pub const INDENT: usize = 2;

/// First line of every rendered top-level type.
pub const GENERATED_HEADER: &str = "/* Generated by Loom */";

pub(crate) fn indent(out: &mut String, width: usize) {
    out.extend(std::iter::repeat(' ').take(width));
}

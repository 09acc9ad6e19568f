//! Type producer SPI and the per-module registry.
//!
//! A [`TypeProducer`] claims qualified names, usually because a resource file below the module's
//! roots maps to them, and contributes source text for those names on demand. A [`Module`] owns
//! the producers of one build module together with its path cache and arbitrates between primary
//! and supplemental producers.

mod diagnostics;
mod extension;
mod model;
mod module;
mod producer;
mod resource;

pub use diagnostics::{DiagnosticSink, ProducerDiagnostic};
pub use extension::{
    extension_target, ExtensionClassProducer, ExtensionClassSource, ExtensionProducer,
    ExtensionTypes, EXTENSIONS_PACKAGE,
};
pub use model::{Model, SimpleModel};
pub use module::{
    GeneratedFile, Module, ModuleLayout, RefreshListener, RegisterError, PRIMARY_CONFLICT,
};
pub use producer::{ContributeRequest, RefreshRequest, TypeProducer};
pub use resource::{ResourceProducer, ResourceTypes};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use loom_core::ContributorKind;
use loom_vfs::VfsPath;
use parking_lot::RwLock;

use crate::diagnostics::DiagnosticSink;
use crate::model::{Model, SimpleModel};
use crate::module::Module;
use crate::producer::{ContributeRequest, RefreshRequest, TypeProducer};
use crate::resource::ResourceTypes;

/// Package segment under which extension classes live: `<p>.extensions.<extended fqn>.<Name>`.
pub const EXTENSIONS_PACKAGE: &str = "extensions";

const EXTENSION_ANNOTATION: &str = "@Extension";
const EXTENSIONS_MARKER: &str = "loom.ext.Extensions";

/// The type an extension class named `fqn` extends.
///
/// ```
/// use loom_producer::extension_target;
///
/// assert_eq!(
///     extension_target("acme.extensions.java.lang.String.StringExt"),
///     Some("java.lang.String")
/// );
/// assert_eq!(extension_target("acme.StringExt"), None);
/// ```
pub fn extension_target(fqn: &str) -> Option<&str> {
    let marker = EXTENSIONS_PACKAGE;
    let start = fqn
        .match_indices(marker)
        .map(|(idx, _)| idx)
        .find(|&idx| {
            (idx == 0 || fqn.as_bytes()[idx - 1] == b'.')
                && fqn.as_bytes().get(idx + marker.len()) == Some(&b'.')
        })?
        + marker.len()
        + 1;
    let end = fqn.rfind('.')?;
    (end > start).then(|| &fqn[start..end])
}

/// A producer whose resources contribute extension classes to other types.
pub trait ExtensionProducer: Send + Sync {
    fn extended_types(&self, module: &Module) -> Vec<String>;

    fn extended_types_for_file(&self, module: &Module, file: &VfsPath) -> Vec<String>;

    /// Extension classes this producer generates for `extended`.
    fn extension_classes(&self, module: &Module, extended: &str) -> Vec<String>;

    fn is_extended_type(&self, module: &Module, fqn: &str) -> bool {
        self.extended_types(module).iter().any(|t| t == fqn)
    }
}

/// Format-specific half of an [`ExtensionClassProducer`].
pub trait ExtensionClassSource: Send + Sync + 'static {
    type Model: Model;

    fn id(&self) -> &str;

    fn handles_file_extension(&self, extension: &str) -> bool;

    /// Types `file` contributes extension classes to.
    fn extended_types_of(&self, module: &Module, file: &VfsPath) -> Vec<String>;

    fn make_extension_class_name(&self, extended: &str) -> String;

    /// Inverse of [`ExtensionClassSource::make_extension_class_name`].
    fn derive_extended_class_from(&self, extension_class: &str) -> Option<String>;

    fn create_model(&self, module: &Module, fqn: &str, files: BTreeSet<VfsPath>) -> Self::Model;

    fn contribute(
        &self,
        module: &Module,
        request: &ContributeRequest,
        model: &Self::Model,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<String>;
}

/// Primary producer of extension classes derived from resource files.
///
/// Any change to a handled file drops the whole extension-class map; it is rebuilt on the
/// next query.
pub struct ExtensionClassProducer<S: ExtensionClassSource> {
    source: S,
    classes: RwLock<Option<Arc<BTreeMap<String, Arc<S::Model>>>>>,
}

impl<S: ExtensionClassSource> ExtensionClassProducer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            classes: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn snapshot(&self, module: &Module) -> Arc<BTreeMap<String, Arc<S::Model>>> {
        if let Some(classes) = self.classes.read().as_ref() {
            return Arc::clone(classes);
        }
        let built = Arc::new(self.build(module));
        let mut slot = self.classes.write();
        Arc::clone(slot.get_or_insert(built))
    }

    fn build(&self, module: &Module) -> BTreeMap<String, Arc<S::Model>> {
        let files: Vec<VfsPath> = {
            let path_cache = module.path_cache();
            let files = path_cache
                .all_files()
                .filter(|file| self.source.handles_file_extension(&file.extension()))
                .cloned()
                .collect();
            files
        };

        let mut by_class: BTreeMap<String, BTreeSet<VfsPath>> = BTreeMap::new();
        for file in files {
            for extended in self.source.extended_types_of(module, &file) {
                by_class
                    .entry(self.source.make_extension_class_name(&extended))
                    .or_default()
                    .insert(file.clone());
            }
        }
        by_class
            .into_iter()
            .map(|(class, files)| {
                let model = self.source.create_model(module, &class, files);
                (class, Arc::new(model))
            })
            .collect()
    }
}

impl<S: ExtensionClassSource> TypeProducer for ExtensionClassProducer<S> {
    fn id(&self) -> &str {
        self.source.id()
    }

    fn contributor_kind(&self) -> ContributorKind {
        ContributorKind::Primary
    }

    fn handles_file_extension(&self, extension: &str) -> bool {
        self.source.handles_file_extension(extension)
    }

    fn is_type(&self, module: &Module, fqn: &str) -> bool {
        self.snapshot(module).contains_key(fqn)
    }

    fn is_package(&self, module: &Module, package: &str) -> bool {
        self.snapshot(module)
            .keys()
            .any(|fqn| fqn != package && loom_core::name::is_within(fqn, package))
    }

    fn types_for_file(&self, module: &Module, file: &VfsPath) -> Vec<String> {
        self.snapshot(module)
            .iter()
            .filter(|(_, model)| model.files().contains(file))
            .map(|(class, _)| class.clone())
            .collect()
    }

    fn find_files_for_type(&self, module: &Module, fqn: &str) -> Vec<VfsPath> {
        self.snapshot(module)
            .get(fqn)
            .map(|model| model.files().iter().cloned().collect())
            .unwrap_or_default()
    }

    fn type_names(&self, module: &Module) -> Vec<String> {
        self.snapshot(module).keys().cloned().collect()
    }

    fn contribute(
        &self,
        module: &Module,
        request: &ContributeRequest,
        _existing: Option<&str>,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<String> {
        let model = self.snapshot(module).get(&request.fqn).cloned()?;
        self.source.contribute(module, request, &model, sink)
    }

    fn refreshed_file(&self, _module: &Module, request: &RefreshRequest) {
        if self.handles_file_extension(&request.file.extension()) {
            *self.classes.write() = None;
        }
    }

    fn refreshed(&self, _module: &Module) {
        *self.classes.write() = None;
    }

    fn as_extension_producer(&self) -> Option<&dyn ExtensionProducer> {
        Some(self)
    }
}

impl<S: ExtensionClassSource> ExtensionProducer for ExtensionClassProducer<S> {
    fn extended_types(&self, module: &Module) -> Vec<String> {
        let mut extended: Vec<String> = self
            .snapshot(module)
            .keys()
            .filter_map(|class| self.source.derive_extended_class_from(class))
            .collect();
        extended.sort();
        extended.dedup();
        extended
    }

    fn extended_types_for_file(&self, module: &Module, file: &VfsPath) -> Vec<String> {
        self.types_for_file(module, file)
            .iter()
            .filter_map(|class| self.source.derive_extended_class_from(class))
            .collect()
    }

    fn extension_classes(&self, module: &Module, extended: &str) -> Vec<String> {
        self.snapshot(module)
            .keys()
            .filter(|class| self.source.derive_extended_class_from(class).as_deref() == Some(extended))
            .cloned()
            .collect()
    }
}

/// Supplemental producer linking a type to its extension classes.
///
/// Source files under `<p>.extensions.<extended fqn>` annotated `@Extension` extend the named
/// type; so do the classes of every registered [`ExtensionProducer`]. The contributed source is
/// the existing source with a marker annotation listing all of them on the type declaration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionTypes;

impl ExtensionTypes {
    pub const ID: &'static str = "loom.extensions";

    fn extension_producer_classes(module: &Module, extended: &str) -> Vec<String> {
        module
            .producers()
            .iter()
            .filter_map(|producer| {
                producer
                    .as_extension_producer()
                    .map(|ext| ext.extension_classes(module, extended))
            })
            .flatten()
            .collect()
    }
}

impl ResourceTypes for ExtensionTypes {
    type Model = SimpleModel;

    fn id(&self) -> &str {
        Self::ID
    }

    fn contributor_kind(&self) -> ContributorKind {
        ContributorKind::Supplemental
    }

    fn handles_file_extension(&self, extension: &str) -> bool {
        extension == "java" || extension == "class"
    }

    fn handles_file(&self, module: &Module, file: &VfsPath) -> bool {
        let in_extensions_package = module
            .path_cache()
            .names_for_file(file)
            .iter()
            .any(|fqn| extension_target(fqn).is_some());
        if !in_extensions_package {
            return false;
        }
        if file.extension() == "class" {
            return true;
        }
        match module.vfs().read_to_string(file) {
            Ok(text) => text.contains(EXTENSION_ANNOTATION),
            Err(err) => {
                tracing::debug!(
                    target: "loom.producer",
                    file = %file,
                    error = %err,
                    "unreadable extension candidate"
                );
                false
            }
        }
    }

    fn type_name_for_file(
        &self,
        _module: &Module,
        default_fqn: &str,
        _file: &VfsPath,
    ) -> Option<String> {
        extension_target(default_fqn).map(str::to_string)
    }

    fn peripheral_types(&self, module: &Module) -> Vec<String> {
        module
            .producers()
            .iter()
            .filter_map(|producer| {
                producer
                    .as_extension_producer()
                    .map(|ext| ext.extended_types(module))
            })
            .flatten()
            .collect()
    }

    fn create_model(&self, _module: &Module, fqn: &str, files: BTreeSet<VfsPath>) -> SimpleModel {
        SimpleModel::new(fqn, files)
    }

    fn contribute(
        &self,
        module: &Module,
        request: &ContributeRequest,
        existing: Option<&str>,
        model: &SimpleModel,
        _sink: &mut dyn DiagnosticSink,
    ) -> Option<String> {
        let existing = existing?;
        let mut classes: Vec<String> = {
            let path_cache = module.path_cache();
            model
                .files()
                .iter()
                .flat_map(|file| path_cache.names_for_file(file))
                .collect()
        };
        classes.extend(Self::extension_producer_classes(module, &request.fqn));
        classes.sort();
        classes.dedup();
        if classes.is_empty() {
            return Some(existing.to_string());
        }
        Some(annotate_declaration(
            existing,
            loom_core::name::simple_name(&request.fqn),
            &classes,
        ))
    }
}

fn annotate_declaration(source: &str, simple_name: &str, classes: &[String]) -> String {
    let listed = classes
        .iter()
        .map(|class| format!("\"{class}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let annotation = format!("@{EXTENSIONS_MARKER}({{{listed}}})\n");

    let mut out = String::with_capacity(source.len() + annotation.len());
    let mut inserted = false;
    for line in source.split_inclusive('\n') {
        if !inserted && declares(line, simple_name) {
            let indent = &line[..line.len() - line.trim_start().len()];
            out.push_str(indent);
            out.push_str(&annotation);
            inserted = true;
        }
        out.push_str(line);
    }
    out
}

fn declares(line: &str, simple_name: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*') {
        return false;
    }
    let mut words = line.split(|c: char| c.is_whitespace() || c == '{' || c == '<' || c == '(');
    let mut saw_keyword = false;
    for word in words.by_ref() {
        if saw_keyword {
            if word.is_empty() {
                continue;
            }
            return word == simple_name;
        }
        saw_keyword = matches!(word, "class" | "interface" | "enum" | "record");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_target_requires_a_whole_segment() {
        assert_eq!(
            extension_target("extensions.java.util.List.ListExt"),
            Some("java.util.List")
        );
        assert_eq!(extension_target("acme.myextensions.java.Foo.Ext"), None);
        assert_eq!(extension_target("acme.extensions.Ext"), None);
    }

    #[test]
    fn annotation_lands_on_the_named_declaration() {
        let source = "package p;\n\n// class Foo in a comment\npublic final class Foo {\n}\n";
        let out = annotate_declaration(source, "Foo", &["a.extensions.p.Foo.FooExt".to_string()]);
        assert_eq!(
            out,
            "package p;\n\n// class Foo in a comment\n@loom.ext.Extensions({\"a.extensions.p.Foo.FooExt\"})\npublic final class Foo {\n}\n"
        );
    }
}

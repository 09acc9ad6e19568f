use std::collections::BTreeMap;

use crate::error::RenderError;
use crate::members::{SrcField, SrcGetProperty, SrcMethod, SrcSetProperty, SrcStatementBlock};
use crate::modifiers::Modifiers;
use crate::types::{SrcAnnotation, SrcParameter, SrcType};
use crate::{indent, GENERATED_HEADER, INDENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Annotation,
    Enum,
    Record,
}

/// Lets supplemental producers amend the rendered text of nested classes.
pub trait InnerSupplementer {
    /// Returns the amended source of the nested class `fqn`, or `source` unchanged.
    fn supplement_inner(&self, fqn: &str, binary: bool, source: String) -> String;
}

/// A synthesized class, interface, annotation, enum, or record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcClass {
    package: String,
    original_simple_name: String,
    simple_name: String,
    /// Rendered simple names of all enclosing classes, outermost first.
    enclosing_names: Vec<String>,
    kind: ClassKind,
    modifiers: Modifiers,
    annotations: Vec<SrcAnnotation>,
    imports: Vec<String>,
    type_vars: Vec<SrcType>,
    superclass: Option<SrcType>,
    interfaces: Vec<SrcType>,
    fields: Vec<SrcField>,
    enum_constants: Vec<SrcField>,
    constructors: Vec<SrcMethod>,
    methods: Vec<SrcMethod>,
    get_properties: BTreeMap<String, SrcGetProperty>,
    set_properties: BTreeMap<String, SrcSetProperty>,
    inner_classes: Vec<SrcClass>,
    static_blocks: Vec<SrcStatementBlock>,
    binary: bool,
}

impl SrcClass {
    /// A top-level type named by its qualified name.
    pub fn new(fqn: &str, kind: ClassKind) -> Self {
        let simple = loom_core::name::simple_name(fqn).to_string();
        Self::with_names(
            loom_core::name::package_of(fqn).to_string(),
            simple.clone(),
            simple,
            Vec::new(),
            kind,
        )
    }

    /// A type nested in `enclosing`, not yet attached to it (see [`SrcClass::add_inner_class`]).
    ///
    /// A name equal to any enclosing class's simple name is renamed to
    /// `<immediate enclosing>_<name>`.
    pub fn nested(name: &str, enclosing: &SrcClass, kind: ClassKind) -> Self {
        let original = loom_core::name::simple_name(name).to_string();
        let mut enclosing_names = enclosing.enclosing_names.clone();
        enclosing_names.push(enclosing.simple_name.clone());
        let simple_name = if enclosing_names.contains(&original) {
            format!("{}_{}", enclosing.simple_name, original)
        } else {
            original.clone()
        };
        let mut class = Self::with_names(enclosing.name(), original, simple_name, enclosing_names, kind);
        class.binary = enclosing.binary;
        class
    }

    fn with_names(
        package: String,
        original_simple_name: String,
        simple_name: String,
        enclosing_names: Vec<String>,
        kind: ClassKind,
    ) -> Self {
        Self {
            package,
            original_simple_name,
            simple_name,
            enclosing_names,
            kind,
            modifiers: Modifiers::NONE,
            annotations: Vec::new(),
            imports: Vec::new(),
            type_vars: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            enum_constants: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            get_properties: BTreeMap::new(),
            set_properties: BTreeMap::new(),
            inner_classes: Vec::new(),
            static_blocks: Vec::new(),
            binary: false,
        }
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Package for top-level types; the enclosing type's qualified name for nested ones.
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn original_simple_name(&self) -> &str {
        &self.original_simple_name
    }

    pub fn name(&self) -> String {
        loom_core::name::join(&self.package, &self.simple_name)
    }

    pub fn is_top_level(&self) -> bool {
        self.enclosing_names.is_empty()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Whether this source poses an existing compiled type rather than a new one.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn set_binary(&mut self, binary: bool) -> &mut Self {
        self.binary = binary;
        self
    }

    pub fn annotations(&self) -> &[SrcAnnotation] {
        &self.annotations
    }

    pub fn has_annotation(&self, simple_name: &str) -> bool {
        self.annotations.iter().any(|a| a.is(simple_name))
    }

    pub fn interfaces(&self) -> &[SrcType] {
        &self.interfaces
    }

    pub fn static_blocks(&self) -> &[SrcStatementBlock] {
        &self.static_blocks
    }

    pub fn inner_classes(&self) -> &[SrcClass] {
        &self.inner_classes
    }

    pub fn methods(&self) -> &[SrcMethod] {
        &self.methods
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) -> &mut Self {
        self.modifiers = modifiers;
        self
    }

    pub fn add_annotation(&mut self, annotation: SrcAnnotation) -> &mut Self {
        self.annotations.push(annotation);
        self
    }

    pub fn add_import(&mut self, import: impl Into<String>) -> &mut Self {
        self.imports.push(import.into());
        self
    }

    pub fn add_static_import(&mut self, import: impl AsRef<str>) -> &mut Self {
        self.imports.push(format!("static {}", import.as_ref()));
        self
    }

    pub fn add_type_var(&mut self, var: SrcType) -> &mut Self {
        self.type_vars.push(var);
        self
    }

    pub fn superclass(&mut self, ty: SrcType) -> &mut Self {
        self.superclass = Some(ty);
        self
    }

    pub fn add_interface(&mut self, ty: SrcType) -> &mut Self {
        self.interfaces.push(ty);
        self
    }

    pub fn add_field(&mut self, field: SrcField) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn add_enum_constant(&mut self, constant: SrcField) -> &mut Self {
        self.enum_constants.push(constant);
        self
    }

    pub fn add_constructor(&mut self, ctor: SrcMethod) -> &mut Self {
        self.constructors.push(ctor);
        self
    }

    pub fn add_method(&mut self, method: SrcMethod) -> &mut Self {
        self.methods.push(method);
        self
    }

    pub fn add_get_property(&mut self, property: SrcGetProperty) -> &mut Self {
        self.get_properties
            .insert(property.property_name().to_string(), property);
        self
    }

    pub fn add_set_property(&mut self, property: SrcSetProperty) -> &mut Self {
        self.set_properties
            .insert(property.property_name().to_string(), property);
        self
    }

    pub fn add_inner_class(&mut self, inner: SrcClass) -> &mut Self {
        self.inner_classes.push(inner);
        self
    }

    pub fn add_static_block(&mut self, block: SrcStatementBlock) -> &mut Self {
        self.static_blocks.push(block);
        self
    }

    /// Inserts a static block at `index` (clamped to the number of blocks).
    pub fn insert_static_block(&mut self, index: usize, block: SrcStatementBlock) -> &mut Self {
        let index = index.min(self.static_blocks.len());
        self.static_blocks.insert(index, block);
        self
    }

    /// Rendered name of the inner class originally named `original`; `original` when no inner
    /// class has that name.
    pub fn disambiguated_name_in_nest<'a>(&'a self, original: &'a str) -> &'a str {
        self.inner_classes
            .iter()
            .find(|inner| inner.original_simple_name == original)
            .map_or(original, |inner| inner.simple_name.as_str())
    }

    /// The record's primary constructor: methods are searched before constructors.
    pub fn find_primary_constructor(&self) -> Option<&SrcMethod> {
        self.methods
            .iter()
            .find(|m| m.is_primary_constructor())
            .or_else(|| self.constructors.iter().find(|c| c.is_primary_constructor()))
    }

    pub fn render(&self) -> Result<String, RenderError> {
        self.render_with(None)
    }

    /// Renders the header followed by this type. Nested types are offered to `supplementer`
    /// after rendering.
    pub fn render_with(
        &self,
        supplementer: Option<&dyn InnerSupplementer>,
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render_header(&mut out);
        out.push_str(&self.render_type(0, supplementer)?);
        Ok(out)
    }

    fn render_header(&self, out: &mut String) {
        out.push_str(GENERATED_HEADER);
        out.push('\n');
        if !self.package.is_empty() {
            out.push_str("package ");
            out.push_str(&self.package);
            out.push_str(";\n\n");
        }
        out.push('\n');
        for import in &self.imports {
            out.push_str("import ");
            out.push_str(import);
            out.push_str(";\n");
        }
    }

    fn render_type(
        &self,
        width: usize,
        supplementer: Option<&dyn InnerSupplementer>,
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        SrcAnnotation::render_all(&self.annotations, &mut out, width);
        indent(&mut out, width);
        match self.kind {
            ClassKind::Class | ClassKind::Interface => {
                let modifiers = if self.is_interface() {
                    self.modifiers.without(Modifiers::ABSTRACT)
                } else {
                    self.modifiers
                };
                modifiers.render(&mut out);
                out.push_str(if self.is_interface() { "interface " } else { "class " });
                out.push_str(&self.simple_name);
                SrcType::render_type_vars(&self.type_vars, &mut out);
                if let Some(superclass) = &self.superclass {
                    out.push_str(" extends ");
                    superclass.render(&mut out);
                }
                self.render_implements(&mut out);
            }
            ClassKind::Enum => {
                self.modifiers.without(Modifiers::FINAL).render(&mut out);
                out.push_str("enum ");
                out.push_str(&self.simple_name);
                self.render_implements(&mut out);
            }
            ClassKind::Annotation => {
                self.modifiers
                    .without(Modifiers::FINAL | Modifiers::ABSTRACT)
                    .render(&mut out);
                out.push_str("@interface ");
                out.push_str(&self.simple_name);
            }
            ClassKind::Record => {
                self.modifiers.render(&mut out);
                out.push_str("record ");
                out.push_str(&self.simple_name);
                SrcType::render_type_vars(&self.type_vars, &mut out);
                let ctor = self.find_primary_constructor().ok_or_else(|| {
                    RenderError::MissingPrimaryConstructor {
                        record: self.name(),
                    }
                })?;
                SrcParameter::render_list(ctor.params(), &mut out);
                self.render_implements(&mut out);
            }
        }
        out.push_str(" {\n");

        if self.kind == ClassKind::Enum {
            self.render_enum_constants(&mut out, width + INDENT);
        }
        self.render_features(&mut out, width + INDENT, supplementer)?;

        indent(&mut out, width);
        out.push_str("}\n\n");

        match supplementer {
            Some(supplementer) if !self.is_top_level() => {
                Ok(supplementer.supplement_inner(&self.name(), self.binary, out))
            }
            _ => Ok(out),
        }
    }

    fn render_implements(&self, out: &mut String) {
        if self.interfaces.is_empty() {
            return;
        }
        out.push_str(if self.is_interface() {
            " extends "
        } else {
            " implements "
        });
        for (idx, iface) in self.interfaces.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            iface.render(out);
        }
    }

    fn render_enum_constants(&self, out: &mut String, width: usize) {
        let last = self.enum_constants.len().saturating_sub(1);
        for (idx, constant) in self.enum_constants.iter().enumerate() {
            SrcAnnotation::render_all(&constant.annotations, out, width);
            indent(out, width);
            out.push_str(&constant.name);
            out.push_str(if idx == last { ";\n\n" } else { ",\n" });
        }
    }

    fn render_features(
        &self,
        out: &mut String,
        width: usize,
        supplementer: Option<&dyn InnerSupplementer>,
    ) -> Result<(), RenderError> {
        for field in &self.fields {
            // Instance state of a record lives in its header.
            if self.kind == ClassKind::Record && !field.is_static() {
                break;
            }
            field.render(out, width);
        }
        for ctor in &self.constructors {
            ctor.render(out, width, &self.simple_name, self.kind)?;
        }
        self.render_properties(out, width)?;
        for method in &self.methods {
            method.render(out, width, &self.simple_name, self.kind)?;
        }
        for inner in &self.inner_classes {
            out.push_str(&inner.render_type(width, supplementer)?);
        }
        for block in &self.static_blocks {
            out.push('\n');
            indent(out, width);
            out.push_str("static {\n");
            block.render_statements(out, width + INDENT);
            indent(out, width);
            out.push_str("}\n");
        }
        Ok(())
    }

    fn render_properties(&self, out: &mut String, width: usize) -> Result<(), RenderError> {
        if !self.get_properties.is_empty() {
            for (name, getter) in &self.get_properties {
                getter
                    .method()
                    .render(out, width, &self.simple_name, self.kind)?;
                if let Some(setter) = self.set_properties.get(name) {
                    setter
                        .method()
                        .render(out, width, &self.simple_name, self.kind)?;
                }
            }
            out.push('\n');
        }

        let mut orphans = false;
        for (name, setter) in &self.set_properties {
            if !self.get_properties.contains_key(name) {
                setter
                    .method()
                    .render(out, width, &self.simple_name, self.kind)?;
                orphans = true;
            }
        }
        if orphans {
            out.push('\n');
        }
        Ok(())
    }
}

use crate::class::ClassKind;
use crate::error::RenderError;
use crate::indent;
use crate::modifiers::Modifiers;
use crate::types::{SrcAnnotation, SrcParameter, SrcType};
use crate::INDENT;

/// A `{ ... }` block of raw statements, one per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrcStatementBlock {
    statements: Vec<String>,
}

impl SrcStatementBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.statements.push(statement.into());
        self
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Renders ` {`, the statements one level deeper than `width`, and the closing brace.
    pub(crate) fn render(&self, out: &mut String, width: usize) {
        out.push_str(" {\n");
        self.render_statements(out, width + INDENT);
        indent(out, width);
        out.push_str("}\n");
    }

    pub(crate) fn render_statements(&self, out: &mut String, width: usize) {
        for statement in &self.statements {
            indent(out, width);
            out.push_str(statement);
            out.push('\n');
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcField {
    pub(crate) name: String,
    pub(crate) ty: SrcType,
    pub(crate) modifiers: Modifiers,
    pub(crate) annotations: Vec<SrcAnnotation>,
    pub(crate) initializer: Option<String>,
}

impl SrcField {
    pub fn new(name: impl Into<String>, ty: SrcType) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers: Modifiers::NONE,
            annotations: Vec::new(),
            initializer: None,
        }
    }

    /// An enum constant; only its name and annotations render.
    pub fn enum_constant(name: impl Into<String>) -> Self {
        Self::new(name, SrcType::new(""))
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn annotation(mut self, annotation: SrcAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn initializer(mut self, expr: impl Into<String>) -> Self {
        self.initializer = Some(expr.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub(crate) fn render(&self, out: &mut String, width: usize) {
        SrcAnnotation::render_all(&self.annotations, out, width);
        indent(out, width);
        self.modifiers.render(out);
        self.ty.render(out);
        out.push(' ');
        out.push_str(&self.name);
        if let Some(init) = &self.initializer {
            out.push_str(" = ");
            out.push_str(init);
        }
        out.push_str(";\n");
    }
}

/// A method or constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcMethod {
    pub(crate) name: String,
    pub(crate) modifiers: Modifiers,
    pub(crate) annotations: Vec<SrcAnnotation>,
    pub(crate) type_vars: Vec<SrcType>,
    pub(crate) returns: Option<SrcType>,
    pub(crate) params: Vec<SrcParameter>,
    pub(crate) throws: Vec<SrcType>,
    pub(crate) body: Option<SrcStatementBlock>,
    pub(crate) constructor: bool,
    pub(crate) primary_constructor: bool,
}

impl SrcMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Modifiers::NONE,
            annotations: Vec::new(),
            type_vars: Vec::new(),
            returns: None,
            params: Vec::new(),
            throws: Vec::new(),
            body: None,
            constructor: false,
            primary_constructor: false,
        }
    }

    /// A constructor; it renders with its owner's simple name.
    pub fn constructor() -> Self {
        Self {
            constructor: true,
            ..Self::new("<init>")
        }
    }

    /// The canonical constructor of a record. Its parameters become the record header.
    pub fn primary_constructor() -> Self {
        Self {
            primary_constructor: true,
            ..Self::constructor()
        }
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn annotation(mut self, annotation: SrcAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn type_var(mut self, var: SrcType) -> Self {
        self.type_vars.push(var);
        self
    }

    pub fn returns(mut self, ty: SrcType) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn param(mut self, param: SrcParameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn throws(mut self, ty: SrcType) -> Self {
        self.throws.push(ty);
        self
    }

    pub fn body(mut self, body: SrcStatementBlock) -> Self {
        self.body = Some(body);
        self
    }

    /// Shorthand for a body of one raw statement.
    pub fn body_text(self, statement: impl Into<String>) -> Self {
        self.body(SrcStatementBlock::new().statement(statement))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[SrcParameter] {
        &self.params
    }

    pub fn is_constructor(&self) -> bool {
        self.constructor
    }

    pub fn is_primary_constructor(&self) -> bool {
        self.primary_constructor
    }

    /// `name(T1, T2)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.params.iter().map(|p| p.ty.to_source()).collect();
        format!("{}({})", self.name, types.join(", "))
    }

    fn is_interface_member(&self, owner: ClassKind) -> bool {
        matches!(owner, ClassKind::Interface | ClassKind::Annotation)
            && !self.modifiers.contains(Modifiers::DEFAULT)
            && !self.modifiers.contains(Modifiers::STATIC)
    }

    pub(crate) fn render(
        &self,
        out: &mut String,
        width: usize,
        owner_name: &str,
        owner_kind: ClassKind,
    ) -> Result<(), RenderError> {
        let interface_member = self.is_interface_member(owner_kind);
        SrcAnnotation::render_all(&self.annotations, out, width);
        indent(out, width);
        let mut modifiers = self.modifiers.without(Modifiers::TRANSIENT);
        if interface_member {
            modifiers = modifiers.without(Modifiers::PUBLIC | Modifiers::ABSTRACT);
        }
        modifiers.render(out);
        if !self.type_vars.is_empty() {
            SrcType::render_type_vars(&self.type_vars, out);
            out.push(' ');
        }
        if self.constructor {
            out.push_str(owner_name);
        } else {
            match &self.returns {
                Some(ty) => ty.render(out),
                None => out.push_str("void"),
            }
            out.push(' ');
            out.push_str(&self.name);
        }
        SrcParameter::render_list(&self.params, out);
        if !self.throws.is_empty() {
            out.push_str(" throws ");
            for (idx, ty) in self.throws.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                ty.render(out);
            }
        }

        if self.modifiers.contains(Modifiers::ABSTRACT) || interface_member {
            out.push_str(";\n");
            return Ok(());
        }
        match &self.body {
            Some(body) => {
                body.render(out, width);
                Ok(())
            }
            None => Err(RenderError::MissingBody {
                class: owner_name.to_string(),
                method: self.signature(),
            }),
        }
    }
}

/// A property getter, rendered as `getName()` (`isName()` for `boolean`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcGetProperty {
    name: String,
    method: SrcMethod,
}

impl SrcGetProperty {
    pub fn new(property: impl Into<String>, ty: SrcType) -> Self {
        let property = property.into();
        let prefix = if ty.is_primitive_boolean() { "is" } else { "get" };
        let method = SrcMethod::new(format!("{prefix}{}", capitalize(&property))).returns(ty);
        Self {
            name: property,
            method,
        }
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.method = self.method.modifiers(modifiers);
        self
    }

    pub fn annotation(mut self, annotation: SrcAnnotation) -> Self {
        self.method = self.method.annotation(annotation);
        self
    }

    pub fn body(mut self, body: SrcStatementBlock) -> Self {
        self.method = self.method.body(body);
        self
    }

    pub fn property_name(&self) -> &str {
        &self.name
    }

    pub(crate) fn method(&self) -> &SrcMethod {
        &self.method
    }
}

/// A property setter, rendered as `void setName(T value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcSetProperty {
    name: String,
    method: SrcMethod,
}

impl SrcSetProperty {
    pub fn new(property: impl Into<String>, ty: SrcType) -> Self {
        let property = property.into();
        let method = SrcMethod::new(format!("set{}", capitalize(&property)))
            .param(SrcParameter::new("value", ty));
        Self {
            name: property,
            method,
        }
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.method = self.method.modifiers(modifiers);
        self
    }

    pub fn annotation(mut self, annotation: SrcAnnotation) -> Self {
        self.method = self.method.annotation(annotation);
        self
    }

    pub fn body(mut self, body: SrcStatementBlock) -> Self {
        self.method = self.method.body(body);
        self
    }

    pub fn property_name(&self) -> &str {
        &self.name
    }

    pub(crate) fn method(&self) -> &SrcMethod {
        &self.method
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

use crate::indent;

/// A type reference as written in source, e.g. `java.util.List<String>[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcType {
    name: String,
    args: Vec<SrcType>,
    array_dims: usize,
    /// Upper bound when used as a type variable declaration.
    bound: Option<Box<SrcType>>,
}

impl SrcType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            array_dims: 0,
            bound: None,
        }
    }

    pub fn arg(mut self, arg: SrcType) -> Self {
        self.args.push(arg);
        self
    }

    pub fn array(mut self) -> Self {
        self.array_dims += 1;
        self
    }

    pub fn bound(mut self, bound: SrcType) -> Self {
        self.bound = Some(Box::new(bound));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_primitive_boolean(&self) -> bool {
        self.name == "boolean" && self.array_dims == 0
    }

    pub(crate) fn render(&self, out: &mut String) {
        out.push_str(&self.name);
        if !self.args.is_empty() {
            out.push('<');
            for (idx, arg) in self.args.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                arg.render(out);
            }
            out.push('>');
        }
        for _ in 0..self.array_dims {
            out.push_str("[]");
        }
    }

    /// Renders `<T extends B, U>`; nothing for an empty list.
    pub(crate) fn render_type_vars(vars: &[SrcType], out: &mut String) {
        if vars.is_empty() {
            return;
        }
        out.push('<');
        for (idx, var) in vars.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            var.render(out);
            if let Some(bound) = &var.bound {
                out.push_str(" extends ");
                bound.render(out);
            }
        }
        out.push('>');
    }

    pub fn to_source(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }
}

/// An annotation use: `@Name`, `@Name(value)` or `@Name(a = x, b = y)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcAnnotation {
    name: String,
    args: Vec<(Option<String>, String)>,
}

impl SrcAnnotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Adds the single unnamed `value` argument, already rendered as source.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.args.push((None, value.into()));
        self
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((Some(name.into()), value.into()));
        self
    }

    /// Name as written, possibly qualified.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this annotation is `simple_name`, qualified or not.
    pub fn is(&self, simple_name: &str) -> bool {
        loom_core::name::simple_name(&self.name) == simple_name
    }

    pub(crate) fn render(&self, out: &mut String) {
        out.push('@');
        out.push_str(&self.name);
        if self.args.is_empty() {
            return;
        }
        out.push('(');
        for (idx, (name, value)) in self.args.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            if let Some(name) = name {
                out.push_str(name);
                out.push_str(" = ");
            }
            out.push_str(value);
        }
        out.push(')');
    }

    /// One annotation per line at `width`.
    pub(crate) fn render_all(annotations: &[SrcAnnotation], out: &mut String, width: usize) {
        for annotation in annotations {
            indent(out, width);
            annotation.render(out);
            out.push('\n');
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcParameter {
    pub name: String,
    pub ty: SrcType,
    pub annotations: Vec<SrcAnnotation>,
}

impl SrcParameter {
    pub fn new(name: impl Into<String>, ty: SrcType) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
        }
    }

    pub fn annotation(mut self, annotation: SrcAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub(crate) fn render_list(params: &[SrcParameter], out: &mut String) {
        out.push('(');
        for (idx, param) in params.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            for annotation in &param.annotations {
                annotation.render(out);
                out.push(' ');
            }
            param.ty.render(out);
            out.push(' ');
            out.push_str(&param.name);
        }
        out.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_generic_array_types() {
        let ty = SrcType::new("java.util.Map")
            .arg(SrcType::new("String"))
            .arg(SrcType::new("Integer").array())
            .array();
        assert_eq!(ty.to_source(), "java.util.Map<String, Integer[]>[]");
    }

    #[test]
    fn renders_bounded_type_variables() {
        let mut out = String::new();
        SrcType::render_type_vars(
            &[
                SrcType::new("T").bound(SrcType::new("Comparable").arg(SrcType::new("T"))),
                SrcType::new("U"),
            ],
            &mut out,
        );
        assert_eq!(out, "<T extends Comparable<T>, U>");
    }

    #[test]
    fn renders_annotation_arguments() {
        let mut out = String::new();
        SrcAnnotation::new("manifold.ext.rt.api.Structural")
            .arg("factoryClass", "Foo.class")
            .arg("baseClass", "Bar.class")
            .render(&mut out);
        assert_eq!(
            out,
            "@manifold.ext.rt.api.Structural(factoryClass = Foo.class, baseClass = Bar.class)"
        );
        assert!(SrcAnnotation::new("a.b.NoBootstrap").is("NoBootstrap"));
    }
}

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Fully qualified name of the wrapper class.
    pub fn boxed_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }

    pub fn is_numeric(self) -> bool {
        self != PrimitiveType::Boolean
    }

    fn rank(self) -> u8 {
        match self {
            PrimitiveType::Boolean => 0,
            PrimitiveType::Byte => 1,
            PrimitiveType::Short | PrimitiveType::Char => 2,
            PrimitiveType::Int => 3,
            PrimitiveType::Long => 4,
            PrimitiveType::Float => 5,
            PrimitiveType::Double => 6,
        }
    }

    /// Widening primitive conversion.
    pub fn widens_to(self, target: PrimitiveType) -> bool {
        if self == target {
            return true;
        }
        if !self.is_numeric() || !target.is_numeric() || target == PrimitiveType::Char {
            return false;
        }
        // char and short do not widen into each other.
        if self == PrimitiveType::Char && target == PrimitiveType::Short {
            return false;
        }
        self.rank() < target.rank()
    }

    /// Binary numeric promotion; `None` unless both operands are numeric.
    pub fn promote(a: PrimitiveType, b: PrimitiveType) -> Option<PrimitiveType> {
        if !a.is_numeric() || !b.is_numeric() {
            return None;
        }
        let wider = if a.rank() >= b.rank() { a } else { b };
        Some(if wider.rank() < PrimitiveType::Int.rank() {
            PrimitiveType::Int
        } else {
            wider
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleField {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveType),
    Class { id: ClassId, args: Vec<Type> },
    /// The `n`th type parameter of the class whose member or supertype mentions it.
    TypeVar(usize),
    Array(Box<Type>),
    /// Components in declaration order; classes come before interfaces.
    Intersection(Vec<Type>),
    /// Fields sorted by name.
    Tuple(Vec<TupleField>),
    /// Type of a constant expression.
    Constant { base: Box<Type>, value: String },
    Null,
    Void,
    /// The placeholder type, inferred during attribution.
    Auto,
    Error,
}

impl Type {
    pub fn class(id: ClassId, args: Vec<Type>) -> Self {
        Type::Class { id, args }
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn constant(base: Type, value: impl Into<String>) -> Self {
        Type::Constant {
            base: Box::new(base),
            value: value.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Type::Auto)
    }

    pub fn is_reference(&self) -> bool {
        match self {
            Type::Class { .. }
            | Type::TypeVar(_)
            | Type::Array(_)
            | Type::Intersection(_)
            | Type::Tuple(_)
            | Type::Null => true,
            Type::Constant { base, .. } => base.is_reference(),
            _ => false,
        }
    }

    /// The type without constant-ness.
    pub fn base_type(&self) -> Type {
        match self {
            Type::Constant { base, .. } => base.base_type(),
            other => other.clone(),
        }
    }

    pub fn constant_value(&self) -> Option<&str> {
        match self {
            Type::Constant { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self.base_ref() {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn class_id(&self) -> Option<ClassId> {
        match self.base_ref() {
            Type::Class { id, .. } => Some(*id),
            _ => None,
        }
    }

    fn base_ref(&self) -> &Type {
        match self {
            Type::Constant { base, .. } => base.base_ref(),
            other => other,
        }
    }

    /// Replaces type variables with `args`; missing arguments (raw types) become `erased`.
    fn substitute(&self, args: &[Type], erased: &Type) -> Type {
        match self {
            Type::TypeVar(idx) => args.get(*idx).cloned().unwrap_or_else(|| erased.clone()),
            Type::Class { id, args: inner } => Type::Class {
                id: *id,
                args: inner.iter().map(|t| t.substitute(args, erased)).collect(),
            },
            Type::Array(element) => Type::array(element.substitute(args, erased)),
            Type::Intersection(parts) => {
                Type::Intersection(parts.iter().map(|t| t.substitute(args, erased)).collect())
            }
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    Private,
    Package,
    Protected,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub access: Access,
    /// Field type or method return type.
    pub ty: Type,
    pub params: Vec<Type>,
}

impl Member {
    pub fn field(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field,
            access: Access::Public,
            ty,
            params: Vec::new(),
        }
    }

    pub fn method(name: impl Into<String>, params: Vec<Type>, returns: Type) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            access: Access::Public,
            ty: returns,
            params,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    /// Fully qualified name.
    pub name: String,
    pub kind: ClassKind,
    /// `None` means `java.lang.Object` (or nothing, for `Object` itself).
    pub superclass: Option<Type>,
    pub interfaces: Vec<Type>,
    pub type_params: Vec<String>,
    pub members: Vec<Member>,
}

impl ClassDef {
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, ClassKind::Interface)
    }

    fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass: None,
            interfaces: Vec::new(),
            type_params: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: Type) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: Type) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_type_params(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn simple_name(&self) -> &str {
        loom_core::name::simple_name(&self.name)
    }
}

/// Classes every attribution relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnown {
    pub object: ClassId,
    pub string: ClassId,
    pub iterable: ClassId,
    pub comparable: ClassId,
}

/// The host compiler's symbol table, reduced to what attribution needs.
#[derive(Debug, Clone)]
pub struct TypeStore {
    classes: Vec<ClassDef>,
    by_name: HashMap<String, ClassId>,
    well_known: WellKnown,
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeStore {
    /// A store holding `java.lang.Object`, `String`, `Iterable`, `Comparable`, `Number` and the
    /// primitive wrappers.
    pub fn new() -> Self {
        let mut store = Self {
            classes: Vec::new(),
            by_name: HashMap::new(),
            well_known: WellKnown {
                object: ClassId(0),
                string: ClassId(0),
                iterable: ClassId(0),
                comparable: ClassId(0),
            },
        };
        let object = store.add_class(ClassDef::class("java.lang.Object"));
        let comparable = store.add_class(
            ClassDef::interface("java.lang.Comparable")
                .with_type_params(&["T"])
                .with_member(Member::method(
                    "compareTo",
                    vec![Type::TypeVar(0)],
                    Type::Primitive(PrimitiveType::Int),
                )),
        );
        let iterable = store.add_class(
            ClassDef::interface("java.lang.Iterable")
                .with_type_params(&["T"])
                .with_member(Member::method("iterator", Vec::new(), Type::Void)),
        );
        let char_sequence = store.add_class(
            ClassDef::interface("java.lang.CharSequence")
                .with_member(Member::method("length", Vec::new(), Type::Primitive(PrimitiveType::Int))),
        );
        let string = store.add_class(
            ClassDef::class("java.lang.String")
                .implements(Type::class(char_sequence, Vec::new()))
                .with_member(Member::method("length", Vec::new(), Type::Primitive(PrimitiveType::Int))),
        );
        let string_type = Type::class(string, Vec::new());
        store.classes[string.idx()]
            .interfaces
            .push(Type::class(comparable, vec![string_type]));

        let number = store.add_class(ClassDef::class("java.lang.Number").with_member(Member::method(
            "intValue",
            Vec::new(),
            Type::Primitive(PrimitiveType::Int),
        )));
        for primitive in [
            PrimitiveType::Boolean,
            PrimitiveType::Byte,
            PrimitiveType::Short,
            PrimitiveType::Char,
            PrimitiveType::Int,
            PrimitiveType::Long,
            PrimitiveType::Float,
            PrimitiveType::Double,
        ] {
            let mut wrapper = ClassDef::class(primitive.boxed_name());
            if primitive.is_numeric() && primitive != PrimitiveType::Char {
                wrapper = wrapper.extends(Type::class(number, Vec::new()));
            }
            let id = store.add_class(wrapper);
            let own = Type::class(id, Vec::new());
            store.classes[id.idx()]
                .interfaces
                .push(Type::class(comparable, vec![own]));
        }

        store.well_known = WellKnown {
            object,
            string,
            iterable,
            comparable,
        };
        store
    }

    pub fn add_class(&mut self, def: ClassDef) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.classes.push(def);
        id
    }

    /// Adds a member to a registered class, e.g. one that mentions the class's own type.
    pub fn add_member(&mut self, id: ClassId, member: Member) {
        self.classes[id.idx()].members.push(member);
    }

    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.idx()]
    }

    /// Looks a class up by qualified name, or by simple name when exactly one class has it.
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        if let Some(id) = self.by_name.get(name) {
            return Some(*id);
        }
        let mut matches = self
            .classes
            .iter()
            .enumerate()
            .filter(|(_, def)| def.simple_name() == name);
        let (idx, _) = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(ClassId(idx as u32))
    }

    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }

    pub fn object_type(&self) -> Type {
        Type::class(self.well_known.object, Vec::new())
    }

    pub fn string_type(&self) -> Type {
        Type::class(self.well_known.string, Vec::new())
    }

    pub fn is_interface(&self, ty: &Type) -> bool {
        ty.class_id()
            .is_some_and(|id| self.class(id).kind == ClassKind::Interface)
    }

    pub fn is_string(&self, ty: &Type) -> bool {
        ty.class_id() == Some(self.well_known.string)
    }

    pub fn boxed(&self, primitive: PrimitiveType) -> Option<Type> {
        self.by_name
            .get(primitive.boxed_name())
            .map(|id| Type::class(*id, Vec::new()))
    }

    pub fn unboxed(&self, ty: &Type) -> Option<PrimitiveType> {
        let name = &self.class(ty.class_id()?).name;
        [
            PrimitiveType::Boolean,
            PrimitiveType::Byte,
            PrimitiveType::Short,
            PrimitiveType::Char,
            PrimitiveType::Int,
            PrimitiveType::Long,
            PrimitiveType::Float,
            PrimitiveType::Double,
        ]
        .into_iter()
        .find(|p| p.boxed_name() == name)
    }

    /// Members declared by the class itself.
    pub fn member_count(&self, id: ClassId) -> usize {
        self.class(id).members.len()
    }

    /// Direct supertypes of `Class { id, args }`, with `args` substituted. Classes without a
    /// declared superclass extend `Object`.
    pub fn direct_supertypes(&self, id: ClassId, args: &[Type]) -> Vec<Type> {
        let def = self.class(id);
        let erased = self.object_type();
        let mut out = Vec::new();
        match &def.superclass {
            Some(superclass) => out.push(superclass.substitute(args, &erased)),
            None if id != self.well_known.object => out.push(erased.clone()),
            None => {}
        }
        out.extend(def.interfaces.iter().map(|t| t.substitute(args, &erased)));
        out
    }

    /// The superclass of a class type; `None` for interfaces, `Object` and non-class types.
    pub fn superclass_of(&self, ty: &Type) -> Option<Type> {
        let Type::Class { id, args } = ty.base_ref() else {
            return None;
        };
        if self.class(*id).kind == ClassKind::Interface || *id == self.well_known.object {
            return None;
        }
        self.direct_supertypes(*id, args).into_iter().next()
    }

    /// `ty` viewed as an instance of `target`, with type arguments carried along.
    pub fn as_super(&self, ty: &Type, target: ClassId) -> Option<Type> {
        match ty {
            Type::Class { id, args } => {
                if *id == target {
                    return Some(ty.clone());
                }
                self.direct_supertypes(*id, args)
                    .iter()
                    .find_map(|sup| self.as_super(sup, target))
            }
            Type::Intersection(parts) => parts.iter().find_map(|p| self.as_super(p, target)),
            Type::Constant { base, .. } => self.as_super(base, target),
            Type::Array(_) | Type::Tuple(_) if target == self.well_known.object => {
                Some(self.object_type())
            }
            _ => None,
        }
    }

    pub fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        match (sub, sup) {
            (Type::Error | Type::Auto, _) | (_, Type::Error | Type::Auto) => true,
            (Type::Constant { base, .. }, _) => self.is_subtype(base, sup),
            (_, Type::Constant { base, .. }) => self.is_subtype(sub, base),
            (Type::Primitive(a), Type::Primitive(b)) => a.widens_to(*b),
            (Type::Null, target) => target.is_reference(),
            (Type::Intersection(parts), target) => parts.iter().any(|p| self.is_subtype(p, target)),
            (source, Type::Intersection(parts)) => parts.iter().all(|p| self.is_subtype(source, p)),
            (Type::Array(a), Type::Array(b)) => {
                a == b || (a.is_reference() && b.is_reference() && self.is_subtype(a, b))
            }
            (Type::Array(_) | Type::Tuple(_), Type::Class { id, .. }) => {
                *id == self.well_known.object
            }
            (Type::Class { .. }, Type::Class { id, args: expected }) => {
                match self.as_super(sub, *id) {
                    Some(Type::Class { args, .. }) => {
                        expected.is_empty() || args.is_empty() || args == *expected
                    }
                    _ => false,
                }
            }
            (Type::Tuple(a), Type::Tuple(b)) => a == b,
            (Type::Void, Type::Void) => true,
            (Type::TypeVar(a), Type::TypeVar(b)) => a == b,
            _ => false,
        }
    }

    /// Assignment compatibility: subtyping plus boxing and unboxing.
    pub fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        if self.is_subtype(from, to) {
            return true;
        }
        if let Some(primitive) = from.as_primitive() {
            if let Some(boxed) = self.boxed(primitive) {
                return self.is_subtype(&boxed, to);
            }
        }
        match (self.unboxed(from), to.as_primitive()) {
            (Some(unboxed), Some(target)) => unboxed.widens_to(target),
            _ => false,
        }
    }

    /// Least upper bound. Several minimal common supertypes make an intersection.
    pub fn lub(&self, a: &Type, b: &Type) -> Type {
        let (a, b) = (a.base_type(), b.base_type());
        if self.is_subtype(&a, &b) {
            return b;
        }
        if self.is_subtype(&b, &a) {
            return a;
        }
        match (&a, &b) {
            (Type::Primitive(x), Type::Primitive(y)) => {
                if let Some(promoted) = PrimitiveType::promote(*x, *y) {
                    return Type::Primitive(promoted);
                }
                return match (self.boxed(*x), self.boxed(*y)) {
                    (Some(bx), Some(by)) => self.lub(&bx, &by),
                    _ => self.object_type(),
                };
            }
            (Type::Primitive(p), other) | (other, Type::Primitive(p)) => {
                return match self.boxed(*p) {
                    Some(boxed) => self.lub(&boxed, other),
                    None => self.object_type(),
                };
            }
            (Type::Array(x), Type::Array(y)) if x.is_reference() && y.is_reference() => {
                return Type::array(self.lub(x, y));
            }
            _ => {}
        }

        let common: BTreeSet<ClassId> = self
            .erased_supertypes(&a)
            .intersection(&self.erased_supertypes(&b))
            .copied()
            .collect();
        let minimal: Vec<ClassId> = common
            .iter()
            .copied()
            .filter(|candidate| {
                !common.iter().any(|other| {
                    other != candidate && self.erased_supertypes_of_class(*other).contains(candidate)
                })
            })
            .collect();

        let mut parts: Vec<Type> = minimal
            .into_iter()
            .map(|id| {
                let args = match (self.as_super(&a, id), self.as_super(&b, id)) {
                    (Some(Type::Class { args: x, .. }), Some(Type::Class { args: y, .. })) if x == y => x,
                    _ => Vec::new(),
                };
                Type::class(id, args)
            })
            .collect();
        parts.sort_by_key(|t| (self.is_interface(t), self.display(t)));
        match parts.len() {
            0 => self.object_type(),
            1 => parts.remove(0),
            _ => Type::Intersection(parts),
        }
    }

    fn erased_supertypes(&self, ty: &Type) -> BTreeSet<ClassId> {
        match ty.base_ref() {
            Type::Class { id, .. } => self.erased_supertypes_of_class(*id),
            Type::Intersection(parts) => parts
                .iter()
                .flat_map(|p| self.erased_supertypes(p))
                .collect(),
            Type::Array(_) | Type::Tuple(_) => BTreeSet::from([self.well_known.object]),
            _ => BTreeSet::new(),
        }
    }

    fn erased_supertypes_of_class(&self, id: ClassId) -> BTreeSet<ClassId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            for sup in self.direct_supertypes(next, &[]) {
                if let Type::Class { id, .. } = sup {
                    queue.push_back(id);
                }
            }
        }
        seen
    }

    /// Finds member `name` of `kind`, starting at `id` and walking supertypes breadth first.
    /// Private members of supertypes are not inherited and are skipped.
    pub fn find_member(&self, id: ClassId, name: &str, kind: MemberKind) -> Vec<(ClassId, &Member)> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            for member in &self.class(next).members {
                if member.name != name || member.kind != kind {
                    continue;
                }
                if next != id && member.access == Access::Private {
                    continue;
                }
                out.push((next, member));
            }
            for sup in self.direct_supertypes(next, &[]) {
                if let Type::Class { id, .. } = sup {
                    queue.push_back(id);
                }
            }
        }
        out
    }

    /// The type of `member` seen through `receiver`'s type arguments.
    pub fn member_type(&self, receiver: &Type, owner: ClassId, member_type: &Type) -> Type {
        let args = match self.as_super(receiver, owner) {
            Some(Type::Class { args, .. }) => args,
            _ => Vec::new(),
        };
        member_type.substitute(&args, &self.object_type())
    }

    pub fn display(&self, ty: &Type) -> String {
        match ty {
            Type::Primitive(p) => p.name().to_string(),
            Type::Class { id, args } => {
                let name = self.class(*id).simple_name().to_string();
                if args.is_empty() {
                    name
                } else {
                    let args: Vec<String> = args.iter().map(|a| self.display(a)).collect();
                    format!("{name}<{}>", args.join(","))
                }
            }
            Type::TypeVar(idx) => format!("T{idx}"),
            Type::Array(element) => format!("{}[]", self.display(element)),
            Type::Intersection(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| self.display(p)).collect();
                parts.join(" & ")
            }
            Type::Tuple(fields) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.name, self.display(&f.ty)))
                    .collect();
                format!("({})", fields.join(", "))
            }
            Type::Constant { base, .. } => self.display(base),
            Type::Null => "null".to_string(),
            Type::Void => "void".to_string(),
            Type::Auto => "auto".to_string(),
            Type::Error => "<error>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> Type {
        Type::Primitive(PrimitiveType::Int)
    }

    #[test]
    fn primitive_widening_and_promotion() {
        assert!(PrimitiveType::Byte.widens_to(PrimitiveType::Int));
        assert!(!PrimitiveType::Long.widens_to(PrimitiveType::Int));
        assert!(!PrimitiveType::Char.widens_to(PrimitiveType::Short));
        assert_eq!(
            PrimitiveType::promote(PrimitiveType::Short, PrimitiveType::Byte),
            Some(PrimitiveType::Int)
        );
        assert_eq!(PrimitiveType::promote(PrimitiveType::Boolean, PrimitiveType::Int), None);
    }

    #[test]
    fn iterable_arguments_flow_through_supertypes() {
        let mut store = TypeStore::new();
        let iterable = store.well_known().iterable;
        let list = store.add_class(
            ClassDef::interface("java.util.List")
                .with_type_params(&["E"])
                .implements(Type::class(iterable, vec![Type::TypeVar(0)])),
        );
        let strings = Type::class(list, vec![store.string_type()]);
        assert_eq!(
            store.as_super(&strings, iterable),
            Some(Type::class(iterable, vec![store.string_type()]))
        );
        assert!(store.is_subtype(&strings, &Type::class(iterable, Vec::new())));
        assert!(store.is_subtype(&strings, &store.object_type()));
    }

    #[test]
    fn lub_of_wrappers_is_number_and_comparable() {
        let store = TypeStore::new();
        let integer = store.boxed(PrimitiveType::Int).unwrap();
        let long = store.boxed(PrimitiveType::Long).unwrap();
        let lub = store.lub(&integer, &long);
        assert_eq!(store.display(&lub), "Number & Comparable");
        assert_eq!(store.lub(&int(), &Type::Primitive(PrimitiveType::Long)), Type::Primitive(PrimitiveType::Long));
        assert_eq!(store.lub(&Type::Null, &store.string_type()), store.string_type());
    }

    #[test]
    fn constants_are_compatible_with_their_base() {
        let store = TypeStore::new();
        let three = Type::constant(int(), "3");
        assert!(store.is_subtype(&three, &int()));
        assert_eq!(three.base_type(), int());
        assert!(store.is_assignable(&three, &store.boxed(PrimitiveType::Int).unwrap()));
    }
}

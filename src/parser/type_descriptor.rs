use serde_json::Value;

use crate::parser::schema_node::Primitive;

/// Index of a descriptor inside the resolver's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

/// Where a descriptor was declared. Drives anonymity and naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Global,
    Property,
    /// `owner_is_global`: the array that declared these items has an `id`.
    ArrayItem { owner_is_global: bool },
    UnionAlternative,
    ParamAlternative,
    ReturnEnvelope,
}

/// The declared `type` of a node, with union alternatives already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    Primitive(Primitive),
    Object,
    Array,
    Union(Vec<TypeId>),
}

impl DeclaredType {
    pub fn describe(&self) -> &'static str {
        match self {
            DeclaredType::Primitive(p) => p.as_str(),
            DeclaredType::Object => "object",
            DeclaredType::Array => "array",
            DeclaredType::Union(_) => "multi-type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Primitive(Primitive),
    Object,
    Array,
    Reference,
    Extends,
    MultiType,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedName {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Global identifier, only on top-level definitions.
    pub id: Option<String>,
    /// Name at the declaration site: the id, the property name, or the
    /// owner's name for array items.
    pub name: String,
    pub origin: Origin,
    pub declared: Option<DeclaredType>,
    pub reference: Option<String>,
    pub parent: Option<String>,
    /// Extra parents dropped when `extends` listed more than one.
    pub dropped_parents: Vec<String>,
    pub properties: Vec<(String, TypeId)>,
    pub element_type: Option<TypeId>,
    pub enum_values: Vec<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub is_anonymous: bool,
    pub inner_classes: Vec<TypeId>,
    /// One per alternative of a multi-object union.
    pub narrowings: Vec<TypeId>,
    pub resolved: Option<ResolvedName>,
    pub path: String,
    pub raw: Value,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, origin: Origin, path: impl Into<String>, raw: Value) -> Self {
        TypeDescriptor {
            id: None,
            name: name.into(),
            origin,
            declared: None,
            reference: None,
            parent: None,
            dropped_parents: Vec::new(),
            properties: Vec::new(),
            element_type: None,
            enum_values: Vec::new(),
            required: false,
            default: None,
            description: None,
            is_anonymous: false,
            inner_classes: Vec::new(),
            narrowings: Vec::new(),
            resolved: None,
            path: path.into(),
            raw,
        }
    }

    /// Primary definition source of this descriptor.
    pub fn kind(&self) -> TypeKind {
        if !self.enum_values.is_empty() {
            return TypeKind::Enum;
        }
        if self.reference.is_some() {
            return TypeKind::Reference;
        }
        match &self.declared {
            Some(DeclaredType::Primitive(p)) => TypeKind::Primitive(*p),
            Some(DeclaredType::Array) => TypeKind::Array,
            Some(DeclaredType::Union(_)) => TypeKind::MultiType,
            Some(DeclaredType::Object) => TypeKind::Object,
            None if self.parent.is_some() => TypeKind::Extends,
            None if self.element_type.is_some() => TypeKind::Array,
            None => TypeKind::Object,
        }
    }

    pub fn property(&self, name: &str) -> Option<TypeId> {
        self.properties.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    /// Identifier shown in logs and errors.
    pub fn display_name(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("x", Origin::Property, "T.x", json!({}))
    }

    #[test]
    fn enum_values_win_over_declared_type() {
        let mut d = descriptor();
        d.declared = Some(DeclaredType::Primitive(Primitive::String));
        d.enum_values = vec!["asc".into(), "desc".into()];

        assert_eq!(d.kind(), TypeKind::Enum);
    }

    #[test]
    fn extends_only_descriptor_is_an_extension() {
        let mut d = descriptor();
        d.parent = Some("Item.Details.Base".into());

        assert_eq!(d.kind(), TypeKind::Extends);
    }

    #[test]
    fn reference_is_reported_before_declared_type() {
        let mut d = descriptor();
        d.reference = Some("Library.Id".into());

        assert_eq!(d.kind(), TypeKind::Reference);
    }
}

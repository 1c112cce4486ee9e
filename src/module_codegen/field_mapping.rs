//! Field declarations, parse expressions and serialize statements.
//!
//! Every descriptor is first reduced to a [`FieldShape`]; shapes the target
//! model cannot express are rejected there. From a shape, the mapping over
//! (kind, required, array) is total.

use crate::errors::{GenError, GenResult};
use crate::module_codegen::model_class;
use crate::parser::schema_node::Primitive;
use crate::parser::type_descriptor::{DeclaredType, TypeId};
use crate::schema_resolver::SchemaResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Primitive(Primitive),
    /// Class reference as written in the generated source.
    Class(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// `nullable` is set by unions that collapse to a boxed primitive.
    Scalar { scalar: Scalar, nullable: bool },
    Array(Scalar),
}

impl FieldShape {
    pub fn is_array(&self) -> bool {
        matches!(self, FieldShape::Array(_))
    }
}

/// How generated code refers to the class of `type_id`: anonymous classes by
/// their local name, named ones through their namespace's model class.
pub fn class_reference(resolver: &SchemaResolver, type_id: TypeId) -> GenResult<String> {
    let target = resolver.instance(type_id)?;
    let d = resolver.get(target);
    let resolved = d
        .resolved
        .as_ref()
        .ok_or_else(|| GenError::naming(d.display_name(), "type was not named"))?;
    if d.is_anonymous {
        Ok(resolved.name.clone())
    } else {
        Ok(format!("{}.{}", model_class(&resolved.namespace), resolved.name))
    }
}

pub fn field_shape(resolver: &SchemaResolver, type_id: TypeId) -> GenResult<FieldShape> {
    if let Some(element) = resolver.array_type(type_id)? {
        if resolver.is_array(element)? {
            let d = resolver.get(type_id);
            return Err(GenError::unsupported(&d.path, "arrays of arrays have no field mapping"));
        }
        let (scalar, _) = scalar_shape(resolver, element)?;
        return Ok(FieldShape::Array(scalar));
    }
    let (scalar, nullable) = scalar_shape(resolver, type_id)?;
    Ok(FieldShape::Scalar { scalar, nullable })
}

fn scalar_shape(resolver: &SchemaResolver, type_id: TypeId) -> GenResult<(Scalar, bool)> {
    match resolver.effective_type(type_id)? {
        DeclaredType::Primitive(p) => Ok((Scalar::Primitive(*p), false)),
        DeclaredType::Object => Ok((Scalar::Class(class_reference(resolver, type_id)?), false)),
        DeclaredType::Union(alternatives) => collapse_union(resolver, type_id, alternatives),
        DeclaredType::Array => {
            let d = resolver.get(type_id);
            Err(GenError::unsupported(&d.path, "array without an element type"))
        }
    }
}

/// Any string alternative makes the field a string, `null|boolean` becomes a
/// nullable boolean and an all-object union uses its own class.
fn collapse_union(resolver: &SchemaResolver, type_id: TypeId, alternatives: &[TypeId]) -> GenResult<(Scalar, bool)> {
    let mut kinds = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        kinds.push(resolver.effective_type(*alternative)?.describe());
    }
    kinds.sort_unstable();
    kinds.dedup();

    if kinds.contains(&"string") {
        return Ok((Scalar::Primitive(Primitive::String), false));
    }
    if kinds == ["boolean", "null"] {
        return Ok((Scalar::Primitive(Primitive::Boolean), true));
    }
    if resolver.is_multi_object(type_id)? {
        return Ok((Scalar::Class(class_reference(resolver, type_id)?), false));
    }

    let d = resolver.get(type_id);
    Err(GenError::unsupported(
        &d.path,
        format!("no field mapping for a union of {}", kinds.join(", ")),
    ))
}

pub fn boxed_type(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Primitive(Primitive::Integer) => "Integer".to_owned(),
        Scalar::Primitive(Primitive::Number) => "Double".to_owned(),
        Scalar::Primitive(Primitive::Boolean) => "Boolean".to_owned(),
        Scalar::Primitive(Primitive::String | Primitive::Any | Primitive::Null) => "String".to_owned(),
        Scalar::Class(class) => class.clone(),
    }
}

fn is_boxed(shape: &FieldShape, required: bool) -> bool {
    match shape {
        FieldShape::Scalar { nullable, .. } => !required || *nullable,
        FieldShape::Array(_) => true,
    }
}

pub fn java_type(shape: &FieldShape, required: bool) -> String {
    match shape {
        FieldShape::Array(scalar) => format!("ArrayList<{}>", boxed_type(scalar)),
        FieldShape::Scalar { scalar, .. } if is_boxed(shape, required) => boxed_type(scalar),
        FieldShape::Scalar { scalar, .. } => match scalar {
            Scalar::Primitive(Primitive::Integer) => "int".to_owned(),
            Scalar::Primitive(Primitive::Number) => "double".to_owned(),
            Scalar::Primitive(Primitive::Boolean) => "boolean".to_owned(),
            other => boxed_type(other),
        },
    }
}

/// Name of the static helper that parses a JSON array into a list of `class`.
pub fn list_creator_name(class: &str) -> String {
    format!("get{}List", class.replace('.', ""))
}

/// Expression reading the value stored under `key` (a Java expression) in
/// the JSON object named `source`.
pub fn parse_expr(shape: &FieldShape, required: bool, source: &str, key: &str) -> String {
    match shape {
        FieldShape::Array(Scalar::Primitive(p)) => {
            let helper = match p {
                Primitive::Integer => "getIntegerArray",
                Primitive::Number => "getDoubleArray",
                Primitive::Boolean => "getBooleanArray",
                Primitive::String | Primitive::Any | Primitive::Null => "getStringArray",
            };
            format!("{}({}, {})", helper, source, key)
        }
        FieldShape::Array(Scalar::Class(class)) => {
            format!("{}.{}({}, {})", class, list_creator_name(class), source, key)
        }
        FieldShape::Scalar { scalar: Scalar::Class(class), .. } if required => {
            format!("new {}({}.getJSONObject({}))", class, source, key)
        }
        FieldShape::Scalar { scalar: Scalar::Class(class), .. } => format!(
            "{src}.has({key}) ? new {class}({src}.getJSONObject({key})) : null",
            src = source,
            key = key,
            class = class
        ),
        FieldShape::Scalar { scalar: Scalar::Primitive(p), .. } => {
            let boxed = is_boxed(shape, required);
            match (p, boxed) {
                (Primitive::Integer, false) => format!("{}.getInt({})", source, key),
                (Primitive::Integer, true) => format!("parseInt({}, {})", source, key),
                (Primitive::Number, false) => format!("{}.getDouble({})", source, key),
                (Primitive::Number, true) => format!("parseDouble({}, {})", source, key),
                (Primitive::Boolean, false) => format!("{}.getBoolean({})", source, key),
                (Primitive::Boolean, true) => format!("parseBoolean({}, {})", source, key),
                (Primitive::String | Primitive::Any | Primitive::Null, false) => {
                    format!("{}.getString({})", source, key)
                }
                (Primitive::String | Primitive::Any | Primitive::Null, true) => {
                    format!("parseString({}, {})", source, key)
                }
            }
        }
    }
}

/// Statement writing field `ident` back under `key` into `obj`.
pub fn serialize_stmt(shape: &FieldShape, required: bool, key: &str, ident: &str) -> String {
    let value = match shape {
        FieldShape::Array(Scalar::Primitive(_)) => format!("new JSONArray({})", ident),
        FieldShape::Array(Scalar::Class(_)) => format!("toJSONArray({})", ident),
        FieldShape::Scalar { scalar: Scalar::Primitive(_), .. } => ident.to_owned(),
        FieldShape::Scalar { scalar: Scalar::Class(_), .. } if required => format!("{}.toJSONObject()", ident),
        FieldShape::Scalar { scalar: Scalar::Class(_), .. } => {
            format!("{} == null ? null : {}.toJSONObject()", ident, ident)
        }
    };
    format!("obj.put({}, {});", key, value)
}

/// Placeholder passed for a field a narrowing constructor does not set.
pub fn null_value(java_type: &str) -> &'static str {
    match java_type {
        "int" | "double" => "-1",
        "boolean" => "false",
        _ => "null",
    }
}

const RESERVED: [&str; 16] = [
    "abstract", "boolean", "case", "class", "default", "double", "final", "for", "int", "new", "package", "private",
    "public", "return", "static", "this",
];

/// Java identifier for a schema property name.
pub fn java_identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.chars().next().map_or(true, |c| c.is_ascii_digit()) || RESERVED.contains(&ident.as_str()) {
        ident.insert(0, '_');
    }
    ident
}

/// Constant name for an enum literal.
pub fn constant_name(value: &str) -> String {
    let mut name: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if name.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

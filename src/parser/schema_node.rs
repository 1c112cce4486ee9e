use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, OneOrMany};

use crate::errors::{GenError, GenResult};

/// Primitive JSON types a schema may name directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Any,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Integer => "integer",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
            Primitive::Null => "null",
            Primitive::Any => "any",
        }
    }
}

/// The value of a `type` field.
#[derive(Debug, Clone)]
pub enum SchemaTypeSpec {
    Primitive(Primitive),
    Object,
    Array,
    /// `type` given as a list of alternative shapes.
    Union(Vec<SchemaNode>),
}

impl SchemaTypeSpec {
    fn from_name(name: &str) -> Option<Self> {
        let spec = match name {
            "string" => SchemaTypeSpec::Primitive(Primitive::String),
            "integer" => SchemaTypeSpec::Primitive(Primitive::Integer),
            "number" => SchemaTypeSpec::Primitive(Primitive::Number),
            "boolean" => SchemaTypeSpec::Primitive(Primitive::Boolean),
            "null" => SchemaTypeSpec::Primitive(Primitive::Null),
            "any" => SchemaTypeSpec::Primitive(Primitive::Any),
            "object" => SchemaTypeSpec::Object,
            "array" => SchemaTypeSpec::Array,
            _ => return None,
        };
        Some(spec)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, SchemaTypeSpec::Object)
    }
}

/// Wire shape of a schema fragment. Fields whose structure we validate
/// ourselves (`type`, `properties`, `items`, `enums`) stay untyped here.
#[serde_as]
#[derive(Debug, Deserialize)]
struct RawSchemaNode {
    id: Option<String>,
    #[serde(rename = "type")]
    schema_type: Option<Value>,
    #[serde(rename = "$ref")]
    reference: Option<String>,
    #[serde_as(as = "Option<OneOrMany<_>>")]
    extends: Option<Vec<String>>,
    properties: Option<Value>,
    items: Option<Value>,
    enums: Option<Vec<Value>>,
    #[serde(default)]
    required: bool,
    default: Option<Value>,
    description: Option<String>,
    name: Option<String>,
}

/// Typed schema tree node. Built once from the raw JSON so the resolver never
/// has to probe dynamic properties.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub path: String,
    pub id: Option<String>,
    pub schema_type: Option<SchemaTypeSpec>,
    pub reference: Option<String>,
    pub extends: Vec<String>,
    pub properties: Option<Vec<(String, SchemaNode)>>,
    pub items: Option<Box<SchemaNode>>,
    pub enums: Vec<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Only set on method parameters.
    pub name: Option<String>,
    pub raw: Value,
}

impl SchemaNode {
    pub fn from_json(value: &Value, path: &str) -> GenResult<Self> {
        if !value.is_object() {
            return Err(GenError::schema(path, "schema node must be a mapping", value));
        }

        let raw = RawSchemaNode::deserialize(value)
            .map_err(|e| GenError::schema(path, e.to_string(), value))?;

        let schema_type = match &raw.schema_type {
            None => None,
            Some(Value::String(name)) => Some(
                SchemaTypeSpec::from_name(name)
                    .ok_or_else(|| GenError::schema(path, format!("unknown type \"{}\"", name), value))?,
            ),
            Some(Value::Array(alternatives)) => {
                let mut nodes = Vec::with_capacity(alternatives.len());
                for (index, alternative) in alternatives.iter().enumerate() {
                    let alt_path = format!("{}.type[{}]", path, index);
                    nodes.push(Self::union_alternative(alternative, &alt_path)?);
                }
                Some(SchemaTypeSpec::Union(nodes))
            }
            Some(other) => {
                return Err(GenError::schema(
                    path,
                    format!("type must be a string or a list, found {}", other),
                    value,
                ))
            }
        };

        let properties = match &raw.properties {
            None => None,
            Some(Value::Object(map)) => {
                let mut props = Vec::with_capacity(map.len());
                for (prop_name, prop) in map {
                    let prop_path = format!("{}.{}", path, prop_name);
                    props.push((prop_name.clone(), Self::from_json(prop, &prop_path)?));
                }
                Some(props)
            }
            Some(_) => return Err(GenError::schema(path, "properties must be a mapping", value)),
        };

        let items = match &raw.items {
            None => None,
            Some(items @ Value::Object(_)) => {
                Some(Box::new(Self::from_json(items, &format!("{}.items", path))?))
            }
            Some(_) => return Err(GenError::schema(path, "items must be a mapping", value)),
        };

        let mut enums = Vec::new();
        for entry in raw.enums.iter().flatten() {
            match entry {
                Value::String(s) => enums.push(s.clone()),
                other => {
                    return Err(GenError::schema(
                        path,
                        format!("enum entry must be a string, found {}", other),
                        value,
                    ))
                }
            }
        }

        Ok(SchemaNode {
            path: path.to_owned(),
            id: raw.id,
            schema_type,
            reference: raw.reference,
            extends: raw.extends.unwrap_or_default(),
            properties,
            items,
            enums,
            required: raw.required,
            default: raw.default,
            description: raw.description,
            name: raw.name,
            raw: value.clone(),
        })
    }

    /// Union entries are usually full nodes, but a bare type name is allowed.
    fn union_alternative(value: &Value, path: &str) -> GenResult<Self> {
        match value {
            Value::String(name) => {
                let mut map = serde_json::Map::new();
                map.insert("type".to_owned(), Value::String(name.clone()));
                Self::from_json(&Value::Object(map), path)
            }
            other => Self::from_json(other, path),
        }
    }

    pub fn declares_object(&self) -> bool {
        self.schema_type.as_ref().map_or(false, SchemaTypeSpec::is_object)
    }

    /// Copy of this node keeping only the listed properties.
    pub fn with_properties(&self, keep: &[String]) -> SchemaNode {
        let mut node = self.clone();
        if let Some(props) = node.properties.take() {
            node.properties = Some(props.into_iter().filter(|(name, _)| keep.contains(name)).collect());
        }
        if let Value::Object(map) = &mut node.raw {
            if let Some(Value::Object(raw_props)) = map.get_mut("properties") {
                raw_props.retain(|name, _| keep.contains(name));
            }
        }
        node
    }
}

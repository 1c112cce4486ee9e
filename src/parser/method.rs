use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::combinator::{constructor_signatures, ConstructorSignature};
use crate::errors::{GenError, GenResult};
use crate::naming::name_in_scope;
use crate::parser::schema_node::{Primitive, SchemaNode, SchemaTypeSpec};
use crate::parser::type_descriptor::TypeId;
use crate::parser::type_resolver::{from_param_alternative, from_property, from_return_envelope};
use crate::schema_resolver::SchemaResolver;
use crate::string_tools::split_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Single(TypeId),
    List(TypeId),
    Primitive(Primitive),
    Undefined,
}

#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub required: bool,
    pub is_list_like: bool,
    /// One entry per admissible type, in declaration order.
    pub type_alternatives: Vec<TypeId>,
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub full_name: String,
    pub namespace: String,
    pub local_name: String,
    pub description: Option<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub list_parameters: Vec<ParameterDescriptor>,
    /// Descriptor of the payload, once envelopes have been unwrapped.
    pub return_type: Option<TypeId>,
    pub return_shape: ReturnShape,
    /// Key the payload sits under when the result was unwrapped.
    pub return_attribute_key: Option<String>,
    pub constructor_signatures: Vec<ConstructorSignature>,
    pub inner_classes: Vec<TypeId>,
}

/// Method names grouped by namespace, then by local name.
pub type MethodRegistry = BTreeMap<String, BTreeMap<String, MethodDescriptor>>;

/// Parameter and return-key names that get special treatment.
#[derive(Debug, Clone)]
pub struct MethodOptions {
    pub list_parameters: Vec<String>,
    pub ignored_return_keys: Vec<String>,
}

impl Default for MethodOptions {
    fn default() -> Self {
        MethodOptions {
            list_parameters: vec!["limits".to_owned(), "sort".to_owned()],
            ignored_return_keys: vec!["limits".to_owned()],
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMethod {
    description: Option<String>,
    #[serde(default)]
    params: Vec<Value>,
    returns: Option<Value>,
}

/// Reads one entry of the `methods` section. Return shape and constructor
/// signatures are only known after the consistency pass, see [`finish_method`].
pub fn resolve_method(
    resolver: &mut SchemaResolver,
    full_name: &str,
    raw: &Value,
    options: &MethodOptions,
) -> GenResult<MethodDescriptor> {
    let (namespace, local_name) = match split_identifier(full_name).as_slice() {
        [namespace, local_name] => ((*namespace).to_owned(), (*local_name).to_owned()),
        parts => {
            return Err(GenError::naming(
                full_name,
                format!("method names need exactly two segments, found {}", parts.len()),
            ))
        }
    };
    debug!(method = full_name, "reading method");

    let method = RawMethod::deserialize(raw).map_err(|e| GenError::schema(full_name, e.to_string(), raw))?;

    let mut descriptor = MethodDescriptor {
        full_name: full_name.to_owned(),
        namespace,
        local_name,
        description: method.description,
        parameters: Vec::new(),
        list_parameters: Vec::new(),
        return_type: None,
        return_shape: ReturnShape::Undefined,
        return_attribute_key: None,
        constructor_signatures: Vec::new(),
        inner_classes: Vec::new(),
    };

    for (index, raw_param) in method.params.iter().enumerate() {
        let node = SchemaNode::from_json(raw_param, &format!("{}.params[{}]", full_name, index))?;
        let mut parameter = resolve_parameter(resolver, &node)?;
        for alternative in &parameter.type_alternatives {
            collect_inner_classes(resolver, *alternative, &mut descriptor.inner_classes);
        }
        if options.list_parameters.contains(&parameter.name) {
            parameter.is_list_like = true;
            descriptor.list_parameters.push(parameter);
        } else {
            descriptor.parameters.push(parameter);
        }
    }

    let returns = method
        .returns
        .ok_or_else(|| GenError::schema(full_name, "no return type set", raw))?;
    let returns = SchemaNode::from_json(&returns, &format!("{}.returns", full_name))?;
    let (return_type, key) = read_return(resolver, full_name, &returns, &options.ignored_return_keys)?;
    if let Some(return_type) = return_type {
        collect_inner_classes(resolver, return_type, &mut descriptor.inner_classes);
    }
    descriptor.return_type = return_type;
    descriptor.return_attribute_key = key;

    Ok(descriptor)
}

fn resolve_parameter(resolver: &mut SchemaResolver, node: &SchemaNode) -> GenResult<ParameterDescriptor> {
    let name = node
        .name
        .clone()
        .ok_or_else(|| GenError::schema(&node.path, "parameter without a name", &node.raw))?;

    let mut type_alternatives = Vec::new();
    match &node.schema_type {
        Some(SchemaTypeSpec::Union(alternatives)) if node.reference.is_none() => {
            let non_null: Vec<&SchemaNode> = alternatives
                .iter()
                .filter(|alt| !matches!(alt.schema_type, Some(SchemaTypeSpec::Primitive(Primitive::Null))))
                .collect();
            let kept: Vec<&SchemaNode> = if non_null.is_empty() { alternatives.iter().collect() } else { non_null };
            for alternative in kept {
                type_alternatives.push(from_param_alternative(resolver, &name, alternative)?);
            }
        }
        _ => type_alternatives.push(from_param_alternative(resolver, &name, node)?),
    }

    Ok(ParameterDescriptor {
        name,
        description: node.description.clone(),
        default: node.default.clone(),
        required: node.required,
        is_list_like: false,
        type_alternatives,
    })
}

/// Picks the payload descriptor out of a `returns` node, unwrapping a single
/// non-ignored property or bundling several into one wrapper.
fn read_return(
    resolver: &mut SchemaResolver,
    method: &str,
    node: &SchemaNode,
    ignored_keys: &[String],
) -> GenResult<(Option<TypeId>, Option<String>)> {
    let plain_object = node.reference.is_none() && node.extends.is_empty() && node.declares_object();
    if !plain_object {
        return Ok((Some(from_return_envelope(resolver, method, node)?), None));
    }

    let keep: Vec<&(String, SchemaNode)> = node
        .properties
        .iter()
        .flatten()
        .filter(|(name, _)| !ignored_keys.contains(name))
        .collect();
    match keep.as_slice() {
        [] => Ok((None, None)),
        [(key, payload)] => Ok((Some(from_property(resolver, key, payload)?), Some(key.clone()))),
        _ => {
            let names: Vec<String> = keep.iter().map(|(name, _)| name.clone()).collect();
            let wrapper = node.with_properties(&names);
            Ok((Some(from_return_envelope(resolver, method, &wrapper)?), None))
        }
    }
}

fn collect_inner_classes(resolver: &SchemaResolver, root: TypeId, into: &mut Vec<TypeId>) {
    if resolver.get(root).is_anonymous {
        into.push(root);
    } else {
        into.extend(resolver.nested_classes(root));
    }
}

/// Names the method-owned shapes in the scope of the call class.
pub fn name_method_types(resolver: &mut SchemaResolver, method: &MethodDescriptor) -> GenResult<()> {
    let enclosing = [method.local_name.clone()];
    let mut taken = HashSet::from([method.local_name.clone()]);
    let roots = method
        .parameters
        .iter()
        .chain(&method.list_parameters)
        .flat_map(|p| p.type_alternatives.iter().copied())
        .chain(method.return_type);
    for root in roots.collect::<Vec<_>>() {
        name_in_scope(resolver, root, &method.namespace, &enclosing, &mut taken)?;
    }
    Ok(())
}

/// Return shape and constructor signatures, which need resolved references.
pub fn finish_method(resolver: &SchemaResolver, method: &mut MethodDescriptor) -> GenResult<()> {
    method.return_shape = match method.return_type {
        None => ReturnShape::Undefined,
        Some(type_id) => classify_return(resolver, type_id)?,
    };
    method.constructor_signatures = constructor_signatures(resolver, &method.full_name, &method.parameters)?;
    debug!(
        method = %method.full_name,
        shape = ?method.return_shape,
        constructors = method.constructor_signatures.len(),
        "resolved method"
    );
    Ok(())
}

fn classify_return(resolver: &SchemaResolver, type_id: TypeId) -> GenResult<ReturnShape> {
    let d = resolver.get(type_id);
    if d.is_anonymous {
        return Ok(ReturnShape::Single(type_id));
    }
    if let Some(element) = resolver.array_type(type_id)? {
        return Ok(ReturnShape::List(element));
    }
    if let Some(primitive) = resolver.primitive_of(type_id)? {
        return Ok(ReturnShape::Primitive(primitive));
    }
    Ok(ReturnShape::Single(type_id))
}

pub fn register_method(registry: &mut MethodRegistry, method: MethodDescriptor) -> GenResult<()> {
    let bucket = registry.entry(method.namespace.clone()).or_default();
    if bucket.contains_key(&method.local_name) {
        return Err(GenError::naming(&method.full_name, "duplicate method name"));
    }
    bucket.insert(method.local_name.clone(), method);
    Ok(())
}

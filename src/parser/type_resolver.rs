//! First pass: turns typed schema nodes into descriptors.
//!
//! Every call site has its own constructor so that the anonymity rules stay
//! explicit: a node is an inner class when it declares `object` inline (as a
//! property, union/parameter alternative, return envelope, or as the items of
//! an array that has no id of its own). `$ref` nodes are never inner classes.

use tracing::debug;

use crate::errors::{GenError, GenResult};
use crate::parser::schema_node::{SchemaNode, SchemaTypeSpec};
use crate::parser::type_descriptor::{DeclaredType, Origin, TypeDescriptor, TypeId};
use crate::schema_resolver::{Degradation, SchemaResolver};

pub fn from_global_definition(
    resolver: &mut SchemaResolver,
    name: &str,
    node: &SchemaNode,
) -> GenResult<TypeId> {
    resolve(resolver, name, node, Origin::Global)
}

pub fn from_property(resolver: &mut SchemaResolver, name: &str, node: &SchemaNode) -> GenResult<TypeId> {
    resolve(resolver, name, node, Origin::Property)
}

pub fn from_array_item(
    resolver: &mut SchemaResolver,
    owner_name: &str,
    node: &SchemaNode,
    owner_is_global: bool,
) -> GenResult<TypeId> {
    resolve(resolver, owner_name, node, Origin::ArrayItem { owner_is_global })
}

pub fn from_union_alternative(
    resolver: &mut SchemaResolver,
    owner_name: &str,
    node: &SchemaNode,
) -> GenResult<TypeId> {
    resolve(resolver, owner_name, node, Origin::UnionAlternative)
}

pub fn from_param_alternative(
    resolver: &mut SchemaResolver,
    param_name: &str,
    node: &SchemaNode,
) -> GenResult<TypeId> {
    resolve(resolver, param_name, node, Origin::ParamAlternative)
}

pub fn from_return_envelope(
    resolver: &mut SchemaResolver,
    method_name: &str,
    node: &SchemaNode,
) -> GenResult<TypeId> {
    resolve(resolver, &format!("{}Result", method_name), node, Origin::ReturnEnvelope)
}

fn is_inline_position(origin: &Origin) -> bool {
    match origin {
        Origin::Global => false,
        Origin::ArrayItem { owner_is_global } => !owner_is_global,
        Origin::Property | Origin::UnionAlternative | Origin::ParamAlternative | Origin::ReturnEnvelope => true,
    }
}

fn all_objects(alternatives: &[SchemaNode]) -> bool {
    !alternatives.is_empty() && alternatives.iter().all(SchemaNode::declares_object)
}

fn resolve(resolver: &mut SchemaResolver, name: &str, node: &SchemaNode, origin: Origin) -> GenResult<TypeId> {
    debug!(path = %node.path, "reading type");

    let mut d = TypeDescriptor::new(name, origin.clone(), &node.path, node.raw.clone());
    d.id = node.id.clone();
    d.required = node.required;
    d.default = node.default.clone();
    d.description = node.description.clone();

    match node.extends.as_slice() {
        [] => {}
        [single] => d.parent = Some(single.clone()),
        [first, rest @ ..] => {
            d.parent = Some(first.clone());
            d.dropped_parents = rest.to_vec();
            resolver.record_degradation(Degradation {
                path: node.path.clone(),
                kept: first.clone(),
                dropped: rest.to_vec(),
            });
        }
    }

    d.reference = node.reference.clone();
    d.enum_values = node.enums.clone();

    if origin == Origin::Global && d.id.is_none() {
        return Err(GenError::schema(&node.path, "no id given for global type", &node.raw));
    }

    let multi_object = matches!(&node.schema_type, Some(SchemaTypeSpec::Union(alts)) if all_objects(alts));

    d.declared = match &node.schema_type {
        None => None,
        Some(SchemaTypeSpec::Primitive(p)) => Some(DeclaredType::Primitive(*p)),
        Some(SchemaTypeSpec::Object) => Some(DeclaredType::Object),
        Some(SchemaTypeSpec::Array) => Some(DeclaredType::Array),
        Some(SchemaTypeSpec::Union(alternatives)) => {
            let mut ids = Vec::with_capacity(alternatives.len());
            for alternative in alternatives {
                ids.push(from_union_alternative(resolver, name, alternative)?);
            }
            if multi_object {
                d.narrowings = ids.clone();
            }
            Some(DeclaredType::Union(ids))
        }
    };

    d.is_anonymous = node.reference.is_none()
        && (node.declares_object() || multi_object)
        && is_inline_position(&origin);

    if let Some(props) = &node.properties {
        for (prop_name, prop) in props {
            let child = from_property(resolver, prop_name, prop)?;
            d.properties.push((prop_name.clone(), child));
            if resolver.get(child).is_anonymous {
                d.inner_classes.push(child);
            }
        }
    }

    if multi_object {
        if let Some(SchemaTypeSpec::Union(alternatives)) = &node.schema_type {
            merge_alternative_properties(resolver, &mut d, alternatives)?;
        }
    }

    if let Some(items) = &node.items {
        let owner_is_global = d.id.is_some();
        let element = from_array_item(resolver, name, items, owner_is_global)?;
        d.element_type = Some(element);
        if resolver.get(element).is_anonymous {
            d.inner_classes.push(element);
        }
    }

    debug!(
        path = %node.path,
        properties = d.properties.len(),
        anonymous = d.inner_classes.len(),
        "read type"
    );

    Ok(resolver.alloc(d))
}

/// The union class carries the ordered merge of every alternative's fields.
/// A later alternative redefining a field replaces its definition but keeps
/// the original position.
fn merge_alternative_properties(
    resolver: &mut SchemaResolver,
    d: &mut TypeDescriptor,
    alternatives: &[SchemaNode],
) -> GenResult<()> {
    let mut merged: Vec<(&str, &SchemaNode)> = Vec::new();
    for alternative in alternatives {
        for (prop_name, prop) in alternative.properties.iter().flatten() {
            match merged.iter_mut().find(|(n, _)| *n == prop_name.as_str()) {
                Some(slot) => slot.1 = prop,
                None => merged.push((prop_name.as_str(), prop)),
            }
        }
    }

    for (prop_name, prop) in merged {
        if d.property(prop_name).is_some() {
            continue;
        }
        let child = from_property(resolver, prop_name, prop)?;
        d.properties.push((prop_name.to_owned(), child));
        if resolver.get(child).is_anonymous {
            d.inner_classes.push(child);
        }
    }
    Ok(())
}

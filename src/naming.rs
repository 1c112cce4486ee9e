//! Second pass: canonical (namespace, name) for every descriptor.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use crate::errors::{GenError, GenResult};
use crate::parser::type_descriptor::{DeclaredType, ResolvedName, TypeId};
use crate::schema_resolver::SchemaResolver;
use crate::string_tools::{pascal_case, split_identifier};

pub const GLOBAL_NAMESPACE: &str = "Global";

/// Middle segments moved to the tail: `Audio.Details.Album` → `AlbumDetails`.
const FOLDED_SEGMENTS: [&str; 4] = ["Details", "Fields", "Items", "Item"];

/// Named types grouped by namespace, then by local name.
#[derive(Debug, Default)]
pub struct EmissionTable {
    pub namespaces: BTreeMap<String, BTreeMap<String, TypeId>>,
}

impl EmissionTable {
    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Applies the segment rules to a dotted identifier.
pub fn resolve_dotted(identifier: &str, anonymous: bool) -> ResolvedName {
    let parts = split_identifier(identifier);
    let (namespace, name) = match parts.as_slice() {
        [single] => (
            GLOBAL_NAMESPACE.to_owned(),
            if anonymous { pascal_case(single) } else { (*single).to_owned() },
        ),
        [namespace, name] => ((*namespace).to_owned(), (*name).to_owned()),
        [namespace, middle, last] => {
            let name = if FOLDED_SEGMENTS.contains(middle) {
                format!("{}{}", last, pascal_case(middle))
            } else {
                format!("{}{}", middle, last)
            };
            ((*namespace).to_owned(), name)
        }
        [namespace, rest @ ..] => ((*namespace).to_owned(), rest.concat()),
        [] => (GLOBAL_NAMESPACE.to_owned(), String::new()),
    };
    ResolvedName { namespace, name }
}

/// Content-derived name of an inline shape: its capitalized property names,
/// sorted and concatenated. Shapes without properties fall back to the
/// capitalized declaring name.
pub fn synthesized_name(resolver: &SchemaResolver, type_id: TypeId) -> String {
    let d = resolver.get(type_id);
    let mut keys: Vec<String> = d.properties.iter().map(|(name, _)| pascal_case(name)).collect();
    keys.sort();
    let joined = keys.concat();
    if !joined.is_empty() {
        return joined;
    }
    let last = split_identifier(&d.name).last().copied().unwrap_or_default();
    pascal_case(last)
}

fn claim(base: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}{}", base, suffix);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Names one descriptor and its subtree. `taken` holds the names already used
/// in the enclosing class: its nested classes plus the names of every class
/// enclosing them. `enclosing` is that chain of class names, outermost first.
pub fn name_in_scope(
    resolver: &mut SchemaResolver,
    type_id: TypeId,
    namespace: &str,
    enclosing: &[String],
    taken: &mut HashSet<String>,
) -> GenResult<()> {
    let d = resolver.get(type_id);
    let resolved = if d.is_anonymous {
        ResolvedName {
            namespace: namespace.to_owned(),
            name: claim(synthesized_name(resolver, type_id), taken),
        }
    } else {
        let instance_name = d
            .id
            .as_deref()
            .or(d.reference.as_deref())
            .unwrap_or(&d.name)
            .to_owned();
        resolve_dotted(&instance_name, false)
    };

    let opens_scope = d.is_anonymous || d.id.is_some();
    let children: Vec<TypeId> = d
        .properties
        .iter()
        .map(|(_, child)| *child)
        .chain(d.element_type)
        .chain(match &d.declared {
            Some(DeclaredType::Union(alternatives)) => alternatives.clone(),
            _ => Vec::new(),
        })
        .collect();

    debug!(path = %d.path, namespace = %resolved.namespace, name = %resolved.name, "named type");
    resolver.get_mut(type_id).resolved = Some(resolved.clone());

    if opens_scope {
        let mut chain = enclosing.to_vec();
        chain.push(resolved.name.clone());
        let mut own: HashSet<String> = chain.iter().cloned().collect();
        for child in children {
            name_in_scope(resolver, child, &resolved.namespace, &chain, &mut own)?;
        }
    } else {
        for child in children {
            name_in_scope(resolver, child, namespace, enclosing, taken)?;
        }
    }
    Ok(())
}

/// Names every type reachable from the named definitions and groups the named
/// ones into the emission table.
pub fn assign_names(resolver: &mut SchemaResolver) -> GenResult<EmissionTable> {
    let globals: Vec<TypeId> = resolver.globals().collect();

    for type_id in &globals {
        let mut taken = HashSet::new();
        name_in_scope(resolver, *type_id, GLOBAL_NAMESPACE, &[], &mut taken)?;
    }

    let mut table = EmissionTable::default();
    for type_id in globals {
        let d = resolver.get(type_id);
        let resolved = d
            .resolved
            .clone()
            .ok_or_else(|| GenError::naming(d.display_name(), "type was not named"))?;
        let bucket = table.namespaces.entry(resolved.namespace.clone()).or_default();
        if let Some(existing) = bucket.get(&resolved.name) {
            return Err(GenError::naming(
                d.display_name(),
                format!(
                    "resolves to {}.{} which is already used by {}",
                    resolved.namespace,
                    resolved.name,
                    resolver.get(*existing).display_name()
                ),
            ));
        }
        bucket.insert(resolved.name, type_id);
    }

    info!(
        namespaces = table.namespaces.len(),
        types = table.len(),
        "assigned type names"
    );
    Ok(table)
}

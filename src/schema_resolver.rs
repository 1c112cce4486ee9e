use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::errors::{GenError, GenResult};
use crate::parser::schema_node::Primitive;
use crate::parser::type_descriptor::{DeclaredType, TypeDescriptor, TypeId};

/// A schema construct the target model cannot express, kept instead of
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub path: String,
    pub kept: String,
    pub dropped: Vec<String>,
}

/// Resolution context for one run: owns every descriptor and indexes the
/// named ones by id.
#[derive(Debug, Default)]
pub struct SchemaResolver {
    types: Vec<TypeDescriptor>,
    globals: HashMap<String, TypeId>,
    global_order: Vec<TypeId>,
    notices: Vec<Degradation>,
}

impl SchemaResolver {
    pub fn new() -> SchemaResolver {
        SchemaResolver::default()
    }

    pub fn alloc(&mut self, descriptor: TypeDescriptor) -> TypeId {
        self.types.push(descriptor);
        TypeId(self.types.len() - 1)
    }

    pub fn register_global(&mut self, id: &str, type_id: TypeId) -> GenResult<()> {
        if let Some(existing) = self.globals.get(id) {
            return Err(GenError::naming(
                id,
                format!(
                    "duplicate id, already registered by {}",
                    self.get(*existing).path
                ),
            ));
        }
        self.globals.insert(id.to_owned(), type_id);
        self.global_order.push(type_id);
        Ok(())
    }

    pub fn get(&self, type_id: TypeId) -> &TypeDescriptor {
        &self.types[type_id.0]
    }

    pub fn get_mut(&mut self, type_id: TypeId) -> &mut TypeDescriptor {
        &mut self.types[type_id.0]
    }

    pub fn lookup(&self, id: &str) -> Option<TypeId> {
        self.globals.get(id).copied()
    }

    /// Named types in registration order.
    pub fn globals(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.global_order.iter().copied()
    }

    pub fn all_ids(&self) -> impl Iterator<Item = TypeId> {
        (0..self.types.len()).map(TypeId)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn record_degradation(&mut self, notice: Degradation) {
        warn!(
            path = %notice.path,
            kept = %notice.kept,
            dropped = ?notice.dropped,
            "multiple inheritance is not supported, keeping the first parent"
        );
        self.notices.push(notice);
    }

    pub fn notices(&self) -> &[Degradation] {
        &self.notices
    }

    pub fn resolve_to_type(&self, id: &str, from: TypeId) -> GenResult<TypeId> {
        self.lookup(id).ok_or_else(|| {
            let d = self.get(from);
            GenError::reference(&d.path, format!("cannot find referenced type \"{}\"", id), &d.raw)
        })
    }

    /// Follows `$ref` links to the descriptor that actually defines the type.
    pub fn instance(&self, type_id: TypeId) -> GenResult<TypeId> {
        let mut current = type_id;
        let mut seen = HashSet::new();
        while let Some(reference) = &self.get(current).reference {
            if !seen.insert(current) {
                return Err(self.cycle_error(type_id));
            }
            current = self.resolve_to_type(reference, current)?;
        }
        Ok(current)
    }

    /// The descriptor's own declared type, or the one inherited through its
    /// parent or reference.
    pub fn effective_type(&self, type_id: TypeId) -> GenResult<&DeclaredType> {
        let mut current = type_id;
        let mut seen = HashSet::new();
        loop {
            let d = self.get(current);
            if let Some(declared) = &d.declared {
                return Ok(declared);
            }
            if !seen.insert(current) {
                return Err(self.cycle_error(type_id));
            }
            let next = match (&d.parent, &d.reference) {
                (Some(parent), _) => parent,
                (None, Some(reference)) => reference,
                (None, None) => {
                    return Err(GenError::schema(
                        &d.path,
                        "cannot find type without \"type\" set, no reference and no parent",
                        &d.raw,
                    ))
                }
            };
            current = self.resolve_to_type(next, current)?;
        }
    }

    /// Element type of an array, inherited through parent or reference.
    pub fn array_type(&self, type_id: TypeId) -> GenResult<Option<TypeId>> {
        let mut current = type_id;
        let mut seen = HashSet::new();
        loop {
            let d = self.get(current);
            if let Some(element) = d.element_type {
                return Ok(Some(element));
            }
            if !seen.insert(current) {
                return Err(self.cycle_error(type_id));
            }
            let next = match (&d.parent, &d.reference) {
                (Some(parent), _) => parent,
                (None, Some(reference)) => reference,
                (None, None) => return Ok(None),
            };
            current = self.resolve_to_type(next, current)?;
        }
    }

    pub fn parent_of(&self, type_id: TypeId) -> GenResult<Option<TypeId>> {
        self.get(type_id)
            .parent
            .as_deref()
            .map(|parent| self.resolve_to_type(parent, type_id))
            .transpose()
    }

    pub fn is_array(&self, type_id: TypeId) -> GenResult<bool> {
        Ok(self.array_type(type_id)?.is_some())
    }

    /// Primitive-valued types never get a class of their own.
    pub fn is_native(&self, type_id: TypeId) -> GenResult<bool> {
        Ok(matches!(self.effective_type(type_id)?, DeclaredType::Primitive(_)))
    }

    pub fn primitive_of(&self, type_id: TypeId) -> GenResult<Option<Primitive>> {
        match self.effective_type(type_id)? {
            DeclaredType::Primitive(p) => Ok(Some(*p)),
            _ => Ok(None),
        }
    }

    /// A union whose alternatives all declare `object`.
    pub fn is_multi_object(&self, type_id: TypeId) -> GenResult<bool> {
        match self.effective_type(type_id)? {
            DeclaredType::Union(alternatives) => Ok(!alternatives.is_empty()
                && alternatives
                    .iter()
                    .all(|alt| self.get(*alt).declared == Some(DeclaredType::Object))),
            _ => Ok(false),
        }
    }

    /// Anonymous classes nested in this type's class: its own inner classes
    /// plus those of named-by-position children (arrays, references).
    pub fn nested_classes(&self, type_id: TypeId) -> Vec<TypeId> {
        let d = self.get(type_id);
        let mut nested = d.inner_classes.clone();
        for child in d.properties.iter().map(|(_, child)| *child).chain(d.element_type) {
            if !self.get(child).is_anonymous {
                nested.extend(self.nested_classes(child));
            }
        }
        nested
    }

    fn cycle_error(&self, type_id: TypeId) -> GenError {
        let d = self.get(type_id);
        GenError::reference(&d.path, "reference/extends chain loops back on itself", &d.raw)
    }

    /// Logs the resolved tree of every named type.
    pub fn dump(&self) -> GenResult<()> {
        for type_id in self.globals() {
            self.dump_one(type_id, 0)?;
        }
        Ok(())
    }

    fn dump_one(&self, type_id: TypeId, depth: usize) -> GenResult<()> {
        let d = self.get(type_id);
        let mut line = String::new();
        if d.is_anonymous {
            line.push_str("-> ");
        }
        line.push_str(&d.name);
        if let Some(resolved) = &d.resolved {
            line.push_str(&format!(" ({}.{})", resolved.namespace, resolved.name));
        }
        if let Some(element) = d.element_type {
            line.push_str(&format!(" [ARRAY {}]", self.effective_type(element)?.describe()));
        }
        line.push_str(&format!(" [TYPE {}]", self.effective_type(type_id)?.describe()));
        if !d.inner_classes.is_empty() {
            let inner = d.inner_classes.iter().map(|c| self.get(*c).name.as_str()).join(" ");
            line.push_str(&format!(" [INNER: {}]", inner));
        }
        debug!("{}{}", "    ".repeat(depth), line);

        for (_, prop) in &d.properties {
            self.dump_one(*prop, depth + 1)?;
        }
        if let Some(element) = d.element_type {
            self.dump_one(element, depth + 1)?;
        }
        Ok(())
    }
}

//! Third pass: every descriptor must have a resolvable type before emission.

use tracing::{debug, info};

use crate::errors::{GenError, GenResult, MultipleErrors};
use crate::parser::type_descriptor::{DeclaredType, TypeId};
use crate::schema_resolver::SchemaResolver;

/// Checks every descriptor and reports all failures together.
pub fn check_consistency(resolver: &SchemaResolver) -> GenResult<()> {
    let errors: Vec<GenError> = resolver
        .all_ids()
        .filter_map(|type_id| check_descriptor(resolver, type_id).err())
        .collect();

    info!(checked = resolver.len(), failures = errors.len(), "consistency checks done");
    MultipleErrors::into_result(errors)
}

fn check_descriptor(resolver: &SchemaResolver, type_id: TypeId) -> GenResult<()> {
    let d = resolver.get(type_id);
    debug!(path = %d.path, "checking type");

    if let (Some(reference), Some(parent)) = (&d.reference, &d.parent) {
        return Err(GenError::reference(
            &d.path,
            format!("both $ref \"{}\" and extends \"{}\" given", reference, parent),
            &d.raw,
        ));
    }
    if let Some(reference) = &d.reference {
        resolver.resolve_to_type(reference, type_id)?;
        resolver.instance(type_id)?;
    }
    if d.parent.is_some() {
        resolver.parent_of(type_id)?;
    }
    for dropped in &d.dropped_parents {
        resolver.resolve_to_type(dropped, type_id)?;
    }

    if d.declared.is_none() && d.reference.is_none() && d.parent.is_none() {
        return Err(GenError::schema(
            &d.path,
            "cannot find type without \"type\" set, no reference and no parent",
            &d.raw,
        ));
    }

    let effective = resolver.effective_type(type_id)?;
    let element = resolver.array_type(type_id)?;
    match (effective, element) {
        (DeclaredType::Array, None) => Err(GenError::schema(&d.path, "array type without items", &d.raw)),
        (DeclaredType::Array, Some(_)) | (_, None) => Ok(()),
        (other, Some(_)) => Err(GenError::schema(
            &d.path,
            format!("items given for a {} type", other.describe()),
            &d.raw,
        )),
    }
}

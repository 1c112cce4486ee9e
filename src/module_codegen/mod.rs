use std::collections::HashSet;
use std::fmt::Write;

use regex::Regex;

use crate::errors::{GenError, GenResult};
use crate::naming::EmissionTable;
use crate::parser::method::MethodRegistry;
use crate::schema_resolver::SchemaResolver;
use import_tracker::ImportTracker;

pub mod call_gen;
pub mod field_mapping;
pub mod import_tracker;
pub mod type_gen;

pub const DEFAULT_HEADER: &str = "// Auto Generated file, do not modify\n";

#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub package: String,
    /// Package holding `AbstractModel` and `AbstractCall`.
    pub base_package: String,
    pub header: String,
    pub ignored_types: Option<Regex>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            package: "org.xbmc.android.jsonrpc.api.model".to_owned(),
            base_package: "org.xbmc.android.jsonrpc.api".to_owned(),
            header: DEFAULT_HEADER.to_owned(),
            ignored_types: None,
        }
    }
}

/// One generated file: a unit name and its full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputUnit {
    pub name: String,
    pub content: String,
}

/// Outer class holding every type of `namespace`.
pub fn model_class(namespace: &str) -> String {
    format!("{}Model", namespace)
}

/// Header, package, imports and the outer class wrapped around `body`.
pub(crate) fn render_unit(
    options: &EmitOptions,
    imports: &mut ImportTracker,
    class_name: &str,
    body: &str,
) -> GenResult<String> {
    let mut content = String::with_capacity(body.len() + 1024);
    content.push_str(&options.header);
    if !options.header.is_empty() && !options.header.ends_with('\n') {
        content.push('\n');
    }
    write!(content, "package {};\n\n", options.package)?;
    imports.write_imports(&mut content, &options.base_package)?;
    write!(content, "\npublic final class {} {{\n", class_name)?;
    content.push_str(body);
    content.push_str("}\n");
    Ok(content)
}

/// Type units first, then one call unit per method namespace.
pub fn emit(
    resolver: &SchemaResolver,
    table: &EmissionTable,
    methods: &MethodRegistry,
    options: &EmitOptions,
) -> GenResult<Vec<OutputUnit>> {
    let mut units = type_gen::create_type_units(resolver, table, options)?;
    units.extend(call_gen::create_call_units(resolver, methods, options)?);

    let mut seen = HashSet::new();
    for unit in &units {
        if !seen.insert(unit.name.as_str()) {
            return Err(GenError::naming(&unit.name, "two output units share this name"));
        }
    }
    Ok(units)
}

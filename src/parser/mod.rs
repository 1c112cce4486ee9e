use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::consistency::check_consistency;
use crate::errors::GenResult;
use crate::introspect::Introspect;
use crate::naming::{assign_names, EmissionTable};
use crate::schema_resolver::SchemaResolver;
use method::{finish_method, name_method_types, register_method, resolve_method, MethodOptions, MethodRegistry};
use schema_node::SchemaNode;

pub mod method;
pub mod schema_node;
pub mod type_descriptor;
pub mod type_resolver;

/// Runs the resolution passes over one introspection document.
pub struct IntrospectParser {
    pub resolver: SchemaResolver,
    pub table: EmissionTable,
    pub methods: MethodRegistry,
    options: MethodOptions,
}

impl IntrospectParser {
    pub fn new(options: MethodOptions) -> Self {
        Self {
            resolver: SchemaResolver::new(),
            table: EmissionTable::default(),
            methods: MethodRegistry::new(),
            options,
        }
    }

    /// Reads every type (and method, unless `skip_methods`), names them,
    /// checks them and expands constructor signatures.
    pub fn parse_introspect(&mut self, introspect: &Introspect, skip_methods: bool) -> GenResult<()> {
        self.read_types(&introspect.types)?;

        let mut methods = Vec::new();
        if !skip_methods {
            for (name, raw) in &introspect.methods {
                methods.push(resolve_method(&mut self.resolver, name, raw, &self.options)?);
            }
        }
        info!(types = self.resolver.globals().count(), methods = methods.len(), "read pass done");

        self.table = assign_names(&mut self.resolver)?;
        for method in &methods {
            name_method_types(&mut self.resolver, method)?;
        }

        check_consistency(&self.resolver)?;

        for mut method in methods {
            finish_method(&self.resolver, &mut method)?;
            register_method(&mut self.methods, method)?;
        }
        Ok(())
    }

    fn read_types(&mut self, types: &Map<String, Value>) -> GenResult<()> {
        for (name, raw) in types {
            let node = SchemaNode::from_json(raw, name)?;
            let id = node.id.clone().unwrap_or_else(|| name.clone());
            if id != *name {
                warn!(key = %name, id = %id, "type key differs from its id, registering under the id");
            }
            let type_id = type_resolver::from_global_definition(&mut self.resolver, &id, &node)?;
            self.resolver.register_global(&id, type_id)?;
        }
        Ok(())
    }
}

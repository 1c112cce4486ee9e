pub mod combinator;
pub mod consistency;
pub mod errors;
pub mod formatter;
pub mod introspect;
pub mod module_codegen;
pub mod naming;
pub mod parser;
pub mod run_emit;
pub mod schema_resolver;
pub mod settings;
pub mod string_tools;

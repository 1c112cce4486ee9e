use std::fmt::Write;

use regex::Regex;
use tracing::{debug, info};

use crate::errors::{GenError, GenResult};
use crate::formatter::Formatter;
use crate::module_codegen::field_mapping::{
    class_reference, constant_name, field_shape, java_identifier, java_type, list_creator_name, null_value,
    parse_expr, serialize_stmt, FieldShape,
};
use crate::module_codegen::import_tracker::{Import, ImportTracker};
use crate::module_codegen::{model_class, render_unit, EmitOptions, OutputUnit};
use crate::naming::EmissionTable;
use crate::parser::type_descriptor::{DeclaredType, TypeId, TypeKind};
use crate::schema_resolver::SchemaResolver;

pub(crate) const GENERATED_NOTE: &str = " * <i>This class was generated automatically from the JSON-RPC introspection.</i>";

/// Builds the alternation used to skip known-empty or native-alias types.
pub fn ignore_regex(patterns: &[String]) -> Result<Option<Regex>, regex::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = String::new();
    for pattern in patterns {
        if !builder.is_empty() {
            builder.push('|');
        }
        builder.push('(');
        builder.push_str(pattern);
        builder.push(')');
    }

    Regex::new(&format!("^(?:{})$", builder)).map(Some)
}

/// A property as it appears in the generated class.
struct Field {
    key: String,
    ident: String,
    shape: FieldShape,
    required: bool,
    java_type: String,
}

impl Field {
    fn key_literal(&self) -> String {
        format!("\"{}\"", self.key)
    }
}

fn fields_of(resolver: &SchemaResolver, type_id: TypeId, imports: &mut ImportTracker) -> GenResult<Vec<Field>> {
    let d = resolver.get(type_id);
    let mut fields = Vec::with_capacity(d.properties.len());
    for (key, prop) in &d.properties {
        let required = resolver.get(*prop).required;
        let shape = field_shape(resolver, *prop)?;
        if shape.is_array() {
            imports.track(Import::ArrayList);
        }
        fields.push(Field {
            key: key.clone(),
            ident: java_identifier(key),
            java_type: java_type(&shape, required),
            shape,
            required,
        });
    }
    Ok(fields)
}

/// One `{namespace}Model` unit per namespace with at least one compiled type.
pub fn create_type_units(
    resolver: &SchemaResolver,
    table: &EmissionTable,
    options: &EmitOptions,
) -> GenResult<Vec<OutputUnit>> {
    let mut results = Vec::with_capacity(table.namespaces.len());

    for (namespace, types) in &table.namespaces {
        let mut imports = ImportTracker::new();
        let mut body = Formatter::new(1);

        for (name, type_id) in types {
            let d = resolver.get(*type_id);
            if let Some(ignored) = &options.ignored_types {
                if ignored.is_match(&d.name) {
                    debug!(type_name = %d.name, "type is on the ignore list");
                    continue;
                }
            }
            debug!(namespace = %namespace, name = %name, "compiling type");
            compile(resolver, *type_id, &mut body, &mut imports, false)?;
        }

        if body.is_empty() {
            debug!(namespace = %namespace, "nothing to compile");
            continue;
        }

        let class_name = model_class(namespace);
        let content = render_unit(options, &mut imports, &class_name, &body.finish())?;
        info!(unit = %class_name, types = types.len(), "compiled type unit");
        results.push(OutputUnit {
            name: class_name,
            content,
        });
    }

    Ok(results)
}

/// Compiles one descriptor into the current unit. Native values, union aliases
/// and pure references produce nothing.
pub fn compile(
    resolver: &SchemaResolver,
    type_id: TypeId,
    f: &mut Formatter,
    imports: &mut ImportTracker,
    inner: bool,
) -> GenResult<()> {
    let d = resolver.get(type_id);

    match d.kind() {
        TypeKind::Enum => return compile_enum(resolver, type_id, f),
        TypeKind::Reference => {
            debug!(path = %d.path, "not compiling reference alias");
            return Ok(());
        }
        _ => {}
    }
    if resolver.is_native(type_id)? {
        debug!(path = %d.path, "not compiling native type");
        return Ok(());
    }
    if matches!(resolver.effective_type(type_id)?, DeclaredType::Union(_)) && !resolver.is_multi_object(type_id)? {
        debug!(path = %d.path, "not compiling collapsed union");
        return Ok(());
    }

    if d.properties.is_empty() && !d.is_anonymous && d.parent.is_none() {
        return match d.element_type {
            Some(element) => {
                debug!(path = %d.path, "compiling item type instead of the array");
                compile(resolver, element, f, imports, inner)
            }
            None => Err(GenError::unsupported(
                &d.path,
                "cannot compile a type with no item type, no enum and no properties",
            )),
        };
    }

    compile_class(resolver, type_id, f, imports, inner)
}

fn compile_enum(resolver: &SchemaResolver, type_id: TypeId, f: &mut Formatter) -> GenResult<()> {
    let d = resolver.get(type_id);
    let name = d.resolved.as_ref().map_or(d.name.as_str(), |r| r.name.as_str());

    f.open(&format!("public interface {} {{", name));
    for value in &d.enum_values {
        f.line(&format!("public final String {} = \"{}\";", constant_name(value), value));
    }
    f.close("}");
    f.line("");
    Ok(())
}

fn compile_class(
    resolver: &SchemaResolver,
    type_id: TypeId,
    f: &mut Formatter,
    imports: &mut ImportTracker,
    inner: bool,
) -> GenResult<()> {
    imports.track(Import::JSONArray);
    imports.track(Import::JSONObject);
    imports.track(Import::JSONException);

    let d = resolver.get(type_id);
    let class_name = d
        .resolved
        .as_ref()
        .map(|r| r.name.clone())
        .ok_or_else(|| GenError::naming(d.display_name(), "type was not named"))?;
    let parent = resolver.parent_of(type_id)?;
    let fields = fields_of(resolver, type_id, imports)?;

    f.line("/**");
    if let Some(id) = &d.id {
        f.line(&format!(" * {}", id));
        f.line(" * <p/>");
    }
    if let Some(description) = &d.description {
        f.line(&format!(" * {}", description));
        f.line(" * <p/>");
    }
    f.line(GENERATED_NOTE);
    f.line(" */");

    let extends = match parent {
        Some(parent) => Some(class_reference(resolver, parent)?),
        None if inner => None,
        None => {
            imports.track(Import::AbstractModel);
            Some("AbstractModel".to_owned())
        }
    };
    match &extends {
        Some(parent) => f.open(&format!("public static class {} extends {} {{", class_name, parent)),
        None => f.open(&format!("public static class {} {{", class_name)),
    }

    if !inner {
        f.line(&format!("public final static String TYPE = \"{}\";", d.name));
    }
    for field in &fields {
        f.line(&format!("public final {} {};", field.java_type, field.ident));
    }

    f.open(&format!("public {}(JSONObject obj) throws JSONException {{", class_name));
    if parent.is_some() {
        f.line("super(obj);");
    }
    if !inner {
        f.line("mType = TYPE;");
    }
    for field in &fields {
        let value = parse_expr(&field.shape, field.required, "obj", &field.key_literal());
        f.line(&format!("{} = {};", field.ident, value));
    }
    f.close("}");

    if parent.is_none() {
        let args = fields
            .iter()
            .map(|field| format!("{} {}", field.java_type, field.ident))
            .collect::<Vec<_>>()
            .join(", ");
        f.open(&format!("public {}({}) {{", class_name, args));
        for field in &fields {
            f.line(&format!("this.{} = {};", field.ident, field.ident));
        }
        f.close("}");
    }

    for narrowing in &d.narrowings {
        compile_narrowing(resolver, &class_name, &fields, *narrowing, f)?;
    }

    f.open("public JSONObject toJSONObject() throws JSONException {");
    if parent.is_some() {
        f.line("final JSONObject obj = super.toJSONObject();");
    } else {
        f.line("final JSONObject obj = new JSONObject();");
    }
    for field in &fields {
        f.line(&serialize_stmt(&field.shape, field.required, &field.key_literal(), &field.ident));
    }
    f.line("return obj;");
    f.close("}");

    write_list_creator(resolver, type_id, f, imports)?;

    for nested in resolver.nested_classes(type_id) {
        compile(resolver, nested, f, imports, true)?;
    }

    f.close("}");
    f.line("");
    Ok(())
}

/// Nested subclass exposing a constructor with only one alternative's fields.
fn compile_narrowing(
    resolver: &SchemaResolver,
    union_class: &str,
    union_fields: &[Field],
    narrowing: TypeId,
    f: &mut Formatter,
) -> GenResult<()> {
    let d = resolver.get(narrowing);
    let name = d
        .resolved
        .as_ref()
        .map(|r| r.name.clone())
        .ok_or_else(|| GenError::naming(&d.path, "union alternative was not named"))?;

    let local: Vec<&Field> = union_fields
        .iter()
        .filter(|field| d.property(&field.key).is_some())
        .collect();
    let args = local
        .iter()
        .map(|field| format!("{} {}", field.java_type, field.ident))
        .collect::<Vec<_>>()
        .join(", ");
    let super_args = union_fields
        .iter()
        .map(|field| {
            if d.property(&field.key).is_some() {
                field.ident.clone()
            } else {
                null_value(&field.java_type).to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    f.open(&format!("public static class {} extends {} {{", name, union_class));
    f.open(&format!("public {}({}) {{", name, args));
    f.line(&format!("super({});", super_args));
    f.close("}");
    f.close("}");
    Ok(())
}

fn write_list_creator(
    resolver: &SchemaResolver,
    type_id: TypeId,
    f: &mut Formatter,
    imports: &mut ImportTracker,
) -> GenResult<()> {
    imports.track(Import::ArrayList);
    let t = class_reference(resolver, type_id)?;

    let mut signature = String::new();
    write!(
        signature,
        "public static ArrayList<{}> {}(JSONObject obj, String key) throws JSONException {{",
        t,
        list_creator_name(&t)
    )?;
    f.open(&signature);
    f.open("if (obj.has(key)) {");
    f.line("final JSONArray a = obj.getJSONArray(key);");
    f.line(&format!("final ArrayList<{t}> l = new ArrayList<{t}>(a.length());", t = t));
    f.open("for (int i = 0; i < a.length(); i++) {");
    f.line(&format!("l.add(new {}(a.getJSONObject(i)));", t));
    f.close("}");
    f.line("return l;");
    f.close("}");
    f.line(&format!("return new ArrayList<{}>(0);", t));
    f.close("}");
    Ok(())
}

use std::collections::HashSet;

use tracing::{debug, info};

use crate::combinator::ConstructorSignature;
use crate::errors::{GenError, GenResult};
use crate::formatter::Formatter;
use crate::module_codegen::field_mapping::{
    boxed_type, field_shape, java_identifier, java_type, parse_expr, FieldShape, Scalar,
};
use crate::module_codegen::import_tracker::{Import, ImportTracker};
use crate::module_codegen::type_gen::{compile, GENERATED_NOTE};
use crate::module_codegen::{render_unit, EmitOptions, OutputUnit};
use crate::parser::method::{MethodDescriptor, MethodRegistry, ParameterDescriptor, ReturnShape};
use crate::parser::type_descriptor::TypeId;
use crate::schema_resolver::SchemaResolver;
use crate::string_tools::pascal_case;

/// Key of the JSON-RPC response member holding the payload.
const RESPONSE_RESULT: &str = "result";

/// How a call class turns the response into its result type. Without a
/// shape the raw result object is handed back.
struct ResultMapping {
    java_type: String,
    shape: Option<FieldShape>,
    returns_list: bool,
}

impl ResultMapping {
    fn of(resolver: &SchemaResolver, method: &MethodDescriptor) -> GenResult<Self> {
        let shape = match method.return_shape {
            ReturnShape::Undefined => {
                return Ok(ResultMapping {
                    java_type: "JSONObject".to_owned(),
                    shape: None,
                    returns_list: false,
                })
            }
            ReturnShape::Single(type_id) => field_shape(resolver, type_id)?,
            ReturnShape::Primitive(primitive) => FieldShape::Scalar {
                scalar: Scalar::Primitive(primitive),
                nullable: false,
            },
            ReturnShape::List(element) => match field_shape(resolver, element)? {
                FieldShape::Scalar { scalar, .. } => FieldShape::Array(scalar),
                FieldShape::Array(_) => {
                    return Err(GenError::unsupported(&method.full_name, "methods returning nested lists"))
                }
            },
        };
        let java_type = match &shape {
            FieldShape::Scalar { scalar, .. } | FieldShape::Array(scalar) => boxed_type(scalar),
        };
        Ok(ResultMapping {
            java_type,
            returns_list: shape.is_array(),
            shape: Some(shape),
        })
    }

    fn parse(&self, source: &str) -> String {
        match &self.shape {
            Some(shape) => parse_expr(shape, true, source, "RESULT"),
            None => format!("{}.getJSONObject(RESULT)", source),
        }
    }
}

/// One unit per method namespace, one call class per method.
pub fn create_call_units(
    resolver: &SchemaResolver,
    methods: &MethodRegistry,
    options: &EmitOptions,
) -> GenResult<Vec<OutputUnit>> {
    let mut results = Vec::with_capacity(methods.len());

    for (namespace, calls) in methods {
        let mut imports = ImportTracker::new();
        let mut body = Formatter::new(1);

        for method in calls.values() {
            compile_call(resolver, method, &mut body, &mut imports)?;
        }

        let content = render_unit(options, &mut imports, namespace, &body.finish())?;
        info!(unit = %namespace, calls = calls.len(), "compiled call unit");
        results.push(OutputUnit {
            name: namespace.clone(),
            content,
        });
    }

    Ok(results)
}

fn parameter<'a>(method: &'a MethodDescriptor, name: &str) -> Option<&'a ParameterDescriptor> {
    method.parameters.iter().find(|p| p.name == name)
}

fn argument_type(resolver: &SchemaResolver, type_id: TypeId, required: bool, trailing_array: bool) -> GenResult<String> {
    let shape = field_shape(resolver, type_id)?;
    match shape {
        FieldShape::Array(scalar) if trailing_array => Ok(format!("{}...", boxed_type(&scalar))),
        shape => Ok(java_type(&shape, required)),
    }
}

fn compile_call(
    resolver: &SchemaResolver,
    method: &MethodDescriptor,
    f: &mut Formatter,
    imports: &mut ImportTracker,
) -> GenResult<()> {
    imports.track(Import::AbstractCall);
    imports.track(Import::JSONObject);
    imports.track(Import::JSONException);

    let name = &method.local_name;
    let result = ResultMapping::of(resolver, method)?;
    if result.returns_list {
        imports.track(Import::ArrayList);
    }
    debug!(method = %method.full_name, result = %result.java_type, "compiling call");

    f.line("/**");
    if let Some(description) = &method.description {
        f.line(&format!(" * {}", description));
        f.line(" * <p/>");
    }
    f.line(GENERATED_NOTE);
    f.line(" */");
    f.open(&format!("public static class {} extends AbstractCall<{}> {{", name, result.java_type));
    f.line(&format!("public final static String API_TYPE = \"{}\";", method.full_name));
    let result_key = method.return_attribute_key.as_deref().unwrap_or(RESPONSE_RESULT);
    f.line(&format!("public final static String RESULT = \"{}\";", result_key));

    let mut rendered = HashSet::new();
    for signature in &method.constructor_signatures {
        compile_constructor(resolver, method, signature, &mut rendered, f)?;
    }

    for list_parameter in &method.list_parameters {
        let Some(type_id) = list_parameter.type_alternatives.first() else {
            continue;
        };
        let ident = java_identifier(&list_parameter.name);
        let arg_type = argument_type(resolver, *type_id, false, true)?;
        f.open(&format!(
            "public {} set{}({} {}) {{",
            name,
            pascal_case(&list_parameter.name),
            arg_type,
            ident
        ));
        f.line(&format!("addParameter(\"{}\", {});", list_parameter.name, ident));
        f.line("return this;");
        f.close("}");
    }

    f.line("@Override");
    if result.returns_list {
        f.open(&format!(
            "protected ArrayList<{}> parseMany(JSONObject obj) throws JSONException {{",
            result.java_type
        ));
    } else {
        f.open(&format!("protected {} parseOne(JSONObject obj) throws JSONException {{", result.java_type));
    }
    if method.return_attribute_key.is_some() {
        f.line(&format!("final JSONObject result = obj.getJSONObject(\"{}\");", RESPONSE_RESULT));
        f.line(&format!("return {};", result.parse("result")));
    } else {
        f.line(&format!("return {};", result.parse("obj")));
    }
    f.close("}");

    f.line("@Override");
    f.open("public String getName() {");
    f.line("return API_TYPE;");
    f.close("}");
    f.line("@Override");
    f.open("protected boolean returnsList() {");
    f.line(&format!("return {};", result.returns_list));
    f.close("}");

    for inner in &method.inner_classes {
        compile(resolver, *inner, f, imports, true)?;
    }

    f.close("}");
    f.line("");
    Ok(())
}

fn compile_constructor(
    resolver: &SchemaResolver,
    method: &MethodDescriptor,
    signature: &ConstructorSignature,
    rendered: &mut HashSet<String>,
    f: &mut Formatter,
) -> GenResult<()> {
    let mut args = Vec::with_capacity(signature.args.len());
    let mut types = Vec::with_capacity(signature.args.len());
    let varargs = signature.trailing_array();
    for arg in &signature.args {
        let required = parameter(method, &arg.name).map_or(false, |p| p.required);
        let arg_type = argument_type(resolver, arg.type_id, required, varargs == Some(arg))?;
        args.push(format!("{} {}", arg_type, java_identifier(&arg.name)));
        types.push(arg_type);
    }

    // Alternatives that collapse to the same Java types give the same constructor.
    if !rendered.insert(types.join(",")) {
        debug!(method = %method.full_name, "skipping duplicate constructor");
        return Ok(());
    }

    let documented: Vec<(&str, &str)> = signature
        .args
        .iter()
        .filter_map(|arg| {
            parameter(method, &arg.name)
                .and_then(|p| p.description.as_deref())
                .map(|description| (arg.name.as_str(), description))
        })
        .collect();
    if !documented.is_empty() {
        f.line("/**");
        for (name, description) in documented {
            f.line(&format!(" * @param {} {}", java_identifier(name), description));
        }
        f.line(" */");
    }

    f.open(&format!("public {}({}) {{", method.local_name, args.join(", ")));
    f.line("super();");
    for arg in &signature.args {
        f.line(&format!("addParameter(\"{}\", {});", arg.name, java_identifier(&arg.name)));
    }
    f.close("}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::method::MethodOptions;
    use crate::parser::IntrospectParser;
    use crate::introspect::Introspect;
    use serde_json::{json, Value};

    fn generate(document: Value) -> Vec<OutputUnit> {
        let introspect: Introspect = serde_json::from_value(document).unwrap();
        let mut parser = IntrospectParser::new(MethodOptions::default());
        parser.parse_introspect(&introspect, false).unwrap();
        create_call_units(&parser.resolver, &parser.methods, &EmitOptions::default()).unwrap()
    }

    fn types() -> Value {
        json!({
            "Library.Id": { "id": "Library.Id", "type": "integer" },
            "List.Limits": { "id": "List.Limits", "type": "object", "properties": { "start": { "type": "integer" } } },
            "List.LimitsReturned": { "id": "List.LimitsReturned", "type": "object", "properties": { "total": { "type": "integer", "required": true } } },
            "Audio.Details.Album": { "id": "Audio.Details.Album", "type": "object", "properties": { "title": { "type": "string" } } },
            "Audio.Fields.Album": { "id": "Audio.Fields.Album", "type": "array", "items": { "type": "string" } }
        })
    }

    #[test]
    fn list_call_with_setters_and_varargs() {
        let units = generate(json!({
            "types": types(),
            "methods": {
                "AudioLibrary.GetAlbums": {
                    "description": "Retrieve all albums",
                    "params": [
                        { "name": "artistid", "type": [ { "type": "null" }, { "$ref": "Library.Id" } ], "description": "Artist to filter on" },
                        { "name": "properties", "$ref": "Audio.Fields.Album" },
                        { "name": "limits", "$ref": "List.Limits" }
                    ],
                    "returns": {
                        "type": "object",
                        "properties": {
                            "limits": { "$ref": "List.LimitsReturned", "required": true },
                            "albums": { "type": "array", "items": { "$ref": "Audio.Details.Album" } }
                        }
                    }
                }
            }
        }));

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "AudioLibrary");
        let source = &units[0].content;
        assert!(source.contains("public static class GetAlbums extends AbstractCall<AudioModel.AlbumDetails> {"));
        assert!(source.contains("public final static String API_TYPE = \"AudioLibrary.GetAlbums\";"));
        assert!(source.contains("public final static String RESULT = \"albums\";"));
        assert!(source.contains("public GetAlbums(Integer artistid, String... properties) {"));
        assert!(source.contains("@param artistid Artist to filter on"));
        assert!(source.contains("public GetAlbums setLimits(ListModel.Limits limits) {"));
        assert!(source.contains("protected ArrayList<AudioModel.AlbumDetails> parseMany(JSONObject obj) throws JSONException {"));
        assert!(source.contains("return AudioModel.AlbumDetails.getAudioModelAlbumDetailsList(result, RESULT);"));
        assert!(source.contains("return true;"));
        assert!(source.contains("import org.xbmc.android.jsonrpc.api.AbstractCall;"));
    }

    #[test]
    fn wrapper_results_are_inner_classes() {
        let units = generate(json!({
            "types": types(),
            "methods": {
                "Player.GetItem": {
                    "params": [ { "name": "playerid", "type": "integer", "required": true } ],
                    "returns": {
                        "type": "object",
                        "properties": {
                            "item": { "$ref": "Audio.Details.Album", "required": true },
                            "position": { "type": "integer", "required": true }
                        }
                    }
                }
            }
        }));

        let source = &units[0].content;
        assert!(source.contains("public static class GetItem extends AbstractCall<ItemPosition> {"));
        assert!(source.contains("public GetItem(int playerid) {"));
        assert!(source.contains("return new ItemPosition(obj.getJSONObject(RESULT));"));
        assert!(source.contains("public static class ItemPosition {"));
        assert!(source.contains("public final static String RESULT = \"result\";"));
    }

    #[test]
    fn primitive_and_undefined_results() {
        let units = generate(json!({
            "types": types(),
            "methods": {
                "JSONRPC.Ping": { "returns": { "type": "string" } },
                "JSONRPC.Introspect": { "returns": { "type": "object" } }
            }
        }));

        let source = &units[0].content;
        assert!(source.contains("public static class Ping extends AbstractCall<String> {"));
        assert!(source.contains("return obj.getString(RESULT);"));
        assert!(source.contains("public static class Introspect extends AbstractCall<JSONObject> {"));
        assert!(source.contains("return obj.getJSONObject(RESULT);"));
        assert!(source.contains("public Ping() {"));
    }

    #[test]
    fn one_constructor_per_combination() {
        let units = generate(json!({
            "types": types(),
            "methods": {
                "Files.GetDirectory": {
                    "params": [
                        { "name": "directory", "type": "string", "required": true },
                        { "name": "media", "type": [ { "type": "boolean" }, { "type": "integer" } ] }
                    ],
                    "returns": { "type": "string" }
                }
            }
        }));

        let source = &units[0].content;
        assert!(source.contains("public GetDirectory(String directory, Boolean media) {"));
        assert!(source.contains("public GetDirectory(String directory, Integer media) {"));
    }
}

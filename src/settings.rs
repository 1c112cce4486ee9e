use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::parser::method::MethodOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub debug: bool,
    /// File path or `http(s)://` JSON-RPC endpoint.
    pub introspect_source: String,
    pub output_dir: String,
    #[serde(default = "default_package")]
    pub package: String,
    #[serde(default = "default_base_package")]
    pub base_package: String,
    /// File whose content replaces the default header comment.
    pub header_file: Option<String>,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    #[serde(default = "default_ignored_types")]
    pub ignored_types: Vec<String>,
    #[serde(default = "default_list_parameters")]
    pub list_parameters: Vec<String>,
    #[serde(default = "default_ignored_return_keys")]
    pub ignored_return_keys: Vec<String>,
    #[serde(default)]
    pub skip_method_generation: bool,
    #[serde(default)]
    pub dump: bool,
}

fn default_package() -> String {
    "org.xbmc.android.jsonrpc.api.model".to_owned()
}

fn default_base_package() -> String {
    "org.xbmc.android.jsonrpc.api".to_owned()
}

fn default_file_extension() -> String {
    "java".to_owned()
}

fn default_ignored_types() -> Vec<String> {
    vec![
        "Item.Fields.Base".to_owned(),
        "Array.Integer".to_owned(),
        "Array.String".to_owned(),
    ]
}

fn default_list_parameters() -> Vec<String> {
    MethodOptions::default().list_parameters
}

fn default_ignored_return_keys() -> Vec<String> {
    MethodOptions::default().ignored_return_keys
}

/// Values given on the command line. They win over every other source.
#[derive(Debug, Default)]
pub struct Overrides {
    pub introspect_source: Option<String>,
    pub output_dir: Option<String>,
    pub skip_method_generation: bool,
    pub dump: bool,
    pub debug: bool,
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

impl Settings {
    /// Reads `modelgen.toml` (or `config_file`), then `MODELGEN_*`
    /// variables, then `overrides`.
    pub fn new(config_file: Option<&str>, overrides: Overrides) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) => File::with_name(path),
            // Add in `./modelgen.toml` when present
            None => File::with_name("modelgen").required(false),
        };

        Config::builder()
            .add_source(file)
            // Eg.. `MODELGEN_OUTPUT_DIR=gen ./target/app` would set the `output_dir` key
            .add_source(
                Environment::with_prefix("MODELGEN")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ignored_types")
                    .with_list_parse_key("list_parameters")
                    .with_list_parse_key("ignored_return_keys"),
            )
            .set_override_option("introspect_source", overrides.introspect_source)?
            .set_override_option("output_dir", overrides.output_dir)?
            .set_override_option("skip_method_generation", flag(overrides.skip_method_generation))?
            .set_override_option("dump", flag(overrides.dump))?
            .set_override_option("debug", flag(overrides.debug))?
            .build()?
            .try_deserialize()
    }

    pub fn method_options(&self) -> MethodOptions {
        MethodOptions {
            list_parameters: self.list_parameters.clone(),
            ignored_return_keys: self.ignored_return_keys.clone(),
        }
    }
}

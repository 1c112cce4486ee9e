use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::errors::{GenError, GenResult};
use crate::introspect::{self, Introspect};
use crate::module_codegen::type_gen::ignore_regex;
use crate::module_codegen::{self, EmitOptions, OutputUnit, DEFAULT_HEADER};
use crate::parser::method::MethodOptions;
use crate::parser::IntrospectParser;
use crate::settings::Settings;

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub methods: MethodOptions,
    pub emit: EmitOptions,
    pub skip_methods: bool,
    pub dump: bool,
}

/// Resolves the whole document and renders every unit in memory. Nothing is
/// returned unless all passes succeed.
pub fn generate(introspect: &Introspect, options: &GenerateOptions) -> GenResult<Vec<OutputUnit>> {
    let mut parser = IntrospectParser::new(options.methods.clone());
    parser.parse_introspect(introspect, options.skip_methods)?;

    let notices = parser.resolver.notices();
    if !notices.is_empty() {
        warn!(count = notices.len(), "generated with degraded inheritance");
    }
    if options.dump {
        parser.resolver.dump()?;
    }

    let IntrospectParser {
        resolver, table, methods, ..
    } = parser;

    let units = module_codegen::emit(&resolver, &table, &methods, &options.emit)?;
    info!(units = units.len(), "rendered output units");
    Ok(units)
}

/// Writes units as `<name>.<extension>` into a directory that must already exist.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    extension: String,
}

impl DirectorySink {
    pub async fn open(root: impl Into<PathBuf>, extension: &str) -> GenResult<Self> {
        let root = root.into();
        let metadata = tokio::fs::metadata(&root)
            .await
            .map_err(|e| GenError::io(&root, e))?;

        if !metadata.is_dir() {
            return Err(GenError::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "output path is not a directory"),
            ));
        }
        if metadata.permissions().readonly() {
            return Err(GenError::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "output directory is not writable"),
            ));
        }

        Ok(DirectorySink {
            root,
            extension: extension.trim_start_matches('.').to_owned(),
        })
    }

    pub fn path_for(&self, unit: &OutputUnit) -> PathBuf {
        self.root.join(format!("{}.{}", unit.name, self.extension))
    }

    pub async fn write(&self, unit: &OutputUnit) -> GenResult<PathBuf> {
        let file_path = self.path_for(unit);
        let mut file = File::create(&file_path)
            .await
            .map_err(|e| GenError::io(&file_path, e))?;
        file.write_all(unit.content.as_bytes())
            .await
            .map_err(|e| GenError::io(&file_path, e))?;
        info!(path = %file_path.display(), "wrote unit");
        Ok(file_path)
    }
}

async fn read_header(header_file: Option<&str>) -> anyhow::Result<String> {
    match header_file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read header file {}", path)),
        None => Ok(DEFAULT_HEADER.to_owned()),
    }
}

pub async fn generate_options(settings: &Settings) -> anyhow::Result<GenerateOptions> {
    let ignored_types = ignore_regex(&settings.ignored_types).context("Invalid ignored_types pattern")?;

    Ok(GenerateOptions {
        methods: settings.method_options(),
        emit: EmitOptions {
            package: settings.package.clone(),
            base_package: settings.base_package.clone(),
            header: read_header(settings.header_file.as_deref()).await?,
            ignored_types,
        },
        skip_methods: settings.skip_method_generation,
        dump: settings.dump,
    })
}

pub async fn run_emit_from_introspect(introspect: Introspect, settings: &Settings) -> anyhow::Result<Vec<PathBuf>> {
    let sink = DirectorySink::open(Path::new(&settings.output_dir), &settings.file_extension)
        .await
        .context("Output directory is not usable")?;
    let options = generate_options(settings).await?;

    let units = generate(&introspect, &options).context("Failed to generate models")?;

    let mut written = Vec::with_capacity(units.len());
    for unit in &units {
        written.push(sink.write(unit).await?);
    }
    Ok(written)
}

pub async fn run_emit(settings: &Settings) -> anyhow::Result<Vec<PathBuf>> {
    let introspect = introspect::load(&settings.introspect_source)
        .await
        .with_context(|| format!("Failed to load introspection from {}", settings.introspect_source))?;

    run_emit_from_introspect(introspect, settings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(output_dir: &Path) -> Settings {
        Settings {
            debug: false,
            introspect_source: "unused".to_owned(),
            output_dir: output_dir.to_string_lossy().into_owned(),
            package: "org.example.model".to_owned(),
            base_package: "org.example".to_owned(),
            header_file: None,
            file_extension: "java".to_owned(),
            ignored_types: vec!["Array.String".to_owned()],
            list_parameters: vec!["limits".to_owned()],
            ignored_return_keys: vec!["limits".to_owned()],
            skip_method_generation: false,
            dump: true,
        }
    }

    fn document() -> Introspect {
        serde_json::from_value(json!({
            "types": {
                "Array.String": { "id": "Array.String", "type": "array", "items": { "type": "string" } },
                "Library.Details.Genre": {
                    "id": "Library.Details.Genre",
                    "type": "object",
                    "properties": { "genreid": { "type": "integer", "required": true }, "title": { "type": "string" } }
                }
            },
            "methods": {
                "AudioLibrary.GetGenres": {
                    "returns": {
                        "type": "object",
                        "properties": { "genres": { "type": "array", "items": { "$ref": "Library.Details.Genre" } } }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn writes_one_file_per_unit() {
        let dir = tempfile::tempdir().unwrap();

        let written = run_emit_from_introspect(document(), &settings(dir.path())).await.unwrap();

        let mut names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["AudioLibrary.java", "LibraryModel.java"]);

        let model = std::fs::read_to_string(dir.path().join("LibraryModel.java")).unwrap();
        assert!(model.starts_with(DEFAULT_HEADER));
        assert!(model.contains("package org.example.model;"));
        assert!(model.contains("import org.example.AbstractModel;"));
        assert!(model.contains("public static class GenreDetails extends AbstractModel {"));
    }

    #[tokio::test]
    async fn missing_directory_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = run_emit_from_introspect(document(), &settings(&missing)).await.unwrap_err();

        assert!(err.to_string().contains("Output directory"));
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn failed_generation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let broken: Introspect = serde_json::from_value(json!({
            "types": { "Video.Cast": { "id": "Video.Cast", "$ref": "Video.Missing" } }
        }))
        .unwrap();

        assert!(run_emit_from_introspect(broken, &settings(dir.path())).await.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn header_file_replaces_default_header() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("header.txt");
        std::fs::write(&header, "/* licensed */\n").unwrap();

        let header = read_header(header.to_str()).await.unwrap();

        assert_eq!(header, "/* licensed */\n");
    }

    #[test]
    fn generate_skips_methods_when_asked() {
        let options = GenerateOptions {
            skip_methods: true,
            ..GenerateOptions::default()
        };

        let units = generate(&document(), &options).unwrap();

        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["LibraryModel"]);
    }
}

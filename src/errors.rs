use std::path::PathBuf;

use thiserror::Error;

pub type GenResult<T> = Result<T, GenError>;

/// Every failure the generator can hit. All of them abort the run.
#[derive(Debug, Error)]
pub enum GenError {
    /// Malformed input node: missing field, wrong node shape, bad enum entry.
    #[error("malformed schema at {path}: {message} {fragment}")]
    SchemaStructure {
        path: String,
        message: String,
        fragment: String,
    },

    /// A `$ref`/`extends` target that does not resolve, or a node using both.
    #[error("unresolved reference at {path}: {message} {fragment}")]
    Reference {
        path: String,
        message: String,
        fragment: String,
    },

    /// Identifier with the wrong segment count, or a name claimed twice.
    #[error("naming error for {name}: {message}")]
    Naming { name: String, message: String },

    /// A shape the emitter or combinator has no template for.
    #[error("unsupported shape at {path}: {message}")]
    UnsupportedShape { path: String, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render output")]
    Render(#[from] std::fmt::Error),

    #[error(transparent)]
    Multiple(#[from] MultipleErrors),
}

impl GenError {
    pub fn schema(path: impl Into<String>, message: impl Into<String>, raw: &serde_json::Value) -> Self {
        GenError::SchemaStructure {
            path: path.into(),
            message: message.into(),
            fragment: snippet(raw),
        }
    }

    pub fn reference(path: impl Into<String>, message: impl Into<String>, raw: &serde_json::Value) -> Self {
        GenError::Reference {
            path: path.into(),
            message: message.into(),
            fragment: snippet(raw),
        }
    }

    pub fn naming(name: impl Into<String>, message: impl Into<String>) -> Self {
        GenError::Naming {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(path: impl Into<String>, message: impl Into<String>) -> Self {
        GenError::UnsupportedShape {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }
}

const SNIPPET_LIMIT: usize = 240;

/// Compact single-line rendering of a raw node, cut off for long fragments.
pub fn snippet(raw: &serde_json::Value) -> String {
    let mut text = raw.to_string();
    if text.len() > SNIPPET_LIMIT {
        let mut cut = SNIPPET_LIMIT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

#[derive(Debug)]
pub struct MultipleErrors {
    errors: Vec<GenError>,
}

impl MultipleErrors {
    pub fn new(errors: Vec<GenError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[GenError] {
        &self.errors
    }

    /// Collapses a list of failures: nothing, the single error, or the aggregate.
    pub fn into_result(mut errors: Vec<GenError>) -> GenResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(GenError::Multiple(MultipleErrors::new(errors))),
        }
    }
}

impl std::error::Error for MultipleErrors {}

impl std::fmt::Display for MultipleErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Multiple errors:")?;
        for error in &self.errors {
            writeln!(f, "- {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snippet_truncates_long_fragments() {
        let raw = json!({ "description": "x".repeat(1000) });

        let text = snippet(&raw);

        assert!(text.ends_with("..."));
        assert!(text.len() <= SNIPPET_LIMIT + 3);
    }

    #[test]
    fn schema_error_reports_path_and_fragment() {
        let err = GenError::schema("Audio.Details.Album", "properties must be a mapping", &json!({"properties": 3}));

        let display = err.to_string();

        assert!(display.contains("Audio.Details.Album"));
        assert!(display.contains("\"properties\":3"));
    }

    #[test]
    fn into_result_keeps_a_single_error_unwrapped() {
        let result = MultipleErrors::into_result(vec![GenError::naming("A.B.C.D", "duplicate")]);

        assert!(matches!(result, Err(GenError::Naming { .. })));
    }

    #[test]
    fn into_result_aggregates_several_errors() {
        let result = MultipleErrors::into_result(vec![
            GenError::naming("A", "first"),
            GenError::naming("B", "second"),
        ]);

        match result {
            Err(GenError::Multiple(all)) => assert_eq!(all.errors().len(), 2),
            other => panic!("expected aggregate, got {:?}", other),
        }
    }
}

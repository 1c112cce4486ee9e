use itertools::Itertools;
use std::{collections::HashSet, fmt::Write};

/// Runtime classes a generated unit may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Import {
    ArrayList,
    AbstractModel,
    AbstractCall,
    JSONArray,
    JSONObject,
    JSONException,
}

impl Import {
    fn path(&self, base_package: &str) -> String {
        match self {
            Import::ArrayList => "java.util.ArrayList".to_owned(),
            Import::AbstractModel => format!("{}.AbstractModel", base_package),
            Import::AbstractCall => format!("{}.AbstractCall", base_package),
            Import::JSONArray => "org.json.JSONArray".to_owned(),
            Import::JSONObject => "org.json.JSONObject".to_owned(),
            Import::JSONException => "org.json.JSONException".to_owned(),
        }
    }
}

/// Imports collected while compiling one output unit.
#[derive(Debug, Default)]
pub struct ImportTracker {
    imports: HashSet<Import>,
}

impl ImportTracker {
    pub fn new() -> Self {
        Self {
            imports: HashSet::new(),
        }
    }

    pub fn track(&mut self, import: Import) {
        self.imports.insert(import);
    }

    /// Writes one sorted, deduplicated import line per dependency and resets
    /// the tracker for the next unit.
    pub fn write_imports(&mut self, file: &mut String, base_package: &str) -> std::fmt::Result {
        let paths = self
            .imports
            .drain()
            .map(|import| import.path(base_package))
            .sorted()
            .dedup();

        for path in paths {
            writeln!(file, "import {};", path)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_are_sorted_and_deduplicated() {
        let mut imports = ImportTracker::new();
        imports.track(Import::JSONObject);
        imports.track(Import::ArrayList);
        imports.track(Import::AbstractModel);
        imports.track(Import::JSONObject);

        let mut file = String::new();
        imports.write_imports(&mut file, "org.xbmc.android.jsonrpc.api").unwrap();

        assert_eq!(
            file,
            "import java.util.ArrayList;\nimport org.json.JSONObject;\nimport org.xbmc.android.jsonrpc.api.AbstractModel;\n"
        );
    }

    #[test]
    fn writing_resets_the_tracker() {
        let mut imports = ImportTracker::new();
        imports.track(Import::JSONArray);
        imports.write_imports(&mut String::new(), "x").unwrap();

        let mut file = String::new();
        imports.write_imports(&mut file, "x").unwrap();

        assert!(file.is_empty());
    }
}

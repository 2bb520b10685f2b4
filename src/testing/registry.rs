//! Suite registry
//!
//! Built-in suites ship as YAML beside the crate and are embedded at build
//! time. Operators can run their own definitions with `--suite-file`.

use std::path::Path;

use super::config::SuiteDefinition;
use crate::common::{Error, Result};

/// Embedded suite sources, in listing order
static BUILTIN: &[(&str, &str)] = &[
    ("list", include_str!("../../suites/list.yaml")),
    ("queue", include_str!("../../suites/queue.yaml")),
    ("stack", include_str!("../../suites/stack.yaml")),
    ("stack2", include_str!("../../suites/stack2.yaml")),
    ("tree", include_str!("../../suites/tree.yaml")),
    ("bin_tree", include_str!("../../suites/bin_tree.yaml")),
    ("bitmap", include_str!("../../suites/bitmap.yaml")),
    ("search", include_str!("../../suites/search.yaml")),
    ("validation", include_str!("../../suites/validation.yaml")),
];

/// Parse every built-in suite
pub fn builtin_suites() -> Result<Vec<SuiteDefinition>> {
    BUILTIN
        .iter()
        .map(|(key, source)| parse_builtin(key, source))
        .collect()
}

/// Names accepted for selection, aliases included
pub fn available_names() -> Vec<String> {
    let mut names: Vec<String> = BUILTIN.iter().map(|(k, _)| k.to_string()).collect();
    if let Ok(suites) = builtin_suites() {
        for suite in suites {
            names.extend(suite.aliases);
        }
    }
    names
}

/// Find a built-in suite by name or alias
pub fn find_suite(name: &str) -> Result<SuiteDefinition> {
    for (key, source) in BUILTIN {
        let suite = parse_builtin(key, source)?;
        if suite.matches_name(name) {
            return Ok(suite);
        }
    }
    Err(Error::UnknownSuite {
        name: name.to_string(),
        available: available_names().join(", "),
    })
}

/// Load a suite definition from a YAML file
pub fn load_suite_file(path: &Path) -> Result<SuiteDefinition> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    SuiteDefinition::from_yaml(&content)
        .map_err(|e| Error::InvalidSuite(format!("{}: {}", path.display(), e)))
}

fn parse_builtin(key: &str, source: &str) -> Result<SuiteDefinition> {
    let suite = SuiteDefinition::from_yaml(source)
        .map_err(|e| Error::Internal(format!("built-in suite '{}' is broken: {}", key, e)))?;
    if suite.name != key {
        return Err(Error::Internal(format!(
            "built-in suite '{}' is named '{}'",
            key, suite.name
        )));
    }
    Ok(suite)
}

//! Suite definition types
//!
//! Defines the data structures for deserializing YAML suite definitions.
//! A suite is pure configuration: the engine never grows a type per module
//! kind.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::capture::{placeholders, Pick};
use crate::common::{Error, Result};

/// A complete suite for one module kind
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SuiteDefinition {
    /// Registry name of the suite
    pub name: String,
    /// Optional description of what the suite verifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Other names the registry accepts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Lifecycle markers the module prints on load and unload
    #[serde(default)]
    pub markers: Markers,
    /// Ordered steps
    pub steps: Vec<Step>,
}

/// Load/unload marker patterns, `{module}` expands to the escaped module name
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Markers {
    #[serde(default = "default_loaded")]
    pub loaded: String,
    #[serde(default = "default_unloaded")]
    pub unloaded: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            loaded: default_loaded(),
            unloaded: default_unloaded(),
        }
    }
}

fn default_loaded() -> String {
    "{module} module loaded".to_string()
}

fn default_unloaded() -> String {
    "{module} module unloaded".to_string()
}

impl Markers {
    /// Loaded marker pattern for a concrete module
    pub fn loaded_for(&self, module: &str) -> String {
        self.loaded.replace("{module}", &regex::escape(module))
    }

    /// Unloaded marker pattern for a concrete module
    pub fn unloaded_for(&self, module: &str) -> String {
        self.unloaded.replace("{module}", &regex::escape(module))
    }
}

/// Writes, an optional capture, then assertions
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Step {
    /// Heading printed before the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Parameter writes in order, as `key=value`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write: Vec<ParamWrite>,
    /// Values to scan from the log once the writes settled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<Capture>,
    /// Patterns that must appear in the log
    pub expect: Vec<Assertion>,
}

impl Step {
    /// Capture names this step depends on
    pub fn required_captures(&self) -> Vec<String> {
        let mut names = Vec::new();
        let texts = self
            .write
            .iter()
            .map(|w| w.value.as_str())
            .chain(self.expect.iter().flat_map(|a| [a.pattern.as_str(), a.description.as_str()]));
        for text in texts {
            for name in placeholders(text) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        if let Some(capture) = &self.capture {
            names.retain(|n| n != &capture.name);
        }
        names
    }
}

/// A single `key=value` parameter write
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct ParamWrite {
    pub key: String,
    pub value: String,
}

impl ParamWrite {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl TryFrom<String> for ParamWrite {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self::new(key.trim(), value)),
            _ => Err(format!("parameter write '{}' must look like key=value", s)),
        }
    }
}

impl From<ParamWrite> for String {
    fn from(w: ParamWrite) -> Self {
        format!("{}={}", w.key, w.value)
    }
}

impl fmt::Display for ParamWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Pattern that must match somewhere in the log
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Assertion {
    pub pattern: String,
    pub description: String,
}

/// Numeric values scanned out of the log for later steps
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Capture {
    /// Name used as `{{name}}` by later steps
    pub name: String,
    /// Regex whose first group holds whitespace-separated values
    pub pattern: String,
    /// Which captured value a placeholder resolves to
    #[serde(default)]
    pub pick: Pick,
}

impl SuiteDefinition {
    /// Parse a suite from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let suite: SuiteDefinition = serde_yaml::from_str(content)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Whether `name` selects this suite
    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Number of assertions the suite makes, marker checks excluded
    pub fn assertion_count(&self) -> usize {
        self.steps.iter().map(|s| s.expect.len()).sum()
    }

    /// Reject definitions that could only fail at run time
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Error::InvalidSuite(format!("{}: {}", self.name, msg));

        if self.name.trim().is_empty() {
            return Err(Error::InvalidSuite("suite name is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(invalid("no steps".to_string()));
        }

        for marker in [self.markers.loaded_for("m"), self.markers.unloaded_for("m")] {
            compile(&marker).map_err(|e| invalid(format!("marker '{}': {}", marker, e)))?;
        }

        let mut defined: HashSet<&str> = HashSet::new();
        for (i, step) in self.steps.iter().enumerate() {
            let n = i + 1;
            if step.expect.is_empty() {
                return Err(invalid(format!("step {} has no assertions", n)));
            }

            for w in &step.write {
                for name in placeholders(&w.value) {
                    if !defined.contains(name.as_str()) {
                        return Err(invalid(format!(
                            "step {} writes '{}' before capture '{}' exists",
                            n, w, name
                        )));
                    }
                }
            }

            if let Some(capture) = &step.capture {
                let re = compile(&capture.pattern)
                    .map_err(|e| invalid(format!("step {} capture: {}", n, e)))?;
                if re.captures_len() < 2 {
                    return Err(invalid(format!(
                        "step {} capture '{}' needs a group",
                        n, capture.name
                    )));
                }
                defined.insert(capture.name.as_str());
            }

            for a in &step.expect {
                for name in placeholders(&a.pattern).into_iter().chain(placeholders(&a.description)) {
                    if !defined.contains(name.as_str()) {
                        return Err(invalid(format!(
                            "step {} references unknown capture '{}'",
                            n, name
                        )));
                    }
                }
                let probe = super::capture::fill_placeholders(&a.pattern, |_| Some("0".into()));
                compile(&probe).map_err(|e| invalid(format!("step {} pattern: {}", n, e)))?;
            }
        }
        Ok(())
    }
}

/// Compile an assertion pattern: unanchored, case-sensitive, multi-line
pub fn compile(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    regex::RegexBuilder::new(pattern).multi_line(true).build()
}

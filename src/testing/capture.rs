//! Values carried between steps
//!
//! A capture scans integers out of a log listing; later steps refer to a
//! picked value as `{{name}}` in write values, patterns and descriptions.

use rand::seq::IndexedRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::config::Capture;

/// How a placeholder chooses among the captured values
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pick {
    First,
    Last,
    Middle,
    #[default]
    Random,
}

impl Pick {
    fn choose(self, values: &[i64]) -> Option<i64> {
        match self {
            Pick::First => values.first().copied(),
            Pick::Last => values.last().copied(),
            Pick::Middle => values.get(values.len() / 2).copied(),
            Pick::Random => values.choose(&mut rand::rng()).copied(),
        }
    }
}

/// Values scanned by one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedValue {
    pub all: Vec<i64>,
    /// The value every placeholder of this capture resolves to
    pub chosen: i64,
}

/// Captured values by name
#[derive(Debug, Default)]
pub struct Captures {
    values: HashMap<String, CapturedValue>,
}

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the most recent match of the capture pattern in `log`
    ///
    /// Returns `None` on a miss; a previous value under the same name is
    /// dropped so dependent steps do not run against stale data.
    pub fn scan(&mut self, capture: &Capture, re: &Regex, log: &str) -> Option<&CapturedValue> {
        let all: Vec<i64> = re
            .captures_iter(log)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| parse_numbers(m.as_str()))
            .unwrap_or_default();

        match capture.pick.choose(&all) {
            Some(chosen) => {
                self.values
                    .insert(capture.name.clone(), CapturedValue { all, chosen });
                self.values.get(&capture.name)
            }
            None => {
                self.values.remove(&capture.name);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&CapturedValue> {
        self.values.get(name)
    }

    /// Substitute every placeholder, or `None` if one is unresolved
    ///
    /// With `escape` the values are regex-escaped for use in a pattern.
    pub fn resolve(&self, text: &str, escape: bool) -> Option<String> {
        let mut missing = false;
        let filled = fill_placeholders(text, |name| match self.values.get(name) {
            Some(v) => {
                let s = v.chosen.to_string();
                Some(if escape { regex::escape(&s) } else { s })
            }
            None => {
                missing = true;
                None
            }
        });
        (!missing).then_some(filled)
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Names referenced as `{{name}}` in `text`, in order of appearance
pub fn placeholders(text: &str) -> Vec<String> {
    placeholder_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Replace placeholders using `lookup`; unresolved ones are left as written
pub fn fill_placeholders<F>(text: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    placeholder_re()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Integer tokens in a whitespace-separated listing
pub fn parse_numbers(listing: &str) -> Vec<i64> {
    listing
        .split_whitespace()
        .filter_map(|t| {
            t.trim_matches(|c: char| !(c.is_ascii_digit() || c == '-'))
                .parse()
                .ok()
        })
        .collect()
}

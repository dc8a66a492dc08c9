//! Alias store and first-word expansion.

use crate::error::{ShellError, ShellResult};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Aliases {
    map: HashMap<String, String>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or replace an alias. Names may be any non-empty string that
    /// does not contain `=`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> ShellResult<()> {
        if name.is_empty() || name.contains('=') {
            return Err(ShellError::parse(format!("invalid alias name: {name:?}")));
        }
        self.map.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn unset(&mut self, name: &str) -> bool {
        self.map.remove(name).is_some()
    }

    /// `(name, value)` pairs sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .map
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Single-pass expansion: if the first whitespace-delimited word of
    /// `line` names an alias, splice in its value and keep the remainder.
    pub fn expand(&self, line: &str) -> String {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return line.to_string();
        }
        let (word, rest) = match trimmed.find(char::is_whitespace) {
            Some(pos) => (&trimmed[..pos], &trimmed[pos..]),
            None => (trimmed, ""),
        };
        match self.map.get(word) {
            Some(value) => format!("{value}{rest}"),
            None => line.to_string(),
        }
    }
}

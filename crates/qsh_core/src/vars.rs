//! Shell variable store.
//!
//! String-to-string table with an export flag per entry. On startup every
//! entry of the process environment is seeded as exported; exported writes
//! are mirrored back into the environment so children inherit them, and
//! lookups fall through to `getenv` for names the table has never seen.

use crate::error::{ShellError, ShellResult};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarEntry {
    pub value: String,
    pub exported: bool,
}

#[derive(Debug, Default)]
pub struct Variables {
    map: HashMap<String, VarEntry>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table from the process environment, all entries exported.
    pub fn from_environ() -> Self {
        let mut vars = Self::new();
        for (name, value) in std::env::vars() {
            vars.map.insert(
                name,
                VarEntry {
                    value,
                    exported: true,
                },
            );
        }
        vars
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Insert or update. An exported entry is pushed into the environment;
    /// overwriting an exported entry as non-exported withdraws it, matching
    /// the assignment-prefix semantics of `NAME=VALUE command`.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<String>,
        exported: bool,
    ) -> ShellResult<()> {
        if !Self::is_valid_name(name) {
            return Err(ShellError::parse(format!("invalid variable name: {name}")));
        }
        let value = value.into();
        if exported {
            std::env::set_var(name, &value);
        } else if self.map.get(name).is_some_and(|e| e.exported) {
            std::env::remove_var(name);
        }
        self.map.insert(name.to_string(), VarEntry { value, exported });
        Ok(())
    }

    /// Table lookup with environment fallback.
    pub fn get(&self, name: &str) -> Option<String> {
        match self.map.get(name) {
            Some(entry) => Some(entry.value.clone()),
            None => std::env::var(name).ok(),
        }
    }

    /// Remove a variable; unexports it as a side effect. Returns whether
    /// anything was removed.
    pub fn unset(&mut self, name: &str) -> bool {
        match self.map.remove(name) {
            Some(entry) => {
                if entry.exported {
                    std::env::remove_var(name);
                }
                true
            }
            None => false,
        }
    }

    /// Mark a variable exported, adopting it from the environment when the
    /// table does not know it yet.
    pub fn export(&mut self, name: &str) -> ShellResult<()> {
        if let Some(entry) = self.map.get_mut(name) {
            entry.exported = true;
            std::env::set_var(name, &entry.value);
            return Ok(());
        }
        match std::env::var(name) {
            Ok(value) => self.set(name, value, true),
            Err(_) => self.set(name, "", true),
        }
    }

    pub fn is_exported(&self, name: &str) -> bool {
        self.map.get(name).is_some_and(|e| e.exported)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All names, sorted for stable listings.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.keys().cloned().collect();
        names.sort();
        names
    }
}

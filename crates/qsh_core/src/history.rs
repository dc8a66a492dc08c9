//! Command history: bounded ring with file persistence.
//!
//! Entries record the raw command line, a unix timestamp, and the exit
//! status. The ring holds at most [`MAX_HISTORY_ENTRIES`]; the oldest entry
//! is evicted on overflow. The on-disk format is one entry per line:
//! `"<unix_ts> <exit_status> <command>\n"`: everything after the second
//! space belongs to the command, no escaping.

use crate::error::{IoErrorKind, ShellError, ShellResult};
use chrono::{Local, TimeZone};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MAX_HISTORY_ENTRIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub command: String,
    pub timestamp: i64,
    pub exit_status: i32,
}

impl HistoryEntry {
    /// Local-time rendering for the `history` listing.
    pub fn format_time(&self) -> String {
        match Local.timestamp_opt(self.timestamp, 0).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format!("@{}", self.timestamp),
        }
    }
}

#[derive(Debug, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    path: Option<PathBuf>,
}

impl History {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            entries: VecDeque::new(),
            path,
        }
    }

    /// Append an entry, timestamped now, evicting the oldest on overflow.
    pub fn add(&mut self, command: impl Into<String>, exit_status: i32) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.push(HistoryEntry {
            command: command.into(),
            timestamp,
            exit_status,
        });
    }

    fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == MAX_HISTORY_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Entries whose command equals `command` exactly.
    pub fn search_exact<'a>(&'a self, command: &'a str) -> Vec<&'a HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.command == command)
            .collect()
    }

    /// Entries whose command contains `needle`.
    pub fn search_substring<'a>(&'a self, needle: &str) -> Vec<&'a HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.command.contains(needle))
            .collect()
    }

    /// Entries whose command matches a glob `pattern`.
    pub fn search_pattern<'a>(&'a self, pattern: &str) -> Vec<&'a HistoryEntry> {
        let Ok(pat) = glob::Pattern::new(pattern) else {
            return Vec::new();
        };
        self.entries
            .iter()
            .filter(|e| pat.matches(&e.command))
            .collect()
    }

    /// Up to `count` entries starting at `start`.
    pub fn range(&self, start: usize, count: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().skip(start).take(count).collect()
    }

    /// Load from the configured file, replacing current contents.
    /// A missing file is not an error; malformed lines are skipped.
    pub fn load(&mut self) -> ShellResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        self.load_from(&path)
    }

    pub fn load_from(&mut self, path: &Path) -> ShellResult<()> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(ShellError::io(
                    IoErrorKind::HistoryLoadFailed,
                    format!("{}: {e}", path.display()),
                ))
            }
        };
        self.entries.clear();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| {
                ShellError::io(IoErrorKind::HistoryLoadFailed, e.to_string())
            })?;
            if let Some(entry) = parse_entry(&line) {
                self.push(entry);
            }
        }
        log::debug!(target: "qsh_core::history", "loaded {} entries", self.entries.len());
        Ok(())
    }

    /// Write every entry to the configured file.
    pub fn save(&self) -> ShellResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        self.save_to(path)
    }

    pub fn save_to(&self, path: &Path) -> ShellResult<()> {
        let mut file = std::fs::File::create(path).map_err(|e| {
            ShellError::io(
                IoErrorKind::HistorySaveFailed,
                format!("{}: {e}", path.display()),
            )
        })?;
        for entry in &self.entries {
            writeln!(
                file,
                "{} {} {}",
                entry.timestamp, entry.exit_status, entry.command
            )
            .map_err(|e| ShellError::io(IoErrorKind::HistorySaveFailed, e.to_string()))?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn parse_entry(line: &str) -> Option<HistoryEntry> {
    let (ts, rest) = line.split_once(' ')?;
    let (status, command) = rest.split_once(' ')?;
    let timestamp: i64 = ts.parse().ok()?;
    if timestamp <= 0 {
        return None;
    }
    let exit_status: i32 = status.parse().ok()?;
    Some(HistoryEntry {
        command: command.to_string(),
        timestamp,
        exit_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fifo_order_and_eviction() {
        let mut history = History::new(None);
        for i in 0..MAX_HISTORY_ENTRIES + 5 {
            history.add(format!("cmd{i}"), 0);
        }
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        // The five oldest were evicted.
        assert_eq!(history.get(0).unwrap().command, "cmd5");
        assert_eq!(history.last().unwrap().command, format!("cmd{}", MAX_HISTORY_ENTRIES + 4));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist");

        let mut history = History::new(Some(path.clone()));
        history.add("echo one", 0);
        history.add("grep x file with spaces", 1);
        history.add("false", 1);
        history.save().unwrap();

        let mut reloaded = History::new(Some(path));
        reloaded.load().unwrap();
        assert_eq!(reloaded.len(), 3);
        let original: Vec<_> = history.iter().cloned().collect();
        let loaded: Vec<_> = reloaded.iter().cloned().collect();
        assert_eq!(original, loaded);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist");
        std::fs::write(&path, "not a timestamp\n12 0 ok\n-5 0 bad-ts\n13 x bad-status\n").unwrap();

        let mut history = History::new(Some(path));
        history.load().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(0).unwrap().command, "ok");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let mut history = History::new(Some(dir.path().join("nope")));
        assert!(history.load().is_ok());
        assert!(history.is_empty());
    }

    #[test]
    fn command_text_with_spaces_survives() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist");
        let mut history = History::new(Some(path.clone()));
        history.add("echo 'Hello, World!' > out.txt", 0);
        history.save().unwrap();

        let mut reloaded = History::new(Some(path));
        reloaded.load().unwrap();
        assert_eq!(
            reloaded.get(0).unwrap().command,
            "echo 'Hello, World!' > out.txt"
        );
    }

    #[test]
    fn search_variants() {
        let mut history = History::new(None);
        history.add("ls -l", 0);
        history.add("git status", 0);
        history.add("git log", 0);
        assert_eq!(history.search_exact("ls -l").len(), 1);
        assert_eq!(history.search_substring("git").len(), 2);
        assert_eq!(history.search_pattern("git *").len(), 2);
        assert!(history.search_pattern("[").is_empty());
    }
}

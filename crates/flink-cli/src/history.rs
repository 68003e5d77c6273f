//! Statement history persisted across sessions.
//!
//! One statement per entry; multi-line statements are joined into a single
//! line. Sensitive statements never reach this module.

use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Statement history file.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
    max_size: usize,
}

impl History {
    /// Create a history backed by `path`, keeping at most `max_size` entries.
    pub fn new(path: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            path: path.into(),
            max_size,
        }
    }

    /// Load the stored entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&self) -> Result<Vec<String>, CliError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| CliError::History(format!("failed to read {}: {e}", self.path.display())))?;
        let mut lines: Vec<String> = contents.lines().map(ToString::to_string).collect();
        let excess = lines.len().saturating_sub(self.max_size);
        lines.drain(..excess);
        Ok(lines)
    }

    /// Replace the stored entries, keeping the most recent ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, entries: &[String]) -> Result<(), CliError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let start = entries.len().saturating_sub(self.max_size);
        let mut contents = entries[start..].join("\n");
        contents.push('\n');
        std::fs::write(&self.path, contents)
            .map_err(|e| CliError::History(format!("failed to write {}: {e}", self.path.display())))
    }

    /// Append a statement, skipping blanks and consecutive duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn append(&self, statement: &str) -> Result<(), CliError> {
        let entry = Self::entry(statement);
        if entry.is_empty() {
            return Ok(());
        }
        let mut entries = self.load()?;
        if entries.last() == Some(&entry) {
            return Ok(());
        }
        entries.push(entry);
        self.save(&entries)
    }

    /// A statement as stored: whitespace runs collapsed to one space.
    pub fn entry(statement: &str) -> String {
        statement.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// History file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

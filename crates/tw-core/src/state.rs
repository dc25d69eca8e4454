//! Persisted recency state
//!
//! A small typed JSON record replacing ad-hoc attribute storage: the ordered
//! list of servers attempted across invocations. The list grows on every
//! connect attempt (including failed ones) and feeds the `recent` and
//! `rotation` selection disciplines.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persisted state file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedState {
    /// Server names in attempt order, oldest first; a name may repeat
    pub recent_servers: Vec<String>,

    #[serde(skip)]
    path: PathBuf,
}

impl SavedState {
    /// Load the state file, treating a missing file as empty state
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let mut state = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e),
        };
        state.path = path.to_path_buf();
        Ok(state)
    }

    /// Flush the state back to disk
    pub fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, contents)
    }

    /// Record a connect attempt against a server
    pub fn push_recent(&mut self, name: &str) {
        self.recent_servers.push(name.to_string());
    }

    /// Recency rank for a server name: 1-based position of its most recent
    /// use, counted from the end of the list (1 = most recently used).
    /// Servers never used rank after every used one.
    pub fn recency_rank(&self, name: &str) -> usize {
        let used: Vec<&str> = {
            // Walk newest-first, keeping first occurrence of each name.
            let mut seen = Vec::new();
            for entry in self.recent_servers.iter().rev() {
                if !seen.contains(&entry.as_str()) {
                    seen.push(entry.as_str());
                }
            }
            seen
        };
        match used.iter().position(|n| *n == name) {
            Some(index) => index + 1,
            None => used.len() + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_state_is_empty() {
        let dir = TempDir::new().unwrap();
        let state = SavedState::load(&dir.path().join("state.json")).unwrap();
        assert!(state.recent_servers.is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut state = SavedState::load(&path).unwrap();
        state.push_recent("CA Toronto");
        state.push_recent("France");
        state.save().unwrap();

        let reloaded = SavedState::load(&path).unwrap();
        assert_eq!(reloaded.recent_servers, vec!["CA Toronto", "France"]);
    }

    #[test]
    fn test_recency_rank_newest_first() {
        let mut state = SavedState::default();
        state.push_recent("a");
        state.push_recent("b");
        state.push_recent("a"); // "a" used again, now most recent

        assert_eq!(state.recency_rank("a"), 1);
        assert_eq!(state.recency_rank("b"), 2);
        // Never-used servers rank after every used one
        assert_eq!(state.recency_rank("c"), 3);
    }
}

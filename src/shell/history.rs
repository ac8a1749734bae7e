//! Session-only command history

use std::collections::VecDeque;

pub const MAX_HISTORY: usize = 1000;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    max_entries: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record a line. Blank lines and immediate repeats are skipped.
    pub fn add(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if self.entries.back().map(String::as_str) == Some(line) {
            return;
        }
        self.entries.push_back(line.to_string());
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Last `limit` entries (all when `None`), numbered by their position in
    /// the retained history.
    pub fn render(&self, limit: Option<usize>) -> String {
        if self.entries.is_empty() {
            return "History is empty".to_string();
        }

        let shown = limit.unwrap_or(self.entries.len()).min(self.entries.len());
        let start = self.entries.len() - shown;

        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .map(|(idx, cmd)| format!("{}. {}", idx + 1, cmd))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

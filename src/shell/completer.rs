//! Tab completion for the REPL
//!
//! First word completes against builtin names and executables on `PATH`;
//! later words complete paths relative to the session directory.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

pub struct DeltaHelper {
    /// Session directory for path completion
    cwd: PathBuf,
    commands: Vec<String>,
}

impl DeltaHelper {
    pub fn new(cwd: PathBuf, builtins: &[&str]) -> Self {
        let mut set: BTreeSet<String> = builtins.iter().map(|b| b.to_string()).collect();
        set.extend(path_commands());
        Self {
            cwd,
            commands: set.into_iter().collect(),
        }
    }

    pub fn set_cwd(&mut self, cwd: PathBuf) {
        self.cwd = cwd;
    }

    fn complete_command(&self, partial: &str) -> Vec<Pair> {
        let lower = partial.to_lowercase();
        self.commands
            .iter()
            .filter(|cmd| cmd.to_lowercase().starts_with(&lower))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect()
    }

    /// Complete file/directory paths
    fn complete_path(&self, partial: &str) -> Vec<Pair> {
        let (dir_part, prefix) = match partial.rfind(|c: char| c == '/' || c == '\\') {
            Some(idx) => (&partial[..=idx], &partial[idx + 1..]),
            None => ("", partial),
        };

        let search_dir = if dir_part.is_empty() {
            self.cwd.clone()
        } else if let Some(rest) = dir_part.strip_prefix("~/") {
            dirs::home_dir().map(|h| h.join(rest)).unwrap_or_else(|| self.cwd.join(dir_part))
        } else {
            let p = Path::new(dir_part);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                self.cwd.join(p)
            }
        };

        let Ok(entries) = std::fs::read_dir(&search_dir) else {
            return Vec::new();
        };

        let prefix_lower = prefix.to_lowercase();
        let mut candidates: Vec<Pair> = entries
            .filter_map(|e| e.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.to_lowercase().starts_with(&prefix_lower) {
                    return None;
                }
                if name.starts_with('.') && !prefix.starts_with('.') {
                    return None;
                }
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                let display = if is_dir { format!("{}/", name) } else { name };
                Some(Pair {
                    replacement: format!("{}{}", dir_part, display),
                    display,
                })
            })
            .collect();

        candidates.sort_by(|a, b| a.display.to_lowercase().cmp(&b.display.to_lowercase()));
        candidates
    }
}

/// Executable names found on `PATH`.
fn path_commands() -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    let Some(path_var) = env::var_os("PATH") else {
        return set;
    };
    for dir in env::split_paths(&path_var) {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            if !is_executable(&entry) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                set.insert(command_name(name));
            }
        }
    }
    set
}

#[cfg(unix)]
fn is_executable(entry: &std::fs::DirEntry) -> bool {
    use std::os::unix::fs::PermissionsExt;
    entry
        .metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(entry: &std::fs::DirEntry) -> bool {
    let lower = entry.file_name().to_string_lossy().to_ascii_lowercase();
    [".exe", ".bat", ".cmd", ".com"].iter().any(|ext| lower.ends_with(ext))
}

#[cfg(unix)]
fn command_name(file: &str) -> String {
    file.to_string()
}

#[cfg(not(unix))]
fn command_name(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_else(|| file.to_ascii_lowercase())
}

/// Start offset and raw text of the word under the cursor, plus whether it
/// is the first word on the line. Quotes are tracked so `"my fi<TAB>` works.
fn current_word(line: &str) -> (usize, &str, bool) {
    let mut in_single = false;
    let mut in_double = false;
    let mut word_start = 0usize;
    let mut words_before = 0usize;
    let mut in_word = false;

    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            c if c.is_whitespace() && !in_single && !in_double => {
                if in_word {
                    words_before += 1;
                    in_word = false;
                }
                continue;
            }
            _ => {}
        }
        if !in_word {
            in_word = true;
            word_start = i;
        }
    }

    if !in_word {
        return (line.len(), "", words_before == 0);
    }
    (word_start, &line[word_start..], words_before == 0)
}

impl Completer for DeltaHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, word, is_first) = current_word(&line[..pos]);

        if is_first {
            return Ok((start, self.complete_command(word)));
        }

        // Keep an opening quote in place and complete inside it.
        let quote = word.chars().next().filter(|c| *c == '"' || *c == '\'');
        let (start, partial) = match quote {
            Some(q) => (start + q.len_utf8(), &word[q.len_utf8()..]),
            None => (start, word),
        };

        let mut candidates = self.complete_path(partial);
        if quote.is_none() {
            for cand in &mut candidates {
                if cand.replacement.contains(' ') {
                    cand.replacement = format!("\"{}\"", cand.replacement);
                }
            }
        }
        Ok((start, candidates))
    }
}

impl Highlighter for DeltaHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{}\x1b[0m", hint))
    }
}

impl Hinter for DeltaHelper {
    type Hint = String;
}

impl Validator for DeltaHelper {}

impl Helper for DeltaHelper {}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::DefaultHistory;

    #[test]
    fn test_command_completion() {
        let helper = DeltaHelper::new(std::env::temp_dir(), &["cd", "cat", "clear", "ls"]);
        let history = DefaultHistory::new();
        let (start, candidates) = helper.complete("c", 1, &Context::new(&history)).unwrap();
        assert_eq!(start, 0);
        assert!(candidates.iter().any(|p| p.replacement == "cd"));
        assert!(candidates.iter().any(|p| p.replacement == "cat"));
        assert!(candidates.iter().any(|p| p.replacement == "clear"));
        assert!(!candidates.iter().any(|p| p.replacement == "ls"));
    }

    #[test]
    fn test_path_completion() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("setup.txt"), "").unwrap();
        std::fs::write(tmp.path().join("src/main.rs"), "").unwrap();

        let helper = DeltaHelper::new(tmp.path().to_path_buf(), &["cat"]);
        let history = DefaultHistory::new();

        let line = "cat s";
        let (start, candidates) = helper.complete(line, line.len(), &Context::new(&history)).unwrap();
        assert_eq!(start, 4);
        let replacements: Vec<_> = candidates.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(replacements, vec!["setup.txt", "src/"]);

        let line = "cat src/m";
        let (start, candidates) = helper.complete(line, line.len(), &Context::new(&history)).unwrap();
        assert_eq!(start, 4);
        assert_eq!(candidates[0].replacement, "src/main.rs");
    }

    #[test]
    fn test_current_word() {
        assert_eq!(current_word("ls"), (0, "ls", true));
        assert_eq!(current_word("ls "), (3, "", false));
        assert_eq!(current_word("cat \"my fi"), (4, "\"my fi", false));
    }
}

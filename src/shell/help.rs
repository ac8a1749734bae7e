//! `help` output
//!
//! Renders a boxed command table sized to the terminal, or a detail box for
//! one command. Commands the shell does not know are asked for their own
//! description (`<cmd> --help`, then `man -f <cmd>`).

use std::path::Path;
use std::time::Duration;
use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use super::executor::{self, CaptureOutcome};
use super::result::CommandResult;

/// Limit for each description probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const MIN_WIDTH: usize = 60;
const MAX_WIDTH: usize = 100;
const MAX_DESCRIPTION: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Directories,
    Files,
    Search,
    Session,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Directories,
        Category::Files,
        Category::Search,
        Category::Session,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Category::Directories => "DIRECTORIES",
            Category::Files => "FILES",
            Category::Search => "SEARCH",
            Category::Session => "SESSION",
        }
    }
}

#[derive(Debug)]
pub struct HelpEntry {
    pub name: &'static str,
    pub category: Category,
    pub usage: &'static str,
    pub summary: &'static str,
    pub examples: &'static [&'static str],
}

pub const HELP_ENTRIES: &[HelpEntry] = &[
    HelpEntry {
        name: "ls",
        category: Category::Directories,
        usage: "ls [-a] [-l] [path]",
        summary: "List directory contents. -a includes hidden files, -l shows details.",
        examples: &["ls -a", "ls -l src"],
    },
    HelpEntry {
        name: "dir",
        category: Category::Directories,
        usage: "dir [-a] [-l] [path]",
        summary: "Alias for ls.",
        examples: &[],
    },
    HelpEntry {
        name: "cd",
        category: Category::Directories,
        usage: "cd [path]",
        summary: "Change the current directory. No argument goes home, .. goes up one level.",
        examples: &["cd /tmp", "cd .."],
    },
    HelpEntry {
        name: "pwd",
        category: Category::Directories,
        usage: "pwd",
        summary: "Print the full path of the current directory.",
        examples: &[],
    },
    HelpEntry {
        name: "mkdir",
        category: Category::Directories,
        usage: "mkdir <path>...",
        summary: "Create directories, including missing parents.",
        examples: &["mkdir build/out"],
    },
    HelpEntry {
        name: "rmdir",
        category: Category::Directories,
        usage: "rmdir <path>...",
        summary: "Remove empty directories.",
        examples: &["rmdir old"],
    },
    HelpEntry {
        name: "cat",
        category: Category::Files,
        usage: "cat <file>...",
        summary: "Show the whole contents of files.",
        examples: &["cat file.txt"],
    },
    HelpEntry {
        name: "touch",
        category: Category::Files,
        usage: "touch <file>...",
        summary: "Create an empty file or update the modification time of an existing one.",
        examples: &["touch notes.md"],
    },
    HelpEntry {
        name: "rm",
        category: Category::Files,
        usage: "rm [-r] <path>...",
        summary: "Remove files. Use -r to remove directories with their contents.",
        examples: &["rm file.txt", "rm -r build"],
    },
    HelpEntry {
        name: "cp",
        category: Category::Files,
        usage: "cp [-r] <src>... <dst>",
        summary: "Copy files. Use -r to copy directories.",
        examples: &["cp file.txt backup.txt", "cp -r dir1 dir2"],
    },
    HelpEntry {
        name: "mv",
        category: Category::Files,
        usage: "mv <src>... <dst>",
        summary: "Move or rename files and directories.",
        examples: &["mv old.txt new.txt", "mv file.txt /tmp/"],
    },
    HelpEntry {
        name: "grep",
        category: Category::Search,
        usage: "grep <text> <file>",
        summary: "Show numbered lines of a file that contain the text.",
        examples: &["grep \"hello\" file.txt"],
    },
    HelpEntry {
        name: "find",
        category: Category::Search,
        usage: "find <pattern>",
        summary: "Find files and directories below the current one by name (* and ? wildcards, case-insensitive).",
        examples: &["find \"*.txt\""],
    },
    HelpEntry {
        name: "head",
        category: Category::Search,
        usage: "head [-n <count>] <file>",
        summary: "Show the first lines of a file (10 by default).",
        examples: &["head file.txt", "head -n 5 file.txt"],
    },
    HelpEntry {
        name: "tail",
        category: Category::Search,
        usage: "tail [-n <count>] <file>",
        summary: "Show the last lines of a file (10 by default).",
        examples: &["tail file.txt", "tail -n 5 file.txt"],
    },
    HelpEntry {
        name: "wc",
        category: Category::Search,
        usage: "wc <file>",
        summary: "Count lines, words and characters in a file.",
        examples: &["wc file.txt"],
    },
    HelpEntry {
        name: "echo",
        category: Category::Session,
        usage: "echo [text]...",
        summary: "Print the arguments separated by single spaces.",
        examples: &["echo hello > out.txt"],
    },
    HelpEntry {
        name: "history",
        category: Category::Session,
        usage: "history [limit]",
        summary: "Show commands entered in this session, optionally only the last few.",
        examples: &["history", "history 5"],
    },
    HelpEntry {
        name: "clear",
        category: Category::Session,
        usage: "clear",
        summary: "Clear the terminal screen.",
        examples: &[],
    },
    HelpEntry {
        name: "cls",
        category: Category::Session,
        usage: "cls",
        summary: "Alias for clear.",
        examples: &[],
    },
    HelpEntry {
        name: "help",
        category: Category::Session,
        usage: "help [--command]",
        summary: "Show this table, or details for one command.",
        examples: &["help --grep"],
    },
    HelpEntry {
        name: "exit",
        category: Category::Session,
        usage: "exit | quit",
        summary: "Leave the shell.",
        examples: &[],
    },
    HelpEntry {
        name: "quit",
        category: Category::Session,
        usage: "quit",
        summary: "Same as exit.",
        examples: &[],
    },
];

pub fn lookup(name: &str) -> Option<&'static HelpEntry> {
    let lower = name.to_lowercase();
    HELP_ENTRIES.iter().find(|e| e.name == lower)
}

/// Terminal width clamped to something a box can be drawn in.
pub fn box_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
        .clamp(MIN_WIDTH, MAX_WIDTH)
}

/// Box-drawing helper; `inner` is the printable width between the borders.
struct Frame {
    inner: usize,
    lines: Vec<String>,
}

impl Frame {
    fn new(width: usize) -> Self {
        let inner = width.saturating_sub(2);
        let top = format!("╔{}╗", "═".repeat(inner)).cyan().to_string();
        Self { inner, lines: vec![top] }
    }

    /// `plain` is used for width; `painted` is what gets printed.
    fn row(&mut self, plain: &str, painted: String) {
        let pad = self.inner.saturating_sub(plain.width() + 1);
        self.lines.push(format!(
            "{} {}{}{}",
            "║".cyan(),
            painted,
            " ".repeat(pad),
            "║".cyan()
        ));
    }

    fn text(&mut self, text: &str) {
        self.row(text, text.to_string());
    }

    fn centered(&mut self, text: &str) {
        let free = self.inner.saturating_sub(text.width());
        let left = free / 2;
        let plain = format!("{}{}", " ".repeat(left.saturating_sub(1)), text);
        let painted = format!("{}{}", " ".repeat(left.saturating_sub(1)), text.bright_cyan().bold());
        self.row(&plain, painted);
    }

    fn separator(&mut self) {
        self.lines.push(format!("╟{}╢", "─".repeat(self.inner)).cyan().to_string());
    }

    fn finish(mut self) -> String {
        self.lines.push(format!("╚{}╝", "═".repeat(self.inner)).cyan().to_string());
        self.lines.join("\n")
    }
}

/// Greedy word wrap by display width.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(10);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.width() + 1 + word.width() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Full command table.
pub fn render_table(width: usize) -> String {
    let mut frame = Frame::new(width);
    frame.centered("DELTA SHELL - COMMANDS");
    frame.separator();

    let cmd_width = HELP_ENTRIES.iter().map(|e| e.name.width()).max().unwrap_or(8) + 2;
    let desc_width = frame.inner.saturating_sub(cmd_width + 3);

    for category in Category::ALL {
        frame.row(category.title(), category.title().bright_yellow().bold().to_string());
        for entry in HELP_ENTRIES.iter().filter(|e| e.category == category) {
            for (i, line) in wrap(entry.summary, desc_width).iter().enumerate() {
                let name = if i == 0 { entry.name } else { "" };
                let pad = " ".repeat(cmd_width - name.width());
                let plain = format!(" {}{}{}", name, pad, line);
                let painted = format!(" {}{}{}", name.bright_green().bold(), pad, line);
                frame.row(&plain, painted);
            }
        }
        frame.separator();
    }

    frame.text("Use 'help --command' for details on one command.");
    frame.text("Any other program on PATH can be run too.");
    frame.finish()
}

/// Detail box for one builtin.
pub fn render_entry(entry: &HelpEntry, width: usize) -> String {
    let mut frame = Frame::new(width);
    frame.centered(&format!("HELP: {}", entry.name.to_uppercase()));
    frame.separator();
    frame.row(
        &format!("Usage: {}", entry.usage),
        format!("Usage: {}", entry.usage.bright_green().bold()),
    );
    for line in wrap(entry.summary, frame.inner.saturating_sub(2)) {
        frame.text(&line);
    }
    if !entry.examples.is_empty() {
        frame.separator();
        frame.row("Examples:", "Examples:".bold().to_string());
        for ex in entry.examples {
            let plain = format!("  {}", ex);
            frame.row(&plain, format!("  {}", ex.bright_yellow()));
        }
    }
    frame.finish()
}

fn render_system(name: &str, description: &str, width: usize) -> String {
    let mut frame = Frame::new(width);
    frame.centered(&format!("HELP: {} (system command)", name));
    frame.separator();
    for line in wrap(description, frame.inner.saturating_sub(2)) {
        frame.text(&line);
    }
    frame.separator();
    frame.text(&format!("Run '{} --help' or 'man {}' for the full manual.", name, name));
    frame.finish()
}

fn render_unknown(name: &str, width: usize) -> String {
    let mut frame = Frame::new(width);
    let msg = format!("Command '{}' not found", name);
    frame.row(&msg, msg.bright_red().bold().to_string());
    frame.text("Type 'help' for a list of available commands.");
    frame.finish()
}

/// `help <name>`; a leading `--` on the name is ignored.
pub fn render_command(name: &str, cwd: &Path) -> CommandResult {
    let name = name.strip_prefix("--").unwrap_or(name);
    let width = box_width();

    if let Some(entry) = lookup(name) {
        return CommandResult::Success(render_entry(entry, width));
    }
    match system_description(name, cwd) {
        Some(desc) => CommandResult::Success(render_system(name, &desc, width)),
        None => CommandResult::Error(render_unknown(name, width)),
    }
}

/// Ask an external program to describe itself.
pub fn system_description(name: &str, cwd: &Path) -> Option<String> {
    let program = executor::locate(name, cwd)?;

    if let Some(out) = probe(&program, &["--help"], cwd) {
        if let Some(line) = first_description_line(&out) {
            return Some(line);
        }
    }

    let man = which::which("man").ok()?;
    let out = probe(&man, &["-f", name], cwd)?;
    man_summary(&out)
}

fn probe(program: &Path, args: &[&str], cwd: &Path) -> Option<String> {
    match executor::capture(program, args, cwd, PROBE_TIMEOUT) {
        Ok(CaptureOutcome::Exited { status, output }) if status.success() => Some(output),
        Ok(_) => None,
        Err(e) => {
            log::debug!("description probe {:?} failed: {}", program, e);
            None
        }
    }
}

/// First meaningful line among the first five of `--help` output.
fn first_description_line(output: &str) -> Option<String> {
    output
        .trim()
        .lines()
        .take(5)
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("Usage:") && !l.starts_with("Options:"))
        .map(|l| {
            if l.chars().count() > MAX_DESCRIPTION {
                format!("{}...", l.chars().take(MAX_DESCRIPTION).collect::<String>())
            } else {
                l.to_string()
            }
        })
}

/// `ls (1) - list directory contents` -> `list directory contents`
fn man_summary(output: &str) -> Option<String> {
    let first = output.lines().next()?;
    let (_, desc) = first.split_once(" - ")?;
    let desc = desc.trim();
    (!desc.is_empty()).then(|| desc.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_entries() {
        for category in Category::ALL {
            assert!(HELP_ENTRIES.iter().any(|e| e.category == category));
        }
    }

    fn strip_ansi(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_table_lines_fit_width() {
        let table = render_table(70);
        for line in table.lines() {
            assert_eq!(strip_ansi(line).width(), 70, "{:?}", line);
        }
        assert!(table.contains("grep"));
        assert!(table.contains("DIRECTORIES"));
    }

    #[test]
    fn test_render_builtin_detail() {
        let cwd = std::env::temp_dir();
        let result = render_command("--head", &cwd);
        assert!(result.is_success());
        assert!(result.message().contains("head -n 5 file.txt"));
        assert!(render_command("LS", &cwd).is_success());
    }

    #[test]
    fn test_unknown_command_is_error() {
        let cwd = std::env::temp_dir();
        let result = render_command("definitely_not_a_real_command_xyz", &cwd);
        assert!(result.is_error());
        assert!(result.message().contains("not found"));
    }

    #[test]
    fn test_first_description_line() {
        let out = "Usage: tool [OPTIONS]\n\nA tool that does things.\nOptions:\n";
        assert_eq!(first_description_line(out).as_deref(), Some("A tool that does things."));
        assert_eq!(first_description_line("Usage: x\nOptions:\n"), None);

        let long = "x".repeat(250);
        let line = first_description_line(&long).unwrap();
        assert_eq!(line.chars().count(), MAX_DESCRIPTION + 3);
    }

    #[test]
    fn test_man_summary() {
        assert_eq!(
            man_summary("ls (1)               - list directory contents\n").as_deref(),
            Some("list directory contents")
        );
        assert_eq!(man_summary("nothing appropriate."), None);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aaa bbb ccc", 10), vec!["aaa bbb", "ccc"]);
        assert!(wrap("", 10).is_empty());
    }
}

//! Session working directory
//!
//! The shell never calls `std::env::set_current_dir`; every path a command
//! touches is resolved here and child processes get the directory explicitly.

use std::env;
use std::fs::{self, DirEntry, Metadata};
use std::path::{Component, Path, PathBuf};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use unicode_width::UnicodeWidthStr;

/// Flags accepted by `ls`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// `-a`: include dotfiles
    pub all: bool,
    /// `-l`: one detailed entry per line
    pub long: bool,
}

impl ListOptions {
    /// Parse `-a`, `-l`, `-la` style flags; returns the options and the first
    /// non-flag argument.
    pub fn parse(args: &[String]) -> (Self, Option<&str>) {
        let mut opts = ListOptions::default();
        let mut target = None;
        for arg in args {
            if let Some(flags) = arg.strip_prefix('-') {
                for ch in flags.chars() {
                    match ch {
                        'a' => opts.all = true,
                        'l' => opts.long = true,
                        _ => {}
                    }
                }
            } else if target.is_none() {
                target = Some(arg.as_str());
            }
        }
        (opts, target)
    }
}

#[derive(Debug, Clone)]
pub struct WorkingDir {
    cwd: PathBuf,
}

impl WorkingDir {
    /// Start in the process directory, or in home when launched from `/`.
    pub fn new() -> Result<Self> {
        let cwd = env::current_dir().context("cannot determine current directory")?;
        let cwd = if cwd.parent().is_none() {
            dirs::home_dir().unwrap_or(cwd)
        } else {
            cwd
        };
        Ok(Self { cwd })
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { cwd: dir.into() }
    }

    pub fn current(&self) -> &Path {
        &self.cwd
    }

    /// Resolve `path` against the session directory, folding `.` and `..`.
    pub fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            return self.cwd.clone();
        }

        let expanded = expand_tilde(path);
        let mut result = if expanded.is_absolute() {
            PathBuf::new()
        } else {
            self.cwd.clone()
        };

        for component in expanded.components() {
            match component {
                Component::Prefix(p) => result.push(p.as_os_str()),
                Component::RootDir => result.push(Component::RootDir.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(name) => result.push(name),
            }
        }

        result
    }

    /// `cd`. Empty path means home.
    pub fn change(&mut self, path: &str) -> Result<&Path> {
        let target = if path.is_empty() {
            dirs::home_dir().context("cd: cannot determine home directory")?
        } else {
            self.resolve(path)
        };

        if !target.exists() {
            bail!("cd: {}: No such directory", target.display());
        }
        if !target.is_dir() {
            bail!("cd: {}: Not a directory", target.display());
        }

        self.cwd = target;
        Ok(&self.cwd)
    }

    pub fn create_dir(&self, path: &str) -> Result<PathBuf> {
        let target = self.resolve(path);
        if target.exists() {
            bail!("mkdir: {}: already exists", target.display());
        }
        fs::create_dir_all(&target)
            .with_context(|| format!("mkdir: cannot create '{}'", target.display()))?;
        Ok(target)
    }

    /// `rmdir` only removes empty directories.
    pub fn remove_dir(&self, path: &str) -> Result<PathBuf> {
        let target = self.resolve(path);
        if !target.exists() {
            bail!("rmdir: {}: No such directory", target.display());
        }
        if !target.is_dir() {
            bail!("rmdir: {}: Not a directory", target.display());
        }
        let mut entries = fs::read_dir(&target)
            .with_context(|| format!("rmdir: cannot access '{}'", target.display()))?;
        if entries.next().is_some() {
            bail!("rmdir: {}: Directory not empty (use rm -r)", target.display());
        }
        fs::remove_dir(&target)
            .with_context(|| format!("rmdir: cannot remove '{}'", target.display()))?;
        Ok(target)
    }

    /// Render a directory listing as text.
    pub fn list(&self, path: &str, opts: ListOptions) -> Result<String> {
        let target = self.resolve(path);
        let entries = fs::read_dir(&target)
            .with_context(|| format!("ls: cannot access '{}'", target.display()))?;

        let mut items: Vec<DirEntry> = entries
            .filter_map(|e| e.ok())
            .filter(|e| opts.all || !e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        items.sort_by_key(|e| e.file_name());

        if opts.long {
            Ok(format_long(&items))
        } else {
            let term_width = crossterm::terminal::size()
                .map(|(w, _)| w as usize)
                .unwrap_or(80);
            Ok(format_columns(&items, term_width))
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn paint_name(name: &str, is_dir: bool) -> String {
    if is_dir {
        name.blue().bold().to_string()
    } else {
        name.to_string()
    }
}

fn format_columns(items: &[DirEntry], term_width: usize) -> String {
    let names: Vec<(String, bool)> = items
        .iter()
        .map(|e| {
            let is_dir = e.file_type().map(|t| t.is_dir()).unwrap_or(false);
            (e.file_name().to_string_lossy().to_string(), is_dir)
        })
        .collect();

    if names.is_empty() {
        return String::new();
    }

    let max_len = names.iter().map(|(n, _)| n.width()).max().unwrap_or(10);
    let col_width = max_len + 2;
    let num_cols = (term_width / col_width).max(1);

    let mut out = String::new();
    for (i, (name, is_dir)) in names.iter().enumerate() {
        let last_in_row = (i + 1) % num_cols == 0 || i == names.len() - 1;
        out.push_str(&paint_name(name, *is_dir));
        if last_in_row {
            out.push('\n');
        } else {
            out.push_str(&" ".repeat(col_width - name.width()));
        }
    }
    out.truncate(out.trim_end_matches('\n').len());
    out
}

fn format_long(items: &[DirEntry]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 1);
    let mut total_blocks = 0u64;

    for entry in items {
        let Ok(meta) = entry.metadata() else { continue };
        total_blocks += meta.len().div_ceil(512);

        let name = entry.file_name().to_string_lossy().to_string();
        let modified = meta
            .modified()
            .map(|t| {
                let datetime: chrono::DateTime<chrono::Local> = t.into();
                datetime.format("%b %d %H:%M").to_string()
            })
            .unwrap_or_else(|_| "??? ?? ??:??".to_string());

        lines.push(format!(
            "{} {:>10} {} {}",
            mode_string(&meta),
            meta.len(),
            modified,
            paint_name(&name, meta.is_dir())
        ));
    }

    let mut out = format!("total {}", total_blocks);
    for line in lines {
        out.push('\n');
        out.push_str(&line);
    }
    out
}

fn type_char(meta: &Metadata) -> char {
    let ft = meta.file_type();
    if ft.is_dir() {
        'd'
    } else if ft.is_symlink() {
        'l'
    } else {
        '-'
    }
}

#[cfg(unix)]
fn mode_string(meta: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    let mut s = String::with_capacity(10);
    s.push(type_char(meta));
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(not(unix))]
fn mode_string(meta: &Metadata) -> String {
    let write = if meta.permissions().readonly() { '-' } else { 'w' };
    format!("{}r{}-", type_char(meta), write)
}

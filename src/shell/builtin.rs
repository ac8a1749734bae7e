//! Built-in commands
//!
//! Every handler takes the session directory and the arguments after the
//! command name, validates them itself, and returns the text to show. Paths
//! always go through [`WorkingDir::resolve`].

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use anyhow::{anyhow, bail, Context, Result};
use glob::{MatchOptions, Pattern};

use super::workdir::{ListOptions, WorkingDir};

/// Handler signature shared by every table-driven builtin.
pub type Handler = fn(&mut WorkingDir, &[String]) -> Result<String>;

/// `find` stops after this many matches.
pub const FIND_LIMIT: usize = 100;

const DEFAULT_LINES: usize = 10;

fn is_recursive_flag(arg: &str) -> bool {
    matches!(arg, "-r" | "-R" | "--recursive")
}

fn operands(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with('-'))
        .collect()
}

/// ls / dir - list directory
pub fn builtin_ls(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let (opts, target) = ListOptions::parse(args);
    wd.list(target.unwrap_or(""), opts)
}

/// cd - change directory
pub fn builtin_cd(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let target = args.first().map(String::as_str).unwrap_or("");
    let dir = wd.change(target)?;
    Ok(format!("Changed to {}", dir.display()))
}

/// pwd - print working directory
pub fn builtin_pwd(wd: &mut WorkingDir, _args: &[String]) -> Result<String> {
    Ok(wd.current().display().to_string())
}

/// mkdir - create directories (parents included)
pub fn builtin_mkdir(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let paths = operands(args);
    if paths.is_empty() {
        bail!("mkdir: missing directory operand. Example: mkdir new_folder");
    }
    let mut created = Vec::with_capacity(paths.len());
    for p in paths {
        let dir = wd.create_dir(p)?;
        created.push(format!("Directory created: {}", dir.display()));
    }
    Ok(created.join("\n"))
}

/// rmdir - remove empty directories
pub fn builtin_rmdir(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let paths = operands(args);
    if paths.is_empty() {
        bail!("rmdir: missing directory operand. Example: rmdir old_folder");
    }
    let mut removed = Vec::with_capacity(paths.len());
    for p in paths {
        let dir = wd.remove_dir(p)?;
        removed.push(format!("Directory removed: {}", dir.display()));
    }
    Ok(removed.join("\n"))
}

/// cat - display file contents
pub fn builtin_cat(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let files = operands(args);
    if files.is_empty() {
        bail!("cat: missing file operand. Example: cat readme.txt");
    }

    let mut out = String::new();
    for file in files {
        let target = existing_file(wd, "cat", file)?;
        let bytes = fs::read(&target)
            .with_context(|| format!("cat: error reading {}", target.display()))?;
        out.push_str(&String::from_utf8_lossy(&bytes));
    }
    Ok(out)
}

/// touch - create empty file or update file timestamp
pub fn builtin_touch(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let files = operands(args);
    if files.is_empty() {
        bail!("touch: missing file operand. Example: touch newfile.txt");
    }

    let mut lines = Vec::with_capacity(files.len());
    for file in files {
        let target = wd.resolve(file);
        if target.exists() {
            let f = fs::OpenOptions::new()
                .write(true)
                .open(&target)
                .with_context(|| format!("touch: cannot touch '{}': Permission denied", target.display()))?;
            f.set_modified(SystemTime::now())
                .with_context(|| format!("touch: cannot update '{}'", target.display()))?;
            lines.push(format!("File updated: {}", target.display()));
        } else {
            File::create(&target)
                .with_context(|| format!("touch: cannot touch '{}'", target.display()))?;
            lines.push(format!("File created: {}", target.display()));
        }
    }
    Ok(lines.join("\n"))
}

/// rm - remove files, or directories with -r
pub fn builtin_rm(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let recursive = args.iter().any(|a| is_recursive_flag(a));
    let targets = operands(args);
    if targets.is_empty() {
        bail!("rm: missing operand. Example: rm file.txt");
    }

    let mut lines = Vec::with_capacity(targets.len());
    for arg in targets {
        let target = wd.resolve(arg);
        if target.is_dir() {
            if !recursive {
                bail!("rm: {}: is a directory (use rm -r {})", target.display(), arg);
            }
            fs::remove_dir_all(&target)
                .with_context(|| format!("rm: cannot remove '{}'", target.display()))?;
            lines.push(format!("Directory removed: {}", target.display()));
        } else if target.exists() || target.is_symlink() {
            fs::remove_file(&target)
                .with_context(|| format!("rm: cannot remove '{}'", target.display()))?;
            lines.push(format!("File removed: {}", target.display()));
        } else {
            bail!("rm: {}: No such file or directory", target.display());
        }
    }
    Ok(lines.join("\n"))
}

/// cp - copy files, or directories with -r
pub fn builtin_cp(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let recursive = args.iter().any(|a| is_recursive_flag(a));
    let paths = operands(args);
    let Some((dest_arg, sources)) = paths.split_last().filter(|(_, s)| !s.is_empty()) else {
        bail!("cp: missing destination. Example: cp file.txt backup.txt");
    };

    let dest = wd.resolve(dest_arg);
    let mut lines = Vec::with_capacity(sources.len());

    for src_arg in sources {
        let src = wd.resolve(src_arg);
        if !src.exists() {
            bail!("cp: {}: No such file or directory", src.display());
        }
        let dest_path = into_dir(&src, &dest)?;

        if src.is_dir() {
            if !recursive {
                bail!("cp: {}: is a directory (use cp -r {} {})", src.display(), src_arg, dest_arg);
            }
            copy_dir_all(&src, &dest_path)?;
            lines.push(format!("Directory copied: {} -> {}", src.display(), dest_path.display()));
        } else {
            fs::copy(&src, &dest_path).with_context(|| {
                format!("cp: cannot copy '{}' to '{}'", src.display(), dest_path.display())
            })?;
            lines.push(format!("File copied: {} -> {}", src.display(), dest_path.display()));
        }
    }
    Ok(lines.join("\n"))
}

/// Helper: copy directory recursively
fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    if dst.starts_with(src) {
        bail!("cp: cannot copy '{}' into itself", src.display());
    }
    fs::create_dir_all(dst).with_context(|| format!("cp: cannot create '{}'", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("cp: cannot read '{}'", src.display()))? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let dest_path = dst.join(entry.file_name());
        if ty.is_dir() {
            copy_dir_all(&entry.path(), &dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)
                .with_context(|| format!("cp: cannot copy '{}'", entry.path().display()))?;
        }
    }
    Ok(())
}

/// mv - move/rename
pub fn builtin_mv(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let paths = operands(args);
    let Some((dest_arg, sources)) = paths.split_last().filter(|(_, s)| !s.is_empty()) else {
        bail!("mv: missing destination. Example: mv old.txt new.txt");
    };

    let dest = wd.resolve(dest_arg);
    let mut lines = Vec::with_capacity(sources.len());

    for src_arg in sources {
        let src = wd.resolve(src_arg);
        if !src.exists() {
            bail!("mv: {}: No such file or directory", src.display());
        }
        let dest_path = into_dir(&src, &dest)?;
        fs::rename(&src, &dest_path).with_context(|| {
            format!("mv: cannot move '{}' to '{}'", src.display(), dest_path.display())
        })?;
        lines.push(format!("Moved: {} -> {}", src.display(), dest_path.display()));
    }
    Ok(lines.join("\n"))
}

/// Copy/move into `dest` when it is an existing directory.
fn into_dir(src: &Path, dest: &Path) -> Result<PathBuf> {
    if dest.is_dir() {
        let name = src
            .file_name()
            .ok_or_else(|| anyhow!("cannot get filename of '{}'", src.display()))?;
        Ok(dest.join(name))
    } else {
        Ok(dest.to_path_buf())
    }
}

fn existing_file(wd: &WorkingDir, cmd: &str, file: &str) -> Result<PathBuf> {
    let target = wd.resolve(file);
    if !target.exists() {
        bail!("{}: {}: No such file", cmd, target.display());
    }
    if !target.is_file() {
        bail!("{}: {}: Not a file", cmd, target.display());
    }
    Ok(target)
}

/// grep - show lines of a file containing text
pub fn builtin_grep(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let [needle, file, ..] = args else {
        bail!("grep: usage: grep <text> <file>. Example: grep \"hello\" file.txt");
    };
    let target = existing_file(wd, "grep", file)?;
    let reader = BufReader::new(
        File::open(&target).with_context(|| format!("grep: cannot open '{}'", target.display()))?,
    );

    let mut matches = Vec::new();
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line.with_context(|| format!("grep: error reading {}", target.display()))?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end();
        if line.contains(needle.as_str()) {
            matches.push(format!("{}: {}", idx + 1, line));
        }
    }

    if matches.is_empty() {
        Ok(format!("Text '{}' not found in file", needle))
    } else {
        Ok(matches.join("\n"))
    }
}

/// find - case-insensitive wildcard search under the current directory
pub fn builtin_find(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let Some(raw) = args.last() else {
        bail!("find: missing pattern. Example: find \"*.txt\"");
    };
    let raw = raw.trim_matches(|c: char| c == '"' || c == '\'');
    let pattern = Pattern::new(raw).with_context(|| format!("find: invalid pattern '{}'", raw))?;
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut found = Vec::new();
    walk_matches(wd.current(), &pattern, options, &mut found);

    if found.is_empty() {
        Ok(format!("Nothing found for pattern: {}", raw))
    } else {
        Ok(found
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn walk_matches(dir: &Path, pattern: &Pattern, options: MatchOptions, found: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else { return };
    let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        if found.len() >= FIND_LIMIT {
            return;
        }
        let name = entry.file_name();
        if pattern.matches_with(&name.to_string_lossy(), options) {
            found.push(entry.path());
        }
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            subdirs.push(entry.path());
        }
    }

    for sub in subdirs {
        if found.len() >= FIND_LIMIT {
            return;
        }
        walk_matches(&sub, pattern, options, found);
    }
}

/// Split `-n N` / `-nN` from the file operand; the file is the last operand.
fn parse_head_tail_args<'a>(cmd: &str, args: &'a [String]) -> Result<(usize, &'a str)> {
    let mut count = DEFAULT_LINES;
    let mut file = None;

    let mut i = 0usize;
    while i < args.len() {
        let arg = args[i].as_str();
        let value = if arg == "-n" {
            i += 1;
            Some(
                args.get(i)
                    .map(String::as_str)
                    .ok_or_else(|| anyhow!("{}: option -n requires a number", cmd))?,
            )
        } else {
            arg.strip_prefix("-n").filter(|rest| !rest.is_empty())
        };

        match value {
            Some(v) => {
                count = v
                    .parse()
                    .map_err(|_| anyhow!("{}: invalid number of lines: '{}'", cmd, v))?;
            }
            None => file = Some(arg),
        }
        i += 1;
    }

    let file = file.ok_or_else(|| anyhow!("{}: missing file operand. Example: {} file.txt", cmd, cmd))?;
    Ok((count, file))
}

fn read_lines(target: &Path, cmd: &str) -> Result<Vec<String>> {
    let bytes = fs::read(target).with_context(|| format!("{}: error reading {}", cmd, target.display()))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

/// head - show first N lines
pub fn builtin_head(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let (count, file) = parse_head_tail_args("head", args)?;
    let target = existing_file(wd, "head", file)?;
    let lines = read_lines(&target, "head")?;
    Ok(lines.into_iter().take(count).collect::<Vec<_>>().join("\n"))
}

/// tail - show last N lines
pub fn builtin_tail(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let (count, file) = parse_head_tail_args("tail", args)?;
    let target = existing_file(wd, "tail", file)?;

    let mut ring: VecDeque<String> = VecDeque::with_capacity(count.max(1));
    for line in read_lines(&target, "tail")? {
        if count == 0 {
            break;
        }
        if ring.len() == count {
            ring.pop_front();
        }
        ring.push_back(line);
    }
    Ok(Vec::from(ring).join("\n"))
}

/// wc - count lines, words and characters
pub fn builtin_wc(wd: &mut WorkingDir, args: &[String]) -> Result<String> {
    let Some(file) = operands(args).last().copied() else {
        bail!("wc: missing file operand. Example: wc file.txt");
    };
    let target = existing_file(wd, "wc", file)?;
    let bytes = fs::read(&target).with_context(|| format!("wc: error reading {}", target.display()))?;
    let content = String::from_utf8_lossy(&bytes);

    let lines = content.matches('\n').count();
    let words = content.split_whitespace().count();
    let chars = content.chars().count();
    Ok(format!(
        "Lines: {}, Words: {}, Chars: {} - {}",
        lines,
        words,
        chars,
        target.display()
    ))
}

//! Shell core module

pub mod builtin;
pub mod completer;
pub mod error;
pub mod executor;
pub mod help;
pub mod history;
pub mod parser;
pub mod redirect;
pub mod registry;
pub mod result;
pub mod workdir;

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::Result;
use colored::Colorize;

pub use error::ShellError;
pub use result::CommandResult;

use executor::ExternalRunner;
use history::History;
use registry::{CommandRegistry, EXIT_COMMANDS};
use workdir::WorkingDir;

/// Main shell state
pub struct Shell {
    /// Session working directory
    pub wd: WorkingDir,
    /// Commands entered this session
    pub history: History,
    registry: CommandRegistry,
    runner: ExternalRunner,
    /// Set by `exit` / `quit`
    pub should_exit: bool,
}

impl Shell {
    pub fn new() -> Result<Self> {
        Ok(Self::with_workdir(WorkingDir::new()?))
    }

    pub fn with_workdir(wd: WorkingDir) -> Self {
        Self {
            wd,
            history: History::new(),
            registry: CommandRegistry::new(),
            runner: ExternalRunner::new(),
            should_exit: false,
        }
    }

    /// Override the limit for captured external commands.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner = ExternalRunner::with_timeout(timeout);
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Record `line` in history, then run it.
    pub fn submit(&mut self, line: &str) -> CommandResult {
        self.history.add(line);
        self.execute_line(line)
    }

    /// Run one line: tokenize, split off redirects, dispatch, redirect.
    pub fn execute_line(&mut self, line: &str) -> CommandResult {
        let trimmed = line.trim();
        if EXIT_COMMANDS.contains(&trimmed.to_lowercase().as_str()) {
            self.should_exit = true;
            return CommandResult::success("");
        }

        let (invocation, spec) = match parser::parse(line) {
            Ok(parsed) => parsed,
            Err(e) => return e.into(),
        };
        log::debug!("invocation {:?} redirect {:?}", invocation, spec);

        let Some(target) = spec.output_target.as_deref() else {
            return self.registry.dispatch(&invocation, &mut self.wd, &self.history, &self.runner);
        };

        // Files get plain text.
        colored::control::set_override(false);
        let result = self.registry.dispatch(&invocation, &mut self.wd, &self.history, &self.runner);
        colored::control::unset_override();

        let path = self.wd.resolve(target);
        redirect::apply(&invocation.key(), result, &path, spec.append)
    }

    /// Get prompt string
    pub fn prompt(&self) -> String {
        fn shorten(s: &str, max: usize) -> String {
            if s.chars().count() <= max {
                return s.to_string();
            }
            let head = s.chars().take(max / 2).collect::<String>();
            let tail = s.chars().rev().take(max / 2 - 1).collect::<String>();
            format!("{}…{}", head, tail.chars().rev().collect::<String>())
        }

        let cwd = self.wd.current();
        let cwd_str = match dirs::home_dir() {
            Some(home) if cwd.starts_with(&home) => {
                let rest = cwd.strip_prefix(&home).unwrap_or(cwd);
                if rest.as_os_str().is_empty() {
                    "~".to_string()
                } else {
                    PathBuf::from("~").join(rest).display().to_string()
                }
            }
            _ => cwd.display().to_string(),
        };

        format!(
            "[{}@{}][{}]> ",
            user_name().bright_green().bold(),
            host_name().bright_green(),
            shorten(&cwd_str, 64).bright_cyan()
        )
    }
}

fn user_name() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string())
}

fn host_name() -> String {
    if let Ok(host) = env::var("HOSTNAME").or_else(|_| env::var("COMPUTERNAME")) {
        return host;
    }
    std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

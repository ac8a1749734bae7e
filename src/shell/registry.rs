//! Command registry and dispatch
//!
//! Resolution order for a case-folded name:
//! 1. table-driven builtins (`ls`, `cd`, `cat`, ...)
//! 2. `history [limit]`
//! 3. `clear` / `cls`
//! 4. `echo`
//! 5. `help [--command]`
//! 6. anything that is not a reserved builtin name runs as an external program
//! 7. a reserved name that reached this point is reported as not found

use std::collections::HashMap;
use std::io;
use crossterm::{cursor::MoveTo, execute, terminal::{Clear, ClearType}};

use super::builtin::{self, Handler};
use super::error::ShellError;
use super::executor::ExternalRunner;
use super::help;
use super::history::History;
use super::parser::Invocation;
use super::result::CommandResult;
use super::workdir::WorkingDir;

/// Names handled by the dispatcher itself rather than the table.
const PSEUDO_COMMANDS: &[&str] = &["history", "clear", "cls", "echo", "help"];

/// Names the REPL intercepts before dispatch.
pub const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

#[derive(Clone, Copy)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub handler: Handler,
}

impl CommandDescriptor {
    pub fn run(&self, wd: &mut WorkingDir, args: &[String]) -> CommandResult {
        (self.handler)(wd, args).into()
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor").field("name", &self.name).finish()
    }
}

/// Immutable name -> handler table, built once per shell.
#[derive(Debug)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let table: &[(&'static str, Handler)] = &[
            ("ls", builtin::builtin_ls),
            ("dir", builtin::builtin_ls),
            ("cd", builtin::builtin_cd),
            ("pwd", builtin::builtin_pwd),
            ("mkdir", builtin::builtin_mkdir),
            ("rmdir", builtin::builtin_rmdir),
            ("cat", builtin::builtin_cat),
            ("touch", builtin::builtin_touch),
            ("rm", builtin::builtin_rm),
            ("cp", builtin::builtin_cp),
            ("mv", builtin::builtin_mv),
            ("grep", builtin::builtin_grep),
            ("find", builtin::builtin_find),
            ("head", builtin::builtin_head),
            ("tail", builtin::builtin_tail),
            ("wc", builtin::builtin_wc),
        ];

        let commands = table
            .iter()
            .map(|&(name, handler)| (name, CommandDescriptor { name, handler }))
            .collect();
        Self { commands }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name.to_lowercase().as_str())
    }

    /// Every name the shell reserves: table entries, pseudo-commands and exit.
    pub fn is_builtin(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.commands.contains_key(lower.as_str())
            || PSEUDO_COMMANDS.contains(&lower.as_str())
            || EXIT_COMMANDS.contains(&lower.as_str())
    }

    /// Sorted reserved names, for completion.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .commands
            .keys()
            .copied()
            .chain(PSEUDO_COMMANDS.iter().copied())
            .chain(EXIT_COMMANDS.iter().copied())
            .collect();
        names.sort_unstable();
        names
    }

    /// Run one invocation to completion.
    pub fn dispatch(
        &self,
        invocation: &Invocation,
        wd: &mut WorkingDir,
        history: &History,
        runner: &ExternalRunner,
    ) -> CommandResult {
        let key = invocation.key();
        let args = &invocation.args;

        if let Some(descriptor) = self.get(&key) {
            log::debug!("dispatch {} -> builtin", key);
            return descriptor.run(wd, args);
        }

        match key.as_str() {
            "history" => history_command(history, args),
            "clear" | "cls" => clear_screen(),
            "echo" => CommandResult::Success(args.join(" ")),
            "help" => match args.first() {
                Some(name) => help::render_command(name, wd.current()),
                None => CommandResult::Success(help::render_table(help::box_width())),
            },
            _ if !self.is_builtin(&key) => {
                log::debug!("dispatch {} -> external", invocation.name);
                runner.run(&invocation.name, args, wd.current())
            }
            _ => ShellError::CommandNotFound(key).into(),
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn history_command(history: &History, args: &[String]) -> CommandResult {
    let limit = match args.first() {
        None => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) => Some(n.max(1) as usize),
            Err(_) => return CommandResult::error(format!("history: limit must be a number, got '{}'", raw)),
        },
    };
    CommandResult::Success(history.render(limit))
}

fn clear_screen() -> CommandResult {
    if let Err(e) = execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0)) {
        log::debug!("clear failed: {}", e);
    }
    CommandResult::success("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(line: &str) -> Invocation {
        super::super::parser::parse(line).unwrap().0
    }

    #[test]
    fn test_is_builtin_case_insensitive() {
        let registry = CommandRegistry::new();
        assert!(registry.is_builtin("ls"));
        assert!(registry.is_builtin("LS"));
        assert!(registry.is_builtin("History"));
        assert!(registry.is_builtin("exit"));
        assert!(!registry.is_builtin("definitely_not_a_builtin"));
        assert!(registry.get("Dir").is_some());
    }

    #[test]
    fn test_echo_and_history() {
        let registry = CommandRegistry::new();
        let runner = ExternalRunner::new();
        let mut wd = WorkingDir::at(std::env::temp_dir());
        let mut history = History::new();
        for cmd in ["one", "two", "three", "four", "five"] {
            history.add(cmd);
        }

        let r = registry.dispatch(&invocation("ECHO a  b"), &mut wd, &history, &runner);
        assert_eq!(r, CommandResult::Success("a b".into()));

        let r = registry.dispatch(&invocation("history 2"), &mut wd, &history, &runner);
        assert_eq!(r, CommandResult::Success("4. four\n5. five".into()));

        let r = registry.dispatch(&invocation("history 0"), &mut wd, &history, &runner);
        assert_eq!(r, CommandResult::Success("5. five".into()));

        let r = registry.dispatch(&invocation("history x"), &mut wd, &history, &runner);
        assert!(r.is_error());
    }

    #[test]
    fn test_reserved_name_with_args_is_not_found() {
        let registry = CommandRegistry::new();
        let runner = ExternalRunner::new();
        let mut wd = WorkingDir::at(std::env::temp_dir());
        let history = History::new();

        let r = registry.dispatch(&invocation("exit now"), &mut wd, &history, &runner);
        assert_eq!(
            r,
            CommandResult::Error("Command 'exit' not found. Type 'help' for a list of commands".into())
        );
    }

    #[test]
    fn test_unknown_external() {
        let registry = CommandRegistry::new();
        let runner = ExternalRunner::new();
        let mut wd = WorkingDir::at(std::env::temp_dir());
        let history = History::new();

        let r = registry.dispatch(&invocation("no_such_prog_abc123"), &mut wd, &history, &runner);
        assert!(r.is_error());
        assert!(r.message().contains("no_such_prog_abc123"));
    }

    #[test]
    fn test_every_command_has_help() {
        let registry = CommandRegistry::new();
        for name in registry.names() {
            assert!(help::lookup(name).is_some(), "no help entry for {}", name);
        }
    }

    #[test]
    fn test_help_table() {
        let registry = CommandRegistry::new();
        let runner = ExternalRunner::new();
        let mut wd = WorkingDir::at(std::env::temp_dir());
        let history = History::new();

        let r = registry.dispatch(&invocation("help"), &mut wd, &history, &runner);
        assert!(r.is_success());
        assert!(r.message().contains("mkdir"));
    }
}

//! Typed failures raised by the interpreter core.
//!
//! Every variant ends up as a [`CommandResult::Error`] at the point where it
//! happens; nothing here unwinds past the dispatcher.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::result::CommandResult;

#[derive(Debug, Error)]
pub enum ShellError {
    // Parsing
    #[error("Operator '{0}' requires a filename")]
    MissingRedirectTarget(String),
    #[error("Redirection '{0}' is not implemented")]
    RedirectNotImplemented(String),
    #[error("Unsupported redirection operator '{0}'")]
    UnsupportedRedirect(String),
    #[error("Multiple output redirections ('{first}' and '{second}')")]
    DuplicateRedirect { first: String, second: String },
    #[error("Empty command")]
    EmptyCommand,

    // Dispatch
    #[error("Command '{0}' not found. Type 'help' for a list of commands")]
    CommandNotFound(String),

    // External processes
    #[error("Command '{0}' not found in system PATH")]
    NotOnPath(String),
    #[error("Command exited with error: {0}")]
    ExitStatus(String),
    #[error("Command failed with code {code}\n{output}")]
    FailedWithOutput { code: String, output: String },
    #[error("Command '{name}' exceeded time limit of {} seconds", .limit.as_secs())]
    Timeout { name: String, limit: Duration },
    #[error("Command '{0}' interrupted by user")]
    Interrupted(String),
    #[error("Execution error: {0}")]
    Spawn(#[source] std::io::Error),

    // Redirection
    #[error("Error writing to file {}: {source}", .path.display())]
    RedirectIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ShellError> for CommandResult {
    fn from(err: ShellError) -> Self {
        CommandResult::Error(err.to_string())
    }
}

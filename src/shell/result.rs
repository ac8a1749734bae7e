//! Uniform outcome of every command, redirection and dispatch step.

use std::fmt;

/// Status tag plus message. `Success` carries the payload to print (possibly
/// empty), `Error` carries a human-readable description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Success(String),
    Error(String),
}

impl CommandResult {
    pub fn success(payload: impl Into<String>) -> Self {
        CommandResult::Success(payload.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        CommandResult::Error(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CommandResult::Error(_))
    }

    /// The payload or error message, whichever this result holds.
    pub fn message(&self) -> &str {
        match self {
            CommandResult::Success(s) | CommandResult::Error(s) => s,
        }
    }

    /// Process exit code for `dshell -c`.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandResult::Success(_) => 0,
            CommandResult::Error(_) => 1,
        }
    }
}

/// Handlers build on `anyhow` internally; the whole context chain becomes the
/// error message.
impl From<anyhow::Result<String>> for CommandResult {
    fn from(value: anyhow::Result<String>) -> Self {
        match value {
            Ok(payload) => CommandResult::Success(payload),
            Err(e) => CommandResult::Error(format!("{:#}", e)),
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_anyhow_chain_is_flattened() {
        let res: anyhow::Result<String> = std::fs::read_to_string("/definitely/not/here")
            .with_context(|| "cat: /definitely/not/here: No such file".to_string());
        let result = CommandResult::from(res);
        assert!(result.is_error());
        assert!(result.message().starts_with("cat: /definitely/not/here: No such file: "));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CommandResult::success("").exit_code(), 0);
        assert_eq!(CommandResult::error("x").exit_code(), 1);
    }
}

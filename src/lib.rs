//! Delta Shell - line-oriented command interpreter
//!
//! Features:
//! - Quote-aware tokenizer with `>` / `>>` output redirection
//! - Case-insensitive builtins for everyday file work
//! - External programs on `PATH`, with a timeout for captured commands
//! - Ctrl+C cancels the running child, never the shell

pub mod interrupt;
pub mod shell;

pub use shell::{CommandResult, Shell};

//! Output redirection (`>` and `>>`)
//!
//! The command's result text goes to the file verbatim, without a trailing
//! newline. Error messages are written too, so a failed command leaves its
//! diagnostics behind.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use super::error::ShellError;
use super::result::CommandResult;

/// Write `result` to `target` and return the confirmation that replaces it.
pub fn apply(command: &str, result: CommandResult, target: &Path, append: bool) -> CommandResult {
    let payload = result.message();
    if let Err(source) = write_payload(target, payload, append) {
        log::warn!("redirect to {} failed: {}", target.display(), source);
        return ShellError::RedirectIo {
            path: target.to_path_buf(),
            source,
        }
        .into();
    }

    match result {
        CommandResult::Success(_) => CommandResult::Success(format!(
            "Output of '{}' redirected to {}",
            command,
            target.display()
        )),
        CommandResult::Error(_) => CommandResult::Error(format!(
            "Command '{}' failed, details in {}",
            command,
            target.display()
        )),
    }
}

fn write_payload(target: &Path, payload: &str, append: bool) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(target)?;
    file.write_all(payload.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_truncate_replaces_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out.txt");

        let result = apply("echo", CommandResult::success("first"), &target, false);
        assert!(result.is_success());
        assert_eq!(fs::read_to_string(&target).unwrap(), "first");

        apply("echo", CommandResult::success("hi"), &target, false);
        assert_eq!(fs::read_to_string(&target).unwrap(), "hi");
    }

    #[test]
    fn test_append_has_no_separator() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out.txt");

        apply("echo", CommandResult::success("a"), &target, true);
        apply("echo", CommandResult::success("b"), &target, true);
        assert_eq!(fs::read_to_string(&target).unwrap(), "ab");
    }

    #[test]
    fn test_error_is_written_and_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("err.txt");

        let result = apply("cat", CommandResult::error("cat: missing"), &target, false);
        assert_eq!(
            result,
            CommandResult::Error(format!("Command 'cat' failed, details in {}", target.display()))
        );
        assert_eq!(fs::read_to_string(&target).unwrap(), "cat: missing");
    }

    #[test]
    fn test_unwritable_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("no/such/dir/out.txt");

        let result = apply("echo", CommandResult::success("x"), &target, false);
        assert!(result.is_error());
        assert!(result.message().starts_with("Error writing to file"));
    }
}

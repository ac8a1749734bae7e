//! External command execution
//!
//! Commands are classified before spawning:
//! - Interactive programs (editors, pagers, REPLs) and streaming programs
//!   (`ping`, `tail -f`, ...) get the terminal directly and run until they exit.
//! - Everything else runs with stdout/stderr captured and a wall-clock limit.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

use super::error::ShellError;
use super::result::CommandResult;
use crate::interrupt;

/// Limit for captured (standard) commands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Programs that need the terminal for input or full-screen output.
const INTERACTIVE_COMMANDS: &[&str] = &[
    // editors
    "nano", "vim", "vi", "nvim", "emacs", "gedit", "kate", "code",
    // monitors, pagers, viewers
    "htop", "top", "btop", "less", "more", "man", "watch",
    // remote sessions
    "ssh", "telnet", "ftp", "sftp",
    // multiplexers and file managers
    "screen", "tmux", "ranger", "mc", "ncdu", "nnn",
    // dialog tools
    "dialog", "whiptail", "fzf",
    // debuggers and interpreters
    "gdb", "python", "python3", "ipython", "node", "nodejs", "irb", "pry",
    // database clients
    "mysql", "psql", "sqlite3", "mongo",
    // nested shells
    "bash", "zsh", "sh", "fish",
];

/// Programs whose output may never end.
const STREAMING_COMMANDS: &[&str] = &["ping", "journalctl", "dmesg", "tcpdump"];

/// Names that stream only when given a follow flag.
const FOLLOW_FLAGS: &[(&str, &[&str])] = &[("tail", &["-f", "-F", "--follow"])];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalClass {
    Interactive,
    Streaming,
    Standard,
}

impl ExternalClass {
    /// Attached commands share the terminal and have no time limit.
    pub fn is_attached(self) -> bool {
        !matches!(self, ExternalClass::Standard)
    }
}

/// Classify a command by name, and by follow flags for a few names.
pub fn classify(name: &str, args: &[String]) -> ExternalClass {
    let lower = name.to_lowercase();
    if INTERACTIVE_COMMANDS.contains(&lower.as_str()) {
        return ExternalClass::Interactive;
    }
    if STREAMING_COMMANDS.contains(&lower.as_str()) {
        return ExternalClass::Streaming;
    }
    let follows = FOLLOW_FLAGS
        .iter()
        .any(|(cmd, flags)| *cmd == lower && args.iter().any(|a| flags.contains(&a.as_str())));
    if follows {
        ExternalClass::Streaming
    } else {
        ExternalClass::Standard
    }
}

/// How a captured run ended.
#[derive(Debug)]
pub enum CaptureOutcome {
    Exited { status: ExitStatus, output: String },
    TimedOut,
}

/// Map an attached run to a result. `interrupted` is whether Ctrl+C arrived
/// while the child held the terminal.
pub fn classify_attached(name: &str, status: ExitStatus, interrupted: bool) -> CommandResult {
    if interrupted || terminated_by_interrupt(&status) {
        return ShellError::Interrupted(name.to_string()).into();
    }
    if status.success() {
        CommandResult::success("")
    } else {
        ShellError::ExitStatus(describe_status(&status)).into()
    }
}

/// Map a captured run to a result.
pub fn classify_capture(
    name: &str,
    outcome: CaptureOutcome,
    interrupted: bool,
    limit: Duration,
) -> CommandResult {
    match outcome {
        CaptureOutcome::TimedOut => ShellError::Timeout {
            name: name.to_string(),
            limit,
        }
        .into(),
        CaptureOutcome::Exited { status, .. } if interrupted || terminated_by_interrupt(&status) => {
            ShellError::Interrupted(name.to_string()).into()
        }
        CaptureOutcome::Exited { status, output } => {
            if status.success() {
                CommandResult::Success(output.trim_end().to_string())
            } else {
                ShellError::FailedWithOutput {
                    code: describe_status(&status),
                    output: output.trim_end().to_string(),
                }
                .into()
            }
        }
    }
}

fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return code.to_string();
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return format!("signal {}", sig);
        }
    }
    "unknown".to_string()
}

#[cfg(unix)]
fn terminated_by_interrupt(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(2)
}

#[cfg(not(unix))]
fn terminated_by_interrupt(_status: &ExitStatus) -> bool {
    false
}

/// Spawns programs found on `PATH`.
#[derive(Debug, Clone)]
pub struct ExternalRunner {
    timeout: Duration,
}

impl ExternalRunner {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Resolve, classify and run `name` in `cwd`.
    pub fn run(&self, name: &str, args: &[String], cwd: &Path) -> CommandResult {
        let program = match locate(name, cwd).or_else(|| locate_folded(name, cwd)) {
            Some(p) => p,
            None => return ShellError::NotOnPath(name.to_string()).into(),
        };

        let class = classify(name, args);
        log::debug!("external {:?} ({:?}) args={:?} cwd={}", program, class, args, cwd.display());

        if class.is_attached() {
            self.run_attached(name, &program, args, cwd)
        } else {
            self.run_captured(name, &program, args, cwd)
        }
    }

    fn run_attached(&self, name: &str, program: &Path, args: &[String], cwd: &Path) -> CommandResult {
        interrupt::take();
        let mut child = match Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => return ShellError::Spawn(e).into(),
        };

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => return ShellError::Spawn(e).into(),
        };
        log::info!("{} exited with {}", name, status);
        classify_attached(name, status, interrupt::take())
    }

    fn run_captured(&self, name: &str, program: &Path, args: &[String], cwd: &Path) -> CommandResult {
        interrupt::take();
        let mut child = match Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => return ShellError::Spawn(e).into(),
        };

        let outcome = match wait_captured(&mut child, self.timeout) {
            Ok(o) => o,
            Err(e) => return ShellError::Spawn(e).into(),
        };
        match &outcome {
            CaptureOutcome::Exited { status, .. } => log::info!("{} exited with {}", name, status),
            CaptureOutcome::TimedOut => {
                log::warn!("{} timed out after {}s", name, self.timeout.as_secs())
            }
        }
        classify_capture(name, outcome, interrupt::take(), self.timeout)
    }
}

impl Default for ExternalRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Find an executable: explicit paths are taken relative to `cwd`, bare names
/// are searched on `PATH`.
pub fn locate(name: &str, cwd: &Path) -> Option<PathBuf> {
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        return which::which_in(name, None::<&str>, cwd).ok();
    }
    which::which(name).ok()
}

/// `Git` -> `git` when only the lowercase spelling exists.
fn locate_folded(name: &str, cwd: &Path) -> Option<PathBuf> {
    let lower = name.to_lowercase();
    if lower == name {
        return None;
    }
    locate(&lower, cwd)
}

/// Run `program` detached from the terminal and capture what it prints.
pub fn capture(program: &Path, args: &[&str], cwd: &Path, limit: Duration) -> std::io::Result<CaptureOutcome> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    wait_captured(&mut child, limit)
}

/// Drain both pipes on reader threads so a chatty child cannot block on a
/// full pipe while we wait on it. The limit covers the pipes as well as the
/// child: a background grandchild holding them open counts as a timeout.
fn wait_captured(child: &mut Child, limit: Duration) -> std::io::Result<CaptureOutcome> {
    let started = Instant::now();
    let (tx, rx) = mpsc::channel();
    let mut pending = 0usize;
    pending += spawn_reader(child.stdout.take(), Stream::Stdout, &tx);
    pending += spawn_reader(child.stderr.take(), Stream::Stderr, &tx);
    drop(tx);

    let Some(status) = child.wait_timeout(limit)? else {
        let _ = child.kill();
        let _ = child.wait();
        return Ok(CaptureOutcome::TimedOut);
    };

    let mut stdout = String::new();
    let mut stderr = String::new();
    while pending > 0 {
        match rx.recv_timeout(limit.saturating_sub(started.elapsed())) {
            Ok((Stream::Stdout, text)) => stdout = text,
            Ok((Stream::Stderr, text)) => stderr = text,
            Err(RecvTimeoutError::Timeout) => {
                // Readers stay detached until the holder closes the pipe.
                log::warn!("output pipes still open after {:?}", limit);
                return Ok(CaptureOutcome::TimedOut);
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        pending -= 1;
    }

    stdout.push_str(&stderr);
    Ok(CaptureOutcome::Exited { status, output: stdout })
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

trait PipeSource: Read + Send + 'static {}
impl PipeSource for ChildStdout {}
impl PipeSource for ChildStderr {}

/// Returns how many readers were started (0 or 1).
fn spawn_reader<R: PipeSource>(pipe: Option<R>, stream: Stream, tx: &Sender<(Stream, String)>) -> usize {
    let Some(mut pipe) = pipe else { return 0 };
    let tx = tx.clone();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, String::from_utf8_lossy(&buf).into_owned()));
    });
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("vim", &[]), ExternalClass::Interactive);
        assert_eq!(classify("VIM", &[]), ExternalClass::Interactive);
        assert_eq!(classify("ping", &args(&["localhost"])), ExternalClass::Streaming);
        assert_eq!(classify("journalctl", &[]), ExternalClass::Streaming);
        assert_eq!(classify("journalctl", &args(&["-u", "x"])), ExternalClass::Streaming);
        assert_eq!(classify("dmesg", &[]), ExternalClass::Streaming);
        assert_eq!(classify("tail", &args(&["log"])), ExternalClass::Standard);
        assert_eq!(classify("tail", &args(&["--follow", "log"])), ExternalClass::Streaming);
        assert_eq!(classify("ls", &args(&["-l"])), ExternalClass::Standard);
        assert!(!ExternalClass::Standard.is_attached());
        assert!(ExternalClass::Streaming.is_attached());
    }

    #[test]
    fn test_not_on_path() {
        let runner = ExternalRunner::new();
        let cwd = std::env::temp_dir();
        let result = runner.run("definitely_not_a_real_command_xyz", &[], &cwd);
        assert_eq!(
            result,
            CommandResult::Error(
                "Command 'definitely_not_a_real_command_xyz' not found in system PATH".into()
            )
        );
    }

    #[test]
    fn test_capture_timeout_branch() {
        let result = classify_capture("sleep", CaptureOutcome::TimedOut, false, DEFAULT_TIMEOUT);
        assert_eq!(
            result,
            CommandResult::Error("Command 'sleep' exceeded time limit of 30 seconds".into())
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::process::ExitStatusExt;

        #[test]
        fn test_capture_outcomes() {
            let ok = ExitStatus::from_raw(0);
            let failed = ExitStatus::from_raw(2 << 8);
            let sigint = ExitStatus::from_raw(2);

            let out = CaptureOutcome::Exited { status: ok, output: "hi\n\n".into() };
            assert_eq!(classify_capture("x", out, false, DEFAULT_TIMEOUT), CommandResult::Success("hi".into()));

            let out = CaptureOutcome::Exited { status: failed, output: "boom\n".into() };
            assert_eq!(
                classify_capture("x", out, false, DEFAULT_TIMEOUT),
                CommandResult::Error("Command failed with code 2\nboom".into())
            );

            let out = CaptureOutcome::Exited { status: sigint, output: String::new() };
            assert!(classify_capture("x", out, false, DEFAULT_TIMEOUT).message().contains("interrupted"));

            let out = CaptureOutcome::Exited { status: ok, output: String::new() };
            assert!(classify_capture("x", out, true, DEFAULT_TIMEOUT).message().contains("interrupted"));
        }

        #[test]
        fn test_attached_outcomes() {
            assert_eq!(classify_attached("vim", ExitStatus::from_raw(0), false), CommandResult::Success(String::new()));
            assert_eq!(
                classify_attached("vim", ExitStatus::from_raw(1 << 8), false),
                CommandResult::Error("Command exited with error: 1".into())
            );
            assert!(classify_attached("ping", ExitStatus::from_raw(0), true).message().contains("interrupted"));
        }

        #[test]
        fn test_run_captures_stdout_and_stderr() {
            let tmp = tempfile::tempdir().unwrap();
            let runner = ExternalRunner::new();
            // `sh` itself is interactive; `env` keeps the run captured.
            let result = runner.run("env", &args(&["sh", "-c", "echo out; echo err 1>&2"]), tmp.path());
            assert_eq!(result, CommandResult::Success("out\nerr".into()));
        }

        #[test]
        fn test_run_uses_working_directory() {
            let tmp = tempfile::tempdir().unwrap();
            std::fs::write(tmp.path().join("marker.txt"), "").unwrap();
            let runner = ExternalRunner::new();
            let result = runner.run("ls", &[], tmp.path());
            assert_eq!(result, CommandResult::Success("marker.txt".into()));
        }

        #[test]
        fn test_run_nonzero_exit() {
            let tmp = tempfile::tempdir().unwrap();
            let runner = ExternalRunner::new();
            let result = runner.run("env", &args(&["sh", "-c", "echo bad; exit 3"]), tmp.path());
            assert_eq!(result, CommandResult::Error("Command failed with code 3\nbad".into()));
        }

        #[test]
        fn test_background_child_holding_pipes_times_out() {
            let tmp = tempfile::tempdir().unwrap();
            let runner = ExternalRunner::with_timeout(Duration::from_millis(500));
            let started = Instant::now();
            let result = runner.run("env", &args(&["sh", "-c", "sleep 5 & echo hi"]), tmp.path());
            assert!(started.elapsed() < Duration::from_secs(3), "blocked for {:?}", started.elapsed());
            assert!(result.message().contains("exceeded time limit"), "{:?}", result);
        }

        #[test]
        fn test_capture_is_bounded_by_limit() {
            let tmp = tempfile::tempdir().unwrap();
            let sh = locate("sh", tmp.path()).unwrap();
            let started = Instant::now();
            let outcome = capture(&sh, &["-c", "sleep 5 & echo hi"], tmp.path(), Duration::from_millis(500)).unwrap();
            assert!(started.elapsed() < Duration::from_secs(3));
            assert!(matches!(outcome, CaptureOutcome::TimedOut));
        }

        #[test]
        fn test_uppercase_name_falls_back_to_lowercase() {
            let tmp = tempfile::tempdir().unwrap();
            let runner = ExternalRunner::new();
            let result = runner.run("ENV", &args(&["sh", "-c", "echo hi"]), tmp.path());
            assert_eq!(result, CommandResult::Success("hi".into()));
        }

        #[test]
        fn test_run_times_out() {
            let tmp = tempfile::tempdir().unwrap();
            let runner = ExternalRunner::with_timeout(Duration::from_millis(200));
            let result = runner.run("sleep", &args(&["5"]), tmp.path());
            assert!(result.is_error());
            assert!(result.message().contains("exceeded time limit"));
        }
    }
}

//! End-to-end behavior of `Shell::execute_line` against a scratch directory.

use std::fs;
use std::time::Duration;

use delta_shell::shell::workdir::WorkingDir;
use delta_shell::{CommandResult, Shell};

fn shell_in(dir: &tempfile::TempDir) -> Shell {
    Shell::with_workdir(WorkingDir::at(dir.path()))
}

#[test]
fn echo_keeps_quoted_spaces() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);
    assert_eq!(shell.execute_line("echo \"a b\""), CommandResult::Success("a b".into()));
    assert_eq!(shell.execute_line(r"echo a\ b"), CommandResult::Success("a b".into()));
}

#[test]
fn overwrite_redirect_truncates() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);
    let out = tmp.path().join("out.txt");

    let r = shell.execute_line("echo hello there > out.txt");
    assert!(r.is_success());
    assert!(r.message().contains("redirected to"));
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello there");

    shell.execute_line("echo hi > out.txt");
    assert_eq!(fs::read_to_string(&out).unwrap(), "hi");
}

#[test]
fn append_redirect_accumulates() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);

    shell.execute_line("echo a >> out.txt");
    shell.execute_line("echo b >> out.txt");
    assert_eq!(fs::read_to_string(tmp.path().join("out.txt")).unwrap(), "ab");
}

#[test]
fn failed_command_writes_error_to_target() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);

    let r = shell.execute_line("cat missing.txt > err.txt");
    assert!(r.is_error());
    assert!(r.message().contains("err.txt"));
    let written = fs::read_to_string(tmp.path().join("err.txt")).unwrap();
    assert!(written.contains("missing.txt"));
}

#[test]
fn redirect_parse_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);

    assert!(shell.execute_line("echo hi >").is_error());

    let r = shell.execute_line("cat f <");
    assert!(r.is_error());
    assert!(r.message().contains("not implemented"));

    let r = shell.execute_line("cat <<EOF");
    assert!(r.is_error());
    assert!(r.message().contains("Unsupported"));

    let r = shell.execute_line("echo a > one.txt > two.txt");
    assert!(r.is_error());
    assert!(!tmp.path().join("one.txt").exists());
}

#[test]
fn unknown_command_is_named() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);

    let r = shell.execute_line("zz_no_such_command_42 arg");
    assert!(r.is_error());
    assert!(r.message().contains("zz_no_such_command_42"));
}

#[test]
fn history_limit_and_validation() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);

    for word in ["one", "two", "three", "four"] {
        shell.submit(&format!("echo {}", word));
    }
    let r = shell.submit("history 2");
    assert_eq!(r, CommandResult::Success("4. echo four\n5. history 2".into()));

    assert!(shell.submit("history x").is_error());
}

#[test]
fn cd_moves_session_directory_only() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);
    let process_cwd = std::env::current_dir().unwrap();

    assert!(shell.execute_line("mkdir sub").is_success());
    assert!(shell.execute_line("cd sub").is_success());
    assert!(shell.execute_line("pwd").message().ends_with("sub"));
    assert_eq!(std::env::current_dir().unwrap(), process_cwd);

    shell.execute_line("touch inner.txt");
    assert!(tmp.path().join("sub").join("inner.txt").exists());
}

#[test]
fn names_are_case_insensitive() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);
    fs::write(tmp.path().join("a.txt"), "line one\nline two\n").unwrap();

    assert_eq!(shell.execute_line("CAT a.txt"), CommandResult::Success("line one\nline two\n".into()));
    assert_eq!(
        shell.execute_line("WC a.txt").message(),
        format!("Lines: 2, Words: 4, Chars: 18 - {}", tmp.path().join("a.txt").display())
    );
}

#[test]
fn exit_and_quit_end_the_session() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp);
    assert!(!shell.should_exit);
    assert!(shell.execute_line("  QUIT ").is_success());
    assert!(shell.should_exit);

    let mut shell = shell_in(&tmp);
    shell.execute_line("exit");
    assert!(shell.should_exit);
}

#[cfg(unix)]
#[test]
fn captured_command_times_out() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shell = shell_in(&tmp).with_timeout(Duration::from_millis(200));

    let r = shell.execute_line("sleep 5");
    assert!(r.is_error());
    assert!(r.message().contains("exceeded time limit"));
}

#[cfg(unix)]
#[test]
fn external_output_is_captured_and_redirected() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("marker.txt"), "").unwrap();
    let mut shell = shell_in(&tmp).with_timeout(Duration::from_secs(10));

    let r = shell.execute_line("env sh -c 'ls' > listing.txt");
    assert!(r.is_success());
    let listing = fs::read_to_string(tmp.path().join("listing.txt")).unwrap();
    assert!(listing.contains("marker.txt"));
}

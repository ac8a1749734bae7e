//! Delta Shell
//!
//! Usage:
//!   dshell                  Interactive shell
//!   dshell -c "command"     Execute single command

use std::any::Any;
use std::env;
use std::panic::{self, AssertUnwindSafe};
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use delta_shell::interrupt;
use delta_shell::shell::completer::DeltaHelper;
use delta_shell::{CommandResult, Shell};

/// Ensure we have a console window (for double-click launch)
#[cfg(windows)]
fn ensure_console() {
    use windows_sys::Win32::System::Console::{AllocConsole, GetConsoleWindow};
    unsafe {
        if GetConsoleWindow().is_null() {
            AllocConsole();
        }
    }
}

#[cfg(not(windows))]
fn ensure_console() {}

fn main() -> Result<()> {
    ensure_console();
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("DSHELL_LOG", "warn")).init();
    interrupt::install();

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "-c" => {
                if args.len() < 3 {
                    eprintln!("dshell: -c requires an argument");
                    std::process::exit(1);
                }
                let cmd = args[2..].join(" ");
                let code = execute_command(&cmd)?;
                std::process::exit(code);
            }
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-v" | "--version" => {
                println!("Delta Shell v{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            _ => {
                eprintln!("dshell: unknown option: {}", args[1]);
                std::process::exit(1);
            }
        }
    }

    run_repl()
}

fn print_help() {
    println!("{}", "Delta Shell - line-oriented command interpreter".bold());
    println!();
    println!("Usage:");
    println!("  dshell                  Start interactive shell");
    println!("  dshell -c \"command\"     Execute single command");
    println!("  dshell -h, --help       Show this help");
    println!("  dshell -v, --version    Show version");
    println!();
    println!("Environment:");
    println!("  DSHELL_LOG              Log filter for stderr (default: warn)");
    println!();
    println!("Type 'help' in the shell for built-in commands.");
}

fn execute_command(cmd: &str) -> Result<i32> {
    let mut shell = Shell::new()?;
    let result = shell.execute_line(cmd);
    report(&result);
    Ok(result.exit_code())
}

fn report(result: &CommandResult) {
    match result {
        CommandResult::Success(text) if text.is_empty() => {}
        CommandResult::Success(text) => println!("{}", text),
        CommandResult::Error(msg) => eprintln!("{}: {}", "error".red(), msg),
    }
}

/// Text of a panic payload, without location or backtrace.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");

    let tl = '\u{256D}';
    let tr = '\u{256E}';
    let bl = '\u{2570}';
    let br = '\u{256F}';
    let h = '\u{2500}';
    let v = '\u{2502}';

    let content_width = 44;
    let title = format!(" Delta Shell v{} ", version);
    let title_pad = (content_width - title.len()) / 2;

    print!("{}", tl.to_string().bright_black());
    print!("{}", h.to_string().repeat(title_pad).bright_black());
    print!("{}", title.bold().cyan());
    print!("{}", h.to_string().repeat(content_width - title_pad - title.len()).bright_black());
    println!("{}", tr.to_string().bright_black());

    let info = "Line-oriented command interpreter";
    let info_pad = (content_width - info.len()) / 2;
    print!("{}", v.to_string().bright_black());
    print!("{}", " ".repeat(info_pad));
    print!("{}", info.white());
    print!("{}", " ".repeat(content_width - info_pad - info.len()));
    println!("{}", v.to_string().bright_black());

    print!("{}", bl.to_string().bright_black());
    print!("{}", h.to_string().repeat(content_width).bright_black());
    println!("{}", br.to_string().bright_black());

    println!("  {} for help, {} to exit, {} for completion",
        "help".green(),
        "exit".green(),
        "Tab".yellow()
    );
    println!();
}

fn run_repl() -> Result<()> {
    print_banner();
    // Faults inside a line are reported by the loop; the source location
    // stays out of the default log level.
    panic::set_hook(Box::new(|info| {
        log::error!("internal fault: {}", panic_message(info.payload()));
        if let Some(location) = info.location() {
            log::debug!("fault raised at {}", location);
        }
    }));

    let mut shell = Shell::new()?;
    let mut editor: Editor<DeltaHelper, DefaultHistory> = Editor::new()?;
    editor.set_helper(Some(DeltaHelper::new(
        shell.wd.current().to_path_buf(),
        &shell.registry().names(),
    )));

    loop {
        if let Some(helper) = editor.helper_mut() {
            helper.set_cwd(shell.wd.current().to_path_buf());
        }

        match editor.readline(&shell.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = editor.add_history_entry(line) {
                    log::debug!("rustyline history: {}", e);
                }

                match panic::catch_unwind(AssertUnwindSafe(|| shell.submit(line))) {
                    Ok(result) => report(&result),
                    Err(_) => eprintln!("{}: unexpected failure while running '{}'", "error".red(), line),
                }

                if shell.should_exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

//! Cross-platform interrupt handling (Ctrl+C).
//!
//! dshell must survive Ctrl+C while a child process owns the terminal. The
//! handler only records that an interrupt happened; the executor clears the
//! flag before spawning and checks it once the child is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

static INSTALLED: OnceLock<()> = OnceLock::new();
static CTRL_SEEN: AtomicBool = AtomicBool::new(false);

#[cfg(windows)]
mod imp {
    use std::sync::atomic::Ordering;
    use windows_sys::Win32::System::Console::{
        SetConsoleCtrlHandler, CTRL_BREAK_EVENT, CTRL_C_EVENT,
    };

    unsafe extern "system" fn handler(ctrl_type: u32) -> i32 {
        match ctrl_type {
            CTRL_C_EVENT | CTRL_BREAK_EVENT => {
                super::CTRL_SEEN.store(true, Ordering::SeqCst);
                1
            }
            _ => 0,
        }
    }

    pub fn install() {
        unsafe {
            if SetConsoleCtrlHandler(Some(handler), 1) == 0 {
                log::warn!("could not install console control handler");
            }
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use std::sync::atomic::Ordering;

    pub fn install() {
        if let Err(e) = ctrlc::set_handler(|| super::CTRL_SEEN.store(true, Ordering::SeqCst)) {
            log::warn!("could not install Ctrl+C handler: {}", e);
        }
    }
}

/// Install the process-wide handler. Safe to call more than once.
pub fn install() {
    INSTALLED.get_or_init(imp::install);
}

/// Read and clear the flag.
pub fn take() -> bool {
    CTRL_SEEN.swap(false, Ordering::SeqCst)
}


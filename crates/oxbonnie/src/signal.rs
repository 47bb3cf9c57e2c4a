//! Signal handling using signal-hook.
//!
//! SIGINT, SIGTERM and SIGQUIT set a shared flag that the benchmark checks
//! between stages. A second signal exits immediately.

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Exit status after an interrupt (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Install the handlers and return the interrupt flag.
pub fn install_interrupt_flag() -> io::Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));

    for &sig in TERM_SIGNALS {
        // Registered first so it sees the flag before this signal sets it
        flag::register_conditional_shutdown(
            sig,
            i32::from(INTERRUPTED_EXIT_CODE),
            Arc::clone(&interrupted),
        )?;
        flag::register(sig, Arc::clone(&interrupted))?;
    }

    Ok(interrupted)
}

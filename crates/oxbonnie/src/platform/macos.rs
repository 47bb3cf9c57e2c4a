//! macOS cache control.

use std::io;
use std::process::Command;

const PURGE: &str = "/usr/sbin/purge";

/// Run `purge` to flush the unified buffer cache. Requires root.
pub fn clear_buffer_cache() -> io::Result<()> {
    let status = Command::new(PURGE).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{PURGE} exited with {status}")))
    }
}

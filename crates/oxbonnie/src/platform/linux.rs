//! Linux cache control.

use std::fs;
use std::io;
use std::process::Command;

const DROP_CACHES: &str = "/proc/sys/vm/drop_caches";

/// Flush dirty pages, then drop the page cache, dentries and inodes.
///
/// Requires root; otherwise the write to `/proc/sys/vm/drop_caches` fails
/// with `PermissionDenied`.
pub fn clear_buffer_cache() -> io::Result<()> {
    // Dirty pages cannot be dropped, sync first
    match Command::new("sync").status() {
        Ok(status) if !status.success() => {
            tracing::debug!("sync exited with {}", status);
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("Failed to run sync: {}", e),
    }

    fs::write(DROP_CACHES, "3\n")
}

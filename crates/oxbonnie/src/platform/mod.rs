//! Platform-specific utilities.
//!
//! Physical memory and free space come from `sysconf` and `statvfs` on Unix.
//! Dropping the buffer cache is OS specific and needs root everywhere it is
//! supported.

use oxbonnie_core::CacheClearer;
use std::io;
use std::path::Path;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::clear_buffer_cache;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::clear_buffer_cache;

/// Drop the OS buffer cache. Not supported on this platform.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn clear_buffer_cache() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("clearing the buffer cache is not supported on {}", std::env::consts::OS),
    ))
}

/// Cache clearer backed by [`clear_buffer_cache`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformCacheClearer;

impl CacheClearer for PlatformCacheClearer {
    fn clear_buffer_cache(&self) -> io::Result<()> {
        clear_buffer_cache()
    }
}

/// Logical cores available to this process; 1 when unknown.
pub fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Total physical memory in bytes.
#[cfg(unix)]
pub fn total_physical_memory() -> io::Result<u64> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
    // SAFETY: as above.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };

    match (u64::try_from(pages), u64::try_from(page_size)) {
        (Ok(pages), Ok(page_size)) if pages > 0 && page_size > 0 => {
            Ok(pages.saturating_mul(page_size))
        }
        _ => Err(io::Error::last_os_error()),
    }
}

/// Total physical memory in bytes.
#[cfg(not(unix))]
pub fn total_physical_memory() -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "cannot determine physical memory on this platform",
    ))
}

/// Bytes available to unprivileged users on the filesystem holding `dir`.
#[cfg(unix)]
pub fn available_disk_space(dir: &Path) -> io::Result<u64> {
    let stat = nix::sys::statvfs::statvfs(dir).map_err(io::Error::from)?;
    #[allow(clippy::useless_conversion)]
    let available =
        u64::from(stat.blocks_available()).saturating_mul(u64::from(stat.fragment_size()));
    Ok(available)
}

/// Bytes available on the filesystem holding `dir`.
#[cfg(not(unix))]
pub fn available_disk_space(_dir: &Path) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "free space query is not supported on this platform",
    ))
}

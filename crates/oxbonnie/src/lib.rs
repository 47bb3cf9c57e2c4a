//! Command-line front end for the `oxbonnie-core` storage benchmark.
//!
//! # Usage
//!
//! ```text
//! oxbonnie [OPTIONS]
//!
//! Options:
//!   -v, --verbose                Verbose output
//!       --json                   Print a JSON report to stdout
//!       --runs <N>               Minimum number of runs (default: 1)
//!       --seconds <N>            Keep running for at least N seconds (default: 0)
//!       --threads <N>            Worker threads (default: CPU count)
//!       --size <GiB>             Aggregate test size (default: 2 x RAM)
//!       --iops-duration <SECS>   IOPS stage duration (default: 15)
//!       --dir <DIR>              Directory to benchmark (default: system temp)
//!       --seed <N>               Reproducible payload and offsets
//!       --no-fsync               Skip fsync after the write stage
//!       --no-color               Disable colored output
//! ```

pub mod cli;
pub mod output;
pub mod platform;
pub mod progress;
pub mod signal;

pub use cli::Cli;
pub use output::Report;
pub use platform::PlatformCacheClearer;

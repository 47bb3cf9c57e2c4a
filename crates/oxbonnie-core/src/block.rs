//! The random payload block.

use crate::error::BenchError;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Deref;

/// Where the random block's bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    /// Seed from the operating system's entropy source.
    Entropy,
    /// Deterministic stream from a fixed seed.
    Seeded(u64),
}

impl From<Option<u64>> for BlockSource {
    fn from(seed: Option<u64>) -> Self {
        seed.map_or(Self::Entropy, Self::Seeded)
    }
}

/// Immutable buffer of pseudorandom bytes.
///
/// Written end-to-end into every worker file and compared against the final
/// block on read-back. Random content keeps compressing or deduplicating
/// filesystems from inflating the measured throughput.
#[derive(Clone, PartialEq, Eq)]
pub struct RandomBlock {
    bytes: Box<[u8]>,
}

impl RandomBlock {
    /// Generate `size` random bytes.
    pub fn generate(size: usize, source: BlockSource) -> Result<Self, BenchError> {
        if size == 0 {
            return Err(BenchError::InvalidConfig(
                "random block size must be greater than zero".to_string(),
            ));
        }

        let mut rng = match source {
            BlockSource::Entropy => ChaCha8Rng::try_from_os_rng()
                .map_err(|e| BenchError::EntropyUnavailable(e.to_string()))?,
            BlockSource::Seeded(seed) => ChaCha8Rng::seed_from_u64(seed),
        };

        let mut bytes = vec![0u8; size].into_boxed_slice();
        rng.fill_bytes(&mut bytes);

        let block = Self { bytes };
        if block.is_degenerate() {
            return Err(BenchError::EntropyUnavailable(format!(
                "generated {size}-byte block is a single repeated byte"
            )));
        }
        Ok(block)
    }

    /// Bytes that belong at `offset` of a file tiled with this block.
    ///
    /// Returns at most `len` bytes; fewer when the range crosses the end of
    /// the block.
    pub fn tile_slice(&self, offset: u64, len: usize) -> &[u8] {
        // Block length always fits in u64; the remainder fits back in usize.
        #[allow(clippy::cast_possible_truncation)]
        let start = (offset % self.bytes.len() as u64) as usize;
        let end = (start + len).min(self.bytes.len());
        &self.bytes[start..end]
    }

    /// A block made of one repeated byte would compress to nothing.
    fn is_degenerate(&self) -> bool {
        match self.bytes.split_first() {
            Some((first, rest)) if !rest.is_empty() => rest.iter().all(|b| b == first),
            _ => false,
        }
    }
}

impl Deref for RandomBlock {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for RandomBlock {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for RandomBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomBlock")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

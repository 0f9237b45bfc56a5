//! Pattern generation for overwrite passes.
//!
//! Every pass is re-derivable at any offset without storing what was written:
//! fixed patterns are pure functions of the absolute offset, random passes are
//! expanded from a per-pass seed in independent 64 KiB blocks, and a complement
//! pass is the bitwise inverse of the pass before it.

use super::{PassSpec, PatternKind};
use crate::crypto::secure_rng::secure_random_bytes;
use crate::{WipeError, WipeResult};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;

/// Size of an independently seeded block of random pattern data
pub const RANDOM_BLOCK_SIZE: usize = 64 * 1024;

const BLOCK_DOMAIN: &[u8] = b"ash-wipe/random-pass/v1";

/// 32-byte seed for one random pass over one target.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSeed(#[serde(with = "hex::serde")] [u8; 32]);

impl PassSeed {
    /// Draw a fresh seed from the OS CSPRNG.
    pub fn generate() -> WipeResult<Self> {
        let mut seed = [0u8; 32];
        secure_random_bytes(&mut seed)?;
        Ok(Self(seed))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> WipeResult<Self> {
        let mut seed = [0u8; 32];
        hex::decode_to_slice(s, &mut seed)
            .map_err(|e| WipeError::InvalidArgument(format!("invalid pass seed: {}", e)))?;
        Ok(Self(seed))
    }

    fn block_rng(&self, block: u64) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(BLOCK_DOMAIN);
        hasher.update(self.0);
        hasher.update(block.to_le_bytes());
        StdRng::from_seed(hasher.finalize().into())
    }
}

impl fmt::Debug for PassSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PassSeed({}..)", &self.to_hex()[..8])
    }
}

/// Produces the bytes of any pass of an algorithm for one target.
///
/// `seeds[i]` must be `Some` for every random pass `i` that is generated.
#[derive(Debug, Clone, Copy)]
pub struct PatternGenerator<'a> {
    passes: &'a [PassSpec],
    seeds: &'a [Option<PassSeed>],
}

impl<'a> PatternGenerator<'a> {
    pub fn new(passes: &'a [PassSpec], seeds: &'a [Option<PassSeed>]) -> Self {
        Self { passes, seeds }
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn pass(&self, index: usize) -> WipeResult<&'a PassSpec> {
        self.passes.get(index).ok_or_else(|| {
            WipeError::InvalidArgument(format!(
                "pass index {} out of range ({} passes)",
                index,
                self.passes.len()
            ))
        })
    }

    /// Whether writing pass `index` requires reading the medium first.
    pub fn reads_medium(&self, index: usize) -> bool {
        matches!(
            self.passes.get(index).map(|p| p.pattern),
            Some(PatternKind::ComplementOfPrevious)
        )
    }

    /// Fill `buf` with the content pass `index` leaves at `offset`.
    pub fn fill(&self, index: usize, offset: u64, buf: &mut [u8]) -> WipeResult<()> {
        match self.pass(index)?.pattern {
            PatternKind::Zero => buf.fill(0x00),
            PatternKind::One => buf.fill(0xFF),
            PatternKind::Repeating(bytes) => fill_repeating(bytes, offset, buf),
            PatternKind::Random => {
                let seed = self
                    .seeds
                    .get(index)
                    .copied()
                    .flatten()
                    .ok_or_else(|| {
                        WipeError::InvalidArgument(format!("random pass {} has no seed", index + 1))
                    })?;
                fill_random(&seed, offset, buf);
            }
            PatternKind::ComplementOfPrevious => {
                if index == 0 {
                    return Err(WipeError::InvalidArgument(
                        "complement pass has no previous pass".to_string(),
                    ));
                }
                self.fill(index - 1, offset, buf)?;
                complement_in_place(buf);
            }
        }
        Ok(())
    }

    /// Lazy reader over `[offset, offset + len)` of pass `index`.
    pub fn reader(&self, index: usize, offset: u64, len: u64) -> PatternReader<'a> {
        PatternReader {
            generator: *self,
            index,
            position: offset,
            end: offset + len,
        }
    }
}

/// Invert every byte of `buf`.
pub fn complement_in_place(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        *byte = !*byte;
    }
}

fn fill_repeating(pattern: &[u8], offset: u64, buf: &mut [u8]) {
    if pattern.is_empty() {
        buf.fill(0);
        return;
    }
    let len = pattern.len() as u64;
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = pattern[((offset + i as u64) % len) as usize];
    }
}

fn fill_random(seed: &PassSeed, offset: u64, buf: &mut [u8]) {
    let block_size = RANDOM_BLOCK_SIZE as u64;
    let mut scratch: Option<Vec<u8>> = None;
    let mut pos = 0usize;

    while pos < buf.len() {
        let absolute = offset + pos as u64;
        let block = absolute / block_size;
        let within = (absolute % block_size) as usize;
        let take = (RANDOM_BLOCK_SIZE - within).min(buf.len() - pos);
        let mut rng = seed.block_rng(block);

        if within == 0 && take == RANDOM_BLOCK_SIZE {
            rng.fill_bytes(&mut buf[pos..pos + take]);
        } else {
            // Partial block: expand the whole block so the bytes match an aligned fill
            let block_buf = scratch.get_or_insert_with(|| vec![0u8; RANDOM_BLOCK_SIZE]);
            rng.fill_bytes(block_buf);
            buf[pos..pos + take].copy_from_slice(&block_buf[within..within + take]);
        }

        pos += take;
    }
}

/// `Read` adapter yielding the bytes of one pass over a byte range.
pub struct PatternReader<'a> {
    generator: PatternGenerator<'a>,
    index: usize,
    position: u64,
    end: u64,
}

impl Read for PatternReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.end.saturating_sub(self.position);
        let n = (buf.len() as u64).min(remaining) as usize;
        if n == 0 {
            return Ok(0);
        }
        self.generator
            .fill(self.index, self.position, &mut buf[..n])
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        self.position += n as u64;
        Ok(n)
    }
}

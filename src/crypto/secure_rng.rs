use crate::{WipeError, WipeResult};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Mutex;

/// OS-backed cryptographic RNG guarded by a FIPS 140-2 style continuous test.
pub struct SecureRng {
    rng: SystemRandom,
    continuous_test: Mutex<ContinuousTest>,
}

impl Default for SecureRng {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureRng {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
            continuous_test: Mutex::new(ContinuousTest::new()),
        }
    }

    pub fn fill_bytes(&self, dest: &mut [u8]) -> WipeResult<()> {
        self.rng
            .fill(dest)
            .map_err(|_| WipeError::Rng("ring SystemRandom failed".to_string()))?;

        let mut test = self
            .continuous_test
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !test.test(dest) {
            return Err(WipeError::Rng(
                "continuous test failed: identical consecutive blocks".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rejects an output block identical to the previous one.
pub(crate) struct ContinuousTest {
    last_block: Option<[u8; 16]>,
    failure_count: u64,
}

impl ContinuousTest {
    pub(crate) fn new() -> Self {
        Self {
            last_block: None,
            failure_count: 0,
        }
    }

    pub(crate) fn test(&mut self, data: &[u8]) -> bool {
        // Test 16-byte blocks as per FIPS 140-2
        if data.len() < 16 {
            return true;
        }

        let mut block = [0u8; 16];
        block.copy_from_slice(&data[..16]);

        if self.last_block == Some(block) {
            self.failure_count += 1;
            tracing::error!(
                failures = self.failure_count,
                "FIPS 140-2 continuous test failed: identical blocks detected"
            );
            return false;
        }

        self.last_block = Some(block);
        true
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_RNG: SecureRng = SecureRng::new();
}

/// Fill `dest` from the process-wide secure RNG.
pub fn secure_random_bytes(dest: &mut [u8]) -> WipeResult<()> {
    GLOBAL_RNG.fill_bytes(dest)
}

/// Shannon entropy in bits per byte.
pub fn calculate_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &byte in data {
        counts[byte as usize] += 1;
    }

    let length = data.len() as f64;
    let mut entropy = 0.0;

    for &count in &counts {
        if count > 0 {
            let probability = count as f64 / length;
            entropy -= probability * probability.log2();
        }
    }

    entropy
}

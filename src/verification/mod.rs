pub mod sampler;

pub use sampler::{plan_samples, sample_budget, SampleWindow};

use crate::algorithms::PatternGenerator;
use crate::io::pass_executor::read_exact_at;
use crate::io::{StorageAccess, WritableHandle};
use crate::targets::WipeTarget;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How much of each target is re-read after the final pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    Full,
    #[default]
    Sampled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Passed => write!(f, "passed"),
            VerificationOutcome::Failed => write!(f, "FAILED"),
            VerificationOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(with = "crate::io::raw_path")]
    pub path: PathBuf,
    pub outcome: VerificationOutcome,
    /// Number of windows read (1 for a full read)
    pub sample_count: usize,
    pub bytes_compared: u64,
    pub first_mismatch: Option<u64>,
    /// Read error that caused the failure, if any
    pub error: Option<String>,
}

impl VerificationResult {
    pub fn skipped(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            outcome: VerificationOutcome::Skipped,
            sample_count: 0,
            bytes_compared: 0,
            first_mismatch: None,
            error: None,
        }
    }
}

/// Job-level aggregate of per-target verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes_compared: u64,
}

impl VerificationSummary {
    pub fn from_results(results: &[VerificationResult]) -> Self {
        results.iter().fold(Self::default(), |mut acc, r| {
            match r.outcome {
                VerificationOutcome::Passed => acc.passed += 1,
                VerificationOutcome::Failed => acc.failed += 1,
                VerificationOutcome::Skipped => acc.skipped += 1,
            }
            acc.bytes_compared += r.bytes_compared;
            acc
        })
    }

    /// Every target was checked and matched; vacuously true with no targets.
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Re-reads the final pass of a target and compares it with the regenerated pattern
pub struct Verifier {
    mode: VerifyMode,
    read_size: usize,
}

impl Verifier {
    pub fn new(mode: VerifyMode, read_size: usize) -> Self {
        Self {
            mode,
            read_size: read_size.max(1),
        }
    }

    pub fn mode(&self) -> VerifyMode {
        self.mode
    }

    /// Open the target through `storage` and verify it. Open failures count as
    /// a failed verification of that target.
    pub fn verify(
        &self,
        storage: &dyn StorageAccess,
        target: &WipeTarget,
        generator: &PatternGenerator<'_>,
        pass_index: usize,
    ) -> VerificationResult {
        match storage.open_for_write(&target.path) {
            Ok(mut handle) => self.verify_target(handle.as_mut(), target, generator, pass_index),
            Err(e) => self.failure(target, 0, 0, e.to_string()),
        }
    }

    pub fn verify_target(
        &self,
        handle: &mut dyn WritableHandle,
        target: &WipeTarget,
        generator: &PatternGenerator<'_>,
        pass_index: usize,
    ) -> VerificationResult {
        let windows = match self.mode {
            VerifyMode::Full if target.length > 0 => vec![SampleWindow {
                offset: 0,
                len: target.length,
            }],
            VerifyMode::Full => Vec::new(),
            VerifyMode::Sampled => plan_samples(target.length),
        };

        let buf_len = (self.read_size as u64)
            .min(windows.iter().map(|w| w.len).max().unwrap_or(0))
            .max(1) as usize;
        let mut actual = vec![0u8; buf_len];
        let mut expected = vec![0u8; buf_len];
        let mut bytes_compared = 0u64;

        for window in &windows {
            let mut offset = window.offset;
            let end = window.offset + window.len;
            while offset < end {
                let n = ((end - offset) as usize).min(buf_len);
                if let Err(e) = read_exact_at(handle, &mut actual[..n], offset) {
                    return self.failure(target, windows.len(), bytes_compared, e.to_string());
                }
                if let Err(e) = generator.fill(pass_index, offset, &mut expected[..n]) {
                    return self.failure(target, windows.len(), bytes_compared, e.to_string());
                }

                if let Some(pos) = actual[..n].iter().zip(&expected[..n]).position(|(a, b)| a != b) {
                    let mismatch = offset + pos as u64;
                    tracing::warn!(
                        path = %target.path.display(),
                        offset = mismatch,
                        "Verification mismatch"
                    );
                    return VerificationResult {
                        path: target.path.clone(),
                        outcome: VerificationOutcome::Failed,
                        sample_count: windows.len(),
                        bytes_compared: bytes_compared + pos as u64,
                        first_mismatch: Some(mismatch),
                        error: None,
                    };
                }

                bytes_compared += n as u64;
                offset += n as u64;
            }
        }

        tracing::debug!(
            path = %target.path.display(),
            samples = windows.len(),
            bytes = bytes_compared,
            "Verification passed"
        );
        VerificationResult {
            path: target.path.clone(),
            outcome: VerificationOutcome::Passed,
            sample_count: windows.len(),
            bytes_compared,
            first_mismatch: None,
            error: None,
        }
    }

    fn failure(
        &self,
        target: &WipeTarget,
        sample_count: usize,
        bytes_compared: u64,
        error: String,
    ) -> VerificationResult {
        tracing::warn!(path = %target.path.display(), error = %error, "Verification read failed");
        VerificationResult {
            path: target.path.clone(),
            outcome: VerificationOutcome::Failed,
            sample_count,
            bytes_compared,
            first_mismatch: None,
            error: Some(error),
        }
    }
}

pub mod dod;
pub mod gutmann;
pub mod nist;
pub mod pattern;


// Re-export the built-in pass tables
pub use dod::DoDWipe;
pub use gutmann::GutmannWipe;
pub use nist::NistWipe;
pub use pattern::{PassSeed, PatternGenerator, PatternReader};

use crate::{WipeError, WipeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Byte pattern written by a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// 0x00 everywhere
    Zero,
    /// 0xFF everywhere
    One,
    /// Cryptographically secure random data, re-derivable from a per-pass seed
    Random,
    /// Bitwise inverse of whatever the previous pass left on the medium
    ComplementOfPrevious,
    /// Fixed multi-byte pattern, phase-aligned to offset 0
    Repeating(&'static [u8]),
}

impl PatternKind {
    pub fn needs_seed(&self) -> bool {
        matches!(self, PatternKind::Random)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Zero => write!(f, "0x00"),
            PatternKind::One => write!(f, "0xFF"),
            PatternKind::Random => write!(f, "random"),
            PatternKind::ComplementOfPrevious => write!(f, "complement"),
            PatternKind::Repeating(bytes) => {
                let parts: Vec<String> = bytes.iter().map(|b| format!("0x{:02X}", b)).collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

/// One entry in an algorithm's pass sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSpec {
    pub pattern: PatternKind,
    pub verify: bool,
    pub label: &'static str,
}

impl PassSpec {
    pub const fn new(pattern: PatternKind, label: &'static str) -> Self {
        Self {
            pattern,
            verify: false,
            label,
        }
    }

    pub const fn verified(pattern: PatternKind, label: &'static str) -> Self {
        Self {
            pattern,
            verify: true,
            label,
        }
    }
}

/// Built-in algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmId {
    Dod,
    Gutmann,
    NistPurge,
    NistClear,
    #[serde(rename = "nist-3pass")]
    Nist3Pass,
}

impl AlgorithmId {
    pub const ALL: [AlgorithmId; 5] = [
        AlgorithmId::Dod,
        AlgorithmId::Gutmann,
        AlgorithmId::NistPurge,
        AlgorithmId::NistClear,
        AlgorithmId::Nist3Pass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmId::Dod => "dod",
            AlgorithmId::Gutmann => "gutmann",
            AlgorithmId::NistPurge => "nist-purge",
            AlgorithmId::NistClear => "nist-clear",
            AlgorithmId::Nist3Pass => "nist-3pass",
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            AlgorithmId::Dod => DoDWipe::algorithm(),
            AlgorithmId::Gutmann => GutmannWipe::algorithm(),
            AlgorithmId::NistPurge => NistWipe::purge(),
            AlgorithmId::NistClear => NistWipe::clear(),
            AlgorithmId::Nist3Pass => NistWipe::custom_three_pass(),
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmId {
    type Err = WipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "dod" | "dod5220" | "dod-5220" | "dod-3pass" | "dod-3-pass" => Ok(AlgorithmId::Dod),
            "gutmann" | "gutmann-35" | "gutmann-35pass" | "gutmann-35-pass" => {
                Ok(AlgorithmId::Gutmann)
            }
            "nist-purge" | "purge" | "nist" => Ok(AlgorithmId::NistPurge),
            "nist-clear" | "clear" | "zero" => Ok(AlgorithmId::NistClear),
            "nist-3pass" | "nist-3-pass" | "custom-3pass" | "custom-3-pass"
            | "custom-3-pass-(nist)" => {
                Ok(AlgorithmId::Nist3Pass)
            }
            _ => Err(WipeError::InvalidArgument(format!(
                "unknown algorithm '{}' (expected one of: dod, gutmann, nist-purge, nist-clear, nist-3pass)",
                s
            ))),
        }
    }
}

/// Named, immutable, ordered sequence of passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Algorithm {
    pub id: AlgorithmId,
    pub name: &'static str,
    pub description: &'static str,
    /// False for variants that are not a published sanitization standard
    pub standard: bool,
    pub passes: &'static [PassSpec],
}

impl Algorithm {
    /// Resolve a user-supplied algorithm name.
    pub fn from_name(name: &str) -> WipeResult<Self> {
        let algorithm = name.parse::<AlgorithmId>()?.algorithm();
        algorithm.validate()?;
        Ok(algorithm)
    }

    pub fn all() -> Vec<Algorithm> {
        AlgorithmId::ALL.iter().map(|id| id.algorithm()).collect()
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// The final pass is the one the verifier re-reads.
    pub fn final_pass_verifies(&self) -> bool {
        self.passes.last().map(|p| p.verify).unwrap_or(false)
    }

    pub fn validate(&self) -> WipeResult<()> {
        if self.passes.is_empty() {
            return Err(WipeError::InvalidArgument(format!(
                "algorithm {} has no passes",
                self.name
            )));
        }
        if self.passes[0].pattern == PatternKind::ComplementOfPrevious {
            return Err(WipeError::InvalidArgument(format!(
                "algorithm {} starts with a complement pass",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} passes)", self.name, self.pass_count())?;
        if !self.standard {
            write!(f, " [non-standard]")?;
        }
        Ok(())
    }
}

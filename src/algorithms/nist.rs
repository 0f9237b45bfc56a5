use super::{Algorithm, AlgorithmId, PassSpec, PatternKind};

/// NIST SP 800-88 Rev. 1 overwrite techniques.
pub struct NistWipe;

impl NistWipe {
    /// Clear: a single overwrite with a fixed value
    pub const CLEAR_PASSES: [PassSpec; 1] =
        [PassSpec::verified(PatternKind::Zero, "Clear: 0x00")];

    /// Purge (overwrite variant): a single pass of random data
    pub const PURGE_PASSES: [PassSpec; 1] =
        [PassSpec::verified(PatternKind::Random, "Purge: random data")];

    /// Not part of SP 800-88. Kept for parity with the "Custom 3-pass (NIST)" menu entry.
    pub const CUSTOM_3PASS: [PassSpec; 3] = [
        PassSpec::new(PatternKind::Random, "Pass 1/3: random data"),
        PassSpec::new(
            PatternKind::ComplementOfPrevious,
            "Pass 2/3: complement of pass 1",
        ),
        PassSpec::verified(PatternKind::Random, "Pass 3/3: random data"),
    ];

    pub fn clear() -> Algorithm {
        Algorithm {
            id: AlgorithmId::NistClear,
            name: "NIST 800-88 Clear",
            description: "1 pass of zeros, verified",
            standard: true,
            passes: &Self::CLEAR_PASSES,
        }
    }

    pub fn purge() -> Algorithm {
        Algorithm {
            id: AlgorithmId::NistPurge,
            name: "NIST 800-88 Purge",
            description: "1 pass of random data, verified",
            standard: true,
            passes: &Self::PURGE_PASSES,
        }
    }

    pub fn custom_three_pass() -> Algorithm {
        Algorithm {
            id: AlgorithmId::Nist3Pass,
            name: "Custom 3-pass (NIST-style, non-standard)",
            description: "random, complement, random; not an SP 800-88 technique",
            standard: false,
            passes: &Self::CUSTOM_3PASS,
        }
    }
}

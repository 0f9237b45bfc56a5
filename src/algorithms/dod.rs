use super::{Algorithm, AlgorithmId, PassSpec, PatternKind};

pub struct DoDWipe;

impl DoDWipe {
    /// DoD 5220.22-M standard pass 1 pattern (all zeros)
    pub const PASS_1_PATTERN: u8 = 0x00;

    /// DoD 5220.22-M standard pass 2 pattern (all ones)
    pub const PASS_2_PATTERN: u8 = 0xFF;

    /// DoD 5220.22-M requires exactly 3 passes
    pub const PASS_COUNT: usize = 3;

    pub const PASSES: [PassSpec; Self::PASS_COUNT] = [
        PassSpec::new(PatternKind::Zero, "Pass 1/3: 0x00"),
        PassSpec::new(PatternKind::One, "Pass 2/3: 0xFF"),
        PassSpec::verified(PatternKind::Random, "Pass 3/3: random data"),
    ];

    pub fn algorithm() -> Algorithm {
        Algorithm {
            id: AlgorithmId::Dod,
            name: "DoD 5220.22-M",
            description: "3 passes: zeros, ones, random; final pass verified",
            standard: true,
            passes: &Self::PASSES,
        }
    }
}

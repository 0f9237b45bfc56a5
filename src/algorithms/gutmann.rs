use super::{Algorithm, AlgorithmId, PassSpec, PatternKind};

pub struct GutmannWipe;

const fn fixed(bytes: &'static [u8], label: &'static str) -> PassSpec {
    PassSpec::new(PatternKind::Repeating(bytes), label)
}

const fn random(label: &'static str) -> PassSpec {
    PassSpec::new(PatternKind::Random, label)
}

impl GutmannWipe {
    pub const PASS_COUNT: usize = 35;

    /// The 35-pass Gutmann sequence from the 1996 paper.
    /// Passes 1-4 and 32-35 are random data;
    /// passes 5-31 target MFM and RLL (2,7) encodings.
    pub const PASSES: [PassSpec; Self::PASS_COUNT] = [
        random("Random Pass 1"),
        random("Random Pass 2"),
        random("Random Pass 3"),
        random("Random Pass 4"),
        fixed(&[0x55], "0x55 - MFM/RLL encoding"),                 // Pass 5
        fixed(&[0xAA], "0xAA - MFM/RLL encoding"),                 // Pass 6
        fixed(&[0x92, 0x49, 0x24], "0x92 0x49 0x24 - MFM specific"), // Pass 7
        fixed(&[0x49, 0x24, 0x92], "0x49 0x24 0x92 - MFM specific"), // Pass 8
        fixed(&[0x24, 0x92, 0x49], "0x24 0x92 0x49 - MFM specific"), // Pass 9
        PassSpec::new(PatternKind::Zero, "0x00 - All zeros"),       // Pass 10
        fixed(&[0x11], "0x11 - Pattern"),                          // Pass 11
        fixed(&[0x22], "0x22 - Pattern"),                          // Pass 12
        fixed(&[0x33], "0x33 - Pattern"),                          // Pass 13
        fixed(&[0x44], "0x44 - Pattern"),                          // Pass 14
        fixed(&[0x55], "0x55 - Pattern"),                          // Pass 15
        fixed(&[0x66], "0x66 - Pattern"),                          // Pass 16
        fixed(&[0x77], "0x77 - Pattern"),                          // Pass 17
        fixed(&[0x88], "0x88 - Pattern"),                          // Pass 18
        fixed(&[0x99], "0x99 - Pattern"),                          // Pass 19
        fixed(&[0xAA], "0xAA - Pattern"),                          // Pass 20
        fixed(&[0xBB], "0xBB - Pattern"),                          // Pass 21
        fixed(&[0xCC], "0xCC - Pattern"),                          // Pass 22
        fixed(&[0xDD], "0xDD - Pattern"),                          // Pass 23
        fixed(&[0xEE], "0xEE - Pattern"),                          // Pass 24
        PassSpec::new(PatternKind::One, "0xFF - All ones"),         // Pass 25
        fixed(&[0x92, 0x49, 0x24], "RLL (2,7) pattern 1"),         // Pass 26
        fixed(&[0x49, 0x24, 0x92], "RLL (2,7) pattern 2"),         // Pass 27
        fixed(&[0x24, 0x92, 0x49], "RLL (2,7) pattern 3"),         // Pass 28
        fixed(&[0x6D, 0xB6, 0xDB], "RLL (2,7) pattern 4"),         // Pass 29
        fixed(&[0xB6, 0xDB, 0x6D], "RLL (2,7) pattern 5"),         // Pass 30
        fixed(&[0xDB, 0x6D, 0xB6], "RLL (2,7) pattern 6"),         // Pass 31
        random("Random Pass 32"),
        random("Random Pass 33"),
        random("Random Pass 34"),
        PassSpec::verified(PatternKind::Random, "Random Pass 35"),
    ];

    pub fn algorithm() -> Algorithm {
        Algorithm {
            id: AlgorithmId::Gutmann,
            name: "Gutmann 35-pass",
            description: "35 passes: 4 random, 27 encoding-specific patterns, 4 random",
            standard: true,
            passes: &Self::PASSES,
        }
    }
}

// Deterministic sample planning for final-pass verification

/// Size of one sampled window
pub const SAMPLE_WINDOW: u64 = 4096;

/// Minimum bytes sampled per target, when the target is that large
pub const MIN_SAMPLE_BYTES: u64 = 100 * 1024;

/// Fraction of the target sampled, in percent
pub const SAMPLE_PERCENT: u64 = 10;

/// Byte range read during verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    pub offset: u64,
    pub len: u64,
}

/// Bytes to sample for a target of `length`: max(100 KiB, 10%), capped at length.
pub fn sample_budget(length: u64) -> u64 {
    let tenth = length.div_ceil(100 / SAMPLE_PERCENT);
    MIN_SAMPLE_BYTES.max(tenth).min(length)
}

/// Evenly spaced windows covering at least [`sample_budget`] bytes.
///
/// The first window starts at offset 0 and the last one ends at `length`.
/// When the budget is the whole target a single full-length range is returned.
pub fn plan_samples(length: u64) -> Vec<SampleWindow> {
    let budget = sample_budget(length);
    if budget == 0 {
        return Vec::new();
    }
    if budget >= length {
        return vec![SampleWindow { offset: 0, len: length }];
    }

    // budget < length implies length > MIN_SAMPLE_BYTES, so count >= 2
    let count = budget.div_ceil(SAMPLE_WINDOW);
    let last_start = length - SAMPLE_WINDOW;
    (0..count)
        .map(|i| SampleWindow {
            // u128 keeps the product exact for multi-terabyte devices
            offset: (i as u128 * last_start as u128 / (count - 1) as u128) as u64,
            len: SAMPLE_WINDOW,
        })
        .collect()
}

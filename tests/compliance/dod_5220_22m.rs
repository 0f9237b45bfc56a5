/// DoD 5220.22-M Compliance Tests
///
/// These tests validate that the DoD wiping algorithm complies with the
/// Department of Defense 5220.22-M data sanitization standard.
///
/// Standard Requirements:
/// - Pass 1: Write 0x00 (all zeros)
/// - Pass 2: Write 0xFF (all ones)
/// - Pass 3: Write cryptographically secure random data
/// - Exactly 3 passes required
/// - Must cover entire addressable space
use crate::common::test_helpers::{calculate_file_entropy, options_in, populate, test_engine, verify_pattern};
use anyhow::Result;
use ash_wipe::algorithms::dod::DoDWipe;
use ash_wipe::algorithms::{PassSeed, PatternGenerator};
use ash_wipe::{AlgorithmId, JobPhase, PatternKind, WipeOptions};
use tempfile::TempDir;

fn seeds() -> Vec<Option<PassSeed>> {
    vec![None, None, Some(PassSeed::from_bytes([0x5E; 32]))]
}

// ==================== PATTERN COMPLIANCE TESTS ====================

#[test]
fn test_dod_pass_patterns_exact() {
    assert_eq!(DoDWipe::PASS_1_PATTERN, 0x00, "pass 1 must use 0x00");
    assert_eq!(DoDWipe::PASS_2_PATTERN, 0xFF, "pass 2 must use 0xFF");
    assert_eq!(DoDWipe::PASS_COUNT, 3, "DoD 5220.22-M requires exactly 3 passes");
}

#[test]
fn test_dod_pass_sequence_order() {
    let algorithm = AlgorithmId::Dod.algorithm();
    let kinds: Vec<PatternKind> = algorithm.passes.iter().map(|p| p.pattern).collect();
    assert_eq!(
        kinds,
        vec![PatternKind::Zero, PatternKind::One, PatternKind::Random]
    );
    assert!(algorithm.standard);
    assert!(algorithm.final_pass_verifies());
}

// ==================== PATTERN APPLICATION TESTS ====================

#[test]
fn test_dod_fixed_passes_fill_entire_buffer() -> Result<()> {
    let algorithm = AlgorithmId::Dod.algorithm();
    let seeds = seeds();
    let generator = PatternGenerator::new(algorithm.passes, &seeds);

    let mut buf = vec![0x77u8; 100_003];
    generator.fill(0, 0, &mut buf)?;
    assert!(buf.iter().all(|&b| b == DoDWipe::PASS_1_PATTERN));

    generator.fill(1, 12_345, &mut buf)?;
    assert!(buf.iter().all(|&b| b == DoDWipe::PASS_2_PATTERN));
    Ok(())
}

#[test]
fn test_dod_random_pass_is_addressable_by_offset() -> Result<()> {
    let algorithm = AlgorithmId::Dod.algorithm();
    let seeds = seeds();
    let generator = PatternGenerator::new(algorithm.passes, &seeds);

    let mut whole = vec![0u8; 200_000];
    generator.fill(2, 0, &mut whole)?;

    // Any window regenerates identically, including across block boundaries
    for &(offset, len) in &[(0usize, 10usize), (65_530, 20), (131_000, 5_000), (199_990, 10)] {
        let mut part = vec![0u8; len];
        generator.fill(2, offset as u64, &mut part)?;
        assert_eq!(&part[..], &whole[offset..offset + len], "offset {}", offset);
    }
    Ok(())
}

#[test]
fn test_dod_random_differs_per_seed() -> Result<()> {
    let algorithm = AlgorithmId::Dod.algorithm();
    let a = seeds();
    let b = vec![None, None, Some(PassSeed::from_bytes([0x5F; 32]))];

    let mut buf_a = vec![0u8; 4096];
    let mut buf_b = vec![0u8; 4096];
    PatternGenerator::new(algorithm.passes, &a).fill(2, 0, &mut buf_a)?;
    PatternGenerator::new(algorithm.passes, &b).fill(2, 0, &mut buf_b)?;
    assert_ne!(buf_a, buf_b);
    Ok(())
}

// ==================== END-TO-END TESTS ====================

#[test]
fn test_dod_final_medium_is_high_entropy() -> Result<()> {
    let root = TempDir::new()?;
    let certs = TempDir::new()?;
    let files = populate(root.path(), &[("disk.img", 256 * 1024)])?;

    let options = WipeOptions {
        keep_files: true,
        ..options_in(&certs)
    };
    let report = test_engine()
        .start_wipe(root.path(), "dod-5220", options)?
        .wait_blocking()?;

    assert_eq!(report.status, JobPhase::Completed);
    assert_eq!(report.targets[0].passes_completed, DoDWipe::PASS_COUNT);
    assert!(!verify_pattern(&files[0], &[0x00])?);
    assert!(!verify_pattern(&files[0], &[0xFF])?);
    let entropy = calculate_file_entropy(&files[0])?;
    assert!(entropy > 7.9, "entropy {} too low for random pass", entropy);
    Ok(())
}

#[test]
fn test_dod_certificate_names_standard() -> Result<()> {
    let root = TempDir::new()?;
    let certs = TempDir::new()?;
    populate(root.path(), &[("f", 1000)])?;

    let report = test_engine()
        .start_wipe(root.path(), "dod", options_in(&certs))?
        .wait_blocking()?;
    let certificate = report.certificate.expect("certificate");
    assert_eq!(certificate.body.algorithm.name, "DoD 5220.22-M");
    assert_eq!(certificate.body.algorithm.passes, 3);
    assert!(certificate.body.algorithm.standard);
    Ok(())
}

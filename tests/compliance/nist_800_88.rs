/// NIST SP 800-88 Rev. 1 Compliance Tests
///
/// Validates the overwrite techniques described for Clear and Purge:
/// - Clear: single pass of a fixed value across all addressable locations
/// - Purge (overwrite): single pass of random data
/// - Verification of the written content is part of sanitization
/// - The 3-pass variant is clearly marked as not part of the guideline
use crate::common::test_helpers::{calculate_file_entropy, options_in, populate, test_engine, verify_all_zeros};
use anyhow::Result;
use ash_wipe::algorithms::nist::NistWipe;
use ash_wipe::algorithms::{PassSeed, PatternGenerator};
use ash_wipe::crypto::certificates::CertificateStatus;
use ash_wipe::{Algorithm, JobPhase, PatternKind, WipeOptions};
use tempfile::TempDir;

#[test]
fn test_clear_is_single_verified_zero_pass() {
    let clear = NistWipe::clear();
    assert_eq!(clear.pass_count(), 1);
    assert_eq!(clear.passes[0].pattern, PatternKind::Zero);
    assert!(clear.final_pass_verifies());
    assert!(clear.standard);
}

#[test]
fn test_purge_is_single_verified_random_pass() {
    let purge = NistWipe::purge();
    assert_eq!(purge.pass_count(), 1);
    assert_eq!(purge.passes[0].pattern, PatternKind::Random);
    assert!(purge.final_pass_verifies());
}

#[test]
fn test_three_pass_variant_is_non_standard() -> Result<()> {
    let custom = Algorithm::from_name("custom-3-pass")?;
    assert_eq!(custom, NistWipe::custom_three_pass());
    assert!(!custom.standard);
    assert_eq!(custom.passes[1].pattern, PatternKind::ComplementOfPrevious);
    Ok(())
}

#[test]
fn test_complement_pass_inverts_previous_random_pass() -> Result<()> {
    let custom = NistWipe::custom_three_pass();
    let seeds = vec![
        Some(PassSeed::from_bytes([1; 32])),
        None,
        Some(PassSeed::from_bytes([3; 32])),
    ];
    let generator = PatternGenerator::new(custom.passes, &seeds);
    assert!(generator.reads_medium(1));

    let mut first = vec![0u8; 70_000];
    let mut second = vec![0u8; 70_000];
    generator.fill(0, 500, &mut first)?;
    generator.fill(1, 500, &mut second)?;
    assert!(first.iter().zip(&second).all(|(a, b)| *a == !*b));
    Ok(())
}

#[test]
fn test_clear_end_to_end_zeroes_all_addressable_bytes() -> Result<()> {
    let root = TempDir::new()?;
    let certs = TempDir::new()?;
    // Odd length so the last chunk is partial
    let files = populate(root.path(), &[("odd.bin", 4096 * 7 + 13)])?;

    let options = WipeOptions {
        keep_files: true,
        ..options_in(&certs)
    };
    let report = test_engine()
        .start_wipe(root.path(), "clear", options)?
        .wait_blocking()?;

    assert_eq!(report.status, JobPhase::Completed);
    assert!(verify_all_zeros(&files[0])?);
    assert_eq!(std::fs::metadata(&files[0])?.len(), 4096 * 7 + 13);
    Ok(())
}

#[test]
fn test_purge_end_to_end_verified() -> Result<()> {
    let root = TempDir::new()?;
    let certs = TempDir::new()?;
    let files = populate(root.path(), &[("p.bin", 128 * 1024)])?;

    let options = WipeOptions {
        keep_files: true,
        ..options_in(&certs)
    };
    let report = test_engine()
        .start_wipe(root.path(), "nist-purge", options)?
        .wait_blocking()?;

    assert_eq!(report.status, JobPhase::Completed);
    assert_eq!(report.verification.passed, 1);
    assert!(calculate_file_entropy(&files[0])? > 7.9);
    let certificate = report.certificate.expect("certificate");
    assert_eq!(certificate.body.status, CertificateStatus::Success);
    Ok(())
}

#[test]
fn test_three_pass_end_to_end_certificate_flags_non_standard() -> Result<()> {
    let root = TempDir::new()?;
    let certs = TempDir::new()?;
    populate(root.path(), &[("f.bin", 9000)])?;

    let report = test_engine()
        .start_wipe(root.path(), "nist-3pass", options_in(&certs))?
        .wait_blocking()?;

    assert_eq!(report.status, JobPhase::Completed);
    assert_eq!(report.targets[0].passes_completed, 3);
    let certificate = report.certificate.expect("certificate");
    assert!(!certificate.body.algorithm.standard);
    Ok(())
}

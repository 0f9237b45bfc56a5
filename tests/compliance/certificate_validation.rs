/// Certificate Validation Tests
///
/// Checks the cryptographic authenticity and tamper detection of certificates
/// written by real jobs:
/// - Content hash is SHA-256 over the canonical body
/// - Ed25519 signature checks against the engine key
/// - Any edit to the stored JSON is detected
use crate::common::test_helpers::{options_in, populate, test_engine};
use anyhow::Result;
use ash_wipe::crypto::certificates::{Certificate, CertificateStatus};
use ash_wipe::{JobPhase, WipeEngine, WipeOptions};
use sha2::{Digest, Sha256};
use std::fs;
use tempfile::TempDir;

fn certified_job() -> Result<(WipeEngine, Certificate, std::path::PathBuf, TempDir, TempDir)> {
    let root = TempDir::new()?;
    let certs = TempDir::new()?;
    populate(root.path(), &[("a", 2000), ("b/c", 3000)])?;

    let engine = test_engine();
    let report = engine
        .start_wipe(root.path(), "dod", options_in(&certs))?
        .wait_blocking()?;
    assert_eq!(report.status, JobPhase::Completed);

    let files = report.certificate_files.expect("certificate files");
    let certificate = report.certificate.expect("certificate");
    Ok((engine, certificate, files.json, root, certs))
}

#[test]
fn test_stored_certificate_verifies() -> Result<()> {
    let (engine, certificate, json_path, _root, _certs) = certified_job()?;

    let loaded = Certificate::load(&json_path)?;
    assert_eq!(loaded, certificate);
    loaded.verify()?;
    loaded.verify_with_key(&engine.public_key_hex())?;
    Ok(())
}

#[test]
fn test_content_hash_is_sha256_of_canonical_body() -> Result<()> {
    let (_engine, certificate, _json, _root, _certs) = certified_job()?;

    let canonical = serde_json::to_vec(&certificate.body)?;
    assert_eq!(certificate.content_hash, hex::encode(Sha256::digest(&canonical)));
    assert_eq!(certificate.content_hash.len(), 64);
    Ok(())
}

#[test]
fn test_body_records_job_facts() -> Result<()> {
    let (_engine, certificate, _json, _root, _certs) = certified_job()?;
    let body = &certificate.body;

    assert_eq!(body.status, CertificateStatus::Success);
    assert_eq!(body.targets.len(), 2);
    assert_eq!(body.targets.iter().map(|t| t.length).sum::<u64>(), 5000);
    assert!(body.targets.iter().all(|t| t.passes_completed == 3 && t.removed));
    assert_eq!(body.verification.passed, 2);
    assert!(body.started_at <= body.finished_at);
    assert!(body.finished_at <= body.generated_at);
    Ok(())
}

#[test]
fn test_edited_json_fails_verification() -> Result<()> {
    let (_engine, _certificate, json_path, _root, _certs) = certified_job()?;

    let original = fs::read_to_string(&json_path)?;
    let tampered = original.replacen("\"passes_completed\": 3", "\"passes_completed\": 4", 1);
    assert_ne!(original, tampered, "fixture must contain the edited field");
    fs::write(&json_path, tampered)?;

    let loaded = Certificate::load(&json_path)?;
    assert!(loaded.verify().is_err());
    Ok(())
}

#[test]
fn test_foreign_key_rejected() -> Result<()> {
    let (_engine, certificate, _json, _root, _certs) = certified_job()?;

    let other = test_engine();
    assert!(certificate.verify_with_key(&other.public_key_hex()).is_err());
    Ok(())
}

#[test]
fn test_no_certificate_without_completion() -> Result<()> {
    let dir = TempDir::new()?;
    let certs = TempDir::new()?;
    let report = test_engine()
        .start_wipe(dir.path().join("missing"), "dod", WipeOptions {
            certificate_dir: Some(certs.path().to_path_buf()),
            ..WipeOptions::default()
        })?
        .wait_blocking()?;

    assert_eq!(report.status, JobPhase::Failed);
    assert!(report.certificate.is_none());
    assert_eq!(fs::read_dir(certs.path())?.count(), 0);
    Ok(())
}

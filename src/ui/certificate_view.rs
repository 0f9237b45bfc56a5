//! Human-readable rendering of a signed certificate.
//!
//! Pure function of the certificate: the same certificate always renders to
//! the same text, so the `.txt` written next to the JSON can be regenerated
//! and diffed later.

use crate::crypto::certificates::Certificate;
use crate::OverwriteGuarantee;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

const RULE: &str =
    "======================================================================";

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn render(certificate: &Certificate) -> String {
    let body = &certificate.body;
    let mut out = String::new();

    // write! to a String cannot fail
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "                 CERTIFICATE OF DATA ERASURE");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Certificate ID : {}", body.certificate_id);
    let _ = writeln!(out, "Job ID         : {}", body.job_id);
    let _ = writeln!(out, "Status         : {}", body.status.as_str());
    let _ = writeln!(
        out,
        "Operator       : {}",
        body.operator_id.as_deref().unwrap_or("(not recorded)")
    );
    let _ = writeln!(out, "Root           : {}", body.root_path.display());
    let _ = writeln!(out, "Started        : {}", timestamp(&body.started_at));
    let _ = writeln!(out, "Finished       : {}", timestamp(&body.finished_at));
    let _ = writeln!(out, "Issued         : {}", timestamp(&body.generated_at));
    out.push('\n');

    let _ = writeln!(out, "ALGORITHM");
    let _ = writeln!(
        out,
        "  {} ({} pass{})",
        body.algorithm.name,
        body.algorithm.passes,
        if body.algorithm.passes == 1 { "" } else { "es" }
    );
    if !body.algorithm.standard {
        let _ = writeln!(out, "  Note: not a published sanitization standard");
    }
    let guarantee = match body.overwrite_guarantee {
        OverwriteGuarantee::FullOverwrite => "full in-place overwrite",
        OverwriteGuarantee::BestEffort => "best effort (in-place overwrite not guaranteed)",
    };
    let _ = writeln!(out, "  Guarantee: {}", guarantee);
    out.push('\n');

    let _ = writeln!(out, "TARGETS ({})", body.targets.len());
    if body.targets.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for target in &body.targets {
        let _ = writeln!(out, "  {}", target.path.display());
        let _ = writeln!(
            out,
            "    {} | {} bytes | {}/{} passes | verification {} ({} bytes read){}",
            target.kind,
            target.length,
            target.passes_completed,
            body.algorithm.passes,
            target.verification,
            target.bytes_verified,
            if target.removed { " | removed" } else { "" }
        );
    }
    out.push('\n');

    let summary = &body.verification;
    let _ = writeln!(out, "VERIFICATION");
    let _ = writeln!(
        out,
        "  passed {} | failed {} | skipped {} | {} bytes compared",
        summary.passed, summary.failed, summary.skipped, summary.bytes_compared
    );

    if !body.warnings.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "WARNINGS");
        for warning in &body.warnings {
            let _ = writeln!(out, "  - {}", warning);
        }
    }
    out.push('\n');

    let _ = writeln!(out, "SIGNATURE (Ed25519)");
    let _ = writeln!(out, "  Content SHA-256 : {}", certificate.content_hash);
    let _ = writeln!(out, "  Public key      : {}", certificate.public_key);
    let _ = writeln!(out, "  Signature       : {}", certificate.signature);
    let _ = writeln!(out, "{}", RULE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::certificates::{sample_body, CertificateGenerator, CertificateStatus};

    fn sample_certificate() -> Certificate {
        CertificateGenerator::new_ephemeral()
            .unwrap()
            .generate(sample_body())
            .unwrap()
    }

    #[test]
    fn test_render_contains_key_fields() {
        let cert = sample_certificate();
        let text = render(&cert);

        assert!(text.contains("Status         : SUCCESS"));
        assert!(text.contains("cert-1"));
        assert!(text.contains("op-7"));
        assert!(text.contains("/data/secret/a.bin"));
        assert!(text.contains("3/3 passes"));
        assert!(text.contains(&cert.content_hash));
        assert!(text.contains(&cert.signature));
        // Second precision, UTC designator
        assert!(text.contains("2026-03-14T09:26:53Z"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let cert = sample_certificate();
        assert_eq!(render(&cert), render(&cert));
    }

    #[test]
    fn test_render_failed_status_and_warnings() {
        let mut body = sample_body();
        body.status = CertificateStatus::VerificationFailed;
        body.warnings = vec!["skipped symbolic link /data/secret/l".to_string()];
        body.operator_id = None;
        body.targets.clear();
        let cert = CertificateGenerator::new_ephemeral()
            .unwrap()
            .generate(body)
            .unwrap();

        let text = render(&cert);
        assert!(text.contains("VERIFICATION FAILED"));
        assert!(text.contains("WARNINGS"));
        assert!(text.contains("(not recorded)"));
        assert!(text.contains("TARGETS (0)"));
        assert!(text.contains("(none)"));
    }
}

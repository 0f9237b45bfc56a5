use crate::algorithms::{Algorithm, AlgorithmId};
use crate::io::write_durably;
use crate::targets::TargetKind;
use crate::verification::{VerificationOutcome, VerificationSummary};
use crate::{OverwriteGuarantee, WipeError, WipeResult};
use chrono::{DateTime, Utc};
use ring::rand::SystemRandom;
use ring::signature::{self, Ed25519KeyPair, KeyPair, UnparsedPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    pub id: AlgorithmId,
    pub name: String,
    /// False for algorithms that are not a published standard
    pub standard: bool,
    pub passes: usize,
}

impl From<&Algorithm> for AlgorithmSummary {
    fn from(algorithm: &Algorithm) -> Self {
        Self {
            id: algorithm.id,
            name: algorithm.name.to_string(),
            standard: algorithm.standard,
            passes: algorithm.pass_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSummary {
    #[serde(with = "crate::io::raw_path")]
    pub path: PathBuf,
    pub kind: TargetKind,
    pub length: u64,
    pub passes_completed: usize,
    pub verification: VerificationOutcome,
    pub bytes_verified: u64,
    /// The file was unlinked after wiping
    pub removed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    /// Every target was wiped and verified
    Success,
    /// At least one target failed verification
    VerificationFailed,
    /// Wiped, but verification was disabled or not applicable
    NotVerified,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Success => "SUCCESS",
            CertificateStatus::VerificationFailed => "VERIFICATION FAILED",
            CertificateStatus::NotVerified => "NOT VERIFIED",
        }
    }
}

/// Everything the certificate attests to. The content hash covers exactly this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBody {
    pub certificate_id: String,
    pub job_id: String,
    pub algorithm: AlgorithmSummary,
    pub overwrite_guarantee: OverwriteGuarantee,
    pub operator_id: Option<String>,
    #[serde(with = "crate::io::raw_path")]
    pub root_path: PathBuf,
    pub targets: Vec<TargetSummary>,
    pub warnings: Vec<String>,
    pub status: CertificateStatus,
    pub verification: VerificationSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl CertificateBody {
    /// Canonical serialization: serde_json in struct field order, no whitespace.
    pub fn canonical_json(&self) -> WipeResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| WipeError::Certificate(format!("failed to serialize body: {}", e)))
    }

    /// Hex-encoded SHA-256 of the canonical body.
    pub fn compute_hash(&self) -> WipeResult<String> {
        let json = self.canonical_json()?;
        Ok(hex::encode(Sha256::digest(&json)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub body: CertificateBody,
    pub content_hash: String,
    /// Ed25519 signature over the hex content hash
    pub signature: String,
    pub public_key: String,
}

impl Certificate {
    pub fn id(&self) -> &str {
        &self.body.certificate_id
    }

    /// Recompute the hash and check the embedded signature.
    pub fn verify(&self) -> WipeResult<()> {
        self.verify_with_key(&self.public_key)
    }

    /// Like [`Certificate::verify`], but against a trusted public key instead
    /// of the one carried in the certificate.
    pub fn verify_with_key(&self, public_key_hex: &str) -> WipeResult<()> {
        let hash = self.body.compute_hash()?;
        if hash != self.content_hash {
            return Err(WipeError::Certificate(format!(
                "content hash mismatch: recorded {}, computed {}",
                self.content_hash, hash
            )));
        }

        let public_key = hex::decode(public_key_hex)
            .map_err(|e| WipeError::Certificate(format!("malformed public key: {}", e)))?;
        let signature = hex::decode(&self.signature)
            .map_err(|e| WipeError::Certificate(format!("malformed signature: {}", e)))?;

        UnparsedPublicKey::new(&signature::ED25519, &public_key)
            .verify(self.content_hash.as_bytes(), &signature)
            .map_err(|_| WipeError::Certificate("signature verification failed".to_string()))
    }

    pub fn to_json_pretty(&self) -> WipeResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WipeError::Certificate(format!("failed to serialize certificate: {}", e)))
    }

    pub fn from_json(json: &str) -> WipeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| WipeError::Certificate(format!("failed to parse certificate: {}", e)))
    }

    pub fn load(path: &Path) -> WipeResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| WipeError::from_lookup(path, e))?;
        Self::from_json(&json)
    }
}

/// Paths written by [`CertificateGenerator::save_certificate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateFiles {
    pub json: PathBuf,
    pub text: PathBuf,
}

pub struct CertificateGenerator {
    key_pair: Ed25519KeyPair,
}

impl std::fmt::Debug for CertificateGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateGenerator")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

impl CertificateGenerator {
    /// Generator with a key that lives only as long as this process.
    pub fn new_ephemeral() -> WipeResult<Self> {
        let pkcs8 = Self::generate_pkcs8()?;
        Self::from_pkcs8(&pkcs8)
    }

    /// Load a PKCS#8 Ed25519 key from `path`, creating and persisting one if absent.
    pub fn load_or_generate(path: &Path) -> WipeResult<Self> {
        match fs::read(path) {
            Ok(bytes) => {
                tracing::debug!(path = %path.display(), "Loaded certificate signing key");
                Self::from_pkcs8(&bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let pkcs8 = Self::generate_pkcs8()?;
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| WipeError::Certificate(format!("{}: {}", parent.display(), e)))?;
                }
                write_durably(path, &pkcs8, Some(0o600))
                    .map_err(|e| WipeError::Certificate(format!("{}: {}", path.display(), e)))?;
                tracing::info!(path = %path.display(), "Generated new certificate signing key");
                Self::from_pkcs8(&pkcs8)
            }
            Err(e) => Err(WipeError::Certificate(format!(
                "cannot read signing key {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn generate_pkcs8() -> WipeResult<Vec<u8>> {
        let rng = SystemRandom::new();
        let document = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|_| WipeError::Certificate("failed to generate signing key".to_string()))?;
        Ok(document.as_ref().to_vec())
    }

    fn from_pkcs8(bytes: &[u8]) -> WipeResult<Self> {
        let key_pair = Ed25519KeyPair::from_pkcs8(bytes)
            .map_err(|e| WipeError::Certificate(format!("invalid signing key: {}", e)))?;
        Ok(Self { key_pair })
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key_pair.public_key().as_ref())
    }

    /// Hash and sign `body`, producing an immutable certificate.
    pub fn generate(&self, body: CertificateBody) -> WipeResult<Certificate> {
        let content_hash = body.compute_hash()?;
        let signature = self.key_pair.sign(content_hash.as_bytes());

        Ok(Certificate {
            body,
            content_hash,
            signature: hex::encode(signature.as_ref()),
            public_key: self.public_key_hex(),
        })
    }

    /// Write `<dir>/<certificate-id>.json` and its text rendering durably.
    pub fn save_certificate(&self, certificate: &Certificate, dir: &Path) -> WipeResult<CertificateFiles> {
        let files = CertificateFiles {
            json: dir.join(format!("{}.json", certificate.id())),
            text: dir.join(format!("{}.txt", certificate.id())),
        };
        let write_err = |path: &Path, reason: String| WipeError::CertificateWrite {
            path: path.to_path_buf(),
            reason,
        };

        fs::create_dir_all(dir).map_err(|e| write_err(dir, e.to_string()))?;

        let json = certificate.to_json_pretty()?;
        write_durably(&files.json, json.as_bytes(), None)
            .map_err(|e| write_err(&files.json, e.to_string()))?;

        let text = crate::ui::certificate_view::render(certificate);
        write_durably(&files.text, text.as_bytes(), None)
            .map_err(|e| write_err(&files.text, e.to_string()))?;

        tracing::info!(
            certificate_id = %certificate.id(),
            path = %files.json.display(),
            "Certificate saved"
        );
        Ok(files)
    }
}

/// Fresh certificate identifier.
pub fn new_certificate_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) fn sample_body() -> CertificateBody {
    let at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 3, 14, 9, 26, 53).unwrap();
    CertificateBody {
        certificate_id: "cert-1".to_string(),
        job_id: "job-1".to_string(),
        algorithm: AlgorithmSummary::from(&AlgorithmId::Dod.algorithm()),
        overwrite_guarantee: OverwriteGuarantee::FullOverwrite,
        operator_id: Some("op-7".to_string()),
        root_path: PathBuf::from("/data/secret"),
        targets: vec![TargetSummary {
            path: PathBuf::from("/data/secret/a.bin"),
            kind: TargetKind::File,
            length: 4096,
            passes_completed: 3,
            verification: VerificationOutcome::Passed,
            bytes_verified: 4096,
            removed: true,
        }],
        warnings: vec![],
        status: CertificateStatus::Success,
        verification: VerificationSummary {
            passed: 1,
            failed: 0,
            skipped: 0,
            bytes_compared: 4096,
        },
        started_at: at,
        finished_at: at,
        generated_at: at,
    }
}

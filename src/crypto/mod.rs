pub mod certificates;
pub mod secure_rng;

// Re-export
pub use certificates::{
    AlgorithmSummary, Certificate, CertificateBody, CertificateFiles, CertificateGenerator,
    CertificateStatus, TargetSummary,
};
pub use secure_rng::secure_random_bytes;

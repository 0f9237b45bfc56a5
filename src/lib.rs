// Allow complex types where needed for comprehensive error handling and configuration
#![allow(clippy::type_complexity)]

pub mod algorithms;
pub mod config;
pub mod crypto;
pub mod error;
pub mod io;
pub mod logging;
pub mod targets;
pub mod ui;
pub mod verification;
pub mod wipe_orchestrator;

// Re-export main wipe engine for convenience
pub use algorithms::{Algorithm, AlgorithmId, PassSpec, PatternKind};
pub use config::EngineConfig;
pub use wipe_orchestrator::{
    CancelToken, JobHandle, JobSnapshot, ProgressEvent, TargetReport, WipeEngine, WipeEvent,
    WipeEvents, WipeReport,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// Error taxonomy for the wipe engine
#[derive(Error, Debug)]
pub enum WipeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Access denied for {}: {reason}", path.display())]
    Access { path: PathBuf, reason: String },

    #[error("I/O error on {}{}: {source}", path.display(), pass_suffix(*pass))]
    Io {
        path: PathBuf,
        pass: Option<usize>,
        #[source]
        source: std::io::Error,
    },

    #[error("Target {} changed length from {expected} to {actual} bytes", path.display())]
    TargetModified {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("A wipe job is already running for {}", .0.display())]
    JobAlreadyRunning(PathBuf),

    #[error("Failed to write certificate to {}: {reason}", path.display())]
    CertificateWrite { path: PathBuf, reason: String },

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Journal error: {0}")]
    Journal(String),

    #[error("Secure random generator failure: {0}")]
    Rng(String),

    #[error("Wipe worker terminated unexpectedly")]
    WorkerTerminated,

    #[error("Operation cancelled")]
    Cancelled,
}

fn pass_suffix(pass: Option<usize>) -> String {
    match pass {
        Some(p) => format!(" (pass {})", p + 1),
        None => String::new(),
    }
}

impl WipeError {
    /// Wrap an I/O error raised while working on `path`.
    pub fn io(path: impl Into<PathBuf>, pass: Option<usize>, source: std::io::Error) -> Self {
        WipeError::Io {
            path: path.into(),
            pass,
            source,
        }
    }

    /// Map an I/O error raised while resolving a path onto the enumeration taxonomy.
    pub fn from_lookup(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => WipeError::NotFound(path),
            _ => WipeError::Access {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// True for errors raised before any data was touched.
    pub fn is_pre_wipe(&self) -> bool {
        matches!(
            self,
            WipeError::InvalidArgument(_)
                | WipeError::NotFound(_)
                | WipeError::Access { .. }
                | WipeError::JobAlreadyRunning(_)
        )
    }
}

// Manual Clone implementation because std::io::Error doesn't implement Clone
impl Clone for WipeError {
    fn clone(&self) -> Self {
        match self {
            WipeError::InvalidArgument(s) => WipeError::InvalidArgument(s.clone()),
            WipeError::NotFound(p) => WipeError::NotFound(p.clone()),
            WipeError::Access { path, reason } => WipeError::Access {
                path: path.clone(),
                reason: reason.clone(),
            },
            WipeError::Io { path, pass, source } => WipeError::Io {
                path: path.clone(),
                pass: *pass,
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            WipeError::TargetModified {
                path,
                expected,
                actual,
            } => WipeError::TargetModified {
                path: path.clone(),
                expected: *expected,
                actual: *actual,
            },
            WipeError::JobAlreadyRunning(p) => WipeError::JobAlreadyRunning(p.clone()),
            WipeError::CertificateWrite { path, reason } => WipeError::CertificateWrite {
                path: path.clone(),
                reason: reason.clone(),
            },
            WipeError::Certificate(s) => WipeError::Certificate(s.clone()),
            WipeError::Journal(s) => WipeError::Journal(s.clone()),
            WipeError::Rng(s) => WipeError::Rng(s.clone()),
            WipeError::WorkerTerminated => WipeError::WorkerTerminated,
            WipeError::Cancelled => WipeError::Cancelled,
        }
    }
}

impl From<rusqlite::Error> for WipeError {
    fn from(err: rusqlite::Error) -> Self {
        WipeError::Journal(err.to_string())
    }
}

pub type WipeResult<T> = Result<T, WipeError>;

/// Options accepted by [`WipeEngine::start_wipe`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WipeOptions {
    /// Descend into subdirectories of the root
    pub recurse: bool,
    /// Re-read the final pass of every target
    pub verify: bool,
    /// Overwrite only; leave the (now overwritten) files and directories in place
    pub keep_files: bool,
    pub operator_id: Option<String>,
    /// Overrides the engine's configured certificate directory
    #[serde(default, with = "crate::io::raw_path::option")]
    pub certificate_dir: Option<PathBuf>,
}

impl Default for WipeOptions {
    fn default() -> Self {
        Self {
            recurse: true,
            verify: true,
            keep_files: false,
            operator_id: None,
            certificate_dir: None,
        }
    }
}

/// Phases of a wipe job.
///
/// ```text
/// Pending -> Enumerating -> Wiping -> Verifying -> Certifying -> Completed
///    \___________\______________\__________\____________\-----> Cancelled | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Pending,
    Enumerating,
    Wiping,
    Verifying,
    Certifying,
    Completed,
    Cancelled,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobPhase::Completed | JobPhase::Cancelled | JobPhase::Failed
        )
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobPhase::Cancelled | JobPhase::Failed => true,
            _ => matches!(
                (self, next),
                (JobPhase::Pending, JobPhase::Enumerating)
                    | (JobPhase::Enumerating, JobPhase::Wiping)
                    | (JobPhase::Wiping, JobPhase::Verifying)
                    | (JobPhase::Verifying, JobPhase::Certifying)
                    | (JobPhase::Certifying, JobPhase::Completed)
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Pending => "pending",
            JobPhase::Enumerating => "enumerating",
            JobPhase::Wiping => "wiping",
            JobPhase::Verifying => "verifying",
            JobPhase::Certifying => "certifying",
            JobPhase::Completed => "completed",
            JobPhase::Cancelled => "cancelled",
            JobPhase::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let phase = match s {
            "pending" => JobPhase::Pending,
            "enumerating" => JobPhase::Enumerating,
            "wiping" => JobPhase::Wiping,
            "verifying" => JobPhase::Verifying,
            "certifying" => JobPhase::Certifying,
            "completed" => JobPhase::Completed,
            "cancelled" => JobPhase::Cancelled,
            "failed" => JobPhase::Failed,
            _ => return None,
        };
        Some(phase)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the storage layer let us do to the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteGuarantee {
    /// Every byte of every target was overwritten in place
    FullOverwrite,
    /// The storage layer could only replace content; in-place overwrite is not guaranteed
    BestEffort,
}

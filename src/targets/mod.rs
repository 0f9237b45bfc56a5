pub mod enumeration;

pub use enumeration::{EnumeratedTargets, SkipReason, SkippedTarget, TargetEnumerator};

use crate::io::StorageAccess;
use crate::{WipeError, WipeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    File,
    BlockDevice,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::File => write!(f, "file"),
            TargetKind::BlockDevice => write!(f, "block device"),
        }
    }
}

/// A single file or block device subject to erasure.
///
/// `length` is captured once at enumeration and drives every write. The
/// pass counter only moves forward, one step per fully flushed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeTarget {
    #[serde(with = "crate::io::raw_path")]
    pub path: PathBuf,
    pub length: u64,
    pub kind: TargetKind,
    passes_completed: usize,
}

impl WipeTarget {
    pub fn new(path: impl Into<PathBuf>, length: u64, kind: TargetKind) -> Self {
        Self {
            path: path.into(),
            length,
            kind,
            passes_completed: 0,
        }
    }

    pub fn passes_completed(&self) -> usize {
        self.passes_completed
    }

    pub(crate) fn record_pass(&mut self) {
        self.passes_completed += 1;
    }

    /// Restore the counter from a journal checkpoint.
    pub(crate) fn restore_progress(&mut self, passes_completed: usize) {
        self.passes_completed = passes_completed;
    }

    /// Fail with `TargetModified` if the target no longer has its captured length.
    pub fn check_length(&self, storage: &dyn StorageAccess) -> WipeResult<()> {
        let actual = storage
            .length(&self.path)
            .map_err(|e| WipeError::io(&self.path, None, e))?;
        if actual != self.length {
            return Err(WipeError::TargetModified {
                path: self.path.clone(),
                expected: self.length,
                actual,
            });
        }
        Ok(())
    }
}

// Target enumeration: resolve a root path into ordered erase targets

use super::{TargetKind, WipeTarget};
use crate::io::{EntryKind, StorageAccess};
use crate::{WipeError, WipeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Symlink,
    /// FIFO, socket, character device, or a block device below the root
    SpecialFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTarget {
    #[serde(with = "crate::io::raw_path")]
    pub path: PathBuf,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            SkipReason::Symlink => write!(f, "skipped symbolic link {}", self.path.display()),
            SkipReason::SpecialFile => write!(f, "skipped special file {}", self.path.display()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratedTargets {
    /// Sorted by path
    pub targets: Vec<WipeTarget>,
    /// Directories below the root, deepest first
    #[serde(with = "crate::io::raw_path::vec")]
    pub directories: Vec<PathBuf>,
    pub skipped: Vec<SkippedTarget>,
}

impl EnumeratedTargets {
    pub fn total_bytes(&self) -> u64 {
        self.targets.iter().map(|t| t.length).sum()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.skipped.iter().map(|s| s.to_string()).collect()
    }
}

pub struct TargetEnumerator<'a> {
    storage: &'a dyn StorageAccess,
    recurse: bool,
}

impl<'a> TargetEnumerator<'a> {
    pub fn new(storage: &'a dyn StorageAccess, recurse: bool) -> Self {
        Self { storage, recurse }
    }

    pub fn enumerate(&self, root: &Path) -> WipeResult<EnumeratedTargets> {
        let meta = self
            .storage
            .metadata(root)
            .map_err(|e| WipeError::from_lookup(root, e))?;

        let mut result = EnumeratedTargets::default();
        match meta.kind {
            EntryKind::Symlink => {
                return Err(WipeError::InvalidArgument(format!(
                    "root {} is a symbolic link",
                    root.display()
                )));
            }
            EntryKind::Other => {
                return Err(WipeError::InvalidArgument(format!(
                    "root {} is not a regular file, directory or block device",
                    root.display()
                )));
            }
            EntryKind::File => {
                result.targets.push(self.target(root, TargetKind::File)?);
            }
            EntryKind::BlockDevice => {
                result.targets.push(self.target(root, TargetKind::BlockDevice)?);
            }
            EntryKind::Directory => {
                self.walk(root, &mut result)?;
            }
        }

        result.targets.sort_by(|a, b| a.path.cmp(&b.path));
        // Deepest first so each directory is empty by the time it is removed
        result.directories.sort_by(|a, b| {
            b.components()
                .count()
                .cmp(&a.components().count())
                .then_with(|| b.cmp(a))
        });

        for skipped in &result.skipped {
            tracing::warn!(path = %skipped.path.display(), reason = ?skipped.reason, "Skipping entry");
        }
        tracing::debug!(
            root = %root.display(),
            targets = result.targets.len(),
            directories = result.directories.len(),
            bytes = result.total_bytes(),
            "Enumeration complete"
        );

        Ok(result)
    }

    fn target(&self, path: &Path, kind: TargetKind) -> WipeResult<WipeTarget> {
        let length = self
            .storage
            .length(path)
            .map_err(|e| WipeError::from_lookup(path, e))?;
        Ok(WipeTarget::new(path, length, kind))
    }

    fn walk(&self, root: &Path, result: &mut EnumeratedTargets) -> WipeResult<()> {
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = self
                .storage
                .list(&dir)
                .map_err(|e| WipeError::from_lookup(&dir, e))?;

            for path in entries {
                let meta = self
                    .storage
                    .metadata(&path)
                    .map_err(|e| WipeError::from_lookup(&path, e))?;

                match meta.kind {
                    EntryKind::File => result.targets.push(self.target(&path, TargetKind::File)?),
                    EntryKind::Directory if self.recurse => {
                        result.directories.push(path.clone());
                        pending.push(path);
                    }
                    EntryKind::Directory => {
                        tracing::debug!(path = %path.display(), "Not descending (recursion disabled)");
                    }
                    EntryKind::Symlink => result.skipped.push(SkippedTarget {
                        path,
                        reason: SkipReason::Symlink,
                    }),
                    EntryKind::BlockDevice | EntryKind::Other => result.skipped.push(SkippedTarget {
                        path,
                        reason: SkipReason::SpecialFile,
                    }),
                }
            }
        }

        Ok(())
    }
}

pub mod pass_executor;
pub mod raw_path;
pub mod storage;

#[cfg(test)]
mod tests;

// Re-exports
pub use pass_executor::{PassExecutor, PassOutcome};
pub use storage::{EntryKind, EntryMetadata, LocalStorage, StorageAccess, WritableHandle};

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

/// Tuning knobs for the pass executor
#[derive(Debug, Clone, PartialEq)]
pub struct IOConfig {
    /// Bytes per positional write
    pub chunk_size: usize,

    /// Retries per chunk after a short write or transient error, on top of
    /// the initial write
    pub max_write_retries: u32,

    /// First retry delay; doubled on each attempt
    pub retry_base_delay: Duration,

    /// Upper bound for a single retry delay
    pub retry_max_delay: Duration,
}

impl Default for IOConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024, // 1MB
            max_write_retries: 5,
            retry_base_delay: Duration::from_millis(10),
            retry_max_delay: Duration::from_secs(1),
        }
    }
}

impl IOConfig {
    pub fn validate(&self) -> crate::WipeResult<()> {
        if self.chunk_size == 0 {
            return Err(crate::WipeError::InvalidArgument(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Replace `path` with `bytes` so that readers see either the old or the new
/// content: temp file, fsync, rename, then fsync of the directory.
pub fn write_durably(path: &Path, bytes: &[u8], mode: Option<u32>) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(format!(".tmp-{}", std::process::id()));
    let tmp_path = path.with_file_name(tmp_name);

    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    if let Some(mode) = mode {
        opts.mode(mode);
    }

    let result = (|| {
        let mut file = opts.open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    // Make the rename itself durable
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

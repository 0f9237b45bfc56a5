//! Common test helper functions

use ash_wipe::{EngineConfig, WipeEngine, WipeOptions};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Engine with small chunks and fast retries, in-memory journal, ephemeral key
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        chunk_size: 4096,
        max_write_retries: 2,
        retry_base_delay_ms: 1,
        ..EngineConfig::default()
    }
}

pub fn test_engine() -> WipeEngine {
    WipeEngine::new(fast_config()).expect("engine")
}

/// Options that write certificates into `certs`
pub fn options_in(certs: &TempDir) -> WipeOptions {
    WipeOptions {
        certificate_dir: Some(certs.path().to_path_buf()),
        ..WipeOptions::default()
    }
}

/// Create `files` (relative path, length) under `root`, filled with a marker byte
pub fn populate(root: &Path, files: &[(&str, usize)]) -> std::io::Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for (i, (name, len)) in files.iter().enumerate() {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, vec![0x40 + i as u8; *len])?;
        created.push(path);
    }
    Ok(created)
}

/// Verify that a file contains only zeros
pub fn verify_all_zeros(path: &Path) -> std::io::Result<bool> {
    verify_pattern(path, &[0x00])
}

/// Verify that a file contains a specific pattern, phase-aligned to offset 0
pub fn verify_pattern(path: &Path, pattern: &[u8]) -> std::io::Result<bool> {
    let mut file = fs::File::open(path)?;
    let mut buffer = vec![0u8; 4096];
    let mut offset = 0usize;

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        for &byte in &buffer[..bytes_read] {
            if byte != pattern[offset % pattern.len()] {
                return Ok(false);
            }
            offset += 1;
        }
    }

    Ok(true)
}

/// Calculate Shannon entropy of a file
pub fn calculate_file_entropy(path: &Path) -> std::io::Result<f64> {
    let buffer = fs::read(path)?;
    Ok(ash_wipe::crypto::secure_rng::calculate_entropy(&buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_verify_all_zeros() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&vec![0u8; 1024]).unwrap();
        temp.flush().unwrap();

        assert!(verify_all_zeros(temp.path()).unwrap());
    }

    #[test]
    fn test_verify_pattern_across_buffer_boundary() {
        let mut temp = NamedTempFile::new().unwrap();
        let pattern = [0x92, 0x49, 0x24];
        let data: Vec<u8> = (0..10_000).map(|i| pattern[i % 3]).collect();
        temp.write_all(&data).unwrap();
        temp.flush().unwrap();

        assert!(verify_pattern(temp.path(), &pattern).unwrap());
    }
}

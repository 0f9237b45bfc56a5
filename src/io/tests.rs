#[cfg(test)]
mod tests {
    use crate::algorithms::{AlgorithmId, PassSeed, PassSpec, PatternGenerator, PatternKind};
    use crate::io::storage::MockWritableHandle;
    use crate::io::*;
    use crate::targets::{TargetKind, WipeTarget};
    use crate::WipeError;
    use std::fs;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

    fn fast_config(chunk_size: usize) -> IOConfig {
        IOConfig {
            chunk_size,
            max_write_retries: 3,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(2),
        }
    }

    const ZERO_PASS: [PassSpec; 1] = [PassSpec::verified(PatternKind::Zero, "zeros")];

    #[test]
    fn test_dod_passes_on_real_file() -> Result<()> {
        let temp = NamedTempFile::new()?;
        fs::write(temp.path(), vec![0x5A; 10_000])?;

        let storage = LocalStorage::new();
        let algorithm = AlgorithmId::Dod.algorithm();
        let seeds = [None, None, Some(PassSeed::from_bytes([9; 32]))];
        let generator = PatternGenerator::new(algorithm.passes, &seeds);
        let executor = PassExecutor::new(fast_config(4096));
        let mut target = WipeTarget::new(temp.path(), 10_000, TargetKind::File);

        let mut handle = storage.open_for_write(temp.path())?;
        for pass in 0..algorithm.pass_count() {
            let outcome = executor.execute_pass(handle.as_mut(), &mut target, &generator, pass)?;
            assert_eq!(outcome.bytes_written, 10_000);
            assert_eq!(outcome.retries, 0);
            assert_eq!(target.passes_completed(), pass + 1);

            let on_disk = fs::read(temp.path())?;
            let mut expected = vec![0u8; 10_000];
            generator.fill(pass, 0, &mut expected)?;
            assert_eq!(on_disk, expected, "pass {} content mismatch", pass + 1);
        }

        // Length never changes
        assert_eq!(fs::metadata(temp.path())?.len(), 10_000);
        Ok(())
    }

    #[test]
    fn test_complement_pass_inverts_medium() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let original: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        fs::write(temp.path(), &original)?;

        let algorithm = AlgorithmId::Nist3Pass.algorithm();
        let seeds = [Some(PassSeed::from_bytes([1; 32])), None, Some(PassSeed::from_bytes([2; 32]))];
        let generator = PatternGenerator::new(algorithm.passes, &seeds);
        let executor = PassExecutor::new(fast_config(1024));
        let mut target = WipeTarget::new(temp.path(), 5000, TargetKind::File);
        let mut handle = LocalStorage::new().open_for_write(temp.path())?;

        executor.execute_pass(handle.as_mut(), &mut target, &generator, 0)?;
        let after_random = fs::read(temp.path())?;
        executor.execute_pass(handle.as_mut(), &mut target, &generator, 1)?;
        let after_complement = fs::read(temp.path())?;

        let inverted: Vec<u8> = after_random.iter().map(|b| !b).collect();
        assert_eq!(after_complement, inverted);

        // The expected value matches what was actually written
        let mut expected = vec![0u8; 5000];
        generator.fill(1, 0, &mut expected)?;
        assert_eq!(after_complement, expected);
        Ok(())
    }

    #[test]
    fn test_rerun_of_interrupted_complement_pass() -> Result<()> {
        let temp = NamedTempFile::new()?;
        fs::write(temp.path(), vec![0x11; 6000])?;

        let algorithm = AlgorithmId::Nist3Pass.algorithm();
        let seeds = [Some(PassSeed::from_bytes([4; 32])), None, Some(PassSeed::from_bytes([5; 32]))];
        let generator = PatternGenerator::new(algorithm.passes, &seeds);
        let executor = PassExecutor::new(fast_config(1024));
        let mut target = WipeTarget::new(temp.path(), 6000, TargetKind::File);
        let mut handle = LocalStorage::new().open_for_write(temp.path())?;
        executor.execute_pass(handle.as_mut(), &mut target, &generator, 0)?;

        // Crash after the first 2500 bytes of the complement reached the medium
        let mut torn = fs::read(temp.path())?;
        torn[..2500].iter_mut().for_each(|b| *b = !*b);
        fs::write(temp.path(), &torn)?;

        let mut expected = vec![0u8; 6000];
        generator.fill(1, 0, &mut expected)?;

        executor.rerun_pass(handle.as_mut(), &mut target, &generator, 1)?;
        assert_eq!(fs::read(temp.path())?, expected);
        assert_eq!(target.passes_completed(), 2);
        Ok(())
    }

    #[test]
    fn test_rerun_of_plain_pass_matches_execute() -> Result<()> {
        let temp = NamedTempFile::new()?;
        fs::write(temp.path(), vec![0x77; 3000])?;

        let algorithm = AlgorithmId::Dod.algorithm();
        let seeds = [None, None, Some(PassSeed::from_bytes([6; 32]))];
        let generator = PatternGenerator::new(algorithm.passes, &seeds);
        let executor = PassExecutor::new(fast_config(1024));
        let mut target = WipeTarget::new(temp.path(), 3000, TargetKind::File);
        target.restore_progress(2);
        let mut handle = LocalStorage::new().open_for_write(temp.path())?;

        executor.rerun_pass(handle.as_mut(), &mut target, &generator, 2)?;
        let mut expected = vec![0u8; 3000];
        generator.fill(2, 0, &mut expected)?;
        assert_eq!(fs::read(temp.path())?, expected);
        Ok(())
    }

    #[test]
    fn test_short_write_is_retried() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_mock = Arc::clone(&calls);

        let mut handle = MockWritableHandle::new();
        handle.expect_write_at().returning(move |buf, _offset| {
            // First call writes only half the chunk
            if calls_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(buf.len() / 2)
            } else {
                Ok(buf.len())
            }
        });
        handle.expect_sync().times(1).returning(|| Ok(()));

        let seeds = [None];
        let generator = PatternGenerator::new(&ZERO_PASS, &seeds);
        let executor = PassExecutor::new(fast_config(1024));
        let mut target = WipeTarget::new("/virtual/t", 2048, TargetKind::File);

        let outcome = executor.execute_pass(&mut handle, &mut target, &generator, 0)?;
        assert_eq!(outcome.bytes_written, 2048);
        assert_eq!(outcome.retries, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(target.passes_completed(), 1);
        Ok(())
    }

    #[test]
    fn test_transient_error_is_retried() -> Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_mock = Arc::clone(&calls);

        let mut handle = MockWritableHandle::new();
        handle.expect_write_at().returning(move |buf, _offset| {
            if calls_in_mock.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(io::Error::new(io::ErrorKind::Interrupted, "signal"))
            } else {
                Ok(buf.len())
            }
        });
        handle.expect_sync().returning(|| Ok(()));

        let seeds = [None];
        let generator = PatternGenerator::new(&ZERO_PASS, &seeds);
        let executor = PassExecutor::new(fast_config(4096));
        let mut target = WipeTarget::new("/virtual/t", 100, TargetKind::File);

        let outcome = executor.execute_pass(&mut handle, &mut target, &generator, 0)?;
        assert_eq!(outcome.retries, 2);
        Ok(())
    }

    #[test]
    fn test_zero_writes_exhaust_retries() {
        let mut handle = MockWritableHandle::new();
        // One attempt plus three retries
        handle.expect_write_at().times(4).returning(|_, _| Ok(0));
        handle.expect_sync().never();

        let seeds = [None];
        let generator = PatternGenerator::new(&ZERO_PASS, &seeds);
        let executor = PassExecutor::new(fast_config(4096));
        let mut target = WipeTarget::new("/virtual/t", 100, TargetKind::File);

        let err = executor
            .execute_pass(&mut handle, &mut target, &generator, 0)
            .unwrap_err();
        assert!(matches!(err, WipeError::Io { pass: Some(0), .. }));
        assert_eq!(target.passes_completed(), 0, "Failed pass must not be counted");
    }

    #[test]
    fn test_fatal_error_not_retried() {
        let mut handle = MockWritableHandle::new();
        handle
            .expect_write_at()
            .times(1)
            .returning(|_, _| Err(io::Error::new(io::ErrorKind::PermissionDenied, "ro")));

        let seeds = [None];
        let generator = PatternGenerator::new(&ZERO_PASS, &seeds);
        let executor = PassExecutor::new(fast_config(4096));
        let mut target = WipeTarget::new("/virtual/t", 100, TargetKind::File);

        let err = executor
            .execute_pass(&mut handle, &mut target, &generator, 0)
            .unwrap_err();
        match err {
            WipeError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sync_failure_fails_pass() {
        let mut handle = MockWritableHandle::new();
        handle.expect_write_at().returning(|buf, _| Ok(buf.len()));
        handle
            .expect_sync()
            .returning(|| Err(io::Error::new(io::ErrorKind::Other, "flush failed")));

        let seeds = [None];
        let generator = PatternGenerator::new(&ZERO_PASS, &seeds);
        let executor = PassExecutor::new(fast_config(4096));
        let mut target = WipeTarget::new("/virtual/t", 100, TargetKind::File);

        assert!(executor.execute_pass(&mut handle, &mut target, &generator, 0).is_err());
        assert_eq!(target.passes_completed(), 0);
    }

    #[test]
    fn test_chunk_offsets_cover_target() -> Result<()> {
        let offsets = Arc::new(std::sync::Mutex::new(Vec::new()));
        let offsets_in_mock = Arc::clone(&offsets);

        let mut handle = MockWritableHandle::new();
        handle.expect_write_at().returning(move |buf, offset| {
            offsets_in_mock.lock().unwrap().push((offset, buf.len()));
            Ok(buf.len())
        });
        handle.expect_sync().returning(|| Ok(()));

        let seeds = [None];
        let generator = PatternGenerator::new(&ZERO_PASS, &seeds);
        let executor = PassExecutor::new(fast_config(1000));
        let mut target = WipeTarget::new("/virtual/t", 2500, TargetKind::File);

        executor.execute_pass(&mut handle, &mut target, &generator, 0)?;
        assert_eq!(
            *offsets.lock().unwrap(),
            vec![(0, 1000), (1000, 1000), (2000, 500)]
        );
        Ok(())
    }

    #[test]
    fn test_empty_target_still_flushes() -> Result<()> {
        let mut handle = MockWritableHandle::new();
        handle.expect_write_at().never();
        handle.expect_sync().times(1).returning(|| Ok(()));

        let seeds = [None];
        let generator = PatternGenerator::new(&ZERO_PASS, &seeds);
        let executor = PassExecutor::new(IOConfig::default());
        let mut target = WipeTarget::new("/virtual/empty", 0, TargetKind::File);

        let outcome = executor.execute_pass(&mut handle, &mut target, &generator, 0)?;
        assert_eq!(outcome.bytes_written, 0);
        assert_eq!(target.passes_completed(), 1);
        Ok(())
    }

    #[test]
    fn test_write_durably_replaces_content() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("record.json");

        write_durably(&path, b"first", None)?;
        write_durably(&path, b"second", None)?;
        assert_eq!(fs::read(&path)?, b"second");

        // No temp files left behind
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }
}

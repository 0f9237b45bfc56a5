// Pass executor: one overwrite pass over one target

use super::storage::WritableHandle;
use super::IOConfig;
use crate::algorithms::PatternGenerator;
use crate::algorithms::pattern::complement_in_place;
use crate::error::classification::{classify_io, ErrorClass};
use crate::error::retry::{ExponentialBackoff, RetryStrategy};
use crate::targets::WipeTarget;
use crate::{WipeError, WipeResult};
use std::io;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub bytes_written: u64,
    /// Chunk-level retries spent on short writes and transient errors
    pub retries: u32,
    pub duration: Duration,
}

impl PassOutcome {
    pub fn throughput_bytes_per_sec(&self) -> u64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.bytes_written as f64 / secs) as u64
        } else {
            0
        }
    }
}

pub struct PassExecutor {
    config: IOConfig,
    retry: ExponentialBackoff,
}

impl PassExecutor {
    pub fn new(config: IOConfig) -> Self {
        let retry = ExponentialBackoff::for_writes(&config);
        Self { config, retry }
    }

    pub fn config(&self) -> &IOConfig {
        &self.config
    }

    /// Write pass `pass_index` over `[0, target.length)` and flush it durably.
    ///
    /// The target's pass counter is incremented only when every byte was
    /// written and the flush succeeded.
    pub fn execute_pass(
        &self,
        handle: &mut dyn WritableHandle,
        target: &mut WipeTarget,
        generator: &PatternGenerator<'_>,
        pass_index: usize,
    ) -> WipeResult<PassOutcome> {
        let from_medium = generator.reads_medium(pass_index);
        self.run_pass(handle, target, generator, pass_index, from_medium)
    }

    /// Re-run a pass that may have been cut short by a crash.
    ///
    /// A complement pass is regenerated from the earlier passes' patterns
    /// instead of re-read: part of the medium may already be inverted.
    pub fn rerun_pass(
        &self,
        handle: &mut dyn WritableHandle,
        target: &mut WipeTarget,
        generator: &PatternGenerator<'_>,
        pass_index: usize,
    ) -> WipeResult<PassOutcome> {
        self.run_pass(handle, target, generator, pass_index, false)
    }

    fn run_pass(
        &self,
        handle: &mut dyn WritableHandle,
        target: &mut WipeTarget,
        generator: &PatternGenerator<'_>,
        pass_index: usize,
        from_medium: bool,
    ) -> WipeResult<PassOutcome> {
        let pass = generator.pass(pass_index)?;
        let start = Instant::now();
        let io_err = |e: io::Error| WipeError::io(&target.path, Some(pass_index), e);

        let chunk_size = (self.config.chunk_size as u64).min(target.length.max(1)) as usize;
        let mut buffer = vec![0u8; chunk_size];
        let mut offset = 0u64;
        let mut retries = 0u32;

        while offset < target.length {
            let len = ((target.length - offset) as usize).min(chunk_size);
            let chunk = &mut buffer[..len];

            if from_medium {
                read_exact_at(handle, chunk, offset).map_err(io_err)?;
                complement_in_place(chunk);
            } else {
                generator.fill(pass_index, offset, chunk)?;
            }

            retries += self.write_chunk(handle, chunk, offset).map_err(io_err)?;
            offset += len as u64;
        }

        handle.sync().map_err(io_err)?;
        target.record_pass();

        let outcome = PassOutcome {
            bytes_written: offset,
            retries,
            duration: start.elapsed(),
        };
        tracing::debug!(
            path = %target.path.display(),
            pass = pass_index + 1,
            pattern = %pass.pattern,
            bytes = outcome.bytes_written,
            retries = outcome.retries,
            "Pass complete"
        );
        Ok(outcome)
    }

    /// Write all of `chunk` at `offset`, retrying the remainder after a short
    /// write or transient error. Returns the number of retries used.
    fn write_chunk(
        &self,
        handle: &mut dyn WritableHandle,
        chunk: &[u8],
        offset: u64,
    ) -> io::Result<u32> {
        let mut written = 0usize;
        let mut attempt = 0u32;

        while written < chunk.len() {
            let failure = match handle.write_at(&chunk[written..], offset + written as u64) {
                Ok(0) => io::Error::new(io::ErrorKind::WriteZero, "write returned zero bytes"),
                Ok(n) => {
                    written += n;
                    if written == chunk.len() {
                        break;
                    }
                    io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("short write: {} of {} bytes", written, chunk.len()),
                    )
                }
                Err(e) => e,
            };

            // Lack of progress is retried like a transient error
            let class = match failure.kind() {
                io::ErrorKind::WriteZero => ErrorClass::Transient,
                _ => classify_io(&failure),
            };
            if !self.retry.should_retry(attempt, class) {
                tracing::warn!(
                    offset = offset + written as u64,
                    attempts = attempt + 1,
                    class = %class,
                    error = %failure,
                    "Chunk write failed"
                );
                return Err(failure);
            }

            let delay = self.retry.next_delay(attempt);
            tracing::debug!(
                offset = offset + written as u64,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Retrying chunk write"
            );
            std::thread::sleep(delay);
            attempt += 1;
        }

        Ok(attempt)
    }
}

/// Fill `buf` from `offset`, tolerating short reads.
pub(crate) fn read_exact_at(
    handle: &mut dyn WritableHandle,
    buf: &mut [u8],
    offset: u64,
) -> io::Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match handle.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("target ended at offset {}", offset + filled as u64),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Error recovery for the wipe engine
///
/// This module provides:
/// - Classification of storage errors into transient and fatal
/// - Retry strategies with exponential backoff and jitter
/// - SQLite-based job journal for resume after cancellation or a crash
///
/// # Architecture
///
/// ```text
/// ┌─────────────────────────────────────────┐
/// │      Wipe scheduler (per-job worker)     │
/// └────────────────┬────────────────────────┘
///                  │
///      ┌───────────┴───────────┐
///      ↓                       ↓
/// ┌──────────────┐      ┌──────────────┐
/// │Classification│      │  Job journal  │
/// │   & Retry    │      │ (checkpoint)  │
/// └──────────────┘      └──────────────┘
/// ```
///
/// Retry happens only at the chunk level inside the pass executor. The
/// journal records each completed pass, so a resumed job repeats at most the
/// pass that was running when it stopped.
///
/// # Usage Example
///
/// ```rust,no_run
/// use ash_wipe::error::JobJournal;
///
/// let journal = JobJournal::open(Some(std::path::Path::new("/var/lib/ash-wipe/journal.db")))?;
/// for job in journal.list_resumable()? {
///     println!("{} stopped in phase {}", job.job_id, job.phase);
/// }
/// # Ok::<(), ash_wipe::WipeError>(())
/// ```

pub mod checkpoint;
pub mod classification;
pub mod retry;

// Re-export main types for convenience
pub use checkpoint::{JobJournal, JobRecord};
pub use classification::{classify_io, ErrorClass};
pub use retry::{ExponentialBackoff, RetryStrategy};

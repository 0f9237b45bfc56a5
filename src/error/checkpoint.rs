/// SQLite-based job journal for resume capability
///
/// One row per job holds the frozen plan (targets, directories, options);
/// per-target pass counters and per-pass random seeds live in their own
/// tables so a checkpoint after each pass is a single-row upsert.
use crate::algorithms::{AlgorithmId, PassSeed};
use crate::io::raw_path;
use crate::targets::WipeTarget;
use crate::{JobPhase, WipeError, WipeOptions, WipeResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Everything needed to continue a job from its last completed pass
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub job_id: String,
    pub root: PathBuf,
    pub algorithm: AlgorithmId,
    pub options: WipeOptions,
    pub phase: JobPhase,
    /// Targets with their pass counters restored
    pub targets: Vec<WipeTarget>,
    /// Directories to remove during cleanup, deepest first
    pub directories: Vec<PathBuf>,
    pub warnings: Vec<String>,
    /// `seeds[target][pass]`, `Some` for random passes only
    pub seeds: Vec<Vec<Option<PassSeed>>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl JobRecord {
    pub fn is_resumable(&self) -> bool {
        self.phase != JobPhase::Completed
    }
}

#[derive(Serialize, Deserialize)]
struct StoredPlan {
    targets: Vec<WipeTarget>,
    #[serde(with = "crate::io::raw_path::vec")]
    directories: Vec<PathBuf>,
    warnings: Vec<String>,
}

fn json_err(e: serde_json::Error) -> WipeError {
    WipeError::Journal(format!("malformed journal data: {}", e))
}

/// Job journal database
pub struct JobJournal {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl std::fmt::Debug for JobJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobJournal").field("db_path", &self.db_path).finish()
    }
}

impl JobJournal {
    /// Open (or create) the journal at `path`; `None` keeps it in memory.
    pub fn open(path: Option<&Path>) -> WipeResult<Self> {
        let conn = match path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        WipeError::Journal(format!("cannot create {}: {}", parent.display(), e))
                    })?;
                }
                let conn = Connection::open(path)?;
                // WAL for crash resilience; NORMAL sync is safe under WAL
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn
            }
            None => Connection::open_in_memory()?,
        };
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let journal = Self {
            conn,
            db_path: path.map(Path::to_path_buf),
        };
        journal.initialize_schema()?;
        Ok(journal)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize_schema(&self) -> WipeResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                job_id TEXT PRIMARY KEY NOT NULL,
                root BLOB NOT NULL,
                algorithm TEXT NOT NULL,
                options TEXT NOT NULL,
                phase TEXT NOT NULL,
                plan TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_error TEXT
            );

            CREATE TABLE IF NOT EXISTS progress (
                job_id TEXT NOT NULL REFERENCES jobs(job_id) ON DELETE CASCADE,
                target_index INTEGER NOT NULL,
                passes_completed INTEGER NOT NULL,
                PRIMARY KEY (job_id, target_index)
            );

            CREATE TABLE IF NOT EXISTS seeds (
                job_id TEXT NOT NULL REFERENCES jobs(job_id) ON DELETE CASCADE,
                target_index INTEGER NOT NULL,
                pass_index INTEGER NOT NULL,
                seed TEXT NOT NULL,
                PRIMARY KEY (job_id, target_index, pass_index)
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_phase ON jobs(phase);
            "#,
        )?;
        Ok(())
    }

    /// Persist a new job with its plan and seeds in one transaction.
    pub fn create_job(&mut self, record: &JobRecord) -> WipeResult<()> {
        let start = Instant::now();
        let options = serde_json::to_string(&record.options).map_err(json_err)?;
        let plan = serde_json::to_string(&StoredPlan {
            targets: record.targets.clone(),
            directories: record.directories.clone(),
            warnings: record.warnings.clone(),
        })
        .map_err(json_err)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO jobs (job_id, root, algorithm, options, phase, plan, created_at, updated_at, last_error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.job_id,
                raw_path::to_bytes(&record.root),
                record.algorithm.as_str(),
                options,
                record.phase.as_str(),
                plan,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
                record.last_error,
            ],
        )?;

        {
            let mut progress = tx.prepare(
                "INSERT INTO progress (job_id, target_index, passes_completed) VALUES (?1, ?2, ?3)",
            )?;
            let mut seeds = tx.prepare(
                "INSERT INTO seeds (job_id, target_index, pass_index, seed) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (t, target) in record.targets.iter().enumerate() {
                progress.execute(params![record.job_id, t as i64, target.passes_completed() as i64])?;
                let target_seeds = record.seeds.get(t).map(Vec::as_slice).unwrap_or(&[]);
                for (p, seed) in target_seeds.iter().enumerate() {
                    if let Some(seed) = seed {
                        seeds.execute(params![record.job_id, t as i64, p as i64, seed.to_hex()])?;
                    }
                }
            }
        }
        tx.commit()?;

        tracing::debug!(
            job_id = %record.job_id,
            targets = record.targets.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Journalled new job"
        );
        Ok(())
    }

    /// Checkpoint a target's pass counter after a completed pass.
    pub fn record_pass(
        &mut self,
        job_id: &str,
        target_index: usize,
        passes_completed: usize,
    ) -> WipeResult<()> {
        let updated = self.conn.execute(
            "UPDATE progress SET passes_completed = ?3 WHERE job_id = ?1 AND target_index = ?2",
            params![job_id, target_index as i64, passes_completed as i64],
        )?;
        if updated == 0 {
            return Err(WipeError::Journal(format!(
                "no progress row for job {} target {}",
                job_id, target_index
            )));
        }
        self.touch(job_id)
    }

    pub fn set_phase(
        &mut self,
        job_id: &str,
        phase: JobPhase,
        last_error: Option<&str>,
    ) -> WipeResult<()> {
        self.conn.execute(
            "UPDATE jobs SET phase = ?2, last_error = COALESCE(?3, last_error), updated_at = ?4 WHERE job_id = ?1",
            params![job_id, phase.as_str(), last_error, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn touch(&self, job_id: &str) -> WipeResult<()> {
        self.conn.execute(
            "UPDATE jobs SET updated_at = ?2 WHERE job_id = ?1",
            params![job_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn load(&self, job_id: &str) -> WipeResult<Option<JobRecord>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT job_id, root, algorithm, options, phase, plan, created_at, updated_at, last_error
                FROM jobs WHERE job_id = ?1
                "#,
                params![job_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, Option<String>>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((job_id, root, algorithm, options, phase, plan, created_at, updated_at, last_error)) = row
        else {
            return Ok(None);
        };

        let algorithm: AlgorithmId = algorithm.parse()?;
        let phase = JobPhase::parse(&phase)
            .ok_or_else(|| WipeError::Journal(format!("unknown phase '{}'", phase)))?;
        let options: WipeOptions = serde_json::from_str(&options).map_err(json_err)?;
        let mut plan: StoredPlan = serde_json::from_str(&plan).map_err(json_err)?;

        let mut stmt = self
            .conn
            .prepare("SELECT target_index, passes_completed FROM progress WHERE job_id = ?1")?;
        let progress = stmt.query_map(params![job_id], |row| {
            Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as usize))
        })?;
        for entry in progress {
            let (index, passes) = entry?;
            if let Some(target) = plan.targets.get_mut(index) {
                target.restore_progress(passes);
            }
        }

        let pass_count = algorithm.algorithm().pass_count();
        let mut seeds = vec![vec![None; pass_count]; plan.targets.len()];
        let mut stmt = self
            .conn
            .prepare("SELECT target_index, pass_index, seed FROM seeds WHERE job_id = ?1")?;
        let rows = stmt.query_map(params![job_id], |row| {
            Ok((
                row.get::<_, i64>(0)? as usize,
                row.get::<_, i64>(1)? as usize,
                row.get::<_, String>(2)?,
            ))
        })?;
        for entry in rows {
            let (t, p, seed) = entry?;
            let slot = seeds
                .get_mut(t)
                .and_then(|s| s.get_mut(p))
                .ok_or_else(|| WipeError::Journal(format!("seed index {}/{} out of range", t, p)))?;
            *slot = Some(PassSeed::from_hex(&seed)?);
        }

        Ok(Some(JobRecord {
            job_id,
            root: raw_path::from_bytes(root),
            algorithm,
            options,
            phase,
            targets: plan.targets,
            directories: plan.directories,
            warnings: plan.warnings,
            seeds,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            last_error,
        }))
    }

    /// Jobs that did not complete, most recently updated first.
    pub fn list_resumable(&self) -> WipeResult<Vec<JobRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id FROM jobs WHERE phase != ?1 ORDER BY updated_at DESC",
        )?;
        let ids = stmt
            .query_map(params![JobPhase::Completed.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.load(&id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn delete(&mut self, job_id: &str) -> WipeResult<()> {
        self.conn
            .execute("DELETE FROM jobs WHERE job_id = ?1", params![job_id])?;
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> WipeResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WipeError::Journal(format!("invalid timestamp '{}': {}", s, e)))
}

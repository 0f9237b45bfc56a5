use anyhow::{bail, Context, Result};
use ash_wipe::crypto::certificates::Certificate;
use ash_wipe::logging::{self, LogConfig};
use ash_wipe::ui::certificate_view;
use ash_wipe::ui::progress::ProgressBar;
use ash_wipe::*;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use futures::StreamExt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ash-wipe")]
#[command(about = "Secure erasure of files, directory trees and block devices with signed certificates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the per-user config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
}

/// Shorthand for a built-in algorithm
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Level {
    /// NIST 800-88 Clear, one zero pass
    Quick,
    /// DoD 5220.22-M, three passes
    Normal,
    /// Gutmann, 35 passes
    Secure,
}

impl Level {
    fn algorithm(self) -> AlgorithmId {
        match self {
            Level::Quick => AlgorithmId::NistClear,
            Level::Normal => AlgorithmId::Dod,
            Level::Secure => AlgorithmId::Gutmann,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Wipe a file, a directory tree, or a block device
    Wipe {
        /// File, directory or device path
        root: PathBuf,

        /// Wiping algorithm (dod, gutmann, nist-purge, nist-clear, nist-3pass)
        #[arg(short, long, conflicts_with = "level")]
        algorithm: Option<String>,

        /// Pick an algorithm by strength instead of by name
        #[arg(short, long, value_enum)]
        level: Option<Level>,

        /// Only wipe files directly inside the root
        #[arg(long)]
        no_recurse: bool,

        /// Skip read-back verification
        #[arg(long)]
        no_verify: bool,

        /// Overwrite but do not delete files and directories
        #[arg(long)]
        keep_files: bool,

        /// Operator recorded in the certificate
        #[arg(long)]
        operator: Option<String>,

        /// Directory for the certificate files
        #[arg(long)]
        cert_dir: Option<PathBuf>,

        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Continue an interrupted or cancelled job
    Resume {
        job_id: String,
    },

    /// List jobs that can be resumed
    Jobs,

    /// List available algorithms
    Algorithms,

    /// Check a certificate's hash and signature
    VerifyCert {
        file: PathBuf,

        /// Require this signing key (hex) instead of trusting the embedded one
        #[arg(long)]
        public_key: Option<String>,
    },

    /// Print a certificate in human-readable form
    RenderCert {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cfg!(feature = "color-output") {
        colored::control::set_override(false);
    }

    let config = EngineConfig::load(cli.config.as_deref())?.with_default_paths();
    let _log_guard = logging::init(LogConfig {
        json: cli.json || config.log_json,
        verbose: cli.debug,
        log_dir: config.log_dir.clone(),
    })?;

    match cli.command {
        Commands::Wipe {
            root,
            algorithm,
            level,
            no_recurse,
            no_verify,
            keep_files,
            operator,
            cert_dir,
            yes,
        } => {
            let algorithm = match (algorithm, level) {
                (Some(name), _) => name,
                (None, Some(level)) => level.algorithm().to_string(),
                (None, None) => AlgorithmId::Dod.to_string(),
            };
            let options = WipeOptions {
                recurse: !no_recurse,
                verify: !no_verify,
                keep_files,
                operator_id: operator,
                certificate_dir: cert_dir,
            };
            wipe(config, &root, &algorithm, options, yes).await
        }
        Commands::Resume { job_id } => {
            let engine = WipeEngine::new(config)?;
            let handle = engine.resume_job(&job_id)?;
            println!("{} {}", "Resuming job".bold(), handle.job_id());
            run_job(handle).await
        }
        Commands::Jobs => list_jobs(config),
        Commands::Algorithms => {
            list_algorithms();
            Ok(())
        }
        Commands::VerifyCert { file, public_key } => verify_certificate(&file, public_key.as_deref()),
        Commands::RenderCert { file } => {
            let certificate = Certificate::load(&file)?;
            print!("{}", certificate_view::render(&certificate));
            Ok(())
        }
    }
}

async fn wipe(
    config: EngineConfig,
    root: &Path,
    algorithm: &str,
    options: WipeOptions,
    assume_yes: bool,
) -> Result<()> {
    // Resolve before prompting so typos fail without a confirmation
    let resolved = Algorithm::from_name(algorithm)?;

    if !assume_yes {
        println!(
            "\n{}",
            "WARNING: this PERMANENTLY DESTROYS data and cannot be undone."
                .red()
                .bold()
        );
        println!("  Target:    {}", root.display());
        println!("  Algorithm: {}", resolved);
        println!(
            "  Mode:      {}{}",
            if options.recurse { "recursive" } else { "top level only" },
            if options.keep_files { ", keep files" } else { "" }
        );
        print!("\nType 'DESTROY' to confirm: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim() != "DESTROY" {
            println!("Operation cancelled");
            return Ok(());
        }
    }

    let engine = WipeEngine::new(config)?;
    let handle = engine.start_wipe(root, algorithm, options)?;
    println!("{} {}", "Started job".bold(), handle.job_id());
    run_job(handle).await
}

/// Drive a job to completion, rendering progress and honoring Ctrl-C.
async fn run_job(handle: JobHandle) -> Result<()> {
    setup_signal_handler(handle.cancel_token())?;

    let mut events = handle
        .subscribe()
        .context("event stream already taken")?;
    let mut bar = ProgressBar::new(32);

    while let Some(event) = events.next().await {
        match event {
            WipeEvent::Phase { phase, .. } => {
                bar.finish();
                tracing::info!(phase = %phase, "Phase");
            }
            WipeEvent::Progress(progress) => bar.render(&progress),
            WipeEvent::Result(_) => break,
        }
    }
    bar.finish();

    let report = handle.wait().await?;
    print_report(&report);

    match report.status {
        JobPhase::Completed => Ok(()),
        JobPhase::Cancelled => {
            println!(
                "Resume with: {} {}",
                "ash-wipe resume".bold(),
                report.job_id
            );
            bail!("wipe cancelled")
        }
        _ => match report.error {
            Some(WipeError::CertificateWrite { .. }) => {
                bail!("data was erased but the certificate could not be written")
            }
            Some(e) => Err(e.into()),
            None => bail!("wipe failed"),
        },
    }
}

fn print_report(report: &WipeReport) {
    println!();
    let status = match report.status {
        JobPhase::Completed => report.status.as_str().to_uppercase().green().bold(),
        JobPhase::Cancelled => report.status.as_str().to_uppercase().yellow().bold(),
        _ => report.status.as_str().to_uppercase().red().bold(),
    };
    println!("Job {}: {}", report.job_id, status);
    println!("  Algorithm:  {}", report.algorithm);
    println!(
        "  Targets:    {}/{} fully wiped ({} bytes)",
        report.completed_targets().count(),
        report.targets.len(),
        report.total_bytes()
    );
    println!(
        "  Verified:   {} passed, {} failed, {} skipped",
        report.verification.passed, report.verification.failed, report.verification.skipped
    );
    let elapsed = (report.finished_at - report.started_at)
        .to_std()
        .unwrap_or_default();
    println!(
        "  Duration:   {}",
        humantime::format_duration(std::time::Duration::from_secs(elapsed.as_secs()))
    );

    for target in report.targets.iter().filter(|t| t.error.is_some()) {
        if let Some(error) = &target.error {
            println!("  {} {}: {}", "error".red(), target.path.display(), error);
        }
    }
    for warning in &report.warnings {
        println!("  {} {}", "warning".yellow(), warning);
    }

    if let Some(files) = &report.certificate_files {
        println!("  Certificate: {}", files.json.display());
        println!("               {}", files.text.display());
    } else if let Some(certificate) = &report.certificate {
        println!(
            "  {} certificate {} was generated but not saved",
            "!".red().bold(),
            certificate.id()
        );
    }
    if let Some(error) = &report.error {
        if !matches!(error, WipeError::Cancelled) {
            println!("  {} {}", "Error:".red().bold(), error);
        }
    }
}

fn list_jobs(config: EngineConfig) -> Result<()> {
    let engine = WipeEngine::new(config)?;
    let jobs = engine.resumable_jobs()?;
    if jobs.is_empty() {
        println!("No resumable jobs");
        return Ok(());
    }
    for job in jobs {
        let pass_total = job.algorithm.algorithm().pass_count();
        let done = job
            .targets
            .iter()
            .filter(|t| t.passes_completed() >= pass_total)
            .count();
        println!(
            "{}  {:<11} {:<10} {}/{} targets  {}",
            job.job_id,
            job.phase,
            job.algorithm,
            done,
            job.targets.len(),
            job.root.display()
        );
        if let Some(error) = &job.last_error {
            println!("    last error: {}", error);
        }
    }
    Ok(())
}

fn list_algorithms() {
    println!("{}", "Available algorithms:".bold());
    for algorithm in Algorithm::all() {
        println!(
            "  {:<11} {} ({} passes){}",
            algorithm.id.to_string().cyan(),
            algorithm.name,
            algorithm.pass_count(),
            if algorithm.standard { "" } else { " [non-standard]" }
        );
        println!("              {}", algorithm.description);
    }
    println!();
    println!("Levels: quick = nist-clear, normal = dod, secure = gutmann");
}

fn verify_certificate(file: &Path, public_key: Option<&str>) -> Result<()> {
    let certificate = Certificate::load(file)?;
    let result = match public_key {
        Some(key) => certificate.verify_with_key(key),
        None => certificate.verify(),
    };

    match result {
        Ok(()) => {
            println!(
                "{} certificate {} ({})",
                "VALID".green().bold(),
                certificate.id(),
                certificate.body.status.as_str()
            );
            if public_key.is_none() {
                println!("  Signed by embedded key {}", certificate.public_key);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "INVALID".red().bold(), e);
            bail!("certificate verification failed")
        }
    }
}

// Ctrl-C requests cancellation; the job stops at the next pass boundary
fn setup_signal_handler(token: CancelToken) -> Result<()> {
    use signal_hook::{consts::SIGINT, iterator::Signals};

    let mut signals = Signals::new([SIGINT])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGINT {
                eprintln!("\n\nInterrupt received, stopping after the current pass...");
                token.cancel();
            }
        }
    });

    Ok(())
}

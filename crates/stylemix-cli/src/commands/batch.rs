//! Batch command implementation
//!
//! Runs every job under a directory and writes a summary report.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::warn;
use walkdir::WalkDir;

use super::apply::execute;
use crate::input::is_job_file;

/// File name of the report written into the output directory.
pub const REPORT_FILE: &str = "batch-report.json";

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Number of jobs found.
    pub total: usize,
    /// Jobs that ran.
    pub passed: usize,
    /// Jobs that failed to load, validate, or run.
    pub failed: usize,
    /// One entry per job, in path order.
    pub results: Vec<BatchResult>,
}

/// Result of one job in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Path of the job file.
    pub job: String,
    /// Whether the job ran.
    pub success: bool,
    /// Job ID, when the file loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Composed-vector hash, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Finds job files under `input_dir`, sorted by path.
///
/// Files inside `exclude` are skipped so a nested output directory is never
/// re-read; both sides are compared in canonical form. Outcome files written
/// by `apply` (`*.out.json`) and batch reports are skipped too.
pub fn find_jobs(input_dir: &Path, exclude: &Path) -> Vec<PathBuf> {
    let exclude = canonical(exclude);
    let mut jobs: Vec<PathBuf> = WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_job_file(path) && !is_generated(path))
        .filter(|path| !canonical(path).starts_with(&exclude))
        .collect();
    jobs.sort();
    jobs
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Outcome and report files produced by earlier runs.
fn is_generated(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".out.json") || name == REPORT_FILE)
        .unwrap_or(false)
}

/// Run the batch command
///
/// Each job's outcome is written to `<out_dir>/<job_id>.json`.
///
/// # Returns
/// Exit code: 0 if every job ran, 1 otherwise
pub fn run(input_dir: &str, out_dir: &str) -> Result<ExitCode> {
    let input_dir = Path::new(input_dir);
    let out_dir = PathBuf::from(out_dir);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let jobs = find_jobs(input_dir, &out_dir);
    if jobs.is_empty() {
        println!("No jobs found in: {}", input_dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    println!("Running {} jobs...", jobs.len());
    println!("Output directory: {}", out_dir.display());

    let batch_start = Instant::now();
    let mut results = Vec::with_capacity(jobs.len());
    let mut passed = 0;
    let mut failed = 0;

    for (i, job_path) in jobs.iter().enumerate() {
        let item_start = Instant::now();
        let progress = format!("[{}/{}]", i + 1, jobs.len()).cyan().bold();
        println!("\n{} {}", progress, job_path.display());

        let result = execute(job_path, |job| out_dir.join(format!("{}.json", job.job_id)));
        let time_str = format!("{:.1}s", item_start.elapsed().as_secs_f64()).dimmed();

        let job = job_path.to_string_lossy().to_string();
        match result {
            Ok(executed) => {
                println!(
                    "  {} {} {} {}",
                    "✓ PASS".green().bold(),
                    "•".dimmed(),
                    time_str,
                    executed.output_path.display()
                );
                passed += 1;
                results.push(BatchResult {
                    job,
                    success: true,
                    job_id: Some(executed.outcome.job_id),
                    output_hash: Some(executed.outcome.output_hash),
                    error: None,
                });
            }
            Err(failure) => {
                println!(
                    "  {} {} {}: {}",
                    "✗ FAIL".red().bold(),
                    "•".dimmed(),
                    time_str,
                    failure
                );
                failed += 1;
                results.push(BatchResult {
                    job,
                    success: false,
                    job_id: None,
                    output_hash: None,
                    error: Some(failure.to_string()),
                });
            }
        }
    }

    let report = BatchReport {
        total: jobs.len(),
        passed,
        failed,
        results,
    };
    let report_path = out_dir.join(REPORT_FILE);
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write report: {}", report_path.display()))?;

    let total_elapsed = batch_start.elapsed().as_secs_f64();
    println!("\n{}", "=".repeat(60));
    println!(
        "{} {} {}",
        "Batch Summary".bold(),
        "•".dimmed(),
        format!(
            "{:.1}s total, {:.1}s avg",
            total_elapsed,
            total_elapsed / jobs.len() as f64
        )
        .dimmed()
    );
    println!("  Total:  {}", jobs.len());
    println!(
        "  Passed: {}",
        if failed == 0 {
            passed.to_string().green()
        } else {
            passed.to_string().normal()
        }
    );
    println!(
        "  Failed: {}",
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        }
    );
    println!("Report: {}", report_path.display());

    if failed > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

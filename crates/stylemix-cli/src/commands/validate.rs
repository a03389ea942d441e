//! Validate command implementation
//!
//! Checks a job document without running the engine.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use stylemix_spec::{canonical_params_hash, validate_job, ValidationResult};

use super::json_output::{
    input_error_to_json, print_json, validation_error_to_json, validation_warning_to_json,
    ValidateOutput,
};
use crate::input::{load_job, LoadResult};

/// Run the validate command
///
/// # Arguments
/// * `job_path` - Path to the job file
/// * `json_output` - Whether to output machine-readable JSON diagnostics
///
/// # Returns
/// Exit code: 0 if valid, 1 if invalid
pub fn run(job_path: &str, json_output: bool) -> Result<ExitCode> {
    if json_output {
        run_json(job_path)
    } else {
        run_human(job_path)
    }
}

/// Run validate with human-readable (colored) output
fn run_human(job_path: &str) -> Result<ExitCode> {
    let start = Instant::now();
    println!("{} {}", "Validating:".cyan().bold(), job_path);

    let LoadResult { job, source_hash } = load_job(Path::new(job_path))
        .with_context(|| format!("Failed to load job file: {}", job_path))?;
    println!("{} {}", "Source:".dimmed(), &source_hash[..16]);
    println!("{} {} ({})", "Job:".dimmed(), job.job_id, job.mode);

    let result = validate_job(&job);
    let duration_ms = start.elapsed().as_millis() as u64;
    print_validation_results(&result);

    if result.is_ok() {
        let params_hash = canonical_params_hash(&job.params)?;
        println!("{} {}", "Params hash:".dimmed(), params_hash);
        println!(
            "\n{} Job is valid ({}ms)",
            "SUCCESS".green().bold(),
            duration_ms
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "\n{} Job has {} error(s) ({}ms)",
            "FAILED".red().bold(),
            result.errors.len(),
            duration_ms
        );
        Ok(ExitCode::from(1))
    }
}

/// Run validate with machine-readable JSON output
fn run_json(job_path: &str) -> Result<ExitCode> {
    let LoadResult { job, source_hash } = match load_job(Path::new(job_path)) {
        Ok(loaded) => loaded,
        Err(e) => {
            let output =
                ValidateOutput::failure(vec![input_error_to_json(&e, Some(job_path))], vec![]);
            print_json(&output)?;
            return Ok(ExitCode::from(1));
        }
    };

    let result = validate_job(&job);
    let success = result.is_ok();
    let output = ValidateOutput {
        success,
        errors: result
            .errors
            .iter()
            .map(|e| validation_error_to_json(e).with_file(job_path))
            .collect(),
        warnings: result.warnings.iter().map(validation_warning_to_json).collect(),
        job_id: Some(job.job_id.clone()),
        params_hash: canonical_params_hash(&job.params).ok(),
        source_hash: Some(source_hash),
    };
    print_json(&output)?;

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_validation_results(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("\n{}", "Errors:".red().bold());
        for error in &result.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }
    if !result.warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow().bold());
        for warning in &result.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }
}

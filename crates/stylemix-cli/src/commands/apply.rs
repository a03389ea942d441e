//! Apply command implementation
//!
//! Loads a job, validates it, runs the engine, and writes the outcome.

use anyhow::Result;
use colored::Colorize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use stylemix_spec::{validate_job, BackendError, JobSpec, ValidationError, ValidationWarning};

use super::json_output::{
    backend_error_to_json, error_codes, input_error_to_json, print_json,
    validation_error_to_json, validation_warning_to_json, ApplyOutput, ApplyResult, JsonError,
};
use crate::dispatch::{run_job, DispatchError, JobOutcome};
use crate::input::{load_job, InputError, LoadResult};

/// A job that ran and whose outcome was written.
#[derive(Debug)]
pub struct Executed {
    /// Engine outcome.
    pub outcome: JobOutcome,
    /// BLAKE3 hash of the job file.
    pub source_hash: String,
    /// Validation warnings.
    pub warnings: Vec<ValidationWarning>,
    /// Where the outcome was written.
    pub output_path: PathBuf,
}

/// Why a job did not produce output.
#[derive(Debug)]
pub enum ApplyFailure {
    /// The file could not be loaded.
    Load(InputError),
    /// The document failed validation.
    Invalid {
        errors: Vec<ValidationError>,
        warnings: Vec<ValidationWarning>,
    },
    /// The engine rejected the inputs.
    Engine {
        error: DispatchError,
        warnings: Vec<ValidationWarning>,
    },
    /// The outcome could not be written.
    Write { path: PathBuf, message: String },
}

impl fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyFailure::Load(e) => write!(f, "{}", e),
            ApplyFailure::Invalid { errors, .. } => {
                write!(f, "job has {} validation error(s)", errors.len())?;
                if let Some(first) = errors.first() {
                    write!(f, ", first: {}", first)?;
                }
                Ok(())
            }
            ApplyFailure::Engine { error, .. } => write!(f, "[{}] {}", error.code(), error),
            ApplyFailure::Write { path, message } => {
                write!(f, "failed to write '{}': {}", path.display(), message)
            }
        }
    }
}

impl ApplyFailure {
    /// Structured errors for JSON output.
    pub fn json_errors(&self, file: &str) -> Vec<JsonError> {
        match self {
            ApplyFailure::Load(e) => vec![input_error_to_json(e, Some(file))],
            ApplyFailure::Invalid { errors, .. } => errors
                .iter()
                .map(|e| validation_error_to_json(e).with_file(file))
                .collect(),
            ApplyFailure::Engine { error, .. } => vec![backend_error_to_json(error).with_file(file)],
            ApplyFailure::Write { path, message } => vec![JsonError::new(
                error_codes::FILE_WRITE,
                message.clone(),
            )
            .with_file(path.display().to_string())],
        }
    }

    /// Validation warnings collected before the failure.
    pub fn warnings(&self) -> &[ValidationWarning] {
        match self {
            ApplyFailure::Invalid { warnings, .. } | ApplyFailure::Engine { warnings, .. } => {
                warnings
            }
            _ => &[],
        }
    }
}

/// Default output location: `<job_id>.out.json` next to the job file.
pub fn default_output_path(job_path: &Path, job_id: &str) -> PathBuf {
    job_path.with_file_name(format!("{}.out.json", job_id))
}

/// Writes a job outcome as pretty JSON, creating parent directories.
pub fn write_outcome(outcome: &JobOutcome, path: &Path) -> std::result::Result<(), ApplyFailure> {
    let write_err = |message: String| ApplyFailure::Write {
        path: path.to_path_buf(),
        message,
    };
    let json = serde_json::to_string_pretty(outcome).map_err(|e| write_err(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }
    std::fs::write(path, json).map_err(|e| write_err(e.to_string()))
}

/// Loads, validates, runs, and writes one job.
///
/// `output_for` picks the output path once the job id is known.
pub fn execute(
    job_path: &Path,
    output_for: impl FnOnce(&JobSpec) -> PathBuf,
) -> std::result::Result<Executed, ApplyFailure> {
    let LoadResult { job, source_hash } = load_job(job_path).map_err(ApplyFailure::Load)?;

    let validation = validate_job(&job);
    if !validation.is_ok() {
        return Err(ApplyFailure::Invalid {
            errors: validation.errors,
            warnings: validation.warnings,
        });
    }
    let warnings = validation.warnings;

    let outcome = match run_job(&job) {
        Ok(outcome) => outcome,
        Err(error) => return Err(ApplyFailure::Engine { error, warnings }),
    };

    let output_path = output_for(&job);
    write_outcome(&outcome, &output_path)?;

    Ok(Executed {
        outcome,
        source_hash,
        warnings,
        output_path,
    })
}

/// Run the apply command
///
/// # Arguments
/// * `job_path` - Path to the job file
/// * `output` - Output path (default: `<job_id>.out.json` next to the job)
/// * `json_output` - Whether to output machine-readable JSON diagnostics
///
/// # Returns
/// Exit code: 0 on success, 1 on validation or engine failure
pub fn run(job_path: &str, output: Option<&str>, json_output: bool) -> Result<ExitCode> {
    let start = Instant::now();
    let path = Path::new(job_path);
    let result = execute(path, |job| match output {
        Some(o) => PathBuf::from(o),
        None => default_output_path(path, &job.job_id),
    });
    let duration_ms = start.elapsed().as_millis() as u64;

    if json_output {
        run_json(job_path, result, duration_ms)
    } else {
        run_human(job_path, result, duration_ms)
    }
}

/// Report apply with human-readable (colored) output
fn run_human(
    job_path: &str,
    result: std::result::Result<Executed, ApplyFailure>,
    duration_ms: u64,
) -> Result<ExitCode> {
    println!("{} {}", "Applying:".cyan().bold(), job_path);

    let executed = match result {
        Ok(executed) => executed,
        Err(failure) => {
            print_warnings(failure.warnings());
            if let ApplyFailure::Invalid { errors, .. } = &failure {
                println!("\n{}", "Errors:".red().bold());
                for error in errors {
                    println!("  {} {}", "✗".red(), error);
                }
            }
            println!("\n{} {} ({}ms)", "FAILED".red().bold(), failure, duration_ms);
            return Ok(ExitCode::from(1));
        }
    };

    let outcome = &executed.outcome;
    println!("{} {}", "Source:".dimmed(), &executed.source_hash[..16]);
    println!(
        "{} {} ({})",
        "Mode:".dimmed(),
        outcome.mode,
        outcome.recombiner
    );
    print_warnings(&executed.warnings);

    println!("\n{}", "Bands:".bold());
    for band in &outcome.bands {
        let score = band
            .score
            .map(|s| format!("score {:.4}", s))
            .unwrap_or_default();
        let status = if band.replaced {
            "replaced".yellow()
        } else {
            "kept".normal()
        };
        println!(
            "  {:<10} [{:>5}..{:<5}] weight {:<6} {} {}",
            band.band.to_string(),
            band.start,
            band.end,
            band.weight,
            status,
            score.as_str().dimmed()
        );
    }

    println!(
        "\n{} {:?}",
        "Composed:".dimmed(),
        outcome.composed.shape
    );
    println!("{} {}", "Params hash:".dimmed(), outcome.params_hash);
    println!("{} {}", "Output hash:".dimmed(), outcome.output_hash);
    println!("{} {}", "Output:".dimmed(), executed.output_path.display());
    println!(
        "\n{} Job '{}' applied ({}ms)",
        "SUCCESS".green().bold(),
        outcome.job_id,
        duration_ms
    );
    Ok(ExitCode::SUCCESS)
}

/// Report apply with machine-readable JSON output
fn run_json(
    job_path: &str,
    result: std::result::Result<Executed, ApplyFailure>,
    duration_ms: u64,
) -> Result<ExitCode> {
    let (output, code) = match result {
        Ok(executed) => {
            let warnings = executed
                .warnings
                .iter()
                .map(validation_warning_to_json)
                .collect();
            let summary = ApplyResult::from_outcome(
                &executed.outcome,
                executed.source_hash,
                executed.output_path.display().to_string(),
                duration_ms,
            );
            (ApplyOutput::success(summary, warnings), ExitCode::SUCCESS)
        }
        Err(failure) => {
            let warnings = failure
                .warnings()
                .iter()
                .map(validation_warning_to_json)
                .collect();
            (
                ApplyOutput::failure(failure.json_errors(job_path), warnings),
                ExitCode::from(1),
            )
        }
    };
    print_json(&output)?;
    Ok(code)
}

fn print_warnings(warnings: &[ValidationWarning]) {
    for warning in warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
}

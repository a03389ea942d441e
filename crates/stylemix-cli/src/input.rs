//! Loading job documents from disk.

use std::path::{Path, PathBuf};

use stylemix_spec::JobSpec;

/// Recognized job file extensions.
pub const JOB_EXTENSIONS: &[&str] = &["json"];

/// A parsed job plus provenance.
#[derive(Debug)]
pub struct LoadResult {
    /// The parsed job.
    pub job: JobSpec,
    /// BLAKE3 hash of the file content (hex).
    pub source_hash: String,
}

/// Errors that can occur while loading a job.
#[derive(Debug)]
pub enum InputError {
    /// File could not be read.
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Unknown file extension.
    UnknownExtension { extension: Option<String> },

    /// JSON parsing failed.
    JsonParse { message: String },
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::FileRead { path, source } => {
                write!(f, "failed to read file '{}': {}", path.display(), source)
            }
            InputError::UnknownExtension { extension: Some(ext) } => {
                write!(f, "unknown file extension '.{}' (expected .json)", ext)
            }
            InputError::UnknownExtension { extension: None } => {
                write!(f, "file has no extension (expected .json)")
            }
            InputError::JsonParse { message } => write!(f, "JSON parse error: {}", message),
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InputError::FileRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Whether `path` has a job file extension.
pub fn is_job_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| JOB_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Loads a job from a JSON file.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use stylemix_cli::input::load_job;
///
/// let loaded = load_job(Path::new("job.json")).unwrap();
/// println!("{} ({})", loaded.job.job_id, &loaded.source_hash[..16]);
/// ```
pub fn load_job(path: &Path) -> Result<LoadResult, InputError> {
    if !is_job_file(path) {
        return Err(InputError::UnknownExtension {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .map(|s| s.to_lowercase()),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| InputError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let source_hash = blake3::hash(content.as_bytes()).to_hex().to_string();

    let job = JobSpec::from_json(&content).map_err(|e| InputError::JsonParse {
        message: e.to_string(),
    })?;

    Ok(LoadResult { job, source_hash })
}

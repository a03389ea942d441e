//! CLI argument definitions for the stylemix command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{ArgAction, Parser, Subcommand};

/// stylemix - compose style embeddings into conditioning tokens
#[derive(Debug, Parser)]
#[command(name = "stylemix")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a job and write the extended conditioning
    Apply {
        /// Path to the job file (JSON)
        #[arg(short, long)]
        job: String,

        /// Output file path (default: <job_id>.out.json next to the job)
        #[arg(short, long)]
        output: Option<String>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Run every job in a directory
    Batch {
        /// Directory to scan recursively for .json jobs
        #[arg(long)]
        input_dir: String,

        /// Directory to write results and batch-report.json into
        #[arg(long)]
        out_dir: String,
    },

    /// Validate a job without running it
    Validate {
        /// Path to the job file (JSON)
        #[arg(short, long)]
        job: String,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print the declared parameter schema
    Schema {
        /// Output the schema as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "stylemix", "apply", "--job", "job.json", "-o", "out.json", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Apply { job, output, json } => {
                assert_eq!(job, "job.json");
                assert_eq!(output.as_deref(), Some("out.json"));
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_verbose_is_global_and_counted() {
        let cli = Cli::try_parse_from(["stylemix", "validate", "-j", "job.json", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Validate { json: false, .. }));
    }

    #[test]
    fn test_parse_batch() {
        let cli = Cli::try_parse_from([
            "stylemix",
            "batch",
            "--input-dir",
            "jobs",
            "--out-dir",
            "out",
        ])
        .unwrap();
        match cli.command {
            Commands::Batch { input_dir, out_dir } => {
                assert_eq!(input_dir, "jobs");
                assert_eq!(out_dir, "out");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_apply_requires_job() {
        assert!(Cli::try_parse_from(["stylemix", "apply"]).is_err());
    }

    #[test]
    fn test_parse_schema() {
        let cli = Cli::try_parse_from(["stylemix", "schema", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Schema { json: true }));
    }
}

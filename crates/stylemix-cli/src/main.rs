//! stylemix CLI - compose style embeddings into conditioning tokens
//!
//! This binary runs composition jobs, validates job documents, and prints the
//! declared parameter schema.

use clap::Parser;
use std::process::ExitCode;

use stylemix_cli::cli_args::{Cli, Commands};
use stylemix_cli::{commands, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Apply { job, output, json } => {
            commands::apply::run(&job, output.as_deref(), json)
        }
        Commands::Batch { input_dir, out_dir } => commands::batch::run(&input_dir, &out_dir),
        Commands::Validate { job, json } => commands::validate::run(&job, json),
        Commands::Schema { json } => commands::schema::run(json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

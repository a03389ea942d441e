//! Schema command implementation
//!
//! Prints the declared parameter schema.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use stylemix_spec::param_schema;

use super::json_output::print_json;

/// Run the schema command
pub fn run(json_output: bool) -> Result<ExitCode> {
    if json_output {
        print_json(&param_schema())?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "Parameters:".cyan().bold());
    for param in param_schema() {
        println!(
            "  {:<22} default {:<5} range [{}, {}] step {}",
            param.name.bold(),
            param.default,
            param.min,
            param.max,
            param.step
        );
        println!("  {:<22} {}", "", param.tooltip.dimmed());
    }
    Ok(ExitCode::SUCCESS)
}

pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "copo",
    about = "Copo product assistant operator CLI",
    long_about = "Prepare the catalog database, inspect configuration, check readiness, and ask the assistant one-off questions.",
    after_help = "Examples:\n  copo doctor --json\n  copo seed\n  copo ask \"¿qué marcas manejan?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo product catalog and verify every demo code is present")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config, model client setup, and catalog database readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one question through the assistant and print the formatted answer")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "Question text; words are joined with spaces")]
        query: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Ask { query } => commands::ask::run(&query.join(" ")),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

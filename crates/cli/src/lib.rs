pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use expensy_core::config::{AppConfig, LogFormat};

use crate::commands::expenses::ExpensesArgs;
use crate::commands::vote::VoteArgs;
use crate::commands::RuntimeOptions;

#[derive(Debug, Parser)]
#[command(
    name = "expensy",
    about = "Expensy approval engine operator CLI",
    long_about = "Inspect configuration and exercise the expense approval engine against the demo dataset (or a JSON dataset).",
    after_help = "Examples:\n  expensy config\n  expensy expenses --status pending --search travel\n  expensy vote --expense EXP-1001 --approver \"Sarah Johnson\" --decision approve\n  expensy path --expense EXP-1001"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an expensy.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Load this JSON dataset instead of the built-in demo data")]
    dataset: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Load the dataset, replay its votes, and summarize the result")]
    Seed,
    #[command(about = "List expenses, newest first, with optional filters")]
    Expenses {
        #[arg(long, help = "pending | approved | rejected")]
        status: Option<String>,
        #[arg(long, help = "travel | food | accommodation | misc | supplies")]
        category: Option<String>,
        #[arg(long, help = "Case-insensitive text matched against description, submitter and category")]
        search: Option<String>,
    },
    #[command(about = "Cast an approver vote and print the updated expense")]
    Vote {
        #[arg(long)]
        expense: String,
        #[arg(long)]
        approver: String,
        #[arg(long, help = "approve | reject")]
        decision: String,
    },
    #[command(about = "Show the approval chain of an expense and the votes cast so far")]
    Path {
        #[arg(long)]
        expense: String,
    },
    #[command(about = "List approval rules")]
    Rules,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = RuntimeOptions { config_path: cli.config, dataset_path: cli.dataset };

    if let Ok(config) = AppConfig::load(options.load_options()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Config => commands::config::run(&options),
        Command::Seed => commands::seed::run(&options),
        Command::Expenses { status, category, search } => {
            commands::expenses::run(&options, &ExpensesArgs { status, category, search })
        }
        Command::Vote { expense, approver, decision } => {
            commands::vote::run(&options, &VoteArgs { expense, approver, decision })
        }
        Command::Path { expense } => commands::path::run(&options, &expense),
        Command::Rules => commands::rules::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the JSON payload.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

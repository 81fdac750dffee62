//! remaim - interactive Redmine to Phabricator issue migrator.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use remaim_core::{Config, Error, Result};
use remaim_migrate::{RunOutcome, StdPrompter, Wizard};
use remaim_phabricator::ConduitClient;
use remaim_redmine::RedmineClient;
use tracing_subscriber::EnvFilter;

/// Exit code when a tracker cannot be reached at all.
const EXIT_UNREACHABLE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "remaim")]
#[command(author, version, about = "ReMaIm - Redmine to Phabricator importer", long_about = None)]
struct Cli {
    /// Skip ambiguous issues instead of asking
    #[arg(short, long)]
    resume: bool,

    /// Configuration file (defaults to <config dir>/remaim/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so they stay out of the prompts
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(&cli).await;
    if let Err(e) = &result {
        eprintln!("{}", failure_message(e));
    }
    ExitCode::from(exit_code(&result))
}

async fn run(cli: &Cli) -> Result<RunOutcome> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    let redmine = Arc::new(RedmineClient::from_config(&config.redmine)?);
    let conduit = Arc::new(ConduitClient::from_config(&config.phabricator)?);

    let mut wizard =
        Wizard::connect(redmine.clone(), redmine, conduit, &config, cli.resume).await?;
    let mut prompter = StdPrompter::stdio();

    let outcome = wizard.run(&mut prompter).await?;
    if let RunOutcome::Completed(report) = &outcome {
        tracing::info!(
            migrated = report.migrated.len(),
            skipped = report.skipped.len(),
            "Run completed"
        );
    }
    Ok(outcome)
}

fn exit_code(result: &Result<RunOutcome>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(Error::Unreachable { .. }) => EXIT_UNREACHABLE,
        Err(_) => 1,
    }
}

fn failure_message(error: &Error) -> String {
    match error {
        Error::Unreachable { host, reason } => format!(
            "\nI am unable to connect to {}.\n\
             Check that you are connected to the internet, that DNS is correctly \
             configured and that the URL in your configuration is right.\n\
             ({})\n",
            host, reason
        ),
        Error::Config(message) => format!("Configuration error: {}", message),
        other => format!(
            "Arrrgh… we're really sorry but something went a little haywire here.\n\
             Use the following information to help us fix it? Pretty please?\n\n\
             Error message: {}\n\
             Error details:\n{:?}\n",
            other, other
        ),
    }
}

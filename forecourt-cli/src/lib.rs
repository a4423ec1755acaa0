//! Command-line interface for the Forecourt listing import.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod error;
mod import;
mod install;

pub use error::CliError;

use import::ImportArgs;
use install::InstallArgs;

const ARG_CATALOG: &str = "catalog";
const ARG_FEED_URL: &str = "feed-url";
const ARG_USERNAME: &str = "username";
const ARG_PASSWORD: &str = "password";
const ARG_PAGE_SIZE: &str = "page-size";
const ARG_MAX_ATTEMPTS: &str = "max-attempts";
const ARG_SYNC_LOG: &str = "sync-log";
const ARG_SUMMARY_ERRORS: &str = "summary-errors";
const ARG_USER_AGENT: &str = "user-agent";
const ARG_PAGE_PARAM: &str = "page-param";
const ARG_SIZE_PARAM: &str = "size-param";
const ARG_ITEMS_KEY: &str = "items-key";
const ARG_HAS_MORE_KEY: &str = "has-more-key";
const ENV_IMPORT_USERNAME: &str = "FORECOURT_CMDS_IMPORT_USERNAME";
const ENV_IMPORT_PASSWORD: &str = "FORECOURT_CMDS_IMPORT_PASSWORD";

/// Catalog database used when no path is configured.
pub const DEFAULT_CATALOG: &str = "forecourt.sqlite";

/// Run the Forecourt CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn dispatch(command: Command, out: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Import(args) => import::run_import(args, out),
        Command::Install(args) => install::run_install(args, out),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "forecourt",
    about = "Synchronise a dealer's vehicle catalog with the provider feed",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the provider feed and reconcile the catalog against it.
    Import(ImportArgs),
    /// Create or migrate the catalog database.
    Install(InstallArgs),
}

#[cfg(test)]
mod tests;

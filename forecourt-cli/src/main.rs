//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use forecourt_cli::CliError;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FORECOURT_LOG";
const DEFAULT_LOG_FILTER: &str = "warn,forecourt_core=info,forecourt_data=info,forecourt_cli=info";

fn main() {
    init_logging();
    match forecourt_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("forecourt: {err}");
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("forecourt: failed to install logger: {err}");
    }
}

//! Error types emitted by the Forecourt CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use forecourt_core::CatalogSchemaError;
use forecourt_data::feed::TransportError;
use forecourt_data::sync::{RunLockError, SyncError, SyncLogError};
use thiserror::Error;

/// Errors emitted by the Forecourt CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A secret without a command-line flag is missing after merging.
    #[error("missing {field} (set {env} or add it to the configuration file)")]
    MissingSecret {
        field: &'static str,
        env: &'static str,
    },
    /// A numeric setting is outside its accepted range.
    #[error("{field} must be {requirement}")]
    InvalidSetting {
        field: &'static str,
        requirement: &'static str,
    },
    /// The configured feed endpoint is not an absolute URL.
    #[error("invalid feed URL {url:?}: {source}")]
    InvalidFeedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client for the feed could not be constructed.
    #[error("failed to build feed client for {url}: {source}")]
    BuildFeedClient {
        url: String,
        #[source]
        source: TransportError,
    },
    /// The async runtime driving the import could not start.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The directory holding the catalog could not be prepared.
    #[error("failed to prepare directory for {path:?}: {source}")]
    PrepareCatalogDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening or initialising the catalog database failed.
    #[error("failed to open catalog at {path:?}: {source}")]
    OpenCatalog {
        path: Utf8PathBuf,
        #[source]
        source: CatalogSchemaError,
    },
    /// Another import holds the catalog.
    #[error(transparent)]
    Lock(#[from] RunLockError),
    /// The run log could not be opened.
    #[error(transparent)]
    OpenSyncLog(#[from] SyncLogError),
    /// The sync aborted before applying any change.
    #[error("import failed: {0}")]
    Sync(#[from] SyncError),
    /// Writing command output failed.
    #[error("failed to write command output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

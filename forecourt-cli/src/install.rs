//! Install command: prepares the catalog database.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use forecourt_core::ListingSchema;
use forecourt_core::SqliteListingStore;
use forecourt_core::store::CATALOG_SCHEMA_VERSION;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_CATALOG, CliError, DEFAULT_CATALOG};

/// CLI arguments for the `install` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Create the catalog database with one column per vehicle \
                 field and record its schema version. Running it against an \
                 existing catalog adds any missing optional columns and \
                 refuses catalogs that lack a required one.",
    about = "Initialise the listing catalog"
)]
#[ortho_config(prefix = "FORECOURT")]
pub(crate) struct InstallArgs {
    /// Path to the SQLite catalog.
    #[arg(long = ARG_CATALOG, value_name = "path")]
    #[serde(default)]
    pub(crate) catalog: Option<Utf8PathBuf>,
}

impl InstallArgs {
    fn catalog_path(self) -> Result<Utf8PathBuf, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(merged
            .catalog
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CATALOG)))
    }
}

pub(crate) fn run_install(args: InstallArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let catalog = args.catalog_path()?;
    install_catalog(&catalog)?;
    writeln!(
        out,
        "initialised catalog at {catalog} (schema version {CATALOG_SCHEMA_VERSION})"
    )
    .map_err(CliError::WriteOutput)
}

/// Create the catalog at `path` along with any missing parent directories.
pub(crate) fn install_catalog(path: &Utf8Path) -> Result<SqliteListingStore, CliError> {
    forecourt_fs::ensure_parent_dir(path).map_err(|source| CliError::PrepareCatalogDir {
        path: path.to_path_buf(),
        source,
    })?;
    let store = SqliteListingStore::open(path.as_std_path(), ListingSchema::vehicle()).map_err(
        |source| CliError::OpenCatalog {
            path: path.to_path_buf(),
            source,
        },
    )?;
    log::info!("catalog ready at {path}");
    Ok(store)
}

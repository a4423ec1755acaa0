//! Import command: fetches the provider feed and reconciles the catalog.

use std::fmt;
use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use forecourt_data::feed::{
    DEFAULT_FEED_URL, DEFAULT_USER_AGENT, FeedCredentials, FeedSource, FeedUrl, FetchOptions,
    HttpFeedSource, PagingConfig, RetryPolicy,
};
use forecourt_data::sync::{
    DEFAULT_SUMMARY_ERRORS, RunLock, SyncLog, SyncOptions, SyncReport, run_sync,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::install::install_catalog;
use crate::{
    ARG_CATALOG, ARG_FEED_URL, ARG_HAS_MORE_KEY, ARG_ITEMS_KEY, ARG_MAX_ATTEMPTS, ARG_PAGE_PARAM,
    ARG_PAGE_SIZE, ARG_PASSWORD, ARG_SIZE_PARAM, ARG_SUMMARY_ERRORS, ARG_SYNC_LOG,
    ARG_USER_AGENT, ARG_USERNAME, CliError, DEFAULT_CATALOG, ENV_IMPORT_PASSWORD,
    ENV_IMPORT_USERNAME,
};

/// CLI arguments for the `import` subcommand.
///
/// The password has no flag; it is read from `FORECOURT_CMDS_IMPORT_PASSWORD`
/// or the configuration file.
#[derive(Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch every page of the provider feed, normalise the \
                 records and bring the catalog in line with them. Settings \
                 can come from CLI flags, configuration files, or \
                 environment variables.",
    about = "Import the provider feed into the catalog"
)]
#[ortho_config(prefix = "FORECOURT")]
pub(crate) struct ImportArgs {
    /// Path to the SQLite catalog.
    #[arg(long = ARG_CATALOG, value_name = "path")]
    #[serde(default)]
    pub(crate) catalog: Option<Utf8PathBuf>,
    /// Export endpoint of the provider feed.
    #[arg(long = ARG_FEED_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) feed_url: Option<String>,
    /// Account name used for basic authentication.
    #[arg(long = ARG_USERNAME, value_name = "name")]
    #[serde(default)]
    pub(crate) username: Option<String>,
    #[arg(skip)]
    #[serde(default)]
    pub(crate) password: Option<String>,
    /// Number of listings requested per page.
    #[arg(long = ARG_PAGE_SIZE, value_name = "count")]
    #[serde(default)]
    pub(crate) page_size: Option<u32>,
    /// Attempts per page before a transient failure becomes fatal.
    #[arg(long = ARG_MAX_ATTEMPTS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
    /// SQLite database recording the outcome of each run.
    #[arg(long = ARG_SYNC_LOG, value_name = "path")]
    #[serde(default)]
    pub(crate) sync_log: Option<Utf8PathBuf>,
    /// Number of error messages printed in the summary.
    #[arg(long = ARG_SUMMARY_ERRORS, value_name = "count")]
    #[serde(default)]
    pub(crate) summary_errors: Option<usize>,
    /// User agent sent with every page request.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Query parameter carrying the page number.
    #[arg(long = ARG_PAGE_PARAM, value_name = "name")]
    #[serde(default)]
    pub(crate) page_param: Option<String>,
    /// Query parameter carrying the page size.
    #[arg(long = ARG_SIZE_PARAM, value_name = "name")]
    #[serde(default)]
    pub(crate) size_param: Option<String>,
    /// Key holding the listings inside a page object.
    #[arg(long = ARG_ITEMS_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) items_key: Option<String>,
    /// Key holding the "more pages follow" marker.
    #[arg(long = ARG_HAS_MORE_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) has_more_key: Option<String>,
}

impl fmt::Debug for ImportArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportArgs")
            .field("catalog", &self.catalog)
            .field("feed_url", &self.feed_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("page_size", &self.page_size)
            .field("max_attempts", &self.max_attempts)
            .field("sync_log", &self.sync_log)
            .field("summary_errors", &self.summary_errors)
            .field("user_agent", &self.user_agent)
            .field("page_param", &self.page_param)
            .field("size_param", &self.size_param)
            .field("items_key", &self.items_key)
            .field("has_more_key", &self.has_more_key)
            .finish()
    }
}

impl ImportArgs {
    pub(crate) fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    /// Path to the SQLite catalog.
    pub(crate) catalog: Utf8PathBuf,
    /// Export endpoint of the provider feed.
    pub(crate) feed_url: FeedUrl,
    /// Basic-auth credentials for the feed.
    pub(crate) credentials: FeedCredentials,
    /// Pagination and retry settings.
    pub(crate) fetch: FetchOptions,
    /// User agent sent with every page request.
    pub(crate) user_agent: String,
    /// Optional run log database.
    pub(crate) sync_log: Option<Utf8PathBuf>,
    /// Number of error messages printed in the summary.
    pub(crate) summary_errors: usize,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let username = non_blank(args.username).ok_or(CliError::MissingArgument {
            field: ARG_USERNAME,
            env: ENV_IMPORT_USERNAME,
        })?;
        let password = non_blank(args.password).ok_or(CliError::MissingSecret {
            field: ARG_PASSWORD,
            env: ENV_IMPORT_PASSWORD,
        })?;

        let raw_url = args
            .feed_url
            .unwrap_or_else(|| DEFAULT_FEED_URL.to_owned());
        let feed_url = FeedUrl::parse(&raw_url)
            .map_err(|source| CliError::InvalidFeedUrl { url: raw_url, source })?;

        let mut paging = PagingConfig::default();
        if let Some(page_size) = args.page_size {
            paging = paging.with_page_size(positive(ARG_PAGE_SIZE, page_size)?);
        }
        let page_param = non_blank(args.page_param).unwrap_or_else(|| paging.page_param.clone());
        let size_param = non_blank(args.size_param).unwrap_or_else(|| paging.size_param.clone());
        paging = paging.with_query_params(page_param, size_param);
        if let Some(items_key) = non_blank(args.items_key) {
            paging = paging.with_items_key(items_key);
        }
        if let Some(has_more_key) = non_blank(args.has_more_key) {
            paging = paging.with_has_more_key(has_more_key);
        }
        let mut retry = RetryPolicy::default();
        if let Some(max_attempts) = args.max_attempts {
            retry = retry.with_max_attempts(positive(ARG_MAX_ATTEMPTS, max_attempts)?);
        }

        Ok(Self {
            catalog: args
                .catalog
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CATALOG)),
            feed_url,
            credentials: FeedCredentials::new(username, password),
            fetch: FetchOptions::default().with_paging(paging).with_retry(retry),
            user_agent: non_blank(args.user_agent)
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            sync_log: args.sync_log,
            summary_errors: args.summary_errors.unwrap_or(DEFAULT_SUMMARY_ERRORS),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn positive(field: &'static str, value: u32) -> Result<u32, CliError> {
    if value == 0 {
        return Err(CliError::InvalidSetting {
            field,
            requirement: "at least 1",
        });
    }
    Ok(value)
}

pub(crate) fn run_import(args: ImportArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let source = HttpFeedSource::new(config.feed_url.clone())
        .map_err(|source| CliError::BuildFeedClient {
            url: config.feed_url.to_string(),
            source,
        })?
        .with_paging(&config.fetch.paging)
        .with_user_agent(config.user_agent.as_str());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let cancellation = CancellationToken::new();
    runtime.block_on(async {
        let interrupted = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupt received; aborting before changes are applied");
                interrupted.cancel();
            }
        });
        execute_import(&config, &source, Some(&cancellation), out)
            .await
            .map(|_| ())
    })
}

/// Run one import against `source`, holding the catalog lock throughout.
///
/// The summary is written to `out` once the plan has been applied; per-record
/// failures are part of the summary rather than an error.
pub(crate) async fn execute_import<S>(
    config: &ImportConfig,
    source: &S,
    cancellation: Option<&CancellationToken>,
    out: &mut dyn Write,
) -> Result<SyncReport, CliError>
where
    S: FeedSource + ?Sized,
{
    let _lock = RunLock::acquire(&config.catalog)?;
    let mut store = install_catalog(&config.catalog)?;
    let sync_log = config
        .sync_log
        .as_deref()
        .map(|path| SyncLog::initialise(path.as_std_path()))
        .transpose()?;

    let mut options = SyncOptions::default().with_fetch(config.fetch.clone());
    if let Some(token) = cancellation {
        options = options.with_cancellation(token);
    }
    if let Some(sync_log) = sync_log.as_ref() {
        options = options.with_log(sync_log);
    }

    log::info!("importing {} into {}", config.feed_url, config.catalog);
    let report = run_sync(source, &config.credentials, &mut store, options).await?;
    writeln!(out, "{}", report.summary(config.summary_errors)).map_err(CliError::WriteOutput)?;
    Ok(report)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ImportConfig, CliError> {
    let merged = ImportArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ImportConfig::try_from(merged)
}

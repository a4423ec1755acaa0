//! Test helpers for composing import configuration and scripted feeds.

use super::*;
use crate::import::{ImportArgs, ImportConfig, config_from_layers_for_test};
use camino::{Utf8Path, Utf8PathBuf};
use forecourt_data::feed::{
    DEFAULT_USER_AGENT, FeedCredentials, FeedUrl, FetchOptions, RetryPolicy, StubFeedSource,
};
use ortho_config::MergeComposer;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

pub(super) const USERNAME: &str = "dealer";
pub(super) const PASSWORD: &str = "hunter2";

/// Temporary directory holding catalog and run log databases.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn catalog(&self) -> Utf8PathBuf {
        self.path("catalog.sqlite")
    }
}

pub(super) fn record(id: &str, make: &str, model: &str) -> Value {
    json!({
        "Id": id,
        "Make": make,
        "Model": model,
        "Variant": format!("{model} base"),
    })
}

pub(super) fn scripted_feed(records: &[Value]) -> StubFeedSource {
    StubFeedSource::new()
        .with_page(1, serde_json::to_vec(records).expect("records serialise"))
        .accepting(FeedCredentials::new(USERNAME, PASSWORD))
}

/// Resolved configuration pointing at `catalog` with retries disabled.
pub(super) fn import_config(catalog: &Utf8Path) -> ImportConfig {
    ImportConfig {
        catalog: catalog.to_path_buf(),
        feed_url: FeedUrl::parse("https://feeds.example.test/export").expect("valid URL"),
        credentials: FeedCredentials::new(USERNAME, PASSWORD),
        fetch: FetchOptions::default().with_retry(RetryPolicy::immediate(1)),
        user_agent: DEFAULT_USER_AGENT.to_owned(),
        sync_log: None,
        summary_errors: 5,
    }
}

/// Serialise parsed CLI arguments into a merge layer, dropping unset values.
pub(super) fn cli_layer(args: &ImportArgs) -> Value {
    let Value::Object(fields) = serde_json::to_value(args).expect("arguments serialise") else {
        panic!("arguments should serialise to an object");
    };
    Value::Object(
        fields
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .collect::<Map<_, _>>(),
    )
}

pub(super) fn merge_layers(
    cli_args: &ImportArgs,
    file_layer: Option<Value>,
    env_layer: Option<Value>,
) -> Result<ImportConfig, CliError> {
    let mut composer = MergeComposer::new();
    if let Some(file) = file_layer {
        composer.push_file(file, None);
    }
    if let Some(env) = env_layer {
        composer.push_environment(env);
    }
    composer.push_cli(cli_layer(cli_args));
    config_from_layers_for_test(composer.layers())
}

//! Focused unit tests covering import configuration and execution.

use super::helpers::{
    PASSWORD, USERNAME, Workspace, import_config, merge_layers, record, scripted_feed,
};
use super::*;
use crate::import::{ImportArgs, ImportConfig, execute_import};
use camino::Utf8PathBuf;
use forecourt_core::{ListingStore, ListingSchema, SqliteListingStore};
use forecourt_data::feed::{
    DEFAULT_FEED_URL, DEFAULT_USER_AGENT, FetchOptions, PagingConfig, RetryPolicy, StubFeedSource, StubResponse,
    block_on_for_tests,
};
use forecourt_data::sync::{RunLock, RunLockError, SyncError};
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn credentials_only() -> ImportArgs {
    ImportArgs {
        username: Some(USERNAME.to_owned()),
        password: Some(PASSWORD.to_owned()),
        ..ImportArgs::default()
    }
}

#[rstest]
fn converting_without_a_username_errors() {
    let args = ImportArgs {
        username: None,
        ..credentials_only()
    };
    match ImportConfig::try_from(args).expect_err("missing username should error") {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_USERNAME);
            assert_eq!(env, ENV_IMPORT_USERNAME);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
#[case::absent(None)]
#[case::blank(Some("  "))]
fn converting_without_a_password_names_the_variable(#[case] password: Option<&str>) {
    let args = ImportArgs {
        password: password.map(str::to_owned),
        ..credentials_only()
    };
    let err = ImportConfig::try_from(args).expect_err("missing password should error");
    match &err {
        CliError::MissingSecret { field, env } => {
            assert_eq!(*field, ARG_PASSWORD);
            assert_eq!(*env, ENV_IMPORT_PASSWORD);
        }
        other => panic!("expected MissingSecret, found {other:?}"),
    }
    assert!(!err.to_string().contains("--password"));
}

#[rstest]
fn converting_applies_defaults() {
    let config = ImportConfig::try_from(credentials_only()).expect("config should build");
    assert_eq!(config.catalog.as_str(), DEFAULT_CATALOG);
    assert_eq!(config.feed_url.as_ref(), DEFAULT_FEED_URL);
    assert_eq!(config.fetch, FetchOptions::default());
    assert_eq!(config.sync_log, None);
    assert_eq!(config.summary_errors, 5);
    assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(config.credentials.username(), USERNAME);
    assert_eq!(config.credentials.password(), PASSWORD);
}

#[rstest]
fn converting_applies_paging_and_retry_overrides() {
    let args = ImportArgs {
        page_size: Some(25),
        max_attempts: Some(5),
        ..credentials_only()
    };
    let config = ImportConfig::try_from(args).expect("config should build");
    assert_eq!(
        config.fetch,
        FetchOptions::default()
            .with_paging(PagingConfig::default().with_page_size(25))
            .with_retry(RetryPolicy::default().with_max_attempts(5))
    );
}

#[rstest]
fn converting_applies_feed_shape_overrides() {
    let args = ImportArgs {
        user_agent: Some("dealer-sync/2".to_owned()),
        page_param: Some("p".to_owned()),
        items_key: Some("Items".to_owned()),
        has_more_key: Some("More".to_owned()),
        ..credentials_only()
    };
    let config = ImportConfig::try_from(args).expect("config should build");
    assert_eq!(config.user_agent, "dealer-sync/2");
    assert_eq!(
        config.fetch.paging,
        PagingConfig::default()
            .with_query_params("p", "pageSize")
            .with_items_key("Items")
            .with_has_more_key("More")
    );
}

#[rstest]
fn blank_feed_shape_settings_keep_the_defaults() {
    let args = ImportArgs {
        user_agent: Some(" ".to_owned()),
        size_param: Some(String::new()),
        items_key: Some("  ".to_owned()),
        ..credentials_only()
    };
    let config = ImportConfig::try_from(args).expect("config should build");
    assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(config.fetch.paging, PagingConfig::default());
}

#[rstest]
fn feed_shape_flags_parse() {
    let cli = Cli::try_parse_from([
        "forecourt",
        "import",
        "--user-agent",
        "dealer-sync/2",
        "--page-param",
        "p",
        "--size-param",
        "n",
        "--items-key",
        "Items",
        "--has-more-key",
        "More",
    ])
    .expect("flags should parse");
    let Command::Import(args) = cli.command else {
        panic!("expected the import command");
    };
    assert_eq!(args.user_agent.as_deref(), Some("dealer-sync/2"));
    assert_eq!(args.page_param.as_deref(), Some("p"));
    assert_eq!(args.size_param.as_deref(), Some("n"));
    assert_eq!(args.items_key.as_deref(), Some("Items"));
    assert_eq!(args.has_more_key.as_deref(), Some("More"));
}

#[rstest]
#[case::page_size(Some(0), None, ARG_PAGE_SIZE)]
#[case::attempts(None, Some(0), ARG_MAX_ATTEMPTS)]
fn converting_rejects_zero_counts(
    #[case] page_size: Option<u32>,
    #[case] max_attempts: Option<u32>,
    #[case] expected: &'static str,
) {
    let args = ImportArgs {
        page_size,
        max_attempts,
        ..credentials_only()
    };
    match ImportConfig::try_from(args).expect_err("zero should be rejected") {
        CliError::InvalidSetting { field, .. } => assert_eq!(field, expected),
        other => panic!("expected InvalidSetting, found {other:?}"),
    }
}

#[rstest]
fn converting_rejects_relative_feed_urls() {
    let args = ImportArgs {
        feed_url: Some("listingapi/export".to_owned()),
        ..credentials_only()
    };
    match ImportConfig::try_from(args).expect_err("relative URL should error") {
        CliError::InvalidFeedUrl { url, .. } => assert_eq!(url, "listingapi/export"),
        other => panic!("expected InvalidFeedUrl, found {other:?}"),
    }
}

#[rstest]
fn debug_output_never_contains_the_password() {
    let args = credentials_only();
    assert!(!format!("{args:?}").contains(PASSWORD));
    let config = ImportConfig::try_from(args).expect("config should build");
    assert!(!format!("{config:?}").contains(PASSWORD));
}

#[rstest]
fn the_password_has_no_command_line_flag() {
    let outcome = Cli::try_parse_from(["forecourt", "import", "--password", PASSWORD]);
    assert!(outcome.is_err());
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    let err = merge_layers(
        &ImportArgs::default(),
        Some(json!({ "page_size": "many" })),
        None,
    )
    .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence(workspace: Workspace) {
    let cli_catalog = workspace.path("from-cli.sqlite");
    let args = ImportArgs {
        catalog: Some(cli_catalog.clone()),
        ..ImportArgs::default()
    };
    let config = merge_layers(
        &args,
        Some(json!({
            "catalog": workspace.path("from-file.sqlite").as_str(),
            "username": "file-user",
            "page_size": 50,
        })),
        Some(json!({
            "username": USERNAME,
            "password": PASSWORD,
        })),
    )
    .expect("merged config should build");
    assert_eq!(config.catalog, cli_catalog);
    assert_eq!(config.credentials.username(), USERNAME);
    assert_eq!(config.credentials.password(), PASSWORD);
    assert_eq!(config.fetch.paging.page_size, 50);
}

#[rstest]
fn execute_import_writes_a_summary(workspace: Workspace) {
    let catalog = workspace.catalog();
    let source = scripted_feed(&[record("A", "Audi", "A3"), record("B", "BMW", "118i")]);
    let mut out = Vec::new();
    let report = block_on_for_tests(execute_import(
        &import_config(&catalog),
        &source,
        None,
        &mut out,
    ))
    .expect("import succeeds");

    assert_eq!(report.created, 2);
    let summary = String::from_utf8(out).expect("utf-8 output");
    assert!(summary.starts_with("created 2, updated 0, deleted 0, unchanged 0"));

    let store =
        SqliteListingStore::open(catalog.as_std_path(), ListingSchema::vehicle()).expect("reopen");
    assert_eq!(store.list_all().expect("list catalog").len(), 2);
    assert!(!Utf8PathBuf::from(format!("{catalog}.lock")).exists());
}

#[rstest]
fn execute_import_records_runs_in_the_sync_log(workspace: Workspace) {
    let catalog = workspace.catalog();
    let log_path = workspace.path("runs.sqlite");
    let config = ImportConfig {
        sync_log: Some(log_path.clone()),
        ..import_config(&catalog)
    };
    let source = scripted_feed(&[record("A", "Audi", "A3")]);
    block_on_for_tests(execute_import(&config, &source, None, &mut Vec::new()))
        .expect("import succeeds");

    let connection = rusqlite::Connection::open(log_path.as_std_path()).expect("open run log");
    let status: String = connection
        .query_row("SELECT status FROM sync_runs", [], |row| row.get(0))
        .expect("read run status");
    assert_eq!(status, "completed");
}

#[rstest]
fn execute_import_refuses_a_held_catalog(workspace: Workspace) {
    let catalog = workspace.catalog();
    let _held = RunLock::acquire(&catalog).expect("first lock");
    let source = scripted_feed(&[record("A", "Audi", "A3")]);
    let outcome = block_on_for_tests(execute_import(
        &import_config(&catalog),
        &source,
        None,
        &mut Vec::new(),
    ));
    assert!(matches!(
        outcome,
        Err(CliError::Lock(RunLockError::Held { .. }))
    ));
    assert!(source.requests().is_empty());
}

#[rstest]
fn execute_import_surfaces_fatal_sync_errors(workspace: Workspace) {
    let catalog = workspace.catalog();
    let source = StubFeedSource::new().with_response(1, StubResponse::Status(503));
    let mut out = Vec::new();
    let outcome = block_on_for_tests(execute_import(
        &import_config(&catalog),
        &source,
        None,
        &mut out,
    ));
    match outcome {
        Err(CliError::Sync(SyncError::Fetch(err))) => assert_eq!(err.page, 1),
        other => panic!("expected a fetch failure, found {other:?}"),
    }
    assert!(out.is_empty());
    assert!(!Utf8PathBuf::from(format!("{catalog}.lock")).exists());
}

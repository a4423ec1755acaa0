//! Behaviour-driven step definitions driving the import CLI scenarios.

use super::helpers::{
    PASSWORD, USERNAME, Workspace, import_config, merge_layers, record, scripted_feed,
};
use super::*;
use crate::import::{ImportConfig, execute_import};
use forecourt_core::{ListingSchema, ListingStore, SqliteListingStore};
use forecourt_data::feed::{DEFAULT_FEED_URL, StubFeedSource, block_on_for_tests};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};
use std::cell::RefCell;

const FILE_FEED_URL: &str = "https://feeds.example.test/from-file";

/// Aggregates import CLI scenario state so each step only needs a single
/// world argument.
#[derive(Debug)]
struct ImportWorld {
    workspace: Workspace,
    cli_args: RefCell<Vec<String>>,
    config_layer: RefCell<Option<Value>>,
    env_layer: RefCell<Option<Value>>,
    config_result: RefCell<Option<Result<ImportConfig, CliError>>>,
    feed: RefCell<Option<StubFeedSource>>,
    output: RefCell<String>,
}

impl ImportWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            cli_args: RefCell::new(Vec::new()),
            config_layer: RefCell::new(None),
            env_layer: RefCell::new(None),
            config_result: RefCell::new(None),
            feed: RefCell::new(None),
            output: RefCell::new(String::new()),
        }
    }

    fn config(&self) -> ImportConfig {
        match self.config_result.borrow().as_ref() {
            Some(Ok(config)) => config.clone(),
            other => panic!("expected a resolved configuration, found {other:?}"),
        }
    }
}

#[fixture]
fn world() -> ImportWorld {
    ImportWorld::new()
}

#[given("the feed credentials are provided via environment variables")]
fn credentials_from_env(#[from(world)] world: &ImportWorld) {
    *world.env_layer.borrow_mut() = Some(json!({
        "username": USERNAME,
        "password": PASSWORD,
    }));
}

#[given("I pass only the username CLI flag")]
fn cli_only_username(#[from(world)] world: &ImportWorld) {
    world
        .cli_args
        .borrow_mut()
        .extend([format!("--{ARG_USERNAME}"), USERNAME.to_owned()]);
}

#[given("the catalog and feed URL are provided via a config file")]
fn provided_via_config(#[from(world)] world: &ImportWorld) {
    *world.config_layer.borrow_mut() = Some(json!({
        "catalog": world.workspace.path("from-file.sqlite").as_str(),
        "feed_url": FILE_FEED_URL,
        "username": "file-user",
    }));
}

#[given("I pass the catalog path with a CLI flag")]
fn cli_provides_catalog(#[from(world)] world: &ImportWorld) {
    world.cli_args.borrow_mut().extend([
        format!("--{ARG_CATALOG}"),
        world.workspace.catalog().to_string(),
    ]);
}

#[given("a scripted feed with two listings")]
fn scripted_two_listings(#[from(world)] world: &ImportWorld) {
    let feed = scripted_feed(&[record("A", "Audi", "A3"), record("B", "BMW", "118i")]);
    world.feed.replace(Some(feed));
}

#[when("I configure the import command")]
fn configure_import(#[from(world)] world: &ImportWorld) {
    let mut invocation = vec!["forecourt".to_owned(), "import".to_owned()];
    invocation.extend(world.cli_args.borrow().iter().cloned());
    let file_layer = world.config_layer.borrow().clone();
    let env_layer = world.env_layer.borrow().clone();
    let outcome = Cli::try_parse_from(invocation)
        .map_err(CliError::ArgumentParsing)
        .and_then(|cli| match cli.command {
            Command::Import(args) => merge_layers(&args, file_layer, env_layer),
            Command::Install(_) => panic!("expected the import command"),
        });
    world.config_result.replace(Some(outcome));
}

#[when("I run the import against the scripted feed")]
fn run_scripted_import(#[from(world)] world: &ImportWorld) {
    let feed = world.feed.borrow();
    let feed = feed.as_ref().expect("feed should be scripted");
    let mut out = Vec::new();
    block_on_for_tests(execute_import(
        &import_config(&world.workspace.catalog()),
        feed,
        None,
        &mut out,
    ))
    .expect("import succeeds");
    world
        .output
        .replace(String::from_utf8(out).expect("utf-8 output"));
}

#[then("the import uses the default catalog and feed URL")]
fn uses_defaults(#[from(world)] world: &ImportWorld) {
    let config = world.config();
    assert_eq!(config.catalog.as_str(), DEFAULT_CATALOG);
    assert_eq!(config.feed_url.as_ref(), DEFAULT_FEED_URL);
    assert_eq!(config.credentials.username(), USERNAME);
}

#[then("the CLI reports that the \"password\" secret is missing")]
fn reports_missing_password(#[from(world)] world: &ImportWorld) {
    let borrowed = world.config_result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingSecret { field, env } => {
            assert_eq!(*field, ARG_PASSWORD);
            assert_eq!(*env, ENV_IMPORT_PASSWORD);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("CLI and environment layers override configuration defaults")]
fn precedence_holds(#[from(world)] world: &ImportWorld) {
    let config = world.config();
    assert_eq!(config.catalog, world.workspace.catalog());
    assert_eq!(config.feed_url.as_ref(), FILE_FEED_URL);
    assert_eq!(config.credentials.username(), USERNAME);
}

#[then("the summary reports two created listings")]
fn summary_reports_creates(#[from(world)] world: &ImportWorld) {
    let output = world.output.borrow();
    assert!(
        output.starts_with("created 2, updated 0, deleted 0, unchanged 0"),
        "unexpected summary: {output}"
    );
}

#[then("the catalog holds two listings")]
fn catalog_holds_listings(#[from(world)] world: &ImportWorld) {
    let catalog = world.workspace.catalog();
    let store = SqliteListingStore::open(catalog.as_std_path(), ListingSchema::vehicle())
        .expect("reopen catalog");
    assert_eq!(store.list_all().expect("list catalog").len(), 2);
}

macro_rules! register_import_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/import_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ImportWorld) {
            let _ = world;
        }
    };
}

register_import_scenario!(
    credentials_from_environment,
    "credentials from the environment with default settings"
);
register_import_scenario!(rejecting_missing_password, "rejecting a missing password");
register_import_scenario!(
    layering_cli_config_env,
    "layering CLI, config file, and environment values"
);
register_import_scenario!(
    importing_scripted_feed,
    "importing a scripted feed into a fresh catalog"
);

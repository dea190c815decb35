//! Behaviour-driven step definitions driving the sync CLI scenarios.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio_util::sync::CancellationToken;
use trafficsync_core::test_support::{RecordingRemoteLayer, StubFeedSource, block_on_for_tests};
use trafficsync_core::{AttributeValue, FeedError};

use super::helpers::{FEED_URL, StubPassBuilder, complete_flags, traffic_segments};
use super::*;
use crate::sync::{SyncConfig, run_sync_with};

/// Scenario state; steps share a single world argument.
struct SyncWorld {
    feed: RefCell<Option<StubFeedSource>>,
    remote: RefCell<Option<RecordingRemoteLayer>>,
    cli_args: RefCell<Vec<String>>,
    builder: RefCell<Option<StubPassBuilder>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl SyncWorld {
    fn new() -> Self {
        Self {
            feed: RefCell::new(None),
            remote: RefCell::new(None),
            cli_args: RefCell::new(Vec::new()),
            builder: RefCell::new(None),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn error(&self) -> String {
        let borrowed = self.result.borrow();
        let outcome = borrowed.as_ref().expect("result recorded");
        match outcome {
            Ok(()) => panic!("expected an error"),
            Err(err) => err.to_string(),
        }
    }

    fn with_builder<T>(&self, inspect: impl FnOnce(&StubPassBuilder) -> T) -> T {
        let borrowed = self.builder.borrow();
        inspect(borrowed.as_ref().expect("command must have run"))
    }
}

#[fixture]
fn world() -> SyncWorld {
    SyncWorld::new()
}

#[given("a feed publishing {count} traffic segments")]
fn feed_publishing(#[from(world)] world: &SyncWorld, count: usize) {
    world
        .feed
        .replace(Some(StubFeedSource::with_features(traffic_segments(count))));
}

#[given("a feed that refuses connections")]
fn feed_refusing(#[from(world)] world: &SyncWorld) {
    world.feed.replace(Some(StubFeedSource::with_error(FeedError::Network {
        url: FEED_URL.to_owned(),
        message: "connection refused".to_owned(),
    })));
}

#[given("a remote layer holding {count} features")]
fn remote_holding(#[from(world)] world: &SyncWorld, count: i64) {
    world
        .remote
        .replace(Some(RecordingRemoteLayer::with_ids(1..=count)));
}

#[given("I pass every connection flag")]
fn pass_every_flag(#[from(world)] world: &SyncWorld) {
    world.cli_args.borrow_mut().extend(complete_flags());
}

#[given("I pass every connection flag except {flag}")]
fn pass_every_flag_except(#[from(world)] world: &SyncWorld, flag: String) {
    let skipped = format!("--{}", flag.trim_matches('"'));
    let flags = complete_flags();
    let kept = flags
        .chunks(2)
        .filter(|pair| pair.first() != Some(&skipped))
        .flatten()
        .cloned();
    world.cli_args.borrow_mut().extend(kept);
}

#[given("I also set {flag} to {value}")]
fn pass_flag(#[from(world)] world: &SyncWorld, flag: String, value: String) {
    world.cli_args.borrow_mut().extend([
        flag.trim_matches('"').to_owned(),
        value.trim_matches('"').to_owned(),
    ]);
}

#[when("I run the sync command")]
fn run_sync_command(#[from(world)] world: &SyncWorld) {
    let feed = world.feed.take().expect("feed configured");
    let remote = world.remote.take().expect("remote configured");
    let builder = StubPassBuilder::new(feed, remote);

    let mut argv = vec!["trafficsync".to_owned(), "sync".to_owned()];
    argv.extend(world.cli_args.borrow().iter().cloned());
    let outcome = Cli::try_parse_from(argv)
        .map_err(CliError::from)
        .and_then(|cli| match cli.command {
            Command::Sync(args) => SyncConfig::try_from(args),
        })
        .and_then(|config| {
            let mut stdout = world.stdout.borrow_mut();
            block_on_for_tests(run_sync_with(
                &config,
                &builder,
                &mut *stdout,
                &CancellationToken::new(),
            ))
        });

    world.result.replace(Some(outcome));
    world.builder.replace(Some(builder));
}

#[then("the command prints {line}")]
fn command_prints(#[from(world)] world: &SyncWorld, line: String) {
    let borrowed = world.result.borrow();
    let outcome = borrowed.as_ref().expect("result recorded");
    assert!(outcome.is_ok(), "expected success, got {outcome:?}");
    let stdout = String::from_utf8(world.stdout.borrow().clone()).expect("stdout utf-8");
    assert_eq!(stdout.trim_end(), line.trim_matches('"'));
}

#[then("nothing was printed")]
fn nothing_printed(#[from(world)] world: &SyncWorld) {
    assert!(world.stdout.borrow().is_empty());
}

#[then("the command fails with {kind}")]
fn command_fails(#[from(world)] world: &SyncWorld, kind: String) {
    let message = world.error();
    assert!(
        message.starts_with(kind.trim_matches('"')),
        "unexpected message {message:?}"
    );
}

#[then("the CLI reports that the {flag} flag is missing")]
fn reports_missing(#[from(world)] world: &SyncWorld, flag: String) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, flag.trim_matches('"')),
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("the observer saw {count} successful pass")]
fn observer_saw_success(#[from(world)] world: &SyncWorld, count: usize) {
    let results = world.with_builder(|builder| builder.observer().results());
    assert_eq!(results.iter().filter(|result| result.is_success()).count(), count);
}

#[then("the observer saw a timestamp of {expected}")]
fn observer_saw_timestamp(#[from(world)] world: &SyncWorld, expected: String) {
    let snapshots = world.with_builder(|builder| builder.observer().snapshots());
    let stamps: Vec<String> = snapshots
        .iter()
        .flat_map(|snapshot| snapshot.features.iter())
        .filter_map(|feature| match feature.attribute("auswertezeit") {
            Some(AttributeValue::UniversalTime(instant)) => Some(instant.to_rfc3339()),
            _ => None,
        })
        .collect();
    assert_eq!(stamps, vec![expected.trim_matches('"').to_owned()]);
}

macro_rules! register_sync_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/sync_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: SyncWorld) {
            let _ = world;
        }
    };
}

register_sync_scenario!(single_successful_pass, "running a single successful pass");
register_sync_scenario!(reporting_failed_pass, "reporting a failed pass");
register_sync_scenario!(rejecting_missing_args, "rejecting missing arguments");
register_sync_scenario!(source_zone_from_flag, "reading the source zone from a flag");

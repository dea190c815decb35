//! Focused unit tests covering sync configuration and the pass runners.

use std::time::Duration;

use rstest::rstest;
use tokio_util::sync::CancellationToken;
use trafficsync_core::test_support::{RecordingRemoteLayer, StubFeedSource, block_on_for_tests};
use trafficsync_core::{DEFAULT_SOURCE_ZONE, ErrorKind, FeedError, LayerEndpoint};

use super::helpers::{
    CountingPass, FEED_URL, LAYER_URL, StubPassBuilder, complete_args, traffic_segments,
};
use super::*;
use crate::sync::{
    HttpPassBuilder, PassBuilder, SyncArgs, SyncConfig, config_from_layers_for_test,
    run_schedule, run_sync_with,
};

fn without(field: &str) -> SyncArgs {
    let mut args = complete_args();
    match field {
        ARG_FEED_URL => args.feed_url = None,
        ARG_REMOTE_PORTAL_URL => args.remote_portal_url = None,
        ARG_REMOTE_APP_ID => args.remote_app_id = None,
        ARG_REMOTE_CLIENT_ID => args.remote_client_id = Some("  ".to_owned()),
        ARG_REMOTE_LAYER_ENDPOINT => args.remote_layer_endpoint = None,
        other => panic!("unknown field {other}"),
    }
    args
}

#[rstest]
#[case(ARG_FEED_URL, ENV_FEED_URL)]
#[case(ARG_REMOTE_PORTAL_URL, ENV_REMOTE_PORTAL_URL)]
#[case(ARG_REMOTE_APP_ID, ENV_REMOTE_APP_ID)]
#[case(ARG_REMOTE_CLIENT_ID, ENV_REMOTE_CLIENT_ID)]
#[case(ARG_REMOTE_LAYER_ENDPOINT, ENV_REMOTE_LAYER_ENDPOINT)]
fn converting_without_required_fields_errors(
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let err = SyncConfig::try_from(without(field)).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn defaults_fill_optional_settings() {
    let config = SyncConfig::try_from(complete_args()).expect("complete args");

    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.source_zone, DEFAULT_SOURCE_ZONE);
    assert_eq!(config.timestamp_field, "auswertezeit");
    assert_eq!(config.speed_field, "geschwindigkeit");
    assert_eq!(config.every, None);
    assert_eq!(config.layer, LayerEndpoint::new(LAYER_URL));
}

#[rstest]
fn rejects_unknown_time_zone() {
    let args = SyncArgs {
        source_time_zone: Some("Mars/Olympus_Mons".to_owned()),
        ..complete_args()
    };
    let err = SyncConfig::try_from(args).expect_err("unknown zone");
    assert!(matches!(err, CliError::InvalidTimeZone { ref value, .. } if value == "Mars/Olympus_Mons"));
}

#[rstest]
#[case(Some(0), None, ARG_TIMEOUT_SECS)]
#[case(None, Some(0), ARG_EVERY)]
fn rejects_zero_durations(
    #[case] timeout_secs: Option<u64>,
    #[case] every: Option<u64>,
    #[case] flag: &'static str,
) {
    let args = SyncArgs {
        timeout_secs,
        every,
        ..complete_args()
    };
    match SyncConfig::try_from(args).expect_err("zero duration") {
        CliError::InvalidDuration { field } => assert_eq!(field, flag),
        other => panic!("expected InvalidDuration, found {other:?}"),
    }
}

#[rstest]
#[case(&["--every"], Some(900))]
#[case(&["--every", "60"], Some(60))]
#[case(&[], None)]
fn every_flag_parses_optional_value(#[case] extra: &[&str], #[case] expected: Option<u64>) {
    let mut argv = vec!["trafficsync".to_owned(), "sync".to_owned()];
    argv.extend(extra.iter().map(|flag| (*flag).to_owned()));
    let cli = Cli::try_parse_from(argv).expect("arguments parse");
    let Command::Sync(args) = cli.command;
    assert_eq!(args.every, expected);
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "timeout_secs": "soon" }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "feed_url": FEED_URL,
            "remote_portal_url": "https://from-file.example",
            "remote_app_id": "file-app",
            "remote_client_id": "file-secret",
            "remote_layer_endpoint": "https://from-file.example/FeatureServer/0",
            "source_time_zone": "Europe/Vienna",
        }),
        None,
    );
    composer.push_environment(json!({
        "remote_app_id": "env-app",
        "remote_layer_endpoint": "https://from-env.example/FeatureServer/0",
    }));
    composer.push_cli(json!({
        "remote_layer_endpoint": LAYER_URL,
        "every": 300,
    }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.portal_url, "https://from-file.example");
    assert_eq!(config.app_id, "env-app");
    assert_eq!(config.client_id, "file-secret");
    assert_eq!(config.layer.as_str(), LAYER_URL);
    assert_eq!(config.source_zone, chrono_tz::Europe::Vienna);
    assert_eq!(config.every, Some(Duration::from_secs(300)));
}

#[rstest]
fn http_builder_accepts_valid_config() {
    let config = SyncConfig::try_from(complete_args()).expect("complete args");
    assert!(HttpPassBuilder.build(&config).is_ok());
}

#[rstest]
fn http_builder_rejects_relative_portal() {
    let args = SyncArgs {
        remote_portal_url: Some("www.arcgis.com".to_owned()),
        ..complete_args()
    };
    let config = SyncConfig::try_from(args).expect("config resolves");
    match HttpPassBuilder.build(&config) {
        Err(CliError::BuildClient(_)) => {}
        Err(other) => panic!("expected BuildClient, found {other:?}"),
        Ok(_) => panic!("expected BuildClient error"),
    }
}

#[rstest]
fn single_pass_reports_insertions() {
    let config = SyncConfig::try_from(complete_args()).expect("complete args");
    let builder = StubPassBuilder::new(
        StubFeedSource::with_features(traffic_segments(3)),
        RecordingRemoteLayer::with_ids([10, 11]),
    );
    let mut stdout = Vec::new();

    block_on_for_tests(run_sync_with(
        &config,
        &builder,
        &mut stdout,
        &CancellationToken::new(),
    ))
    .expect("pass succeeds");

    assert_eq!(
        String::from_utf8(stdout).expect("utf-8"),
        "Succeeded: 3 features inserted\n"
    );
}

#[rstest]
fn single_pass_failure_becomes_error() {
    let config = SyncConfig::try_from(complete_args()).expect("complete args");
    let builder = StubPassBuilder::new(
        StubFeedSource::with_error(FeedError::Network {
            url: FEED_URL.to_owned(),
            message: "connection refused".to_owned(),
        }),
        RecordingRemoteLayer::default(),
    );
    let mut stdout = Vec::new();

    let err = block_on_for_tests(run_sync_with(
        &config,
        &builder,
        &mut stdout,
        &CancellationToken::new(),
    ))
    .expect_err("pass fails");

    match &err {
        CliError::PassFailed(failure) => assert_eq!(failure.kind, ErrorKind::Transport),
        other => panic!("expected PassFailed, found {other:?}"),
    }
    assert!(err.to_string().starts_with("TransportError: "));
    assert!(stdout.is_empty());
}

#[rstest]
#[case(false)]
#[case(true)]
fn schedule_runs_until_shutdown(#[case] failing: bool) {
    let shutdown = CancellationToken::new();
    let pass = CountingPass::new(3, shutdown.clone(), failing);

    let passes = block_on_for_tests(run_schedule(&pass, Duration::from_millis(1), &shutdown));

    assert_eq!(passes, 3);
    assert_eq!(pass.runs(), 3);
}

#[rstest]
fn schedule_does_not_start_after_shutdown() {
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let pass = CountingPass::new(1, shutdown.clone(), false);

    let passes = block_on_for_tests(run_schedule(&pass, Duration::from_secs(900), &shutdown));

    assert_eq!(passes, 0);
    assert_eq!(pass.runs(), 0);
}

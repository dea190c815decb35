//! Sync command implementation for the trafficsync CLI.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use clap::Parser;
use log::{error, info};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use trafficsync_core::{
    DEFAULT_SOURCE_ZONE, DEFAULT_TIMESTAMP_FIELD, FeedSource, LayerEndpoint, Normalizer,
    RemoteLayerClient, SyncResult, Synchronizer, TimestampPolicy,
};
use trafficsync_data::feature_service::{FeatureServiceClient, FeatureServiceConfig};
use trafficsync_data::feed::{
    DEFAULT_SPEED_FIELD, FeedSchema, HttpFeedSource, HttpFeedSourceConfig,
};

use crate::{
    ARG_EVERY, ARG_FEED_URL, ARG_REMOTE_APP_ID, ARG_REMOTE_CLIENT_ID,
    ARG_REMOTE_LAYER_ENDPOINT, ARG_REMOTE_PORTAL_URL, ARG_TIMEOUT_SECS, CliError, ENV_FEED_URL,
    ENV_REMOTE_APP_ID, ENV_REMOTE_CLIENT_ID, ENV_REMOTE_LAYER_ENDPOINT, ENV_REMOTE_PORTAL_URL,
};

/// Interval in seconds used when `--every` is given without a value.
pub(crate) const DEFAULT_INTERVAL_SECS: &str = "900";

/// Request timeout used when `--timeout-secs` is absent.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "sync",
    long_about = "Replace the contents of a hosted feature layer with the \
                 current traffic feed. Settings can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Synchronize a feature layer with the traffic feed"
)]
#[ortho_config(prefix = "TRAFFICSYNC")]
pub(crate) struct SyncArgs {
    /// URL of the GeoJSON traffic feed.
    #[arg(long = ARG_FEED_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) feed_url: Option<String>,
    /// Portal issuing access tokens (e.g. `https://www.arcgis.com`).
    #[arg(long = ARG_REMOTE_PORTAL_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) remote_portal_url: Option<String>,
    /// Registered application id.
    #[arg(long = ARG_REMOTE_APP_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) remote_app_id: Option<String>,
    /// Application credential used for app login.
    #[arg(long = ARG_REMOTE_CLIENT_ID, value_name = "secret")]
    #[serde(default)]
    pub(crate) remote_client_id: Option<String>,
    /// URL of the feature layer to replace.
    #[arg(long = ARG_REMOTE_LAYER_ENDPOINT, value_name = "url")]
    #[serde(default)]
    pub(crate) remote_layer_endpoint: Option<String>,
    /// Per-request timeout in seconds (default 30).
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// IANA zone of the feed's wall-clock timestamps (default Europe/Berlin).
    #[arg(long = "source-time-zone", value_name = "zone")]
    #[serde(default)]
    pub(crate) source_time_zone: Option<String>,
    /// Attribute holding the evaluation timestamp.
    #[arg(long = "timestamp-field", value_name = "name")]
    #[serde(default)]
    pub(crate) timestamp_field: Option<String>,
    /// Attribute holding the measured speed.
    #[arg(long = "speed-field", value_name = "name")]
    #[serde(default)]
    pub(crate) speed_field: Option<String>,
    /// Repeat the pass on this interval in seconds until interrupted
    /// (900 when given without a value).
    #[arg(
        long = ARG_EVERY,
        value_name = "secs",
        num_args = 0..=1,
        default_missing_value = DEFAULT_INTERVAL_SECS
    )]
    #[serde(default)]
    pub(crate) every: Option<u64>,
}

impl SyncArgs {
    pub(crate) fn into_config(self) -> Result<SyncConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SyncConfig::try_from(merged)
    }
}

/// Resolved `sync` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncConfig {
    pub(crate) feed_url: String,
    pub(crate) portal_url: String,
    pub(crate) app_id: String,
    pub(crate) client_id: String,
    pub(crate) layer: LayerEndpoint,
    pub(crate) timeout: Duration,
    pub(crate) source_zone: Tz,
    pub(crate) timestamp_field: String,
    pub(crate) speed_field: String,
    /// `None` runs a single pass.
    pub(crate) every: Option<Duration>,
}

impl SyncConfig {
    /// Normalizer resolving the configured timestamp field in the configured
    /// zone.
    pub(crate) fn normalizer(&self) -> Normalizer {
        Normalizer::new(TimestampPolicy::new(self.timestamp_field.clone()).with_zone(self.source_zone))
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    env: &'static str,
) -> Result<String, CliError> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or(CliError::MissingArgument { field, env })
}

fn positive_secs(value: u64, field: &'static str) -> Result<Duration, CliError> {
    if value == 0 {
        return Err(CliError::InvalidDuration { field });
    }
    Ok(Duration::from_secs(value))
}

impl TryFrom<SyncArgs> for SyncConfig {
    type Error = CliError;

    fn try_from(args: SyncArgs) -> Result<Self, Self::Error> {
        let feed_url = required(args.feed_url, ARG_FEED_URL, ENV_FEED_URL)?;
        let portal_url = required(
            args.remote_portal_url,
            ARG_REMOTE_PORTAL_URL,
            ENV_REMOTE_PORTAL_URL,
        )?;
        let app_id = required(args.remote_app_id, ARG_REMOTE_APP_ID, ENV_REMOTE_APP_ID)?;
        let client_id = required(
            args.remote_client_id,
            ARG_REMOTE_CLIENT_ID,
            ENV_REMOTE_CLIENT_ID,
        )?;
        let layer = required(
            args.remote_layer_endpoint,
            ARG_REMOTE_LAYER_ENDPOINT,
            ENV_REMOTE_LAYER_ENDPOINT,
        )?;

        let timeout = positive_secs(
            args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ARG_TIMEOUT_SECS,
        )?;
        let every = args
            .every
            .map(|secs| positive_secs(secs, ARG_EVERY))
            .transpose()?;
        let source_zone = match args.source_time_zone {
            None => DEFAULT_SOURCE_ZONE,
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|err| CliError::InvalidTimeZone {
                    reason: err.to_string(),
                    value: name.clone(),
                })?,
        };

        Ok(Self {
            feed_url,
            portal_url,
            app_id,
            client_id,
            layer: LayerEndpoint::new(layer),
            timeout,
            source_zone,
            timestamp_field: args
                .timestamp_field
                .unwrap_or_else(|| DEFAULT_TIMESTAMP_FIELD.to_owned()),
            speed_field: args
                .speed_field
                .unwrap_or_else(|| DEFAULT_SPEED_FIELD.to_owned()),
            every,
        })
    }
}

/// One configured pass against a fixed feed and layer.
#[async_trait(?Send)]
pub(crate) trait SyncPass {
    async fn run(&self, cancel: &CancellationToken) -> SyncResult;
}

pub(crate) struct ConfiguredPass<F, R> {
    sync: Synchronizer<F, R>,
    feed_url: String,
    layer: LayerEndpoint,
}

impl<F, R> ConfiguredPass<F, R> {
    pub(crate) const fn new(sync: Synchronizer<F, R>, feed_url: String, layer: LayerEndpoint) -> Self {
        Self {
            sync,
            feed_url,
            layer,
        }
    }
}

#[async_trait(?Send)]
impl<F, R> SyncPass for ConfiguredPass<F, R>
where
    F: FeedSource,
    R: RemoteLayerClient,
{
    async fn run(&self, cancel: &CancellationToken) -> SyncResult {
        self.sync
            .sync_once_with_cancel(&self.feed_url, &self.layer, cancel)
            .await
    }
}

/// Builds the pass for the current invocation.
pub(crate) trait PassBuilder {
    fn build(&self, config: &SyncConfig) -> Result<Box<dyn SyncPass>, CliError>;
}

pub(crate) struct HttpPassBuilder;

impl PassBuilder for HttpPassBuilder {
    fn build(&self, config: &SyncConfig) -> Result<Box<dyn SyncPass>, CliError> {
        let schema = FeedSchema::default()
            .with_timestamp_field(config.timestamp_field.clone())
            .with_speed_field(config.speed_field.clone());
        let feed = HttpFeedSource::with_config(
            HttpFeedSourceConfig::default()
                .with_timeout(config.timeout)
                .with_schema(schema),
        )?;
        let remote = FeatureServiceClient::new(
            FeatureServiceConfig::new(
                config.portal_url.clone(),
                config.app_id.clone(),
                config.client_id.clone(),
            )
            .with_timeout(config.timeout),
        )?;
        let sync = Synchronizer::new(feed, remote).with_normalizer(config.normalizer());
        Ok(Box::new(ConfiguredPass::new(
            sync,
            config.feed_url.clone(),
            config.layer.clone(),
        )))
    }
}

/// Run the configured command: one pass, or passes on an interval until
/// `shutdown` is cancelled.
pub(crate) async fn run_sync_with(
    config: &SyncConfig,
    builder: &dyn PassBuilder,
    writer: &mut dyn Write,
    shutdown: &CancellationToken,
) -> Result<(), CliError> {
    let pass = builder.build(config)?;
    match config.every {
        None => run_single(pass.as_ref(), writer, shutdown).await,
        Some(every) => {
            run_schedule(pass.as_ref(), every, shutdown).await;
            Ok(())
        }
    }
}

async fn run_single(
    pass: &dyn SyncPass,
    writer: &mut dyn Write,
    shutdown: &CancellationToken,
) -> Result<(), CliError> {
    match pass.run(shutdown).await {
        SyncResult::Success(summary) => {
            writeln!(writer, "Succeeded: {} features inserted", summary.inserted)
                .map_err(CliError::WriteOutput)
        }
        SyncResult::Failure(failure) => Err(CliError::PassFailed(failure)),
    }
}

/// Run passes back to back on `every` until `shutdown` fires.
///
/// A pass is awaited before the next tick is taken, so passes never overlap;
/// ticks missed while a pass is in flight are skipped. Returns the number of
/// passes started.
pub(crate) async fn run_schedule(
    pass: &dyn SyncPass,
    every: Duration,
    shutdown: &CancellationToken,
) -> usize {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut passes = 0_usize;
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        passes = passes.saturating_add(1);
        match pass.run(shutdown).await {
            SyncResult::Success(summary) => {
                info!("scheduled pass {passes} inserted {} features", summary.inserted);
            }
            SyncResult::Failure(failure) => error!("scheduled pass {passes} failed: {failure}"),
        }
    }
    info!("stopping after {passes} passes");
    passes
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SyncConfig, CliError> {
    let merged = SyncArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SyncConfig::try_from(merged)
}

//! Command-line interface for the trafficsync layer synchronizer.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod error;
mod logging;
mod sync;

pub use error::CliError;

use sync::{HttpPassBuilder, SyncArgs};

const ARG_FEED_URL: &str = "feed-url";
const ARG_REMOTE_PORTAL_URL: &str = "remote-portal-url";
const ARG_REMOTE_APP_ID: &str = "remote-app-id";
const ARG_REMOTE_CLIENT_ID: &str = "remote-client-id";
const ARG_REMOTE_LAYER_ENDPOINT: &str = "remote-layer-endpoint";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ARG_EVERY: &str = "every";
const ENV_FEED_URL: &str = "TRAFFICSYNC_CMDS_SYNC_FEED_URL";
const ENV_REMOTE_PORTAL_URL: &str = "TRAFFICSYNC_CMDS_SYNC_REMOTE_PORTAL_URL";
const ENV_REMOTE_APP_ID: &str = "TRAFFICSYNC_CMDS_SYNC_REMOTE_APP_ID";
const ENV_REMOTE_CLIENT_ID: &str = "TRAFFICSYNC_CMDS_SYNC_REMOTE_CLIENT_ID";
const ENV_REMOTE_LAYER_ENDPOINT: &str = "TRAFFICSYNC_CMDS_SYNC_REMOTE_LAYER_ENDPOINT";

/// Run the trafficsync CLI with the current process arguments and
/// environment.
///
/// # Errors
///
/// Returns an error when arguments or configuration are invalid, when the
/// HTTP clients cannot be built, or when a single pass fails. Scheduled
/// passes log their failures instead.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    logging::init_logging();
    match cli.command {
        Command::Sync(args) => {
            let config = args.into_config()?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(CliError::Runtime)?;
            runtime.block_on(async {
                let shutdown = CancellationToken::new();
                let on_interrupt = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        log::warn!("interrupted; cancelling the current pass");
                        on_interrupt.cancel();
                    }
                });
                let mut stdout = std::io::stdout().lock();
                sync::run_sync_with(&config, &HttpPassBuilder, &mut stdout, &shutdown).await
            })
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "trafficsync",
    about = "Mirror a traffic feed into a hosted feature layer",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replace the layer contents with the current feed.
    Sync(SyncArgs),
}

#[cfg(test)]
mod tests;

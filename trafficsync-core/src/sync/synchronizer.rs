use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use futures_util::FutureExt;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use super::{
    ErrorKind, MutationPhase, PassObserver, RemoteMutationError, SyncFailure, SyncResult,
    SyncSummary,
};
use crate::{EditResults, FeedSource, IdFilter, LayerEndpoint, Normalizer, RemoteLayerClient};

/// Default bound on each network stage of a pass.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Tunables for a [`Synchronizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound on the fetch, list, delete, and insert stages.
    pub stage_timeout: Duration,
    /// Filter used to list the ids that will be deleted.
    pub id_filter: IdFilter,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            id_filter: IdFilter::match_all(),
        }
    }
}

impl SyncOptions {
    /// Set the per-stage timeout.
    #[must_use]
    pub const fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Set the filter used when listing remote ids.
    #[must_use]
    pub fn with_id_filter(mut self, filter: IdFilter) -> Self {
        self.id_filter = filter;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Fetch,
    Normalize,
    ListRemoteIds,
    DeleteAll,
    InsertAll,
}

impl Stage {
    const fn error_kind(self) -> ErrorKind {
        match self {
            Self::Fetch => ErrorKind::Transport,
            Self::Normalize => ErrorKind::Geometry,
            Self::ListRemoteIds => ErrorKind::RemoteQuery,
            Self::DeleteAll | Self::InsertAll => ErrorKind::RemoteMutation,
        }
    }

    fn failed(self, cause: &dyn fmt::Display) -> SyncFailure {
        SyncFailure::new(self.error_kind(), format!("{self} failed: {cause}"))
    }

    fn cancelled(self) -> SyncFailure {
        SyncFailure::new(ErrorKind::Cancelled, format!("pass cancelled during {self}"))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Normalize => "normalize",
            Self::ListRemoteIds => "list remote ids",
            Self::DeleteAll => "delete all",
            Self::InsertAll => "insert all",
        })
    }
}

/// Replaces the contents of a remote layer with the current feed snapshot.
///
/// A pass runs fetch, normalize, list, delete, and insert strictly in order.
/// Nothing on the remote layer is mutated until the new snapshot has been
/// fetched and normalized. The delete and insert are separate calls, so the
/// layer is briefly empty or stale between them.
///
/// The synchronizer holds no state between passes. Callers that trigger
/// passes concurrently must serialise them per layer themselves.
///
/// # Examples
/// ```
/// use trafficsync_core::test_support::{RecordingRemoteLayer, StubFeedSource, block_on_for_tests};
/// use trafficsync_core::{FeatureSet, LayerEndpoint, Synchronizer};
///
/// let remote = RecordingRemoteLayer::with_ids([1, 2, 3]);
/// let sync = Synchronizer::new(StubFeedSource::with_features(FeatureSet::default()), remote);
/// let layer = LayerEndpoint::from("https://host/FeatureServer/0");
///
/// let result = block_on_for_tests(sync.sync_once("https://feed.example/traffic", &layer));
/// assert_eq!(result.inserted_count(), Some(0));
/// assert!(sync.remote().stored_ids().is_empty());
/// ```
pub struct Synchronizer<F, R> {
    feed: F,
    remote: R,
    normalizer: Normalizer,
    options: SyncOptions,
    observers: Vec<Box<dyn PassObserver>>,
}

impl<F, R> Synchronizer<F, R>
where
    F: FeedSource,
    R: RemoteLayerClient,
{
    /// Create a synchronizer with the default normalizer and options.
    #[must_use]
    pub fn new(feed: F, remote: R) -> Self {
        Self {
            feed,
            remote,
            normalizer: Normalizer::default(),
            options: SyncOptions::default(),
            observers: Vec::new(),
        }
    }

    /// Replace the normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Register an observer for snapshots and results.
    #[must_use]
    pub fn with_observer(mut self, observer: impl PassObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// The feed source.
    #[must_use]
    pub const fn feed(&self) -> &F {
        &self.feed
    }

    /// The remote layer client.
    #[must_use]
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// The options in use.
    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run one pass that cannot be cancelled.
    pub async fn sync_once(&self, feed_url: &str, layer: &LayerEndpoint) -> SyncResult {
        self.sync_once_with_cancel(feed_url, layer, &CancellationToken::new())
            .await
    }

    /// Run one pass, stopping early when `cancel` fires.
    ///
    /// Every outcome is returned as a [`SyncResult`]; collaborator panics are
    /// caught and reported as [`ErrorKind::Unknown`]. Cancelling after the
    /// delete was submitted can leave the layer empty until the next pass.
    pub async fn sync_once_with_cancel(
        &self,
        feed_url: &str,
        layer: &LayerEndpoint,
        cancel: &CancellationToken,
    ) -> SyncResult {
        info!("starting pass for {layer} from {feed_url}");
        let outcome = AssertUnwindSafe(self.run_pass(feed_url, layer, cancel))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(summary)) => SyncResult::Success(summary),
            Ok(Err(failure)) => SyncResult::Failure(failure),
            Err(payload) => SyncResult::Failure(SyncFailure::new(
                ErrorKind::Unknown,
                format!("pass aborted by a panic: {}", panic_message(payload.as_ref())),
            )),
        };
        match &result {
            SyncResult::Success(summary) => info!(
                "pass for {layer} succeeded: {} inserted, {} deleted, {} rejected",
                summary.inserted,
                summary.deleted,
                summary.mutation_errors.len()
            ),
            SyncResult::Failure(failure) => error!("pass for {layer} failed: {failure}"),
        }
        self.notify(|observer| observer.on_result(layer, &result));
        result
    }

    async fn run_pass(
        &self,
        feed_url: &str,
        layer: &LayerEndpoint,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, SyncFailure> {
        let fetched = self
            .bounded(Stage::Fetch, cancel, self.feed.fetch(feed_url))
            .await?
            .map_err(|err| SyncFailure::new(err.kind(), err.to_string()))?;
        info!("fetched {} features from {feed_url}", fetched.len());

        ensure_live(Stage::Normalize, cancel)?;
        let snapshot = self
            .normalizer
            .normalize(&fetched)
            .map_err(|err| SyncFailure::new(err.kind(), err.to_string()))?;
        self.notify(|observer| observer.on_snapshot(layer, &snapshot));

        let ids = self
            .bounded(
                Stage::ListRemoteIds,
                cancel,
                self.remote.list_all_ids(layer, &self.options.id_filter),
            )
            .await?
            .map_err(|err| Stage::ListRemoteIds.failed(&err))?;
        info!("remote layer {layer} holds {} features", ids.len());

        let mut summary = SyncSummary::default();
        if ids.is_empty() {
            info!("remote layer {layer} is empty; skipping delete");
        } else {
            let deleted = self
                .bounded(
                    Stage::DeleteAll,
                    cancel,
                    self.remote.delete_objects(layer, &ids),
                )
                .await?
                .map_err(|err| Stage::DeleteAll.failed(&err))?;
            summary.deleted = deleted.succeeded();
            record_rejections(&mut summary, MutationPhase::Delete, &deleted);
            info!("deleted {} of {} remote features", summary.deleted, ids.len());
        }

        if snapshot.is_empty() {
            info!("feed snapshot is empty; skipping insert");
        } else {
            let inserted = self
                .bounded(
                    Stage::InsertAll,
                    cancel,
                    self.remote.insert_features(layer, &snapshot),
                )
                .await?
                .map_err(|err| Stage::InsertAll.failed(&err))?;
            summary.inserted = inserted.succeeded();
            record_rejections(&mut summary, MutationPhase::Insert, &inserted);
            info!(
                "inserted {} of {} features",
                summary.inserted,
                snapshot.len()
            );
        }

        Ok(summary)
    }

    async fn bounded<T>(
        &self,
        stage: Stage,
        cancel: &CancellationToken,
        work: impl Future<Output = T>,
    ) -> Result<T, SyncFailure> {
        ensure_live(stage, cancel)?;
        let limit = self.options.stage_timeout;
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(stage.cancelled()),
            outcome = tokio::time::timeout(limit, work) => outcome.map_err(|_| {
                SyncFailure::new(
                    stage.error_kind(),
                    format!("{stage} timed out after {}s", limit.as_secs()),
                )
            }),
        }
    }

    fn notify(&self, event: impl Fn(&dyn PassObserver)) {
        for observer in &self.observers {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| event(observer.as_ref())));
            if delivered.is_err() {
                warn!("pass observer panicked; notification dropped");
            }
        }
    }
}

fn ensure_live(stage: Stage, cancel: &CancellationToken) -> Result<(), SyncFailure> {
    if cancel.is_cancelled() {
        Err(stage.cancelled())
    } else {
        Ok(())
    }
}

fn record_rejections(summary: &mut SyncSummary, phase: MutationPhase, results: &EditResults) {
    for outcome in results.failures() {
        let rejection = RemoteMutationError {
            phase,
            object_id: outcome.object_id,
            message: outcome
                .error
                .clone()
                .unwrap_or_else(|| "rejected without a reason".to_owned()),
        };
        warn!("{rejection}");
        summary.mutation_errors.push(rejection);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

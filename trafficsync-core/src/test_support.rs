//! In-memory collaborators for unit and behaviour tests.
//!
//! [`RecordingRemoteLayer`] behaves like a small hosted layer: it stores ids,
//! assigns new ones on insert, and records every call so tests can assert on
//! what the synchronizer did. Failures, rejections, and panics are injected
//! per call.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;

use crate::{
    DeleteResult, EditOutcome, EditResults, FeatureSet, FeedError, FeedSource, IdFilter,
    InsertResult, LayerEndpoint, PassObserver, RemoteError, RemoteLayerClient, RemoteObjectId,
    SyncResult,
};

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(future),
        Err(err) => panic!("failed to build Tokio runtime: {err}"),
    }
}

/// [`FeedSource`] returning a canned snapshot or error.
#[derive(Debug)]
pub struct StubFeedSource {
    response: Result<FeatureSet, FeedError>,
    requests: RefCell<Vec<String>>,
}

impl StubFeedSource {
    /// Answer every fetch with `features`.
    #[must_use]
    pub fn with_features(features: FeatureSet) -> Self {
        Self {
            response: Ok(features),
            requests: RefCell::default(),
        }
    }

    /// Fail every fetch with `error`.
    #[must_use]
    pub fn with_error(error: FeedError) -> Self {
        Self {
            response: Err(error),
            requests: RefCell::default(),
        }
    }

    /// URLs fetched so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl FeedSource for StubFeedSource {
    async fn fetch(&self, url: &str) -> Result<FeatureSet, FeedError> {
        self.requests.borrow_mut().push(url.to_owned());
        self.response.clone()
    }
}

/// Remote operations a test can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    /// [`RemoteLayerClient::list_all_ids`].
    List,
    /// [`RemoteLayerClient::delete_objects`].
    Delete,
    /// [`RemoteLayerClient::insert_features`].
    Insert,
}

/// A call received by [`RecordingRemoteLayer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// Ids were listed.
    List {
        /// Target layer.
        layer: LayerEndpoint,
        /// Filter supplied.
        filter: IdFilter,
    },
    /// Ids were deleted.
    Delete {
        /// Target layer.
        layer: LayerEndpoint,
        /// Ids submitted.
        ids: Vec<RemoteObjectId>,
    },
    /// Features were inserted.
    Insert {
        /// Target layer.
        layer: LayerEndpoint,
        /// Features submitted.
        features: FeatureSet,
    },
}

impl RecordedCall {
    /// Which operation this was.
    #[must_use]
    pub const fn kind(&self) -> RemoteCall {
        match self {
            Self::List { .. } => RemoteCall::List,
            Self::Delete { .. } => RemoteCall::Delete,
            Self::Insert { .. } => RemoteCall::Insert,
        }
    }
}

/// In-memory [`RemoteLayerClient`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingRemoteLayer {
    stored: RefCell<Vec<RemoteObjectId>>,
    inserted: RefCell<Vec<FeatureSet>>,
    next_id: Cell<i64>,
    calls: RefCell<Vec<RecordedCall>>,
    failures: HashMap<RemoteCall, RemoteError>,
    panics: Option<RemoteCall>,
    rejected_deletes: Vec<RemoteObjectId>,
    rejected_inserts: usize,
    cancel_after_list: Option<CancellationToken>,
}

impl RecordingRemoteLayer {
    /// A layer already holding `ids`.
    #[must_use]
    pub fn with_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let stored: Vec<_> = ids.into_iter().map(RemoteObjectId::from_raw).collect();
        let next = stored
            .iter()
            .map(|id| id.get())
            .max()
            .map_or(1, |max| max.saturating_add(1));
        Self {
            stored: RefCell::new(stored),
            next_id: Cell::new(next),
            ..Self::default()
        }
    }

    /// Fail every `call` with `error`.
    #[must_use]
    pub fn failing(mut self, call: RemoteCall, error: RemoteError) -> Self {
        self.failures.insert(call, error);
        self
    }

    /// Panic whenever `call` is made.
    #[must_use]
    pub fn panicking_on(mut self, call: RemoteCall) -> Self {
        self.panics = Some(call);
        self
    }

    /// Report these ids as rejected when asked to delete them.
    #[must_use]
    pub fn rejecting_deletes(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.rejected_deletes = ids.into_iter().map(RemoteObjectId::from_raw).collect();
        self
    }

    /// Reject the first `count` features of each insert.
    #[must_use]
    pub fn rejecting_inserts(mut self, count: usize) -> Self {
        self.rejected_inserts = count;
        self
    }

    /// Cancel `token` as soon as ids have been listed.
    #[must_use]
    pub fn cancelling_after_list(mut self, token: CancellationToken) -> Self {
        self.cancel_after_list = Some(token);
        self
    }

    /// Every call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// Number of calls of the given kind.
    #[must_use]
    pub fn count(&self, call: RemoteCall) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|recorded| recorded.kind() == call)
            .count()
    }

    /// Ids currently held.
    #[must_use]
    pub fn stored_ids(&self) -> Vec<RemoteObjectId> {
        self.stored.borrow().clone()
    }

    /// Feature sets submitted to successful insert calls.
    #[must_use]
    pub fn inserted_batches(&self) -> Vec<FeatureSet> {
        self.inserted.borrow().clone()
    }

    fn enter(&self, call: RemoteCall) -> Result<(), RemoteError> {
        assert!(
            self.panics != Some(call),
            "remote layer double panicked on {call:?}"
        );
        self.failures.get(&call).map_or(Ok(()), |error| Err(error.clone()))
    }

    fn allocate_id(&self) -> RemoteObjectId {
        let id = self.next_id.get();
        self.next_id.set(id.saturating_add(1));
        RemoteObjectId::from_raw(id)
    }
}

#[async_trait(?Send)]
impl RemoteLayerClient for RecordingRemoteLayer {
    async fn list_all_ids(
        &self,
        layer: &LayerEndpoint,
        filter: &IdFilter,
    ) -> Result<Vec<RemoteObjectId>, RemoteError> {
        self.calls.borrow_mut().push(RecordedCall::List {
            layer: layer.clone(),
            filter: filter.clone(),
        });
        self.enter(RemoteCall::List)?;
        if let Some(token) = &self.cancel_after_list {
            token.cancel();
        }
        Ok(self.stored_ids())
    }

    async fn delete_objects(
        &self,
        layer: &LayerEndpoint,
        ids: &[RemoteObjectId],
    ) -> Result<DeleteResult, RemoteError> {
        self.calls.borrow_mut().push(RecordedCall::Delete {
            layer: layer.clone(),
            ids: ids.to_vec(),
        });
        self.enter(RemoteCall::Delete)?;
        let mut stored = self.stored.borrow_mut();
        let outcomes = ids
            .iter()
            .map(|id| {
                if self.rejected_deletes.contains(id) {
                    EditOutcome::rejected(Some(*id), "object is locked")
                } else if let Some(position) = stored.iter().position(|held| held == id) {
                    stored.remove(position);
                    EditOutcome::accepted(*id)
                } else {
                    EditOutcome::rejected(Some(*id), "object does not exist")
                }
            })
            .collect();
        Ok(EditResults::new(outcomes))
    }

    async fn insert_features(
        &self,
        layer: &LayerEndpoint,
        features: &FeatureSet,
    ) -> Result<InsertResult, RemoteError> {
        self.calls.borrow_mut().push(RecordedCall::Insert {
            layer: layer.clone(),
            features: features.clone(),
        });
        self.enter(RemoteCall::Insert)?;
        let outcomes = (0..features.len())
            .map(|index| {
                if index < self.rejected_inserts {
                    EditOutcome::rejected(None, "geometry rejected by layer")
                } else {
                    let id = self.allocate_id();
                    self.stored.borrow_mut().push(id);
                    EditOutcome::accepted(id)
                }
            })
            .collect();
        self.inserted.borrow_mut().push(features.clone());
        Ok(EditResults::new(outcomes))
    }
}

/// [`PassObserver`] that keeps everything it is told.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    snapshots: RefCell<Vec<FeatureSet>>,
    results: RefCell<Vec<SyncResult>>,
}

impl RecordingObserver {
    /// Snapshots received so far.
    #[must_use]
    pub fn snapshots(&self) -> Vec<FeatureSet> {
        self.snapshots.borrow().clone()
    }

    /// Results received so far.
    #[must_use]
    pub fn results(&self) -> Vec<SyncResult> {
        self.results.borrow().clone()
    }
}

impl PassObserver for RecordingObserver {
    fn on_snapshot(&self, _layer: &LayerEndpoint, snapshot: &FeatureSet) {
        self.snapshots.borrow_mut().push(snapshot.clone());
    }

    fn on_result(&self, _layer: &LayerEndpoint, result: &SyncResult) {
        self.results.borrow_mut().push(result.clone());
    }
}

//! Test doubles and fixtures shared by the CLI unit and behaviour tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use trafficsync_core::test_support::{RecordingObserver, RecordingRemoteLayer, StubFeedSource};
use trafficsync_core::{
    AttributeValue, Feature, FeatureSet, LineGeometry, SpatialReference, SyncFailure, SyncResult,
    SyncSummary, Synchronizer,
};

use crate::sync::{ConfiguredPass, PassBuilder, SyncArgs, SyncConfig, SyncPass};
use super::*;

pub(super) const FEED_URL: &str = "http://stadtplan.example/geojson?Thema=19584";
pub(super) const PORTAL_URL: &str = "https://www.arcgis.com";
pub(super) const LAYER_URL: &str =
    "https://services.example/arcgis/rest/services/Verkehr/FeatureServer/0";

/// Arguments with every required option set.
pub(super) fn complete_args() -> SyncArgs {
    SyncArgs {
        feed_url: Some(FEED_URL.to_owned()),
        remote_portal_url: Some(PORTAL_URL.to_owned()),
        remote_app_id: Some("traffic-app".to_owned()),
        remote_client_id: Some("s3cret".to_owned()),
        remote_layer_endpoint: Some(LAYER_URL.to_owned()),
        ..SyncArgs::default()
    }
}

/// CLI flags matching [`complete_args`].
pub(super) fn complete_flags() -> Vec<String> {
    [
        (ARG_FEED_URL, FEED_URL),
        (ARG_REMOTE_PORTAL_URL, PORTAL_URL),
        (ARG_REMOTE_APP_ID, "traffic-app"),
        (ARG_REMOTE_CLIENT_ID, "s3cret"),
        (ARG_REMOTE_LAYER_ENDPOINT, LAYER_URL),
    ]
    .into_iter()
    .flat_map(|(flag, value)| [format!("--{flag}"), value.to_owned()])
    .collect()
}

/// `count` Bonn road segments with local evaluation timestamps.
pub(super) fn traffic_segments(count: usize) -> FeatureSet {
    let evaluated = NaiveDate::from_ymd_opt(2019, 2, 12)
        .and_then(|date| date.and_hms_opt(9, 15, 0))
        .expect("valid timestamp");
    let segment = || {
        let properties = HashMap::from([
            ("auswertezeit".to_owned(), AttributeValue::LocalTime(evaluated)),
            ("geschwindigkeit".to_owned(), AttributeValue::Number(35.0)),
        ]);
        Feature::new(
            LineGeometry::new(
                vec![vec![vec![7.0985, 50.7374], vec![7.1002, 50.7381]]],
                SpatialReference::WGS84,
            ),
            properties,
        )
    };
    FeatureSet::new(std::iter::repeat_with(segment).take(count).collect())
}

/// Builds a pass over in-memory doubles, wired with the resolved config.
pub(super) struct StubPassBuilder {
    collaborators: RefCell<Option<(StubFeedSource, RecordingRemoteLayer)>>,
    observer: Rc<RecordingObserver>,
}

impl StubPassBuilder {
    pub(super) fn new(feed: StubFeedSource, remote: RecordingRemoteLayer) -> Self {
        Self {
            collaborators: RefCell::new(Some((feed, remote))),
            observer: Rc::new(RecordingObserver::default()),
        }
    }

    pub(super) fn observer(&self) -> Rc<RecordingObserver> {
        Rc::clone(&self.observer)
    }
}

impl PassBuilder for StubPassBuilder {
    fn build(&self, config: &SyncConfig) -> Result<Box<dyn SyncPass>, CliError> {
        let (feed, remote) = self
            .collaborators
            .borrow_mut()
            .take()
            .expect("stub builder used once");
        let sync = Synchronizer::new(feed, remote)
            .with_normalizer(config.normalizer())
            .with_observer(Rc::clone(&self.observer));
        Ok(Box::new(ConfiguredPass::new(
            sync,
            config.feed_url.clone(),
            config.layer.clone(),
        )))
    }
}

/// Pass that counts runs and requests shutdown after `stop_after`.
pub(super) struct CountingPass {
    runs: Cell<usize>,
    stop_after: usize,
    shutdown: CancellationToken,
    fail: bool,
}

impl CountingPass {
    pub(super) const fn new(stop_after: usize, shutdown: CancellationToken, fail: bool) -> Self {
        Self {
            runs: Cell::new(0),
            stop_after,
            shutdown,
            fail,
        }
    }

    pub(super) fn runs(&self) -> usize {
        self.runs.get()
    }
}

#[async_trait(?Send)]
impl SyncPass for CountingPass {
    async fn run(&self, _cancel: &CancellationToken) -> SyncResult {
        let runs = self.runs.get() + 1;
        self.runs.set(runs);
        if runs >= self.stop_after {
            self.shutdown.cancel();
        }
        if self.fail {
            SyncResult::Failure(SyncFailure::new(
                trafficsync_core::ErrorKind::Transport,
                "feed unreachable",
            ))
        } else {
            SyncResult::Success(SyncSummary::default())
        }
    }
}

use crate::{FeatureSet, LayerEndpoint, SyncResult};

/// Subscriber notified of each pass's snapshot and outcome.
///
/// Observers run on the pass's task, so they should return quickly. A
/// panicking observer is logged and otherwise ignored.
pub trait PassObserver {
    /// Called with the normalized snapshot before the remote layer is touched.
    fn on_snapshot(&self, layer: &LayerEndpoint, snapshot: &FeatureSet);

    /// Called once with the result of every pass.
    fn on_result(&self, layer: &LayerEndpoint, result: &SyncResult);
}

impl<T: PassObserver + ?Sized> PassObserver for std::rc::Rc<T> {
    fn on_snapshot(&self, layer: &LayerEndpoint, snapshot: &FeatureSet) {
        (**self).on_snapshot(layer, snapshot);
    }

    fn on_result(&self, layer: &LayerEndpoint, result: &SyncResult) {
        (**self).on_result(layer, result);
    }
}

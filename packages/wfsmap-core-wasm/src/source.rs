use std::cell::{Cell, RefCell};

use futures::channel::oneshot;
use geo_types::Rect;
use serde::Serialize;

use crate::feature::{extent_of, Feature};

/// Loading state of a layer's feature source.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Undefined,
    Loading,
    Ready,
    Error,
}

/// In-memory feature set of one layer.
///
/// State transitions fire the pending one-shot subscriptions with the new
/// state. Appending a feature is a change too, except while a load is in
/// flight: subscribers then wait for the load to settle.
pub struct FeatureSource {
    url: String,
    state: Cell<SourceState>,
    features: RefCell<Vec<Feature>>,
    listeners: RefCell<Vec<oneshot::Sender<SourceState>>>,
}

impl FeatureSource {
    pub fn new(url: String) -> Self {
        Self {
            url,
            state: Cell::new(SourceState::Undefined),
            features: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> SourceState {
        self.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state.get() == SourceState::Ready
    }

    pub fn set_state(&self, state: SourceState) {
        self.state.set(state);
        self.notify();
    }

    /// Put loaded features ahead of any added locally and mark the source
    /// ready in one change.
    pub fn load(&self, features: Vec<Feature>) {
        {
            let mut current = self.features.borrow_mut();
            let local = std::mem::replace(&mut *current, features);
            current.extend(local);
        }
        self.set_state(SourceState::Ready);
    }

    pub fn add_feature(&self, feature: Feature) {
        self.features.borrow_mut().push(feature);
        if self.state.get() != SourceState::Loading {
            self.notify();
        }
    }

    pub fn len(&self) -> usize {
        self.features.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.borrow().is_empty()
    }

    pub fn features(&self) -> Vec<Feature> {
        self.features.borrow().clone()
    }

    pub fn with_features<R>(&self, f: impl FnOnce(&[Feature]) -> R) -> R {
        f(&self.features.borrow())
    }

    pub fn extent(&self) -> Option<Rect<f64>> {
        self.with_features(extent_of)
    }

    /// Subscribe to the next change only. The receiver resolves once with the
    /// state current at that change and the subscription is gone afterwards.
    pub fn once_changed(&self) -> oneshot::Receiver<SourceState> {
        let (tx, rx) = oneshot::channel();
        self.listeners.borrow_mut().push(tx);
        rx
    }

    pub fn pending_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn notify(&self) {
        let state = self.state.get();
        // Drain before sending so a woken task may subscribe again.
        let listeners: Vec<_> = self.listeners.borrow_mut().drain(..).collect();
        for tx in listeners {
            let _ = tx.send(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use geo_types::{point, Geometry};

    #[test]
    fn once_listener_fires_a_single_time() {
        let source = FeatureSource::new("http://gs/ows".to_string());
        let first = source.once_changed();
        assert_eq!(source.pending_listeners(), 1);

        source.set_state(SourceState::Loading);
        assert_eq!(first.now_or_never(), Some(Ok(SourceState::Loading)));
        assert_eq!(source.pending_listeners(), 0);

        let second = source.once_changed();
        source.load(vec![Feature::new(Geometry::Point(point! { x: 1.0, y: 1.0 }))]);
        assert_eq!(second.now_or_never(), Some(Ok(SourceState::Ready)));
        assert!(source.is_ready());
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn appending_a_feature_is_a_change() {
        let source = FeatureSource::new(String::new());
        source.set_state(SourceState::Ready);
        let rx = source.once_changed();

        source.add_feature(Feature::new(Geometry::Point(point! { x: 3.0, y: 4.0 })));

        assert_eq!(rx.now_or_never(), Some(Ok(SourceState::Ready)));
        assert_eq!(source.extent().map(|r| r.min().x), Some(3.0));
    }

    #[test]
    fn load_keeps_features_added_while_loading() {
        let source = FeatureSource::new(String::new());
        source.set_state(SourceState::Loading);
        let rx = source.once_changed();

        let mut drawn = Feature::new(Geometry::Point(point! { x: 0.0, y: 0.0 }));
        drawn.id = Some("local".to_string());
        source.add_feature(drawn);
        assert_eq!(source.pending_listeners(), 1);

        let mut loaded = Feature::new(Geometry::Point(point! { x: 5.0, y: 5.0 }));
        loaded.id = Some("Wells.1".to_string());
        source.load(vec![loaded]);

        assert_eq!(rx.now_or_never(), Some(Ok(SourceState::Ready)));
        let ids: Vec<_> = source.features().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, [Some("Wells.1".to_string()), Some("local".to_string())]);
    }
}

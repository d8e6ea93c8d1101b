use geo_types::Rect;

use crate::feature::{extent_to_array, GeometryKind};

/// The rendering side of the viewer. Calls are fire-and-forget: the map
/// library applies them on its own schedule.
pub trait MapView {
    fn set_layer_visible(&self, layer_id: &str, visible: bool);

    /// Animate the view so `extent` is framed.
    fn fit_extent(&self, extent: &Rect<f64>, duration_ms: u32);

    /// Start a single-geometry draw interaction on a layer.
    fn activate_draw(&self, layer_id: &str, kind: GeometryKind, session_id: &str);

    fn deactivate_draw(&self);

    /// Replace the rendered features of a layer with a GeoJSON collection.
    fn show_features(&self, layer_id: &str, feature_collection: &str);
}

/// [`MapView`] backed by the page's `wasmJsHelpers`.
#[derive(Default, Clone, Copy)]
pub struct JsMapView;

impl MapView for JsMapView {
    fn set_layer_visible(&self, layer_id: &str, visible: bool) {
        crate::set_layer_visible(layer_id, visible);
    }

    fn fit_extent(&self, extent: &Rect<f64>, duration_ms: u32) {
        crate::fit_extent(&extent_to_array(extent), duration_ms);
    }

    fn activate_draw(&self, layer_id: &str, kind: GeometryKind, session_id: &str) {
        crate::activate_draw(layer_id, kind.as_str(), session_id);
    }

    fn deactivate_draw(&self) {
        crate::deactivate_draw();
    }

    fn show_features(&self, layer_id: &str, feature_collection: &str) {
        crate::set_layer_features(layer_id, feature_collection);
    }
}

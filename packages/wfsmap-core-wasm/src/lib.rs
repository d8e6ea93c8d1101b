use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use log::{info, LevelFilter};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

// Logging backend for the browser console
pub mod console;
pub mod error;
// Viewer configuration and built-in layer set
pub mod config;
pub mod style;
// Feature model, GeoJSON decoding and extents
pub mod feature;
pub mod source;
pub mod registry;
// WFS requests and GML geometry encoding
pub mod gml;
pub mod wfs;
// Seams to the page
pub mod transport;
pub mod view;
pub mod attributes;
pub mod viewer;

#[cfg(test)]
mod test_support;

use attributes::JsAttributeGrid;
use config::ViewerConfig;
use error::ViewerError;
use feature::{extent_to_array, parse_geometry, Feature};
use transport::JsTransport;
use view::JsMapView;
use viewer::{DrawSession, Viewer};

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

// Helpers the page installs on `window.wasmJsHelpers` before loading the module.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = fetchText, catch)]
    pub fn fetch_text(url: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = postXml, catch)]
    pub fn post_xml(url: &str, body: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = setLayerVisible)]
    pub fn set_layer_visible(layer_id: &str, visible: bool);

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = fitExtent)]
    pub fn fit_extent(extent: &[f64], duration_ms: u32);

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = activateDraw)]
    pub fn activate_draw(layer_id: &str, kind: &str, session_id: &str);

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = deactivateDraw)]
    pub fn deactivate_draw();

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = setLayerFeatures)]
    pub fn set_layer_features(layer_id: &str, feature_collection: &str);

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = showAttributeGrid)]
    pub fn show_attribute_grid(table: JsValue);

    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = hideAttributeGrid)]
    pub fn hide_attribute_grid();
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console::init(LevelFilter::Info);
        info!("WASM module initialized successfully");
    });
}

type PageViewer = Viewer<JsTransport, JsMapView, JsAttributeGrid>;

/// The viewer as seen from the page.
#[wasm_bindgen]
pub struct MapViewer {
    inner: Rc<PageViewer>,
    pending_draw: RefCell<Option<DrawSession>>,
}

#[wasm_bindgen]
impl MapViewer {
    /// `config` may be `undefined` to use the built-in layer set.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<MapViewer, JsValue> {
        let config: ViewerConfig = if config.is_undefined() || config.is_null() {
            ViewerConfig::default()
        } else {
            from_value(config)?
        };
        let inner = Viewer::new(config, JsTransport, JsMapView, JsAttributeGrid)?;
        Ok(MapViewer {
            inner: Rc::new(inner),
            pending_draw: RefCell::new(None),
        })
    }

    #[wasm_bindgen(js_name = viewOptions)]
    pub fn view_options(&self) -> Result<JsValue, JsValue> {
        Ok(to_value(&self.inner.config().view_options())?)
    }

    #[wasm_bindgen(js_name = layerDescriptors)]
    pub fn layer_descriptors(&self) -> Result<JsValue, JsValue> {
        Ok(to_value(&self.inner.layer_descriptors())?)
    }

    #[wasm_bindgen(js_name = loadLayer)]
    pub fn load_layer(&self, layer_id: String) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            inner.load_layer(&layer_id).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves with the number of layers that loaded.
    #[wasm_bindgen(js_name = loadAll)]
    pub fn load_all(&self) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let loaded = inner
                .load_all()
                .await
                .iter()
                .filter(|(_, result)| result.is_ok())
                .count();
            Ok(JsValue::from(loaded as u32))
        })
    }

    /// Returns whether the visibility changed.
    #[wasm_bindgen(js_name = setVisibility)]
    pub fn set_visibility(&self, layer_id: &str, visible: bool) -> Result<bool, JsValue> {
        Ok(self.inner.set_visibility(layer_id, visible)?)
    }

    /// Resolves with `[minx, miny, maxx, maxy]`, or `null` when nothing was framed.
    #[wasm_bindgen(js_name = zoomToExtent)]
    pub fn zoom_to_extent(&self, layer_id: String) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            match inner.zoom_to_extent(&layer_id).await? {
                Some(extent) => Ok(to_value(&extent_to_array(&extent))?),
                None => Ok(JsValue::NULL),
            }
        })
    }

    /// Returns the id of the new draw session.
    #[wasm_bindgen(js_name = beginDraw)]
    pub fn begin_draw(&self, layer_id: &str) -> Result<String, JsValue> {
        let session = self.inner.begin_draw(layer_id)?;
        let id = session.id().to_string();
        *self.pending_draw.borrow_mut() = Some(session);
        Ok(id)
    }

    /// Finish the session with the drawn GeoJSON geometry and submit it.
    /// Resolves with the transaction summary.
    #[wasm_bindgen(js_name = completeDraw)]
    pub fn complete_draw(&self, session_id: &str, geometry: Option<String>) -> Result<Promise, JsValue> {
        let session = self.take_session(session_id)?;
        let geometry = match geometry.as_deref().map(parse_geometry).transpose() {
            Ok(geometry) => geometry,
            Err(err) => {
                self.inner.cancel_draw(session)?;
                return Err(err.into());
            }
        };

        let inner = Rc::clone(&self.inner);
        Ok(future_to_promise(async move {
            let summary = inner.complete_draw(session, geometry).await?;
            Ok(to_value(&summary)?)
        }))
    }

    #[wasm_bindgen(js_name = cancelDraw)]
    pub fn cancel_draw(&self, session_id: &str) -> Result<(), JsValue> {
        let session = self.take_session(session_id)?;
        Ok(self.inner.cancel_draw(session)?)
    }

    /// Submit a GeoJSON geometry to a layer without drawing it first.
    #[wasm_bindgen(js_name = submitFeature)]
    pub fn submit_feature(&self, layer_id: String, geometry: Option<String>) -> Result<Promise, JsValue> {
        let feature = match geometry {
            Some(json) => Feature::new(parse_geometry(&json)?),
            None => Feature::without_geometry(),
        };
        let inner = Rc::clone(&self.inner);
        Ok(future_to_promise(async move {
            let summary = inner.submit_feature(&layer_id, &feature).await?;
            Ok(to_value(&summary)?)
        }))
    }

    #[wasm_bindgen(js_name = showAttributes)]
    pub fn show_attributes(&self, layer_id: &str) -> Result<JsValue, JsValue> {
        let table = self.inner.show_attributes(layer_id)?;
        Ok(JsValue::from(table.rows.len() as u32))
    }

    #[wasm_bindgen(js_name = hideAttributes)]
    pub fn hide_attributes(&self) {
        self.inner.hide_attributes();
    }
}

impl MapViewer {
    fn take_session(&self, session_id: &str) -> Result<DrawSession, ViewerError> {
        let mut pending = self.pending_draw.borrow_mut();
        match pending.take() {
            Some(session) if session.id().to_string() == session_id => Ok(session),
            other => {
                *pending = other;
                Err(ViewerError::StaleDrawSession(session_id.to_string()))
            }
        }
    }
}

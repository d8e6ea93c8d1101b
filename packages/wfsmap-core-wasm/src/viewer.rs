use std::cell::RefCell;
use std::rc::Rc;

use geo_types::{Geometry, Rect};
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::attributes::{attribute_table, AttributeGrid, AttributeTable, EMPTY_LAYER_MESSAGE};
use crate::config::{ViewerConfig, FIT_DURATION_MS};
use crate::error::{Result, ViewerError};
use crate::feature::{
    decode_feature_collection, encode_feature_collection, geometry_type_name, Feature,
    GeometryKind,
};
use crate::gml;
use crate::registry::{Layer, LayerDescriptor, LayerRegistry};
use crate::source::SourceState;
use crate::transport::Transport;
use crate::view::MapView;
use crate::wfs::{self, TransactionSummary};

/// One in-progress drawing gesture on one layer.
///
/// Created by [`Viewer::begin_draw`] and consumed by
/// [`Viewer::complete_draw`] or [`Viewer::cancel_draw`].
#[derive(Debug, PartialEq)]
pub struct DrawSession {
    id: Uuid,
    layer_id: String,
    kind: GeometryKind,
}

impl DrawSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }
}

/// The viewer core: layer registry plus the operations the page triggers.
pub struct Viewer<T, V, G> {
    config: ViewerConfig,
    registry: LayerRegistry,
    transport: T,
    view: V,
    grid: G,
    active_draw: RefCell<Option<(Uuid, String)>>,
}

impl<T, V, G> Viewer<T, V, G>
where
    T: Transport,
    V: MapView,
    G: AttributeGrid,
{
    pub fn new(config: ViewerConfig, transport: T, view: V, grid: G) -> Result<Self> {
        let registry = LayerRegistry::from_config(&config)?;
        info!(
            "Viewer configured with {} layers on {}",
            registry.len(),
            config.server.base_url
        );
        Ok(Self {
            config,
            registry,
            transport,
            view,
            grid,
            active_draw: RefCell::new(None),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn layer_descriptors(&self) -> Vec<LayerDescriptor> {
        self.registry.layers().map(|l| l.descriptor()).collect()
    }

    fn layer(&self, layer_id: &str) -> Result<Rc<Layer>> {
        self.registry.resolve(layer_id).ok_or_else(|| {
            error!("Layer '{}' is not configured", layer_id);
            ViewerError::UnknownLayer(layer_id.to_string())
        })
    }

    /// Fetch a layer's features once. Later calls are no-ops.
    pub async fn load_layer(&self, layer_id: &str) -> Result<()> {
        let layer = self.layer(layer_id)?;
        let source = layer.source();
        if source.state() != SourceState::Undefined {
            debug!("Layer '{}' already {:?}, not fetching", layer_id, source.state());
            return Ok(());
        }

        source.set_state(SourceState::Loading);
        let fetched = match self.transport.get_text(source.url()).await {
            Ok(body) => decode_feature_collection(&body),
            Err(err) => Err(err),
        };

        match fetched {
            Ok(features) => {
                info!("Loaded {} features for layer '{}'", features.len(), layer_id);
                source.load(features);
                self.refresh_layer(&layer);
                Ok(())
            }
            Err(err) => {
                error!("Failed to load layer '{}': {}", layer_id, err);
                source.set_state(SourceState::Error);
                Err(err)
            }
        }
    }

    /// Load every layer in order; one failing layer does not stop the rest.
    pub async fn load_all(&self) -> Vec<(String, Result<()>)> {
        let mut results = Vec::with_capacity(self.registry.len());
        for id in self.registry.ids() {
            let result = self.load_layer(&id).await;
            results.push((id, result));
        }
        results
    }

    fn refresh_layer(&self, layer: &Layer) {
        match layer.source().with_features(encode_feature_collection) {
            Ok(json) => self.view.show_features(&layer.id, &json),
            Err(err) => warn!("Could not encode features of layer '{}': {}", layer.id, err),
        }
    }

    /// Returns whether the visibility actually changed. The view only hears
    /// about real changes.
    pub fn set_visibility(&self, layer_id: &str, visible: bool) -> Result<bool> {
        let layer = self.layer(layer_id)?;
        let changed = layer.set_visible(visible);
        if changed {
            debug!("Layer '{}' visible={}", layer_id, visible);
            self.view.set_layer_visible(layer_id, visible);
        }
        Ok(changed)
    }

    /// Frame the extent of a layer's loaded features.
    ///
    /// A ready source is framed within the first poll. Otherwise this waits
    /// for exactly one state change of the source and frames only if that
    /// change left it ready. There is no timeout: a source that never changes
    /// keeps the future pending.
    pub async fn zoom_to_extent(&self, layer_id: &str) -> Result<Option<Rect<f64>>> {
        let layer = self.layer(layer_id)?;
        let source = layer.source();

        if !source.is_ready() {
            debug!("Layer '{}' not ready, waiting for its next change", layer_id);
            let state = source
                .once_changed()
                .await
                .map_err(|_| ViewerError::SourceClosed(layer_id.to_string()))?;
            if state != SourceState::Ready {
                debug!("Layer '{}' changed to {:?}, not zooming", layer_id, state);
                return Ok(None);
            }
        }

        match source.extent() {
            Some(extent) => {
                self.view.fit_extent(&extent, FIT_DURATION_MS);
                Ok(Some(extent))
            }
            None => {
                warn!("Layer '{}' has no geometries to zoom to", layer_id);
                Ok(None)
            }
        }
    }

    pub fn active_draw_layer(&self) -> Option<String> {
        self.active_draw.borrow().as_ref().map(|(_, layer)| layer.clone())
    }

    /// Open a draw session on a layer. Only one session may be active.
    pub fn begin_draw(&self, layer_id: &str) -> Result<DrawSession> {
        let layer = self.layer(layer_id)?;

        if let Some((_, active_layer)) = self.active_draw.borrow().as_ref() {
            warn!(
                "Draw requested on '{}' while a session on '{}' is open",
                layer_id, active_layer
            );
            return Err(ViewerError::DrawSessionActive(active_layer.clone()));
        }

        let session = DrawSession {
            id: Uuid::new_v4(),
            layer_id: layer.id.clone(),
            kind: layer.geometry_kind,
        };
        *self.active_draw.borrow_mut() = Some((session.id, session.layer_id.clone()));
        self.view
            .activate_draw(&layer.id, session.kind, &session.id.to_string());
        info!("Drawing {} on layer '{}'", session.kind, layer.id);
        Ok(session)
    }

    fn end_session(&self, session: &DrawSession) -> Result<()> {
        let is_active = matches!(
            self.active_draw.borrow().as_ref(),
            Some((id, _)) if *id == session.id
        );
        if !is_active {
            warn!("Draw session {} is not active", session.id);
            return Err(ViewerError::StaleDrawSession(session.id.to_string()));
        }

        *self.active_draw.borrow_mut() = None;
        self.view.deactivate_draw();
        Ok(())
    }

    /// Abandon a session without submitting anything.
    pub fn cancel_draw(&self, session: DrawSession) -> Result<()> {
        self.end_session(&session)?;
        debug!("Draw session {} cancelled", session.id);
        Ok(())
    }

    /// Completion of the drawing gesture.
    ///
    /// A matching geometry is kept in the layer's local source before it is
    /// submitted and stays there whatever the server answers.
    pub async fn complete_draw(
        &self,
        session: DrawSession,
        geometry: Option<Geometry<f64>>,
    ) -> Result<TransactionSummary> {
        self.end_session(&session)?;

        let feature = match geometry {
            Some(geometry) => {
                if GeometryKind::of(&geometry) != Some(session.kind) {
                    let actual = geometry_type_name(&geometry).to_string();
                    error!(
                        "Layer '{}' accepts {} but the drawing produced {}",
                        session.layer_id, session.kind, actual
                    );
                    return Err(ViewerError::GeometryKindMismatch {
                        layer: session.layer_id,
                        expected: session.kind,
                        actual,
                    });
                }
                let feature = Feature::new(geometry);
                let layer = self.layer(&session.layer_id)?;
                layer.source().add_feature(feature.clone());
                self.refresh_layer(&layer);
                feature
            }
            None => Feature::without_geometry(),
        };

        self.submit_feature(&session.layer_id, &feature).await
    }

    /// Send one feature to the server as a transactional insert.
    pub async fn submit_feature(
        &self,
        layer_id: &str,
        feature: &Feature,
    ) -> Result<TransactionSummary> {
        let layer = self.layer(layer_id)?;
        let Some(geometry) = feature.geometry.as_ref() else {
            error!("Refusing to submit a feature without geometry to '{}'", layer_id);
            return Err(ViewerError::MissingGeometry);
        };

        let gml = gml::encode_geometry(geometry, &self.config.crs.code).map_err(|err| {
            error!("Cannot encode geometry for '{}': {}", layer_id, err);
            err
        })?;
        let body = wfs::insert_transaction(
            &self.config.server,
            &layer.type_name,
            &layer.geometry_name,
            &gml,
            &feature.properties,
        )?;

        let endpoint = self.config.server.transaction_endpoint();
        debug!("Posting insert of {} to {}", layer.type_name, endpoint);
        let response = self.transport.post_xml(endpoint, &body).await.map_err(|err| {
            error!("Insert into '{}' failed: {}", layer.type_name, err);
            err
        })?;

        match wfs::parse_transaction_response(&response) {
            Ok(summary) => {
                info!(
                    "Inserted {} feature(s) into '{}': {:?}",
                    summary.total_inserted, layer.type_name, summary.feature_ids
                );
                Ok(summary)
            }
            Err(err) => {
                error!("Insert into '{}' rejected: {} ({})", layer.type_name, err, response);
                Err(err)
            }
        }
    }

    pub fn show_attributes(&self, layer_id: &str) -> Result<AttributeTable> {
        let layer = self.layer(layer_id)?;
        match attribute_table(&layer) {
            Ok(table) => {
                self.grid.show_table(&table);
                Ok(table)
            }
            Err(err @ ViewerError::EmptyLayer(_)) => {
                self.grid.alert(EMPTY_LAYER_MESSAGE);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub fn hide_attributes(&self) {
        self.grid.hide_table();
    }
}

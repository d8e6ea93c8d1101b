use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::feature::GeometryKind;
use crate::source::FeatureSource;
use crate::style::LayerStyle;
use crate::wfs;

/// A configured vector layer bound to one feature type on the server.
pub struct Layer {
    pub id: String,
    pub name: String,
    pub type_name: String,
    pub geometry_kind: GeometryKind,
    pub geometry_name: String,
    pub style: LayerStyle,
    visible: Cell<bool>,
    source: FeatureSource,
}

/// What the page needs to build the sidebar control of a layer.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    pub id: String,
    pub name: String,
    pub geometry_kind: GeometryKind,
    pub style: LayerStyle,
    pub visible: bool,
}

impl Layer {
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Returns whether the flag actually changed.
    pub fn set_visible(&self, visible: bool) -> bool {
        self.visible.replace(visible) != visible
    }

    pub fn source(&self) -> &FeatureSource {
        &self.source
    }

    pub fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            geometry_kind: self.geometry_kind,
            style: self.style.clone(),
            visible: self.is_visible(),
        }
    }
}

/// Ordered set of layers with lookup by id.
pub struct LayerRegistry {
    layers: Vec<Rc<Layer>>,
    index: HashMap<String, usize>,
}

impl LayerRegistry {
    pub fn from_config(config: &ViewerConfig) -> Result<Self> {
        config.validate()?;

        let mut layers = Vec::with_capacity(config.layers.len());
        let mut index = HashMap::with_capacity(config.layers.len());
        for layer in &config.layers {
            let url = wfs::get_feature_url(&config.server, &config.crs.code, &layer.type_name);
            index.insert(layer.id.clone(), layers.len());
            layers.push(Rc::new(Layer {
                id: layer.id.clone(),
                name: layer.name.clone(),
                type_name: layer.type_name.clone(),
                geometry_kind: layer.geometry_kind,
                geometry_name: layer.geometry_name.clone(),
                style: layer.style.clone(),
                visible: Cell::new(layer.visible),
                source: FeatureSource::new(url),
            }));
        }

        Ok(Self { layers, index })
    }

    pub fn resolve(&self, layer_id: &str) -> Option<Rc<Layer>> {
        self.index.get(layer_id).map(|&i| Rc::clone(&self.layers[i]))
    }

    pub fn layers(&self) -> impl Iterator<Item = &Rc<Layer>> {
        self.layers.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use crate::source::SourceState;

    #[test]
    fn resolves_every_configured_layer() {
        let config = ViewerConfig::default();
        let registry = LayerRegistry::from_config(&config).unwrap();

        assert_eq!(registry.len(), config.layers.len());
        for layer in &config.layers {
            let resolved = registry.resolve(&layer.id).unwrap();
            assert_eq!(resolved.id, layer.id);
            assert_eq!(resolved.geometry_kind, layer.geometry_kind);
            assert_eq!(resolved.type_name, layer.type_name);
        }
    }

    #[test]
    fn unknown_id_has_no_side_effects() {
        let registry = LayerRegistry::from_config(&ViewerConfig::default()).unwrap();
        assert!(registry.resolve("nope").is_none());
        for layer in registry.layers() {
            assert!(layer.is_visible());
            assert_eq!(layer.source().state(), SourceState::Undefined);
        }
    }

    #[test]
    fn keeps_configuration_order_and_binds_sources() {
        let mut config = ViewerConfig::default();
        config.layers = vec![
            LayerConfig::new("b", "B", "Beta", GeometryKind::Point),
            LayerConfig::new("a", "A", "Alpha", GeometryKind::LineString),
        ];
        let registry = LayerRegistry::from_config(&config).unwrap();

        assert_eq!(registry.ids(), ["b", "a"]);
        let alpha = registry.resolve("a").unwrap();
        assert!(alpha.source().url().contains("typeName=CreateData%3AAlpha"));
    }

    #[test]
    fn visibility_reports_changes_only() {
        let registry = LayerRegistry::from_config(&ViewerConfig::default()).unwrap();
        let layer = registry.resolve("topoLineLayer").unwrap();

        assert!(!layer.set_visible(true));
        assert!(layer.set_visible(false));
        assert!(!layer.set_visible(false));
        assert!(!layer.descriptor().visible);
    }
}

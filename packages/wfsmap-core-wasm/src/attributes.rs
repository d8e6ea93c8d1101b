use log::warn;
use serde::Serialize;
use serde_json::{Map, Value};
use serde_wasm_bindgen::Serializer;

use crate::error::{Result, ViewerError};
use crate::feature::GEOMETRY_KEY;
use crate::registry::Layer;

pub const EMPTY_LAYER_MESSAGE: &str = "No features available for this layer.";

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Read-only key/value view of a layer's features.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeTable {
    pub layer_id: String,
    pub fields: Vec<Field>,
    pub rows: Vec<Map<String, Value>>,
}

/// Build the table for `layer`. Columns come from the first feature.
pub fn attribute_table(layer: &Layer) -> Result<AttributeTable> {
    layer.source().with_features(|features| {
        let first = features
            .first()
            .ok_or_else(|| ViewerError::EmptyLayer(layer.id.clone()))?;

        let fields = first
            .properties
            .keys()
            .filter(|key| key.as_str() != GEOMETRY_KEY)
            .map(|key| Field {
                name: key.clone(),
                kind: "text".to_string(),
            })
            .collect();
        let rows = features.iter().map(|f| f.properties.clone()).collect();

        Ok(AttributeTable {
            layer_id: layer.id.clone(),
            fields,
            rows,
        })
    })
}

/// The tabular widget on the page.
pub trait AttributeGrid {
    fn show_table(&self, table: &AttributeTable);

    fn hide_table(&self);

    /// Blocking notice for the user.
    fn alert(&self, message: &str);
}

/// [`AttributeGrid`] backed by the page's `wasmJsHelpers` and `window.alert`.
#[derive(Default, Clone, Copy)]
pub struct JsAttributeGrid;

impl AttributeGrid for JsAttributeGrid {
    fn show_table(&self, table: &AttributeTable) {
        // Maps must arrive as plain objects for the grid to read them.
        let serializer = Serializer::json_compatible();
        match table.serialize(&serializer) {
            Ok(value) => crate::show_attribute_grid(value),
            Err(err) => warn!("Could not hand attribute table to the page: {}", err),
        }
    }

    fn hide_table(&self) {
        crate::hide_attribute_grid();
    }

    fn alert(&self, message: &str) {
        match web_sys::window() {
            Some(window) => {
                if let Err(err) = window.alert_with_message(message) {
                    warn!("window.alert failed: {:?}", err);
                }
            }
            None => warn!("No window to alert on: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerConfig, ViewerConfig};
    use crate::feature::{Feature, GeometryKind};
    use crate::registry::LayerRegistry;
    use geo_types::{point, Geometry};
    use serde_json::json;

    fn registry() -> LayerRegistry {
        let mut config = ViewerConfig::default();
        config.layers = vec![LayerConfig::new("wells", "Wells", "Topo_Point", GeometryKind::Point)];
        LayerRegistry::from_config(&config).unwrap()
    }

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_layer_is_reported() {
        let registry = registry();
        let layer = registry.resolve("wells").unwrap();
        assert_eq!(
            attribute_table(&layer),
            Err(ViewerError::EmptyLayer("wells".to_string()))
        );
    }

    #[test]
    fn fields_come_from_first_feature() {
        let registry = registry();
        let layer = registry.resolve("wells").unwrap();
        layer.source().load(vec![
            Feature::new(Geometry::Point(point! { x: 0.0, y: 0.0 }))
                .with_properties(props(json!({"depth": 12, "name": "A", "geometry": "x"}))),
            Feature::new(Geometry::Point(point! { x: 1.0, y: 1.0 }))
                .with_properties(props(json!({"name": "B", "owner": "C"}))),
        ]);

        let table = attribute_table(&layer).unwrap();
        let names: Vec<&str> = table.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["depth", "name"]);
        assert!(table.fields.iter().all(|f| f.kind == "text"));
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["owner"], "C");
    }
}

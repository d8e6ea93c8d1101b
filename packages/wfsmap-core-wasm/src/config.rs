use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::feature::GeometryKind;
use crate::style::{LayerStyle, Stroke};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/geoserver/CreateData/ows";
pub const DEFAULT_WORKSPACE: &str = "CreateData";
pub const DEFAULT_NAMESPACE_URI: &str = "http://CreateData";
pub const DEFAULT_CRS: &str = "EPSG:32638";
pub const DEFAULT_PROJ_DEFINITION: &str = "+proj=utm +zone=38 +datum=WGS84 +units=m +no_defs";
pub const DEFAULT_MAX_FEATURES: u32 = 50;
pub const DEFAULT_GEOMETRY_NAME: &str = "the_geom";

/// Duration of the view animation when framing a layer.
pub const FIT_DURATION_MS: u32 = 1000;

/// Everything the viewer needs to know up front. The built-in default is the
/// CreateData workspace with its four layers; the page may pass an override
/// object with the same shape.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub server: ServerConfig,
    pub crs: CrsConfig,
    pub view: InitialView,
    pub layers: Vec<LayerConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub base_url: String,
    /// Transactions go to `base_url` unless this is set.
    pub transaction_url: Option<String>,
    pub workspace: String,
    pub namespace_uri: String,
    pub max_features: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CrsConfig {
    pub code: String,
    /// proj4 definition the page registers before building its map.
    pub proj_definition: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct InitialView {
    pub base_layer: String,
    /// Longitude/latitude; the page projects it into the map CRS.
    pub center_lon_lat: [f64; 2],
    pub zoom: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    pub id: String,
    pub name: String,
    /// Unqualified feature type name; the workspace prefix is added on request.
    pub type_name: String,
    pub geometry_kind: GeometryKind,
    #[serde(default = "default_geometry_name")]
    pub geometry_name: String,
    #[serde(default)]
    pub style: LayerStyle,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_geometry_name() -> String {
    DEFAULT_GEOMETRY_NAME.to_string()
}

fn default_visible() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            transaction_url: None,
            workspace: DEFAULT_WORKSPACE.to_string(),
            namespace_uri: DEFAULT_NAMESPACE_URI.to_string(),
            max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

impl Default for CrsConfig {
    fn default() -> Self {
        Self {
            code: DEFAULT_CRS.to_string(),
            proj_definition: DEFAULT_PROJ_DEFINITION.to_string(),
        }
    }
}

impl Default for InitialView {
    fn default() -> Self {
        Self {
            base_layer: "osm".to_string(),
            center_lon_lat: [45.0, 42.0],
            zoom: 12.0,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            crs: CrsConfig::default(),
            view: InitialView::default(),
            layers: default_layers(),
        }
    }
}

/// Map bootstrap values for the page.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewOptions {
    pub base_layer: String,
    pub projection: String,
    pub proj_definition: String,
    pub center_lon_lat: [f64; 2],
    pub zoom: f64,
}

impl ServerConfig {
    pub fn transaction_endpoint(&self) -> &str {
        self.transaction_url.as_deref().unwrap_or(&self.base_url)
    }
}

impl LayerConfig {
    pub fn new(id: &str, name: &str, type_name: &str, geometry_kind: GeometryKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            type_name: type_name.to_string(),
            geometry_kind,
            geometry_name: default_geometry_name(),
            style: LayerStyle::default(),
            visible: true,
        }
    }

    pub fn with_style(mut self, style: LayerStyle) -> Self {
        self.style = style;
        self
    }
}

fn default_layers() -> Vec<LayerConfig> {
    vec![
        LayerConfig::new("nakvetiLayer", "Nakveti Layer", "NakveTi", GeometryKind::Polygon)
            .with_style(LayerStyle::outline("blue", 1.5)),
        LayerConfig::new("shenobaLayer", "Shenoba Layer", "Senoba", GeometryKind::Polygon)
            .with_style(LayerStyle::hatched(Stroke::new("black", 1.5), "#422006", 1.5, 8)),
        LayerConfig::new("topoLineLayer", "Topo Line Layer", "Topo_Line", GeometryKind::LineString)
            .with_style(LayerStyle::outline("red", 2.0)),
        LayerConfig::new("topoPointLayer", "Topo Point Layer", "Topo_Point", GeometryKind::Point)
            .with_style(LayerStyle::marker(4.0, "rgba(0, 255, 0, 0.7)", Stroke::new("black", 2.0))),
    ]
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ViewerConfig =
            serde_json::from_str(json).map_err(|e| ViewerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            base_layer: self.view.base_layer.clone(),
            projection: self.crs.code.clone(),
            proj_definition: self.crs.proj_definition.clone(),
            center_lon_lat: self.view.center_lon_lat,
            zoom: self.view.zoom,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.is_empty() {
            return Err(ViewerError::Config("server base URL is empty".to_string()));
        }
        if self.server.workspace.is_empty() {
            return Err(ViewerError::Config("workspace is empty".to_string()));
        }
        if self.crs.code.is_empty() {
            return Err(ViewerError::Config("CRS code is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for layer in &self.layers {
            if layer.id.is_empty() {
                return Err(ViewerError::Config("layer with empty id".to_string()));
            }
            if layer.type_name.is_empty() {
                return Err(ViewerError::Config(format!(
                    "layer '{}' has no type name",
                    layer.id
                )));
            }
            if !seen.insert(layer.id.as_str()) {
                return Err(ViewerError::Config(format!(
                    "duplicate layer id '{}'",
                    layer.id
                )));
            }
        }
        Ok(())
    }
}

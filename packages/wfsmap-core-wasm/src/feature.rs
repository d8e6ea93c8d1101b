use std::fmt;

use geo::BoundingRect;
use geo_types::{coord, Geometry, Rect};
use geozero::geojson::GeoJson;
use geozero::{ToGeo, ToJson};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ViewerError};

/// The property key that holds the geometry in GeoJSON-derived property maps.
pub const GEOMETRY_KEY: &str = "geometry";

/// Geometry kinds a layer can be declared with.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    /// Classify a geometry. Multi-geometries and collections have no kind:
    /// a draw session never produces them.
    pub fn of(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Point(_) => Some(GeometryKind::Point),
            Geometry::Line(_) | Geometry::LineString(_) => Some(GeometryKind::LineString),
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
                Some(GeometryKind::Polygon)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// A single geographic entity held by a layer's source.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    /// Server-assigned id such as `NakveTi.3`. Drawn features have none.
    pub id: Option<String>,
    pub geometry: Option<Geometry<f64>>,
    /// Never contains [`GEOMETRY_KEY`].
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
            properties: Map::new(),
        }
    }

    pub fn without_geometry() -> Self {
        Self {
            id: None,
            geometry: None,
            properties: Map::new(),
        }
    }

    pub fn with_properties(mut self, mut properties: Map<String, Value>) -> Self {
        properties.remove(GEOMETRY_KEY);
        self.properties = properties;
        self
    }

    pub fn kind(&self) -> Option<GeometryKind> {
        self.geometry.as_ref().and_then(GeometryKind::of)
    }
}

// Wire shape of a GetFeature response with outputFormat=application/json.
#[derive(Deserialize)]
struct RawFeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Parse a bare GeoJSON geometry object into geo-types.
pub fn parse_geometry(json: &str) -> Result<Geometry<f64>> {
    Ok(GeoJson(json).to_geo()?)
}

/// Decode a GeoJSON FeatureCollection document.
pub fn decode_feature_collection(json: &str) -> Result<Vec<Feature>> {
    let raw: RawFeatureCollection = serde_json::from_str(json)?;
    if raw.kind != "FeatureCollection" {
        return Err(ViewerError::Decode(format!(
            "expected a FeatureCollection, got '{}'",
            raw.kind
        )));
    }

    raw.features
        .into_iter()
        .map(|feature| {
            let geometry = match feature.geometry {
                Some(value) => Some(parse_geometry(&value.to_string())?),
                None => None,
            };
            let id = feature.id.map(|id| match id {
                Value::String(s) => s,
                other => other.to_string(),
            });
            let mut properties = feature.properties.unwrap_or_default();
            properties.remove(GEOMETRY_KEY);
            Ok(Feature {
                id,
                geometry,
                properties,
            })
        })
        .collect()
}

/// Encode features as a GeoJSON FeatureCollection for the page.
pub fn encode_feature_collection(features: &[Feature]) -> Result<String> {
    let mut encoded = Vec::with_capacity(features.len());
    for feature in features {
        let geometry = match &feature.geometry {
            Some(geometry) => serde_json::from_str::<Value>(&geometry.to_json()?)?,
            None => Value::Null,
        };
        let mut object = Map::new();
        object.insert("type".to_string(), Value::from("Feature"));
        if let Some(id) = &feature.id {
            object.insert("id".to_string(), Value::from(id.as_str()));
        }
        object.insert(GEOMETRY_KEY.to_string(), geometry);
        object.insert(
            "properties".to_string(),
            Value::Object(feature.properties.clone()),
        );
        encoded.push(Value::Object(object));
    }

    let collection = serde_json::json!({
        "type": "FeatureCollection",
        "features": encoded,
    });
    Ok(collection.to_string())
}

/// Minimal rectangle covering every feature geometry, if there is any.
pub fn extent_of(features: &[Feature]) -> Option<Rect<f64>> {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .filter_map(|g| g.bounding_rect())
        .reduce(|acc, rect| {
            Rect::new(
                coord! { x: acc.min().x.min(rect.min().x), y: acc.min().y.min(rect.min().y) },
                coord! { x: acc.max().x.max(rect.max().x), y: acc.max().y.max(rect.max().y) },
            )
        })
}

/// `[minx, miny, maxx, maxy]`, the order the page's view expects.
pub fn extent_to_array(extent: &Rect<f64>) -> [f64; 4] {
    [extent.min().x, extent.min().y, extent.max().x, extent.max().y]
}

use serde::{Deserialize, Serialize};

// Visual attributes of a layer. These are handed to the page as-is; the
// rendering library builds its own style objects from them.

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Fill {
    Solid {
        color: String,
    },
    /// Repeating diagonal lines drawn on a square canvas tile.
    #[serde(rename_all = "camelCase")]
    Hatch {
        color: String,
        line_width: f64,
        tile_size: u32,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CircleMarker {
    pub radius: f64,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct LayerStyle {
    pub stroke: Option<Stroke>,
    pub fill: Option<Fill>,
    pub circle: Option<CircleMarker>,
}

impl Stroke {
    pub fn new(color: &str, width: f64) -> Self {
        Self {
            color: color.to_string(),
            width,
        }
    }
}

impl LayerStyle {
    pub fn outline(color: &str, width: f64) -> Self {
        Self {
            stroke: Some(Stroke::new(color, width)),
            ..Default::default()
        }
    }

    pub fn hatched(outline: Stroke, hatch_color: &str, line_width: f64, tile_size: u32) -> Self {
        Self {
            stroke: Some(outline),
            fill: Some(Fill::Hatch {
                color: hatch_color.to_string(),
                line_width,
                tile_size,
            }),
            circle: None,
        }
    }

    pub fn marker(radius: f64, fill_color: &str, outline: Stroke) -> Self {
        Self {
            stroke: None,
            fill: None,
            circle: Some(CircleMarker {
                radius,
                fill: Some(Fill::Solid {
                    color: fill_color.to_string(),
                }),
                stroke: Some(outline),
            }),
        }
    }
}

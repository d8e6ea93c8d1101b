use thiserror::Error;
use wasm_bindgen::JsValue;

use crate::feature::GeometryKind;

/// Every failure the viewer core can report.
///
/// All of them are terminal for the operation that raised them and leave
/// prior state untouched, except where a variant says otherwise.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViewerError {
    /// A layer id that is not in the registry. Treated as a wiring mistake on
    /// the page, never shown to the user.
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("a draw session is already active on layer '{0}'")]
    DrawSessionActive(String),

    #[error("draw session {0} is not the active session")]
    StaleDrawSession(String),

    #[error("layer '{layer}' accepts {expected} geometries, got {actual}")]
    GeometryKindMismatch {
        layer: String,
        expected: GeometryKind,
        actual: String,
    },

    #[error("feature has no geometry")]
    MissingGeometry,

    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// Network-level failure. The drawn feature stays in the local source.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid feature data: {0}")]
    Decode(String),

    /// The server answered but reported that the insert did not happen.
    #[error("transaction rejected by server: {0}")]
    TransactionFailed(String),

    #[error("layer '{0}' has no features")]
    EmptyLayer(String),

    #[error("feature source of layer '{0}' went away while waiting for it")]
    SourceClosed(String),
}

pub type Result<T> = std::result::Result<T, ViewerError>;

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::Decode(err.to_string())
    }
}

impl From<geozero::error::GeozeroError> for ViewerError {
    fn from(err: geozero::error::GeozeroError) -> Self {
        ViewerError::Decode(err.to_string())
    }
}

impl From<ViewerError> for JsValue {
    fn from(err: ViewerError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

use std::path::PathBuf;

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Cannot read GPX input '{}': {source}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed GPX document: {0}")]
    MalformedDocument(String),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingField {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Invalid number '{value}' for '{field}'")]
    MalformedNumber { field: &'static str, value: String },

    #[error("Invalid timestamp '{value}'")]
    MalformedTimestamp { value: String },

    #[error("Point {index} has no elevation")]
    MissingElevation { index: usize },

    #[error("Point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}

pub type Result<T> = std::result::Result<T, TrackError>;

impl From<quick_xml::events::attributes::AttrError> for TrackError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(e.into())
    }
}

impl From<TrackError> for JsValue {
    fn from(e: TrackError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

pub mod converter;
pub mod elevation;
pub mod error;
pub mod filter;
pub mod geo;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod processor;

use wasm_bindgen::prelude::*;

pub use crate::elevation::{smooth, total_elevation_change, total_elevation_gain, ElevationChange};
pub use crate::error::{Result, TrackError};
pub use crate::geo::{distance, total_distance};
pub use crate::gpx_types::{Document, Track, TrackPoint, TrackSegment, Waypoint};
pub use crate::parser::{extract_points, parse_file as parse, parse_gpx};
pub use crate::processor::{TrackProcessor, TrackSummary};

use crate::options::ProcessOptions;

/// Summarize every track of a GPX string, returned as a JS array.
#[wasm_bindgen(js_name = gpxTrackSummary)]
pub fn gpx_track_summary(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let processor = TrackProcessor::new(parse_options(options)?);
    let doc = parse_gpx(gpx_string)?;
    let summaries = processor.summarize_document(&doc)?;
    serde_wasm_bindgen::to_value(&summaries).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Summarize every track of a GPX string, returned as a JSON string.
#[wasm_bindgen(js_name = gpxTrackSummaryString)]
pub fn gpx_track_summary_string(gpx_string: &str, options: JsValue) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let processor = TrackProcessor::new(parse_options(options)?);
    let doc = parse_gpx(gpx_string)?;
    let summaries = processor.summarize_document(&doc)?;
    serde_json::to_string(&summaries).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// GeoJSON overlay of the document's tracks and waypoints, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let processor = TrackProcessor::new(parse_options(options)?);
    let doc = parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &processor)?;
    serde_wasm_bindgen::to_value(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Smoothed points of the selected track (`trackIndex`, default 0).
#[wasm_bindgen(js_name = gpxSmoothTrack)]
pub fn gpx_smooth_track(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let processor = TrackProcessor::new(parse_options(options)?);
    let doc = parse_gpx(gpx_string)?;
    let points = processor.selected_points(&doc).ok_or_else(|| {
        JsValue::from_str(&format!(
            "GPX document has no track at index {}",
            processor.options().track_index
        ))
    })?;
    let smoothed = processor.smooth(&points)?;
    serde_wasm_bindgen::to_value(&smoothed).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_options(options: JsValue) -> std::result::Result<ProcessOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ProcessOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::gpx_types::*;
use crate::processor::{TrackProcessor, TrackSummary};

/// Build the map overlay: one feature per non-empty track, carrying its
/// summary, plus one Point per waypoint.
pub fn to_feature_collection(
    data: &Document,
    processor: &TrackProcessor,
) -> Result<FeatureCollection> {
    let mut features = Vec::new();

    for wpt in &data.waypoints {
        features.push(waypoint_to_feature(wpt));
    }

    for trk in &data.tracks {
        let (summary, smoothed) = processor.summarize_smoothed(trk)?;
        let raw = trk.points();
        let points = match smoothed {
            Some(smoothed) if processor.options().smooth_geometry => smoothed,
            _ => raw.clone(),
        };
        if let Some(feature) = track_to_feature(&points, &raw, &summary) {
            features.push(feature);
        }
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// `geometry_points` are drawn; timestamps always come from the raw points.
fn track_to_feature(
    geometry_points: &[TrackPoint],
    raw_points: &[TrackPoint],
    summary: &TrackSummary,
) -> Option<Feature> {
    let geometry = match geometry_points {
        [] => return None,
        [single] => Geometry::new(Value::Point(point_coords(single))),
        many => Geometry::new(Value::LineString(many.iter().map(point_coords).collect())),
    };

    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("track".to_string()),
    );
    insert_optional(&mut props, "name", &summary.name);
    insert_optional(&mut props, "type", &summary.activity_type);
    insert_number(&mut props, "distance", Some(summary.distance));
    insert_number(&mut props, "elevationGain", summary.elevation_gain);
    insert_number(&mut props, "elevationLoss", summary.elevation_loss);
    if let Some(secs) = summary.elapsed_seconds {
        props.insert("elapsedSeconds".to_string(), JsonValue::Number(secs.into()));
    }
    insert_coordinate_times(&mut props, raw_points);

    Some(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(props),
        foreign_members: None,
    })
}

fn waypoint_to_feature(wpt: &Waypoint) -> Feature {
    let coords = match wpt.elevation {
        Some(ele) => vec![wpt.lon, wpt.lat, ele],
        None => vec![wpt.lon, wpt.lat],
    };

    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("waypoint".to_string()),
    );
    insert_optional(&mut props, "name", &wpt.name);
    if let Some(time) = wpt.time {
        props.insert("time".to_string(), JsonValue::String(time.to_rfc3339()));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(coords))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &TrackPoint) -> Vec<f64> {
    match pt.elevation {
        Some(ele) => vec![pt.lon, pt.lat, ele],
        None => vec![pt.lon, pt.lat],
    }
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}

fn insert_number(props: &mut Map<String, JsonValue>, key: &str, value: Option<f64>) {
    if let Some(n) = value.and_then(serde_json::Number::from_f64) {
        props.insert(key.to_string(), JsonValue::Number(n));
    }
}

fn insert_coordinate_times(props: &mut Map<String, JsonValue>, points: &[TrackPoint]) {
    let times: Vec<JsonValue> = points
        .iter()
        .map(|pt| match pt.time {
            Some(t) => JsonValue::String(t.to_rfc3339()),
            None => JsonValue::Null,
        })
        .collect();

    // Only include if at least one time is present
    if times.iter().any(|t| !t.is_null()) {
        let mut coord_props = Map::new();
        coord_props.insert("times".to_string(), JsonValue::Array(times));
        props.insert(
            "coordinateProperties".to_string(),
            JsonValue::Object(coord_props),
        );
    }
}

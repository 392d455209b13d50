use chrono::{DateTime, Utc};
use serde::Serialize;

/// Parsed GPX document: root attributes, standalone waypoints and tracks.
#[derive(Debug, Default, Clone)]
pub struct Document {
    pub version: Option<String>,
    pub creator: Option<String>,
    pub waypoints: Vec<Waypoint>,
    pub tracks: Vec<Track>,
}

impl Document {
    /// All points of the track at `index`, segments concatenated in document order.
    pub fn track_points(&self, index: usize) -> Option<Vec<TrackPoint>> {
        self.tracks.get(index).map(Track::points)
    }
}

/// A standalone <wpt>. Not part of any distance or elevation calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub name: Option<String>,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
            time: None,
            name: None,
        }
    }
}

/// A single <trkpt> sample. Every optional field stays `None` when the
/// document does not carry it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub heart_rate: Option<u32>,
    pub power: Option<u32>,
    pub cadence: Option<u32>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
            time: None,
            heart_rate: None,
            power: None,
            cadence: None,
        }
    }

    pub fn with_elevation(lat: f64, lon: f64, elevation: f64) -> Self {
        Self {
            elevation: Some(elevation),
            ..Self::new(lat, lon)
        }
    }
}

/// A GPX track (<trk>).
#[derive(Debug, Default, Clone)]
pub struct Track {
    pub name: Option<String>,
    pub activity_type: Option<String>,
    pub segments: Vec<TrackSegment>,
}

impl Track {
    /// Flattened view of every segment, in document order.
    pub fn points(&self) -> Vec<TrackPoint> {
        self.segments
            .iter()
            .flat_map(|seg| seg.points.iter().cloned())
            .collect()
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|seg| seg.points.len()).sum()
    }
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Default, Clone)]
pub struct TrackSegment {
    pub points: Vec<TrackPoint>,
}

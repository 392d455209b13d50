use serde::Deserialize;

use crate::filter::FilterConfig;

/// Options for track processing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    /// Which track of the document the single-track operations use (default: 0)
    #[serde(default)]
    pub track_index: usize,

    /// Smoothing strategy for elevation (default: Kalman)
    #[serde(default)]
    pub smoother: SmootherKind,

    /// How the Kalman filter steps between samples (default: fixed)
    #[serde(default)]
    pub time_step: TimeStepMode,

    /// Kalman filter tuning (default: FilterConfig::default())
    #[serde(default)]
    pub filter: FilterConfig,

    /// Draw the smoothed track instead of the raw one in GeoJSON output (default: false)
    #[serde(default)]
    pub smooth_geometry: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SmootherKind {
    #[default]
    Kalman,
    MovingAverage { window: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeStepMode {
    /// Every update advances the filter by `filter.dt`.
    #[default]
    Fixed,
    /// Use the gap between consecutive timestamps.
    FromTimestamps,
}

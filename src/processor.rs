use log::debug;
use serde::Serialize;

use crate::elevation::{self, ElevationChange};
use crate::error::{Result, TrackError};
use crate::filter::{KalmanFilter3D, MovingAverageFilter};
use crate::geo;
use crate::gpx_types::{Document, Track, TrackPoint};
use crate::options::{ProcessOptions, SmootherKind, TimeStepMode};

/// Per-track statistics handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub name: Option<String>,
    pub activity_type: Option<String>,
    pub point_count: usize,
    /// Metres along the raw (unsmoothed) points.
    pub distance: f64,
    pub elapsed_seconds: Option<i64>,
    /// `None` when some point has no elevation.
    pub elevation_gain: Option<f64>,
    pub elevation_loss: Option<f64>,
}

/// Distance and elevation operations for one track at a time. Every call
/// builds its own filter, so a processor can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct TrackProcessor {
    options: ProcessOptions,
}

impl TrackProcessor {
    pub fn new(options: ProcessOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Points of the track picked by `track_index`.
    pub fn selected_points(&self, doc: &Document) -> Option<Vec<TrackPoint>> {
        doc.track_points(self.options.track_index)
    }

    pub fn total_distance(&self, points: &[TrackPoint]) -> f64 {
        geo::total_distance(points)
    }

    pub fn smooth(&self, points: &[TrackPoint]) -> Result<Vec<TrackPoint>> {
        let config = self.options.filter;
        match (self.options.smoother, self.options.time_step) {
            (SmootherKind::MovingAverage { window }, _) => {
                elevation::smooth_with(points, |x, y, z| MovingAverageFilter::new(x, y, z, window))
            }
            (SmootherKind::Kalman, TimeStepMode::Fixed) => {
                elevation::smooth_with(points, |x, y, z| KalmanFilter3D::new(x, y, z, config))
            }
            (SmootherKind::Kalman, TimeStepMode::FromTimestamps) => {
                elevation::smooth_with_timestamps(points, config)
            }
        }
    }

    pub fn elevation_change(&self, points: &[TrackPoint]) -> Result<ElevationChange> {
        let smoothed = self.smooth(points)?;
        Ok(elevation::elevation_change(&elevation::elevations(&smoothed)?))
    }

    pub fn total_elevation_gain(&self, points: &[TrackPoint]) -> Result<f64> {
        self.elevation_change(points).map(|change| change.gain)
    }

    pub fn summarize(&self, track: &Track) -> Result<TrackSummary> {
        self.summarize_smoothed(track).map(|(summary, _)| summary)
    }

    /// Summary of `track` plus the smoothed points its elevation figures were
    /// taken from. The points are `None` when some point has no elevation.
    pub fn summarize_smoothed(
        &self,
        track: &Track,
    ) -> Result<(TrackSummary, Option<Vec<TrackPoint>>)> {
        let points = track.points();

        let elapsed_seconds = match (points.first(), points.last()) {
            (Some(first), Some(last)) => match (first.time, last.time) {
                (Some(start), Some(end)) => Some((end - start).num_seconds()),
                _ => None,
            },
            _ => None,
        };

        let smoothed = match self.smooth(&points) {
            Ok(smoothed) => Some(smoothed),
            Err(TrackError::MissingElevation { index }) => {
                debug!("no elevation at point {index}, skipping elevation summary");
                None
            }
            Err(e) => return Err(e),
        };
        let change = smoothed
            .as_deref()
            .map(elevation::elevations)
            .transpose()?
            .map(|eles| elevation::elevation_change(&eles));

        let summary = TrackSummary {
            name: track.name.clone(),
            activity_type: track.activity_type.clone(),
            point_count: points.len(),
            distance: self.total_distance(&points),
            elapsed_seconds,
            elevation_gain: change.map(|c| c.gain),
            elevation_loss: change.map(|c| c.loss),
        };
        debug!(
            "summarized track {:?}: {} points, {:.1} m",
            summary.name, summary.point_count, summary.distance
        );
        Ok((summary, smoothed))
    }

    /// Summaries for every track, each processed on its own.
    pub fn summarize_document(&self, doc: &Document) -> Result<Vec<TrackSummary>> {
        doc.tracks.iter().map(|track| self.summarize(track)).collect()
    }
}

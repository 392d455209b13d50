use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, TrackError};
use crate::filter::{FilterConfig, KalmanFilter3D, PositionFilter};
use crate::gpx_types::TrackPoint;

/// Elevation steps smaller than this (in either direction) are treated as
/// filter residual jitter and dropped.
pub const ELEVATION_NOISE_THRESHOLD_M: f64 = 0.1;

/// Accumulated climb and descent, both as positive metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationChange {
    pub gain: f64,
    pub loss: f64,
}

/// Sum per-step climbs and descents of an elevation series. The threshold is
/// applied to each step on its own, never cumulatively.
pub fn elevation_change(elevations: &[f64]) -> ElevationChange {
    let mut change = ElevationChange::default();
    for w in elevations.windows(2) {
        let delta = w[1] - w[0];
        if delta >= ELEVATION_NOISE_THRESHOLD_M {
            change.gain += delta;
        } else if delta <= -ELEVATION_NOISE_THRESHOLD_M {
            change.loss -= delta;
        }
    }
    change
}

/// Elevation channel of a point sequence. Every point must carry one.
pub fn elevations(points: &[TrackPoint]) -> Result<Vec<f64>> {
    points
        .iter()
        .enumerate()
        .map(|(index, p)| p.elevation.ok_or(TrackError::MissingElevation { index }))
        .collect()
}

/// Filter input of every point. Positions and elevations must be finite.
fn measurements(points: &[TrackPoint]) -> Result<Vec<(f64, f64, f64)>> {
    points
        .iter()
        .enumerate()
        .map(|(index, p)| {
            let ele = p.elevation.ok_or(TrackError::MissingElevation { index })?;
            if p.lat.is_finite() && p.lon.is_finite() && ele.is_finite() {
                Ok((p.lat, p.lon, ele))
            } else {
                Err(TrackError::NonFiniteCoordinate { index })
            }
        })
        .collect()
}

/// Smooth with the default Kalman configuration.
pub fn smooth(points: &[TrackPoint]) -> Result<Vec<TrackPoint>> {
    smooth_with(points, |x, y, z| {
        KalmanFilter3D::new(x, y, z, FilterConfig::default())
    })
}

/// Run a filter built from the first point over every point, the first one
/// included. One smoothed point comes out per input point, carrying only the
/// filtered lat/lon/elevation.
pub fn smooth_with<F, M>(points: &[TrackPoint], make_filter: M) -> Result<Vec<TrackPoint>>
where
    F: PositionFilter,
    M: FnOnce(f64, f64, f64) -> F,
{
    let measured = measurements(points)?;
    let Some(&(x0, y0, z0)) = measured.first() else {
        return Ok(Vec::new());
    };

    let mut filter = make_filter(x0, y0, z0);
    Ok(measured
        .iter()
        .map(|&(x, y, z)| {
            filter.update(x, y, z);
            smoothed_point(filter.read())
        })
        .collect())
}

/// Like [`smooth`] but steps the Kalman filter by the real gap between
/// consecutive timestamps. Falls back to `config.dt` for the first point and
/// wherever a timestamp is missing or does not move forward.
pub fn smooth_with_timestamps(
    points: &[TrackPoint],
    config: FilterConfig,
) -> Result<Vec<TrackPoint>> {
    let measured = measurements(points)?;
    let Some(&(x0, y0, z0)) = measured.first() else {
        return Ok(Vec::new());
    };

    let mut kf = KalmanFilter3D::new(x0, y0, z0, config);
    let mut previous: Option<DateTime<Utc>> = None;
    let mut smoothed = Vec::with_capacity(points.len());
    for (p, &(x, y, z)) in points.iter().zip(&measured) {
        let dt = match (previous, p.time) {
            (Some(prev), Some(now)) => {
                let gap = (now - prev).num_milliseconds() as f64 / 1000.0;
                if gap > 0.0 { gap } else { config.dt }
            }
            _ => config.dt,
        };
        kf.update_with_dt(x, y, z, dt);
        smoothed.push(smoothed_point(kf.read()));
        previous = p.time;
    }

    Ok(smoothed)
}

/// Gain and loss over the smoothed series.
pub fn total_elevation_change(points: &[TrackPoint]) -> Result<ElevationChange> {
    let smoothed = smooth(points)?;
    Ok(elevation_change(&elevations(&smoothed)?))
}

pub fn total_elevation_gain(points: &[TrackPoint]) -> Result<f64> {
    total_elevation_change(points).map(|change| change.gain)
}

fn smoothed_point((lat, lon, ele): (f64, f64, f64)) -> TrackPoint {
    TrackPoint::with_elevation(lat, lon, ele)
}

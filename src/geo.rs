//! Great-circle distance on a spherical Earth.
//!
//! Elevation changes and the Earth's ellipticity are both ignored, so results
//! are an approximation with bounded error (well under 0.5% for the short hops
//! between consecutive GPS fixes).

use crate::gpx_types::{TrackPoint, Waypoint};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Anything with a WGS84 latitude/longitude in decimal degrees.
pub trait Coordinate {
    fn lat(&self) -> f64;
    fn lon(&self) -> f64;
}

impl Coordinate for TrackPoint {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

impl Coordinate for Waypoint {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

/// Haversine distance between two points, in metres.
///
/// Uses the `atan2(√h, √(1−h))` form, which stays well-conditioned for the
/// small separations between consecutive samples. It only loses precision for
/// near-antipodal points.
pub fn distance<A: Coordinate + ?Sized, B: Coordinate + ?Sized>(p1: &A, p2: &B) -> f64 {
    let lat1 = p1.lat().to_radians();
    let lat2 = p2.lat().to_radians();
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (p2.lon() - p1.lon()).to_radians() / 2.0;

    let sin_dlat = half_dlat.sin();
    let sin_dlon = half_dlon.sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;

    let theta = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * theta
}

/// Sum of the distances between consecutive points, in metres. Zero for fewer
/// than two points.
pub fn total_distance<C: Coordinate>(points: &[C]) -> f64 {
    points.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

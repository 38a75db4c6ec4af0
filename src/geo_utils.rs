//! # Geographic Utilities
//!
//! Small geographic helpers shared by the track materializer and the render
//! adapter.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a track segment in meters |
//! | [`compute_bounds`] | Bounding box of a set of points |
//!
//! All functions expect WGS84 latitude/longitude in degrees.

use crate::{Bounds, GpsPoint};
use geo::{Distance, Haversine, Point};

/// Great-circle distance between two GPS points in meters.
///
/// # Arguments
/// * `p1` - First point
/// * `p2` - Second point
///
/// # Returns
/// Distance along the Earth's surface in meters (mean radius 6,371 km).
///
/// # Example
///
/// ```rust
/// use photo_route_map::{GpsPoint, geo_utils};
///
/// let tokyo_station = GpsPoint::new(35.681, 139.767);
/// let shinjuku = GpsPoint::new(35.690, 139.700);
///
/// let distance = geo_utils::haversine_distance(&tokyo_station, &shinjuku);
/// assert!((distance - 6_100.0).abs() < 300.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Sum of the distances between consecutive points, in meters.
///
/// Empty and single-point inputs have length 0.
///
/// # Example
///
/// ```rust
/// use photo_route_map::{GpsPoint, geo_utils};
///
/// let walk = vec![
///     GpsPoint::new(35.000, 139.0),
///     GpsPoint::new(35.001, 139.0),
///     GpsPoint::new(35.002, 139.0),
/// ];
/// let length = geo_utils::polyline_length(&walk);
/// assert!((length - 222.4).abs() < 2.0);
/// ```
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Bounding box enclosing all `points`.
///
/// For empty input the result is inverted (min > max); callers check for
/// emptiness first.
///
/// ```rust
/// use photo_route_map::{GpsPoint, geo_utils};
///
/// let points = vec![
///     GpsPoint::new(35.68, 139.76),
///     GpsPoint::new(35.70, 139.70),
/// ];
/// let bounds = geo_utils::compute_bounds(&points);
/// assert_eq!(bounds.min_lat, 35.68);
/// assert_eq!(bounds.min_lng, 139.70);
/// ```
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

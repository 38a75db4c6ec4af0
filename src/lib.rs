//! # Photo Route Map
//!
//! Day-by-day correlation of geotagged photos with recorded GPS tracks.
//!
//! This library provides:
//! - Decoding of the photo log (CSV) and the track index (JSON)
//! - Stable per-participant colors, from a fixed table or a palette
//! - Day indexing and exact per-day filtering of both datasets
//! - Race-free materialization of a day's GPX tracks into colored lines
//! - A render adapter producing markers, polylines, legend, and detail panel
//! - Generation of the track index from published track files
//!
//! ## Features
//!
//! - **`parallel`** - Scan participant directories in parallel with rayon
//! - **`http`** - Enable an HTTP [`DataSource`] for remotely published data
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use photo_route_map::{filter_day, parse_photo_log, DayKey};
//!
//! let csv = "kato/IMG1.jpg,2025-04-23T10:00:00,35.0,139.0,food\n";
//! let photos = parse_photo_log(csv.as_bytes(), "/photos").unwrap();
//!
//! let day = DayKey::parse("0423").unwrap();
//! let today = filter_day(&photos, &[], &day);
//! assert_eq!(today.photos.len(), 1);
//! assert_eq!(today.photos[0].url, "/photos/kato/IMG1.jpg");
//! ```
//!
//! A full viewer builds a [`Session`] over a [`DataSource`], selects a day,
//! runs the returned [`MaterializeJob`] and draws [`Session::scene`].

use serde::{Deserialize, Serialize};

pub mod config;
pub mod days;
pub mod error;
pub mod geo_utils;
pub mod identity;
pub mod materialize;
pub mod photos;
pub mod render;
pub mod session;
pub mod source;
pub mod tracks;

pub use config::{DayIndexConfig, IdentityConfig, IdentityEntry, MapConfig, ViewerConfig};
pub use days::{filter_day, DayIndex, DayKey, DaySlice};
pub use error::{Error, Result};
pub use identity::{Color, IdentityRegistry, LegendEntry, ParticipantId, SET1_PALETTE};
pub use materialize::{
    decode_gpx_lines, MaterializeJob, MaterializeOutcome, PublishedTracks, TrackFailure,
    TrackMaterializer, TrackSegment,
};
pub use photos::{load_photo_log, parse_photo_log, PhotoRecord};
pub use render::{
    build_scene, category_badge, DetailPanel, Key, MapScene, MarkerIndex, PhotoMarker, Polyline,
    Selection,
};
pub use session::{LoadState, Session};
pub use source::{DataSource, FsSource, MemorySource};
#[cfg(feature = "http")]
pub use source::HttpSource;
pub use tracks::{
    day_key_from_file_name, generate_track_index, load_track_index, parse_track_index,
    write_track_index, TrackReference,
};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use photo_route_map::GpsPoint;
/// let point = GpsPoint::new(35.681, 139.767); // Tokyo Station
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of drawn geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    ///
    /// Returns `None` for an empty slice.
    ///
    /// # Example
    /// ```
    /// use photo_route_map::{Bounds, GpsPoint};
    ///
    /// let bounds = Bounds::from_points(&[
    ///     GpsPoint::new(35.68, 139.70),
    ///     GpsPoint::new(35.70, 139.77),
    /// ])
    /// .unwrap();
    /// assert_eq!(bounds.min_lat, 35.68);
    /// assert_eq!(bounds.max_lng, 139.77);
    /// assert!(Bounds::from_points(&[]).is_none());
    /// ```
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(35.681, 139.767).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_from_points() {
        assert!(Bounds::from_points(&[]).is_none());

        let bounds = Bounds::from_points(&[
            GpsPoint::new(35.0, 139.0),
            GpsPoint::new(35.2, 139.4),
        ])
        .unwrap();
        let center = bounds.center();
        assert!((center.latitude - 35.1).abs() < 1e-9);
        assert!((center.longitude - 139.2).abs() < 1e-9);
    }
}

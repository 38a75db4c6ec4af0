//! Render adapter: from pipeline state to map primitives.
//!
//! The map widget itself is out of scope. This module produces what it
//! consumes: one marker per photo with valid coordinates, one polyline per
//! published track segment, the legend, and the detail panel contents for
//! the selected photo. It also owns marker hit-testing and the selection
//! state.

use crate::config::MapConfig;
use crate::geo_utils;
use crate::identity::{Color, IdentityRegistry, LegendEntry};
use crate::materialize::PublishedTracks;
use crate::photos::PhotoRecord;
use crate::{Bounds, GpsPoint};
use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Serialize;

/// Badge shown when a photo has no category or an unlisted one.
pub const UNKNOWN_CATEGORY_BADGE: &str = "❓";

const CATEGORY_BADGES: [(&str, &str); 7] = [
    ("食べ物", "🍽️"),
    ("風景", "🏞️"),
    ("人（知ってる人）", "👤"),
    ("植物", "🌱"),
    ("建物（外景）", "🏢"),
    ("体験・発見", "💡"),
    ("その他", "📌"),
];

pub fn category_badge(category: Option<&str>) -> &'static str {
    category
        .and_then(|c| CATEGORY_BADGES.iter().find(|(name, _)| *name == c))
        .map_or(UNKNOWN_CATEGORY_BADGE, |(_, badge)| *badge)
}

/// A photo thumbnail placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoMarker {
    /// Stable widget key, see [`PhotoRecord::marker_key`].
    pub key: String,
    pub position: GpsPoint,
    pub image_url: String,
    pub border_color: Color,
    pub badge: &'static str,
    /// Icon edge in pixels.
    pub icon_size: u32,
    /// Icon anchor in pixels from the top-left corner.
    pub icon_anchor: (u32, u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub positions: Vec<GpsPoint>,
    pub color: Color,
    pub weight: u32,
}

/// Everything the map widget draws for the selected day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapScene {
    pub markers: Vec<PhotoMarker>,
    pub polylines: Vec<Polyline>,
    pub legend: Vec<LegendEntry>,
    pub center: GpsPoint,
    pub zoom: u8,
    pub tile_url: String,
    /// Extent of the drawn geometry, if any.
    pub bounds: Option<Bounds>,
}

/// Build the scene for one day.
///
/// Photos with invalid coordinates get no marker. Assigning colors may grow
/// a dynamic registry, so markers are colored before the legend is read.
///
/// # Arguments
/// * `photos` - The selected day's photos, usually [`crate::DaySlice::photos`]
/// * `tracks` - The most recently published segment set
/// * `registry` - The session's identity registry
/// * `map` - Icon size, line weight, and initial view
///
/// # Returns
/// Markers in photo order, one polyline per segment, the legend, and the
/// bounds of everything drawn (`None` when nothing is drawn).
///
/// # Example
/// ```
/// use photo_route_map::{
///     build_scene, parse_photo_log, IdentityRegistry, MapConfig, PublishedTracks, SET1_PALETTE,
/// };
///
/// let csv = "kato/IMG1.jpg,2025-04-23T10:00:00,35.0,139.0,風景\n";
/// let photos = parse_photo_log(csv.as_bytes(), "/photos").unwrap();
/// let today: Vec<_> = photos.iter().collect();
/// let mut registry = IdentityRegistry::with_palette(SET1_PALETTE.to_vec()).unwrap();
///
/// let scene = build_scene(
///     &today,
///     &PublishedTracks::default(),
///     &mut registry,
///     &MapConfig::default(),
/// );
/// assert_eq!(scene.markers.len(), 1);
/// assert_eq!(scene.markers[0].badge, "🏞️");
/// assert_eq!(scene.legend[0].participant, "kato");
/// ```
pub fn build_scene(
    photos: &[&PhotoRecord],
    tracks: &PublishedTracks,
    registry: &mut IdentityRegistry,
    map: &MapConfig,
) -> MapScene {
    let half = map.icon_size / 2;
    let mut markers = Vec::with_capacity(photos.len());
    for photo in photos {
        let position = photo.position();
        if !position.is_valid() {
            debug!("[Render] {} has no usable position, not drawn", photo.marker_key());
            continue;
        }
        markers.push(PhotoMarker {
            key: photo.marker_key(),
            position,
            image_url: photo.url.clone(),
            border_color: registry.color_of(&photo.participant),
            badge: category_badge(photo.category.as_deref()),
            icon_size: map.icon_size,
            icon_anchor: (half, half),
        });
    }

    let polylines: Vec<Polyline> = tracks
        .segments
        .iter()
        .map(|segment| Polyline {
            positions: segment.coordinates.clone(),
            color: segment.color,
            weight: map.line_weight,
        })
        .collect();

    let extent: Vec<GpsPoint> = markers
        .iter()
        .map(|m| m.position)
        .chain(
            polylines
                .iter()
                .flat_map(|l| l.positions.iter().copied())
                .filter(GpsPoint::is_valid),
        )
        .collect();
    let bounds = Bounds::from_points(&extent);

    MapScene {
        markers,
        polylines,
        legend: registry.legend(),
        center: map.center,
        zoom: map.zoom,
        tile_url: map.tile_url.clone(),
        bounds,
    }
}

/// Contents of the photo detail panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailPanel {
    pub image_url: String,
    pub person: String,
    pub datetime: String,
    /// `lat,lng` as recorded.
    pub position: String,
    pub category: Option<String>,
    pub file: String,
}

impl DetailPanel {
    pub fn for_photo(photo: &PhotoRecord, registry: &IdentityRegistry) -> Self {
        Self {
            image_url: photo.url.clone(),
            person: registry.display_name(&photo.participant),
            datetime: photo.timestamp.clone(),
            position: format!("{},{}", photo.latitude, photo.longitude),
            category: photo.category.clone(),
            file: photo.file.clone(),
        }
    }
}

/// Key events the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// The photo whose detail panel is open, by marker key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<String>,
}

impl Selection {
    pub fn select(&mut self, marker_key: impl Into<String>) {
        self.selected = Some(marker_key.into());
    }

    /// Close button, or a new day.
    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Returns whether the key closed the panel.
    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Escape => self.selected.take().is_some(),
            Key::Other => false,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Resolve the selection against the photos currently shown.
    pub fn resolve<'a>(&self, photos: &[&'a PhotoRecord]) -> Option<&'a PhotoRecord> {
        let key = self.selected.as_deref()?;
        photos.iter().copied().find(|p| p.marker_key() == key)
    }
}

// =============================================================================
// Marker hit-testing
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct IndexedMarker {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedMarker {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for IndexedMarker {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

/// Spatial index over a scene's markers for click lookup.
pub struct MarkerIndex {
    tree: RTree<IndexedMarker>,
}

impl MarkerIndex {
    pub fn new(markers: &[PhotoMarker]) -> Self {
        let indexed: Vec<IndexedMarker> = markers
            .iter()
            .enumerate()
            .map(|(idx, m)| IndexedMarker {
                idx,
                lat: m.position.latitude,
                lng: m.position.longitude,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    /// Index of the marker nearest `point`, if it lies within `radius_meters`.
    pub fn hit(&self, point: GpsPoint, radius_meters: f64) -> Option<usize> {
        let nearest = self.tree.nearest_neighbor(&[point.latitude, point.longitude])?;
        let distance = geo_utils::haversine_distance(
            &point,
            &GpsPoint::new(nearest.lat, nearest.lng),
        );
        (distance <= radius_meters).then_some(nearest.idx)
    }
}

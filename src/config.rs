//! Viewer configuration.
//!
//! Every field has a default matching the published 2025 spring dataset, so
//! an empty JSON object (`{}`) is a valid configuration.

use crate::error::{Error, Result};
use crate::identity::{Color, ParticipantId, SET1_PALETTE};
use crate::GpsPoint;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for a viewing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Photo log resource. Default: `/data/photos.csv`
    pub photo_log_url: String,

    /// Track index resource. Default: `/routes/index.json`
    pub track_index_url: String,

    /// Prefix joined with `participant/file` to form photo URLs.
    /// Default: `/photos`
    pub photo_url_prefix: String,

    /// Participant color/alias policy.
    pub identity: IdentityConfig,

    /// Which days can be selected.
    pub days: DayIndexConfig,

    /// Map presentation defaults.
    pub map: MapConfig,

    /// Track files fetched concurrently within one generation.
    /// 1 fetches sequentially. Default: 4
    pub track_concurrency: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            photo_log_url: "/data/photos.csv".to_string(),
            track_index_url: "/routes/index.json".to_string(),
            photo_url_prefix: "/photos".to_string(),
            identity: IdentityConfig::default(),
            days: DayIndexConfig::default(),
            map: MapConfig::default(),
            track_concurrency: 4,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.track_concurrency == 0 {
            return Err(Error::Config("track_concurrency must be at least 1".into()));
        }
        if let IdentityConfig::Dynamic { palette } = &self.identity {
            if palette.is_empty() {
                return Err(Error::Config("dynamic palette must not be empty".into()));
            }
        }
        if let DayIndexConfig::FixedRange { start, end } = &self.days {
            if start > end {
                return Err(Error::Config(format!(
                    "day range starts after it ends ({} > {})",
                    start, end
                )));
            }
            // MMDD keys repeat once the range reaches the same date a year later
            let year_later = start.checked_add_months(Months::new(12));
            if year_later.map_or(true, |limit| *end >= limit) {
                return Err(Error::Config(format!(
                    "day range {}..={} is longer than a year",
                    start, end
                )));
            }
        }
        Ok(())
    }
}

/// A known participant in the static identity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEntry {
    pub participant: ParticipantId,
    pub color: Color,
    #[serde(default)]
    pub alias: Option<String>,
}

impl IdentityEntry {
    fn new(participant: &str, color: Color, alias: &str) -> Self {
        Self {
            participant: participant.to_string(),
            color,
            alias: Some(alias.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum IdentityConfig {
    /// Fixed table; entry order is the legend order.
    Static {
        entries: Vec<IdentityEntry>,
        fallback_color: Color,
        fallback_alias: String,
    },
    /// Round-robin palette assignment in first-seen order.
    Dynamic {
        #[serde(default = "default_palette")]
        palette: Vec<Color>,
    },
}

fn default_palette() -> Vec<Color> {
    SET1_PALETTE.to_vec()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        IdentityConfig::Static {
            entries: vec![
                IdentityEntry::new("suzuki", Color::rgb(0xe4, 0x1a, 0x1c), "🍎 Apple"),
                IdentityEntry::new("kato", Color::rgb(0x37, 0x7e, 0xb8), "🫐 Blueberry"),
                IdentityEntry::new("shen", Color::rgb(0x4d, 0xaf, 0x4a), "🥬 Cabbage"),
                IdentityEntry::new("shiotani", Color::rgb(0xff, 0x7f, 0x00), "🍊 Dekopon"),
                IdentityEntry::new("takase", Color::rgb(0x98, 0x4e, 0xa3), "🍆 Eggplant"),
            ],
            fallback_color: Color::rgb(0x88, 0x88, 0x88),
            fallback_alias: "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DayIndexConfig {
    /// Every calendar day in `start..=end`, whether or not it has data.
    FixedRange { start: NaiveDate, end: NaiveDate },
    /// Exactly the days present in the loaded photos and tracks.
    Derived,
}

impl Default for DayIndexConfig {
    fn default() -> Self {
        DayIndexConfig::FixedRange {
            start: NaiveDate::from_ymd_opt(2025, 4, 22).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 5, 13).unwrap_or_default(),
        }
    }
}

/// Map presentation defaults handed through to the render adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial map center. Default: Tokyo Station (35.681, 139.767)
    pub center: GpsPoint,
    /// Initial zoom level. Default: 13
    pub zoom: u8,
    /// Tile URL template. Default: OpenStreetMap
    pub tile_url: String,
    /// Polyline stroke weight in pixels. Default: 4
    pub line_weight: u32,
    /// Photo marker icon edge in pixels; the anchor is the icon center.
    /// Default: 42
    pub icon_size: u32,
    /// Maximum distance between a click and a marker for the click to
    /// select it. Default: 30.0 meters
    pub hit_radius_meters: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: GpsPoint::new(35.681, 139.767),
            zoom: 13,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            line_weight: 4,
            icon_size: 42,
            hit_radius_meters: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = ViewerConfig::from_json_str("{}").unwrap();
        assert_eq!(config.photo_log_url, "/data/photos.csv");
        assert_eq!(config.track_index_url, "/routes/index.json");
        assert_eq!(config.map.zoom, 13);
        assert!(matches!(config.identity, IdentityConfig::Static { .. }));
        assert!(matches!(config.days, DayIndexConfig::FixedRange { .. }));
    }

    #[test]
    fn test_dynamic_identity_and_derived_days() {
        let json = r##"{
            "identity": { "policy": "dynamic", "palette": ["#111111", "#222222"] },
            "days": { "policy": "derived" },
            "track_concurrency": 1
        }"##;
        let config = ViewerConfig::from_json_str(json).unwrap();
        match config.identity {
            IdentityConfig::Dynamic { palette } => assert_eq!(palette.len(), 2),
            other => panic!("unexpected identity config: {:?}", other),
        }
        assert_eq!(config.days, DayIndexConfig::Derived);
        assert_eq!(config.track_concurrency, 1);
    }

    #[test]
    fn test_dynamic_identity_defaults_to_set1() {
        let config =
            ViewerConfig::from_json_str(r#"{ "identity": { "policy": "dynamic" } }"#).unwrap();
        assert_eq!(
            config.identity,
            IdentityConfig::Dynamic { palette: SET1_PALETTE.to_vec() }
        );
    }

    #[test]
    fn test_fixed_range_parses_dates() {
        let json = r#"{ "days": { "policy": "fixed_range", "start": "2025-04-30", "end": "2025-05-02" } }"#;
        let config = ViewerConfig::from_json_str(json).unwrap();
        assert_eq!(
            config.days,
            DayIndexConfig::FixedRange {
                start: NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            }
        );
    }

    #[test]
    fn test_validation_failures() {
        assert!(ViewerConfig::from_json_str(r#"{ "track_concurrency": 0 }"#).is_err());
        assert!(ViewerConfig::from_json_str(
            r#"{ "identity": { "policy": "dynamic", "palette": [] } }"#
        )
        .is_err());
        assert!(ViewerConfig::from_json_str(
            r#"{ "days": { "policy": "fixed_range", "start": "2025-05-13", "end": "2025-04-22" } }"#
        )
        .is_err());
        assert!(ViewerConfig::from_json_str(
            r#"{ "identity": { "policy": "dynamic", "palette": ["red"] } }"#
        )
        .is_err());
    }

    #[test]
    fn test_fixed_range_across_new_year_is_valid() {
        let json = r#"{ "days": { "policy": "fixed_range", "start": "2024-12-30", "end": "2025-01-02" } }"#;
        assert!(ViewerConfig::from_json_str(json).is_ok());

        let too_long = r#"{ "days": { "policy": "fixed_range", "start": "2024-04-22", "end": "2025-04-22" } }"#;
        assert!(ViewerConfig::from_json_str(too_long).is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, r#"{ "photo_url_prefix": "/img" }"#).unwrap();
        let config = ViewerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.photo_url_prefix, "/img");

        let missing = ViewerConfig::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(Error::Io { .. })));
    }
}

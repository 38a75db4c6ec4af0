//! Photo log decoding.
//!
//! The photo log is a header-less CSV with one row per geotagged photo:
//!
//! ```text
//! relativePath,timestamp,latitude,longitude[,category]
//! kato/IMG1.jpg,2025-04-23T10:00:00,35.0,139.0,食べ物
//! ```
//!
//! `relativePath` is `participant/file`. Rows whose coordinates do not parse
//! are kept with NaN coordinates; the render adapter skips them. Rows that
//! cannot be attributed to a participant or a day are dropped with a warning.

use crate::days::DayKey;
use crate::error::Result;
use crate::identity::ParticipantId;
use crate::source::DataSource;
use crate::GpsPoint;
use log::{info, warn};
use serde::Serialize;
use std::io::Read;

/// One geotagged photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoRecord {
    pub participant: ParticipantId,
    pub file: String,
    /// Image location, derived from participant and file.
    pub url: String,
    pub timestamp: String,
    pub day_key: DayKey,
    pub latitude: f64,
    pub longitude: f64,
    pub category: Option<String>,
}

impl PhotoRecord {
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// Key unique per photo within a session: `participant_day_file`.
    pub fn marker_key(&self) -> String {
        format!("{}_{}_{}", self.participant, self.day_key, self.file)
    }
}

/// URL of a photo image under `prefix`.
pub fn photo_url(prefix: &str, participant: &str, file: &str) -> String {
    format!("{}/{}/{}", prefix.trim_end_matches('/'), participant, file)
}

/// Decode a photo log. Fails only if the CSV itself is unreadable.
pub fn parse_photo_log<R: Read>(reader: R, url_prefix: &str) -> Result<Vec<PhotoRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in csv_reader.records().enumerate() {
        let row_data = result?;
        let path = row_data.get(0).unwrap_or_default();
        let timestamp = row_data.get(1).unwrap_or_default();

        let Some((participant, file)) = path.split_once('/') else {
            warn!("[PhotoLog] row {}: path {:?} has no participant, skipped", row + 1, path);
            skipped += 1;
            continue;
        };
        let Some(day_key) = DayKey::from_timestamp(timestamp) else {
            warn!("[PhotoLog] row {}: timestamp {:?} has no day, skipped", row + 1, timestamp);
            skipped += 1;
            continue;
        };

        let latitude = parse_coordinate(row_data.get(2));
        let longitude = parse_coordinate(row_data.get(3));
        let category = row_data
            .get(4)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        records.push(PhotoRecord {
            participant: participant.to_string(),
            file: file.to_string(),
            url: photo_url(url_prefix, participant, file),
            timestamp: timestamp.to_string(),
            day_key,
            latitude,
            longitude,
            category,
        });
    }

    if skipped > 0 {
        warn!("[PhotoLog] {} rows skipped", skipped);
    }
    Ok(records)
}

/// Non-numeric input becomes NaN rather than an error.
fn parse_coordinate(field: Option<&str>) -> f64 {
    field
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Fetch and decode the photo log at `url`.
pub async fn load_photo_log<S: DataSource>(
    source: &S,
    url: &str,
    url_prefix: &str,
) -> Result<Vec<PhotoRecord>> {
    let bytes = source.fetch(url).await?;
    let records = parse_photo_log(bytes.as_slice(), url_prefix)?;
    info!("[PhotoLog] loaded {} photos from {}", records.len(), url);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_parse_example_row() {
        let csv = "kato/IMG1.jpg,2025-04-23T10:00:00,35.0,139.0,food\n";
        let photos = parse_photo_log(csv.as_bytes(), "/photos").unwrap();
        assert_eq!(photos.len(), 1);

        let p = &photos[0];
        assert_eq!(p.participant, "kato");
        assert_eq!(p.file, "IMG1.jpg");
        assert_eq!(p.url, "/photos/kato/IMG1.jpg");
        assert_eq!(p.timestamp, "2025-04-23T10:00:00");
        assert_eq!(p.day_key.as_str(), "0423");
        assert_eq!(p.latitude, 35.0);
        assert_eq!(p.longitude, 139.0);
        assert_eq!(p.category.as_deref(), Some("food"));
        assert_eq!(p.marker_key(), "kato_0423_IMG1.jpg");
    }

    #[test]
    fn test_category_is_optional() {
        let csv = "shen/a.jpg,2025-04-22T09:00:00,35.0,139.0\n\
                   shen/b.jpg,2025-04-22T09:05:00,35.0,139.0,\n";
        let photos = parse_photo_log(csv.as_bytes(), "/photos").unwrap();
        assert_eq!(photos.len(), 2);
        assert!(photos[0].category.is_none());
        assert!(photos[1].category.is_none());
    }

    #[test]
    fn test_bad_coordinates_are_kept() {
        let csv = "kato/x.jpg,2025-04-23T10:00:00,north,139.0\n\
                   kato/y.jpg,2025-04-23T10:00:00\n";
        let photos = parse_photo_log(csv.as_bytes(), "/photos").unwrap();
        assert_eq!(photos.len(), 2);
        assert!(photos[0].latitude.is_nan());
        assert_eq!(photos[0].longitude, 139.0);
        assert!(!photos[0].position().is_valid());
        assert!(photos[1].latitude.is_nan() && photos[1].longitude.is_nan());
    }

    #[test]
    fn test_unattributable_rows_are_skipped() {
        let csv = "no-slash.jpg,2025-04-23T10:00:00,35.0,139.0\n\
                   kato/ok.jpg,2025-04-23T10:00:00,35.0,139.0\n\
                   kato/bad-ts.jpg,sometime,35.0,139.0\n";
        let photos = parse_photo_log(csv.as_bytes(), "/photos").unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].file, "ok.jpg");
    }

    #[test]
    fn test_blank_lines_and_quoted_fields() {
        let csv = "\n\"takase/IMG 9.jpg\",2025-05-01T12:00:00,35.5,139.5,\"体験・発見\"\n\n";
        let photos = parse_photo_log(csv.as_bytes(), "/photos/").unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].url, "/photos/takase/IMG 9.jpg");
        assert_eq!(photos[0].category.as_deref(), Some("体験・発見"));
    }

    #[tokio::test]
    async fn test_load_photo_log_from_source() {
        let source = MemorySource::new().with(
            "/data/photos.csv",
            "kato/IMG1.jpg,2025-04-23T10:00:00,35.0,139.0,food\n",
        );
        let photos = load_photo_log(&source, "/data/photos.csv", "/photos").await.unwrap();
        assert_eq!(photos.len(), 1);

        let missing = load_photo_log(&source, "/data/other.csv", "/photos").await;
        assert!(missing.is_err());
    }
}

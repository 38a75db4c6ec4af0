//! Track references and the track index.
//!
//! Track logs are published per participant as
//! `<root>/<participant>/<name>.gpx`. The day of a log comes from its file
//! name: an 8-digit `YYYYMMDD` token right after the literal `Log`, e.g.
//! `Log20250423-001.gpx` belongs to day `0423`. Files without that token are
//! left out of the index.
//!
//! The index is a JSON array written once by the `gen-track-index` binary
//! and read by every viewing session:
//!
//! ```json
//! [
//!   { "file": "kato/Log20250423-001.gpx", "person": "kato", "mmdd": "0423",
//!     "url": "/routes/kato/Log20250423-001.gpx" }
//! ]
//! ```

use crate::days::DayKey;
use crate::error::{Error, Result};
use crate::identity::ParticipantId;
use crate::source::DataSource;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory scanned by the index generator.
pub const ROUTES_ROOT: &str = "public/routes";

/// URL prefix under which `ROUTES_ROOT` is published.
pub const ROUTES_URL_PREFIX: &str = "/routes";

/// Participants whose track directories are scanned.
pub const PARTICIPANTS: [&str; 5] = ["suzuki", "kato", "shen", "takase", "shiotani"];

/// Name of the index file written into the routes root.
pub const INDEX_FILE_NAME: &str = "index.json";

static DATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Log(\d{8})-").expect("date token pattern is valid"));

/// Pointer to one participant's track log for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackReference {
    /// `participant/filename`
    pub file: String,
    #[serde(rename = "person", alias = "participant")]
    pub participant: ParticipantId,
    #[serde(rename = "mmdd", alias = "dayKey")]
    pub day_key: DayKey,
    pub url: String,
}

impl TrackReference {
    pub fn new(participant: &str, file_name: &str, day_key: DayKey) -> Self {
        Self {
            file: format!("{}/{}", participant, file_name),
            participant: participant.to_string(),
            day_key,
            url: format!("{}/{}/{}", ROUTES_URL_PREFIX, participant, file_name),
        }
    }
}

/// Day encoded in a track file name, if the name carries a date token.
pub fn day_key_from_file_name(file_name: &str) -> Option<DayKey> {
    let token = DATE_TOKEN.captures(file_name)?.get(1)?;
    DayKey::from_date_token(token.as_str())
}

fn is_gpx(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".gpx")
}

/// Index one participant's directory. Entries are visited in name order.
fn scan_participant(root: &Path, participant: &str) -> Result<Vec<TrackReference>> {
    let dir = root.join(participant);
    let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(&dir, e))?;
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!("[TrackIndex] skipping non-UTF-8 name {:?}", raw),
        }
    }
    names.sort();

    let refs: Vec<TrackReference> = names
        .iter()
        .filter(|name| is_gpx(name))
        .filter_map(|name| match day_key_from_file_name(name) {
            Some(day) => Some(TrackReference::new(participant, name, day)),
            None => {
                debug!("[TrackIndex] {}/{} has no date token, excluded", participant, name);
                None
            }
        })
        .collect();

    debug!("[TrackIndex] {}: {} tracks", participant, refs.len());
    Ok(refs)
}

/// Scan every participant directory under `root`.
///
/// Any unreadable directory fails the whole scan.
pub fn generate_track_index(root: &Path, participants: &[&str]) -> Result<Vec<TrackReference>> {
    #[cfg(feature = "parallel")]
    let per_participant: Vec<Vec<TrackReference>> = {
        use rayon::prelude::*;
        participants
            .par_iter()
            .map(|p| scan_participant(root, p))
            .collect::<Result<_>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let per_participant: Vec<Vec<TrackReference>> = participants
        .iter()
        .map(|p| scan_participant(root, p))
        .collect::<Result<_>>()?;

    Ok(per_participant.into_iter().flatten().collect())
}

/// Write `refs` as pretty-printed JSON to `<root>/index.json`.
pub fn write_track_index(root: &Path, refs: &[TrackReference]) -> Result<PathBuf> {
    let path = root.join(INDEX_FILE_NAME);
    let json = serde_json::to_string_pretty(refs)?;
    fs::write(&path, json).map_err(|e| Error::io(&path, e))?;
    info!("[TrackIndex] wrote {} references to {}", refs.len(), path.display());
    Ok(path)
}

/// Decode a track index.
///
/// Fails only if the content is not a JSON array. Entries that do not decode
/// as a [`TrackReference`] are skipped with a warning.
pub fn parse_track_index(bytes: &[u8]) -> Result<Vec<TrackReference>> {
    let entries: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;

    let mut refs = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        match TrackReference::deserialize(entry) {
            Ok(r) => refs.push(r),
            Err(e) => warn!("[TrackIndex] entry {}: {}, skipped", i, e),
        }
    }
    Ok(refs)
}

/// Fetch and decode the track index at `url`.
pub async fn load_track_index<S: DataSource>(source: &S, url: &str) -> Result<Vec<TrackReference>> {
    let bytes = source.fetch(url).await?;
    let refs = parse_track_index(&bytes)?;
    info!("[TrackIndex] loaded {} track references from {}", refs.len(), url);
    Ok(refs)
}

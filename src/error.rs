//! Crate-wide error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading, decoding, or configuring the viewer pipeline.
///
/// Most of these never escape a [`crate::Session`]: dataset load failures are
/// recorded per dataset and track failures per file. The index generator is
/// the one caller that propagates them to the process exit code.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("photo log: {0}")]
    PhotoLog(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode GPX {url}: {reason}")]
    Gpx { url: String, reason: String },

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("color {color} assigned to both {first} and {second}")]
    DuplicateColor {
        color: String,
        first: String,
        second: String,
    },

    #[error("invalid day key {0:?} (expected 4 digits MMDD)")]
    InvalidDayKey(String),

    #[error("day {0} is not in the day index")]
    UnknownDay(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn fetch(url: &str, reason: impl ToString) -> Self {
        Error::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

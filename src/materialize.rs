//! Turning a day's track references into colored line geometry.
//!
//! Each day selection starts a new *generation*. A generation fetches and
//! decodes its GPX files, then publishes the resulting segments as one unit,
//! but only if no newer generation has been started in the meantime. A slow
//! generation for an earlier day can therefore never overwrite, or mix with,
//! the lines of the day currently selected.
//!
//! ```text
//! select 0423 ──► gen 1 ──fetch────────────────────────► publish? no (latest = 2)
//! select 0424 ──────────► gen 2 ──fetch──► publish? yes
//! ```

use crate::days::DayKey;
use crate::error::{Error, Result};
use crate::geo_utils;
use crate::identity::{Color, ParticipantId};
use crate::source::DataSource;
use crate::tracks::TrackReference;
use crate::GpsPoint;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// One renderable line, colored for its participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSegment {
    pub participant: ParticipantId,
    /// `participant/filename` of the track log it came from.
    pub file: String,
    /// Points in (latitude, longitude) order.
    pub coordinates: Vec<GpsPoint>,
    pub color: Color,
}

impl TrackSegment {
    pub fn length_meters(&self) -> f64 {
        geo_utils::polyline_length(&self.coordinates)
    }
}

/// A track reference that contributed no segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackFailure {
    pub file: String,
    pub reason: String,
}

/// The segment set currently on display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishedTracks {
    /// Generation that produced this set; 0 before anything is published.
    pub generation: u64,
    pub day: Option<DayKey>,
    pub segments: Vec<TrackSegment>,
    pub failures: Vec<TrackFailure>,
}

/// How a generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeOutcome {
    Published {
        generation: u64,
        day: DayKey,
        segments: usize,
        failures: usize,
    },
    /// A newer generation was started; the result was dropped.
    Superseded { generation: u64, day: DayKey },
}

impl MaterializeOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, MaterializeOutcome::Published { .. })
    }
}

/// Decode GPX content into line geometry.
///
/// Every track segment and every route with at least two points yields one
/// line. Waypoints are point features and contribute nothing.
pub fn decode_gpx_lines(bytes: &[u8], url: &str) -> Result<Vec<Vec<GpsPoint>>> {
    let gpx = gpx::read(bytes).map_err(|e| Error::Gpx {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let to_line = |points: &[gpx::Waypoint]| -> Vec<GpsPoint> {
        points
            .iter()
            .map(|wpt| {
                let p = wpt.point();
                // geo points are (x = lng, y = lat)
                GpsPoint::new(p.y(), p.x())
            })
            .collect()
    };

    let track_lines = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .map(|segment| to_line(&segment.points));
    let route_lines = gpx.routes.iter().map(|route| to_line(&route.points));

    Ok(track_lines
        .chain(route_lines)
        .filter(|line| line.len() >= 2)
        .collect())
}

struct Shared {
    latest: AtomicU64,
    published: watch::Sender<Arc<PublishedTracks>>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }
}

/// Owner of the generation counter and the published segment set.
pub struct TrackMaterializer<S> {
    source: Arc<S>,
    shared: Arc<Shared>,
    concurrency: usize,
}

impl<S: DataSource> TrackMaterializer<S> {
    /// `concurrency` is the number of track fetches in flight per generation.
    pub fn new(source: Arc<S>, concurrency: usize) -> Self {
        let (published, _) = watch::channel(Arc::new(PublishedTracks::default()));
        Self {
            source,
            shared: Arc::new(Shared {
                latest: AtomicU64::new(0),
                published,
            }),
            concurrency: concurrency.max(1),
        }
    }

    /// Start a new generation for `day`, superseding every earlier one.
    ///
    /// The generation counter is bumped immediately, so any job begun before
    /// this call can no longer publish, even if it finishes later.
    ///
    /// # Arguments
    /// * `day` - The day being selected
    /// * `work` - The day's track references, each paired with the color its
    ///   segments will carry
    ///
    /// # Returns
    /// A [`MaterializeJob`] that does nothing until [`MaterializeJob::run`]
    /// is awaited.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use photo_route_map::{DayKey, MemorySource, TrackMaterializer};
    ///
    /// let m = TrackMaterializer::new(Arc::new(MemorySource::new()), 4);
    /// let first = m.begin(DayKey::parse("0423").unwrap(), vec![]);
    /// let second = m.begin(DayKey::parse("0424").unwrap(), vec![]);
    ///
    /// assert!(!first.is_current());
    /// assert!(second.is_current());
    /// assert_eq!(m.latest_generation(), second.generation());
    /// ```
    pub fn begin(&self, day: DayKey, work: Vec<(TrackReference, Color)>) -> MaterializeJob<S> {
        let generation = self.shared.latest.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "[Materializer] generation {} for day {} ({} tracks)",
            generation,
            day,
            work.len()
        );
        MaterializeJob {
            generation,
            day,
            work,
            source: Arc::clone(&self.source),
            shared: Arc::clone(&self.shared),
            concurrency: self.concurrency,
        }
    }

    pub fn latest_generation(&self) -> u64 {
        self.shared.latest.load(Ordering::SeqCst)
    }

    /// The segment set most recently published.
    pub fn current(&self) -> Arc<PublishedTracks> {
        Arc::clone(&self.shared.published.borrow())
    }

    /// Receiver notified on every successful publish.
    pub fn subscribe(&self) -> watch::Receiver<Arc<PublishedTracks>> {
        self.shared.published.subscribe()
    }
}

/// One generation's pending work. Run it on the UI's executor.
#[must_use = "a job does nothing until run"]
pub struct MaterializeJob<S> {
    generation: u64,
    day: DayKey,
    work: Vec<(TrackReference, Color)>,
    source: Arc<S>,
    shared: Arc<Shared>,
    concurrency: usize,
}

impl<S: DataSource> MaterializeJob<S> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn day(&self) -> &DayKey {
        &self.day
    }

    pub fn is_current(&self) -> bool {
        self.shared.is_current(self.generation)
    }

    /// Fetch, decode, and publish. Failures of single files are recorded in
    /// the published set and do not stop the others.
    pub async fn run(self) -> MaterializeOutcome {
        let start = Instant::now();
        let generation = self.generation;

        let results: Vec<std::result::Result<Vec<TrackSegment>, TrackFailure>> =
            stream::iter(self.work.iter())
                .map(|(reference, color)| {
                    materialize_one(&*self.source, &self.shared, generation, reference, *color)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut segments = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(s) => segments.extend(s),
                Err(f) => failures.push(f),
            }
        }

        let segment_count = segments.len();
        let failure_count = failures.len();
        let day = self.day.clone();

        let published = self.shared.published.send_if_modified(|current| {
            if !self.shared.is_current(generation) {
                return false;
            }
            *current = Arc::new(PublishedTracks {
                generation,
                day: Some(day),
                segments,
                failures,
            });
            true
        });

        if published {
            info!(
                "[Materializer] generation {} published day {}: {} segments, {} failures in {:?}",
                generation,
                self.day,
                segment_count,
                failure_count,
                start.elapsed()
            );
            MaterializeOutcome::Published {
                generation,
                day: self.day,
                segments: segment_count,
                failures: failure_count,
            }
        } else {
            debug!(
                "[Materializer] generation {} for day {} superseded by {}, dropped",
                generation,
                self.day,
                self.shared.latest.load(Ordering::SeqCst)
            );
            MaterializeOutcome::Superseded {
                generation,
                day: self.day,
            }
        }
    }
}

async fn materialize_one<S: DataSource>(
    source: &S,
    shared: &Shared,
    generation: u64,
    reference: &TrackReference,
    color: Color,
) -> std::result::Result<Vec<TrackSegment>, TrackFailure> {
    // Superseded generations stop fetching; their result is discarded anyway.
    if !shared.is_current(generation) {
        return Ok(Vec::new());
    }

    let lines = match source.fetch(&reference.url).await {
        Ok(bytes) => decode_gpx_lines(&bytes, &reference.url),
        Err(e) => Err(e),
    };

    match lines {
        Ok(lines) => {
            debug!("[Materializer] {}: {} lines", reference.file, lines.len());
            Ok(lines
                .into_iter()
                .map(|coordinates| TrackSegment {
                    participant: reference.participant.clone(),
                    file: reference.file.clone(),
                    coordinates,
                    color,
                })
                .collect())
        }
        Err(e) => {
            warn!("[Materializer] {}: {}", reference.file, e);
            Err(TrackFailure {
                file: reference.file.clone(),
                reason: e.to_string(),
            })
        }
    }
}

//! One viewing session: the loaded datasets and everything derived from them.
//!
//! A session is built once at startup and owns the single identity registry,
//! the day index, the selected day and photo, and the track materializer.
//! The UI drives it with day selections, clicks, and key presses; each day
//! selection hands back a [`MaterializeJob`] for the UI's executor to run.

use crate::config::ViewerConfig;
use crate::days::{filter_day, DayIndex, DayKey, DaySlice};
use crate::error::{Error, Result};
use crate::identity::{IdentityRegistry, LegendEntry};
use crate::materialize::{MaterializeJob, PublishedTracks, TrackMaterializer};
use crate::photos::{load_photo_log, PhotoRecord};
use crate::render::{build_scene, DetailPanel, Key, MapScene, MarkerIndex, Selection};
use crate::source::DataSource;
use crate::tracks::{load_track_index, TrackReference};
use crate::GpsPoint;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;

/// Outcome of loading one dataset. A failed dataset reads as empty.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loaded(Vec<T>),
    Failed(String),
}

impl<T> LoadState<T> {
    fn from_result(dataset: &str, result: Result<Vec<T>>) -> Self {
        match result {
            Ok(items) => LoadState::Loaded(items),
            Err(e) => {
                error!("[Session] {} unavailable: {}", dataset, e);
                LoadState::Failed(e.to_string())
            }
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            LoadState::Loaded(items) => items,
            LoadState::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Loaded(_) => None,
            LoadState::Failed(reason) => Some(reason),
        }
    }
}

pub struct Session<S> {
    config: ViewerConfig,
    registry: IdentityRegistry,
    photos: LoadState<PhotoRecord>,
    tracks: LoadState<TrackReference>,
    day_index: DayIndex,
    selected_day: Option<DayKey>,
    selection: Selection,
    materializer: TrackMaterializer<S>,
}

impl<S: DataSource> Session<S> {
    /// Load both datasets and build the day index.
    ///
    /// The two loads are independent: either may fail without affecting the
    /// other. Only an invalid configuration is an error.
    ///
    /// # Arguments
    /// * `source` - Where the photo log, track index, and track files live
    /// * `config` - Resource URLs plus identity, day, and map settings
    ///
    /// # Returns
    /// A session with no day selected. A dataset that failed to load reads
    /// as empty and reports its reason through [`LoadState::error`].
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use photo_route_map::{MemorySource, Session, ViewerConfig};
    ///
    /// let source = MemorySource::new()
    ///     .with("/data/photos.csv", "kato/IMG1.jpg,2025-04-23T10:00:00,35.0,139.0,food\n")
    ///     .with("/routes/index.json", "[]");
    ///
    /// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    /// let mut session = rt
    ///     .block_on(Session::load(Arc::new(source), ViewerConfig::default()))
    ///     .unwrap();
    ///
    /// assert_eq!(session.photos().items().len(), 1);
    /// assert!(session.select_initial_day().is_some());
    /// ```
    pub async fn load(source: Arc<S>, config: ViewerConfig) -> Result<Self> {
        config.validate()?;
        let registry = IdentityRegistry::from_config(&config.identity)?;

        let (photos, tracks) = futures::join!(
            load_photo_log(&*source, &config.photo_log_url, &config.photo_url_prefix),
            load_track_index(&*source, &config.track_index_url),
        );
        let photos = LoadState::from_result("photo log", photos);
        let tracks = LoadState::from_result("track index", tracks);

        let day_index = DayIndex::from_config(&config.days, photos.items(), tracks.items());
        info!(
            "[Session] {} photos, {} tracks, {} selectable days",
            photos.items().len(),
            tracks.items().len(),
            day_index.len()
        );

        let materializer = TrackMaterializer::new(source, config.track_concurrency);
        Ok(Self {
            config,
            registry,
            photos,
            tracks,
            day_index,
            selected_day: None,
            selection: Selection::default(),
            materializer,
        })
    }

    /// Select the first indexed day if nothing is selected yet.
    pub fn select_initial_day(&mut self) -> Option<MaterializeJob<S>> {
        if self.selected_day.is_some() {
            return None;
        }
        let first = self.day_index.first()?.clone();
        self.select_day(&first).ok()
    }

    /// Switch to `day`: closes the detail panel and starts a new track
    /// generation, superseding any still running.
    pub fn select_day(&mut self, day: &DayKey) -> Result<MaterializeJob<S>> {
        if !self.day_index.contains(day) {
            return Err(Error::UnknownDay(day.to_string()));
        }
        self.selected_day = Some(day.clone());
        self.selection.clear();

        let slice = filter_day(self.photos.items(), self.tracks.items(), day);
        let work = slice
            .tracks
            .iter()
            .map(|t| ((*t).clone(), self.registry.color_of(&t.participant)))
            .collect();
        info!(
            "[Session] day {}: {} photos, {} tracks",
            day,
            slice.photos.len(),
            slice.tracks.len()
        );
        Ok(self.materializer.begin(day.clone(), work))
    }

    /// The selected day's photos and track references.
    pub fn today(&self) -> Option<DaySlice<'_>> {
        let day = self.selected_day.as_ref()?;
        Some(filter_day(self.photos.items(), self.tracks.items(), day))
    }

    pub fn scene(&mut self) -> MapScene {
        let published = self.materializer.current();
        let photos: Vec<&PhotoRecord> = match &self.selected_day {
            Some(day) => filter_day(self.photos.items(), &[], day).photos,
            None => Vec::new(),
        };
        build_scene(&photos, &published, &mut self.registry, &self.config.map)
    }

    /// Open the detail panel for the marker under `point`, if any.
    pub fn click(&mut self, point: GpsPoint) -> Option<DetailPanel> {
        let scene = self.scene();
        let hit = MarkerIndex::new(&scene.markers).hit(point, self.config.map.hit_radius_meters)?;
        self.selection.select(scene.markers[hit].key.clone());
        self.detail_panel()
    }

    /// Select a photo of the current day by marker key.
    pub fn select_photo(&mut self, marker_key: &str) -> Option<DetailPanel> {
        let today = self.today()?;
        if !today.photos.iter().any(|p| p.marker_key() == marker_key) {
            return None;
        }
        self.selection.select(marker_key);
        self.detail_panel()
    }

    pub fn close_panel(&mut self) {
        self.selection.clear();
    }

    /// Returns whether the key closed the panel.
    pub fn handle_key(&mut self, key: Key) -> bool {
        self.selection.handle_key(key)
    }

    pub fn detail_panel(&self) -> Option<DetailPanel> {
        let today = self.today()?;
        let photo = self.selection.resolve(&today.photos)?;
        Some(DetailPanel::for_photo(photo, &self.registry))
    }

    pub fn days(&self) -> &[DayKey] {
        self.day_index.days()
    }

    pub fn selected_day(&self) -> Option<&DayKey> {
        self.selected_day.as_ref()
    }

    pub fn photos(&self) -> &LoadState<PhotoRecord> {
        &self.photos
    }

    pub fn tracks(&self) -> &LoadState<TrackReference> {
        &self.tracks
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.registry.legend()
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn published_tracks(&self) -> Arc<PublishedTracks> {
        self.materializer.current()
    }

    pub fn subscribe_tracks(&self) -> watch::Receiver<Arc<PublishedTracks>> {
        self.materializer.subscribe()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

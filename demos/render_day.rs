//! Load a published site directory and print what the map would draw.
//!
//! Run with: cargo run --example render_day -- <site-dir> [MMDD]
//!
//! `<site-dir>` is the directory served at `/`, containing `data/photos.csv`
//! and `routes/index.json`. A `viewer.json` there overrides the defaults.

use std::path::PathBuf;
use std::sync::Arc;

use photo_route_map::{DayKey, FsSource, MaterializeOutcome, Session, ViewerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    let day = args.next().map(|s| s.parse::<DayKey>()).transpose()?;

    let config_path = root.join("viewer.json");
    let config = if config_path.exists() {
        ViewerConfig::from_json_file(&config_path)?
    } else {
        ViewerConfig::default()
    };

    let source = Arc::new(FsSource::new(&root));
    let mut session = Session::load(source, config).await?;

    if let Some(error) = session.photos().error() {
        println!("photo log unavailable: {}", error);
    }
    if let Some(error) = session.tracks().error() {
        println!("track index unavailable: {}", error);
    }

    let job = match day {
        Some(day) => Some(session.select_day(&day)?),
        None => session.select_initial_day(),
    };
    let Some(job) = job else {
        println!("no days to show");
        return Ok(());
    };

    match job.run().await {
        MaterializeOutcome::Published { day, segments, failures, .. } => {
            println!("day {}: {} lines drawn, {} tracks failed", day, segments, failures);
        }
        MaterializeOutcome::Superseded { day, .. } => {
            println!("day {}: superseded", day);
        }
    }

    let scene = session.scene();
    println!("\nLegend:");
    for entry in &scene.legend {
        println!("  {}  {}", entry.color, entry.label);
    }

    println!("\nMarkers:");
    for marker in &scene.markers {
        println!(
            "  {} {} at ({:.5}, {:.5}) border {}",
            marker.badge,
            marker.key,
            marker.position.latitude,
            marker.position.longitude,
            marker.border_color
        );
    }

    println!("\nTracks:");
    for line in &scene.polylines {
        println!("  {} points, color {}", line.positions.len(), line.color);
    }

    if let Some(bounds) = scene.bounds {
        let center = bounds.center();
        println!("\nExtent center: ({:.5}, {:.5})", center.latitude, center.longitude);
    }

    Ok(())
}

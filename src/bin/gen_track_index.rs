//! Build `public/routes/index.json` from the published track logs.
//!
//! Run from the site root: `cargo run --bin gen-track-index`

use log::error;
use photo_route_map::tracks::{PARTICIPANTS, ROUTES_ROOT};
use photo_route_map::{generate_track_index, write_track_index};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let root = Path::new(ROUTES_ROOT);
    let result = generate_track_index(root, &PARTICIPANTS)
        .and_then(|refs| write_track_index(root, &refs).map(|_| refs.len()));

    match result {
        Ok(count) => {
            println!("index.json written ({} GPX)", count);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[gen-track-index] {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

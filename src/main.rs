//! Target Vision - heading, offset and distance to the field target
//!
//! This is the main entry point for the target-vision service binary.

use std::env;

use target_vision::calibration::{CalibrationController, FocalLength, StoreError};
use target_vision::pipeline::ReplaySource;
use target_vision::settings::VisionSettings;
use target_vision::table::MemoryTable;
use target_vision::tracker::TargetTracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut settings = VisionSettings::load();

    // Environment overrides take precedence over the settings file
    settings.field_of_view_deg = env::var("VISION_FOV_DEG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(settings.field_of_view_deg);
    settings.target_width_in = env::var("VISION_TARGET_WIDTH_IN")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(settings.target_width_in);
    settings.target_height_in = env::var("VISION_TARGET_HEIGHT_IN")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(settings.target_height_in);
    settings.distance_model = env::var("VISION_DISTANCE_MODEL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(settings.distance_model);
    settings.calibration_axis = env::var("VISION_CALIBRATION_AXIS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(settings.calibration_axis);
    settings.remount = env::var("VISION_REMOUNT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(settings.remount);
    settings.focal_length_path =
        env::var("VISION_FOCAL_LENGTH_PATH").unwrap_or(settings.focal_length_path);

    println!("🎯 Target Vision - heading, offset and distance to the field target");
    println!("===================================================================");
    println!("Table: {}", settings.table_name);
    println!(
        "Target: {} x {} in, FOV {} deg",
        settings.target_width_in, settings.target_height_in, settings.field_of_view_deg
    );
    println!(
        "Distance model: {:?} (calibration axis {:?})",
        settings.distance_model, settings.calibration_axis
    );
    println!("Focal length file: {}", settings.focal_length_path);
    println!(
        "Remount: {:?} over {:?}",
        settings.remount, settings.remount_targets
    );
    println!("===================================================================\n");

    let store = settings.store();
    let focal = match store.load() {
        Ok(focal) => {
            match focal.get() {
                Some(value) => {
                    tracing::info!("Loaded focal length {} from {}", value, store.path().display())
                }
                None => tracing::warn!(
                    "No stored focal length at {}; distance reads -1 until calibrated",
                    store.path().display()
                ),
            }
            focal
        }
        Err(e @ StoreError::IllegalData { .. }) => {
            tracing::error!("{}; run a calibration to repair it", e);
            FocalLength::unset()
        }
        Err(e) => {
            tracing::error!("Could not read the stored focal length: {}", e);
            FocalLength::unset()
        }
    };

    let controller = CalibrationController::new(
        store,
        settings.target_spec(),
        settings.calibration_axis,
        focal,
    );
    let mut tracker = TargetTracker::new(MemoryTable::new(), settings.transform(), controller);

    // Replay a recorded results file when given one, otherwise consume the
    // live pipeline stream on stdin.
    match args.get(1) {
        Some(path) => tracker.run(ReplaySource::from_path(path)?).await,
        None => tracker.run(ReplaySource::stdin()).await,
    }

    Ok(())
}

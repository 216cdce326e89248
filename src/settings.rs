//! Deployment settings for the vision service.
//! Persisted in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::calibration::{
    CalibrationStore, RemountMode, DEFAULT_FOCAL_LENGTH_PATH, DEFAULT_REMOUNT_TARGETS,
    DEFAULT_SETTLE_MS,
};
use crate::geometry::{
    DistanceModel, GeometryTransform, TargetAxis, TargetSpec, DEFAULT_FOV_DEG,
    DEFAULT_TARGET_HEIGHT_IN, DEFAULT_TARGET_WIDTH_IN,
};

/// Service settings that can be saved and loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    /// Control-plane table the measurements publish into
    pub table_name: String,
    /// Assumed horizontal field of view in degrees
    pub field_of_view_deg: f64,
    /// Physical target width in inches
    pub target_width_in: f64,
    /// Physical target height in inches
    pub target_height_in: f64,
    /// Distance model ("linear-focal" or "empirical")
    pub distance_model: DistanceModel,
    /// Target axis the focal length is calibrated against ("width" or "height")
    pub calibration_axis: TargetAxis,
    /// Where the focal length is stored
    pub focal_length_path: String,
    /// How the store gains write access ("sudo" or "disabled")
    pub remount: RemountMode,
    /// Mounts flipped read-write around a calibration write
    pub remount_targets: Vec<String>,
    /// Pause between remounting read-write and writing, in milliseconds
    pub remount_settle_ms: u64,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            table_name: "vision".to_string(),
            field_of_view_deg: DEFAULT_FOV_DEG,
            target_width_in: DEFAULT_TARGET_WIDTH_IN,
            target_height_in: DEFAULT_TARGET_HEIGHT_IN,
            distance_model: DistanceModel::default(),
            calibration_axis: TargetAxis::default(),
            focal_length_path: DEFAULT_FOCAL_LENGTH_PATH.to_string(),
            remount: RemountMode::default(),
            remount_targets: DEFAULT_REMOUNT_TARGETS.iter().map(|s| s.to_string()).collect(),
            remount_settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

impl VisionSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "targetvision", "target-vision")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir().ok_or("Cannot determine config directory")?;

        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;

        let path = dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }

    /// The physical target dimensions these settings describe.
    pub fn target_spec(&self) -> TargetSpec {
        TargetSpec::new(self.target_width_in, self.target_height_in)
    }

    /// Build the geometry transform these settings describe.
    pub fn transform(&self) -> GeometryTransform {
        GeometryTransform::new(self.target_spec())
            .with_fov_deg(self.field_of_view_deg)
            .with_model(self.distance_model)
            .with_axis(self.calibration_axis)
    }

    /// Build the calibration store these settings describe.
    pub fn store(&self) -> CalibrationStore {
        CalibrationStore::new(&self.focal_length_path)
            .with_remount(self.remount)
            .with_remount_targets(&self.remount_targets)
            .with_settle(std::time::Duration::from_millis(self.remount_settle_ms))
    }
}

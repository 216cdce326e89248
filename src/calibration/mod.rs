//! Focal length calibration: the live constant, its durable storage, and
//! the operator-triggered recalibration flow.

mod constant;
mod controller;
mod store;

pub use constant::FocalLength;
pub use controller::{CalibrationController, CalibrationEvent, CalibrationState};
pub use store::{
    CalibrationStore, RemountMode, StoreError, DEFAULT_FOCAL_LENGTH_PATH,
    DEFAULT_REMOUNT_TARGETS, DEFAULT_SETTLE_MS,
};

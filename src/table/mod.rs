//! Control-plane table shared with the robot code and operator dashboards.
//!
//! The deployed service publishes into a networked key/value table; this
//! module abstracts that facility behind a trait so the pipeline, the
//! calibration flow, and the tests all run against an in-process map.

mod memory;

pub use memory::MemoryTable;

/// Published in place of a distance when no estimate is available.
pub const INVALID_DISTANCE: f64 = -1.0;

/// Keys this service publishes and watches.
pub mod keys {
    /// Heading offset to the target in degrees; positive means the target
    /// sits left of frame center.
    pub const DEGREE_OFFSET: &str = "degree_offset";
    /// Lateral offset to the target in inches, same sign as the heading.
    pub const INCH_OFFSET: &str = "inch_offset";
    /// Forward distance to the target in inches, or -1 when unknown.
    pub const CURRENT_DISTANCE: &str = "current_distance";
    /// Apparent target width in pixels.
    pub const PIXEL_WIDTH: &str = "pixel_width";
    /// Apparent target height in pixels.
    pub const PIXEL_HEIGHT: &str = "pixel_height";
    /// Vertical pixel offset of the target from frame center.
    pub const PIXEL_Y_DIST: &str = "pixel_y_dist";
    /// Distance from the empirical height fit, in inches.
    pub const HEIGHT_DISTANCE: &str = "height_distance";
    /// Distance from the empirical width fit, in inches.
    pub const WIDTH_DISTANCE: &str = "width_distance";
    /// Average of the two empirical fits, in inches.
    pub const AVERAGE_DISTANCE: &str = "average_distance";
    /// Operator-set trigger requesting a recalibration; cleared on consume.
    pub const CALIBRATION_ENABLE: &str = "fl_calibration_enable";
    /// Operator-measured distance to the target in inches.
    pub const CALIBRATION_DISTANCE: &str = "fl_calibration_distance";
}

/// Key/value facility shared with the rest of the robot.
pub trait ControlPlane {
    /// Read a numeric entry, falling back when the key is absent.
    fn get_f64(&self, key: &str, default: f64) -> f64;
    /// Publish a numeric entry.
    fn set_f64(&self, key: &str, value: f64);
    /// Read a boolean entry, falling back when the key is absent.
    fn get_bool(&self, key: &str, default: bool) -> bool;
    /// Publish a boolean entry.
    fn set_bool(&self, key: &str, value: bool);
    /// Whether any entry exists under the key.
    fn contains_key(&self, key: &str) -> bool;
}

/// Seed the operator-editable calibration keys with their inert defaults.
///
/// Dashboards can only edit keys that exist, so the trigger and the known
/// distance are created up front. Values already published survive a
/// service restart untouched.
pub fn seed_operator_defaults<T: ControlPlane + ?Sized>(table: &T) {
    if !table.contains_key(keys::CALIBRATION_DISTANCE) {
        table.set_f64(keys::CALIBRATION_DISTANCE, INVALID_DISTANCE);
    }
    if !table.contains_key(keys::CALIBRATION_ENABLE) {
        table.set_bool(keys::CALIBRATION_ENABLE, false);
    }
}

//! The focal-length calibration constant.

/// Camera-specific constant relating apparent pixel size to physical
/// distance, or an explicit "never calibrated" sentinel.
///
/// This is the one value that outlives a single frame. It is loaded from
/// the [`CalibrationStore`](super::CalibrationStore) once at startup,
/// replaced only when an operator-triggered calibration commits, and read
/// by the geometry transform on every frame. While unset, distance
/// estimation under the linear model degrades to an explicit invalid
/// result instead of a silently wrong number.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FocalLength(Option<f64>);

impl FocalLength {
    /// The never-calibrated sentinel.
    pub fn unset() -> Self {
        Self(None)
    }

    /// A calibrated constant. `value` must be positive; every producer
    /// (store load, calibration recomputation) validates this before
    /// constructing.
    pub fn set(value: f64) -> Self {
        Self(Some(value))
    }

    /// The constant, if calibrated.
    pub fn get(&self) -> Option<f64> {
        self.0
    }

    /// Whether a calibration has ever been committed or loaded.
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

//! Pure transform from pixel-space target geometry to robot-relative
//! navigation quantities.

use std::fmt;

use thiserror::Error;

use super::model::{DistanceEstimate, DistanceModel, EmpiricalDiagnostics};
use super::observation::{TargetAxis, TargetObservation, TargetSpec};
use crate::calibration::FocalLength;

/// Default assumed horizontal field of view, in degrees.
pub const DEFAULT_FOV_DEG: f64 = 60.0;

/// Geometry errors. Degenerate detections are rejected here so that
/// NaN/infinity can never reach the control plane.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    #[error("degenerate bounding rect: {width}x{height} px")]
    DegenerateRect { width: f64, height: f64 },
    #[error("degenerate frame width: {0} px")]
    DegenerateFrame(f64),
}

/// Navigation quantities computed for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    /// Angular offset of the target from the frame center, in degrees.
    /// Positive when the target lies to the frame's left of center.
    pub heading_offset_deg: f64,
    /// Lateral offset of the target from the frame center, in inches.
    pub lateral_offset_in: f64,
    /// Estimated distance to the target, in inches. `None` when the linear
    /// model is selected but no focal length has been calibrated.
    pub distance_in: Option<f64>,
    /// Apparent target width, in pixels.
    pub pixel_width: f64,
    /// Apparent target height, in pixels.
    pub pixel_height: f64,
    /// Vertical offset of the target center from the frame center, in
    /// pixels (positive above center).
    pub pixel_y_dist: f64,
    /// Per-fit diagnostics, present when the empirical model ran.
    pub empirical: Option<EmpiricalDiagnostics>,
}

/// One-line rendering used by the frame log.
impl fmt::Display for Measurements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "heading {:+.2} deg, lateral {:+.2} in, {:.0} x {:.0} px",
            self.heading_offset_deg, self.lateral_offset_in, self.pixel_width, self.pixel_height
        )?;
        match self.distance_in {
            Some(distance_in) => write!(f, ", distance {:.1} in", distance_in),
            None => write!(f, ", distance uncalibrated"),
        }
    }
}

/// Converts a [`TargetObservation`] into [`Measurements`].
///
/// Pure computation: no I/O, no mutation. The focal length is passed by
/// value on every call so the transform never holds calibration state.
#[derive(Debug, Clone, Copy)]
pub struct GeometryTransform {
    target: TargetSpec,
    fov_deg: f64,
    model: DistanceModel,
    axis: TargetAxis,
}

impl Default for GeometryTransform {
    fn default() -> Self {
        Self::new(TargetSpec::default())
    }
}

impl GeometryTransform {
    /// Create a transform for the given target with default field of view,
    /// distance model and axis.
    pub fn new(target: TargetSpec) -> Self {
        Self {
            target,
            fov_deg: DEFAULT_FOV_DEG,
            model: DistanceModel::default(),
            axis: TargetAxis::default(),
        }
    }

    /// Set the assumed field of view in degrees.
    pub fn with_fov_deg(mut self, fov_deg: f64) -> Self {
        self.fov_deg = fov_deg;
        self
    }

    /// Select the distance estimation model.
    pub fn with_model(mut self, model: DistanceModel) -> Self {
        self.model = model;
        self
    }

    /// Set the target axis used by the linear focal model.
    pub fn with_axis(mut self, axis: TargetAxis) -> Self {
        self.axis = axis;
        self
    }

    /// The configured distance model.
    pub fn model(&self) -> DistanceModel {
        self.model
    }

    /// The physical target dimensions this transform converts against.
    pub fn target(&self) -> TargetSpec {
        self.target
    }

    /// Compute the navigation quantities for one observation.
    pub fn measure(
        &self,
        observation: &TargetObservation,
        focal: FocalLength,
    ) -> Result<Measurements, GeometryError> {
        let rect = &observation.rect;
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(GeometryError::DegenerateRect {
                width: rect.width,
                height: rect.height,
            });
        }
        if observation.frame_width <= 0.0 {
            return Err(GeometryError::DegenerateFrame(observation.frame_width));
        }

        // Pixel offset of the target center from the frame center; positive
        // means the target is left of center.
        let pixel_offset = observation.frame_width / 2.0 - rect.center_x();
        let heading_offset_deg = (pixel_offset / observation.frame_width) * self.fov_deg;
        let lateral_offset_in = pixel_offset * (self.target.width_in / rect.width);
        let pixel_y_dist = observation.frame_height / 2.0 - rect.center_y();

        let (distance_in, empirical) =
            match self.model.estimate(rect, &self.target, focal, self.axis) {
                DistanceEstimate::Measured(d) => (Some(d), None),
                DistanceEstimate::Empirical(diag) => (Some(diag.average_distance_in), Some(diag)),
                DistanceEstimate::Uncalibrated => (None, None),
            };

        Ok(Measurements {
            heading_offset_deg,
            lateral_offset_in,
            distance_in,
            pixel_width: rect.width,
            pixel_height: rect.height,
            pixel_y_dist,
            empirical,
        })
    }
}

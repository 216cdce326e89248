//! Distance estimation strategies.
//!
//! Two interchangeable models are supported, selectable by configuration:
//!
//! - **Linear focal**: pinhole relation `distance = focal * physical / pixels`
//!   along a configured target axis. Requires a previously calibrated focal
//!   length; without one the estimate is reported as uncalibrated rather
//!   than a wrong number.
//! - **Empirical**: a regression fit of distance against the target's
//!   apparent pixel height and width, averaged. Self-contained (no focal
//!   length), but only meaningful inside the pixel ranges it was fitted
//!   over; see [`EMPIRICAL_HEIGHT_RANGE_PX`] and [`EMPIRICAL_WIDTH_RANGE_PX`].

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::observation::{BoundingRect, TargetAxis, TargetSpec};
use crate::calibration::FocalLength;

/// Height fit: `distance = (height_px - 66.1) / -0.145`.
const HEIGHT_FIT_INTERCEPT_PX: f64 = 66.1;
const HEIGHT_FIT_SLOPE_PX_PER_IN: f64 = -0.145;

/// Width fit: `distance = 0.00191*w^2 - 1.41*w + 231`.
const WIDTH_FIT_QUADRATIC: f64 = 0.00191;
const WIDTH_FIT_LINEAR: f64 = -1.41;
const WIDTH_FIT_CONSTANT: f64 = 231.0;

/// Pixel heights the empirical height fit was regressed over. Outside this
/// window the fit extrapolates into non-physical values (negative distances
/// above ~66 px).
pub const EMPIRICAL_HEIGHT_RANGE_PX: RangeInclusive<f64> = 15.0..=65.0;

/// Pixel widths the empirical width fit was regressed over. The quadratic
/// turns back upward past its vertex (~369 px) and goes negative well
/// before that, so wider detections are extrapolations.
pub const EMPIRICAL_WIDTH_RANGE_PX: RangeInclusive<f64> = 20.0..=250.0;

/// Distance model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceModel {
    /// Pinhole model using the calibrated focal length.
    #[default]
    LinearFocal,
    /// Regression fit over apparent pixel size; ignores the focal length.
    Empirical,
}

impl std::str::FromStr for DistanceModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear-focal" => Ok(Self::LinearFocal),
            "empirical" => Ok(Self::Empirical),
            other => Err(format!("unknown distance model: {other:?}")),
        }
    }
}

/// Per-fit outputs of the empirical model, published as diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmpiricalDiagnostics {
    /// Distance from the height fit, in inches.
    pub height_distance_in: f64,
    /// Distance from the width fit, in inches.
    pub width_distance_in: f64,
    /// Average of the two fits, in inches; the model's distance estimate.
    pub average_distance_in: f64,
    /// True when either pixel dimension fell outside its fitted range,
    /// i.e. the values above are extrapolations.
    pub extrapolated: bool,
}

/// Outcome of a distance estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceEstimate {
    /// Linear focal model produced a distance, in inches.
    Measured(f64),
    /// Empirical model produced a distance plus per-fit diagnostics.
    Empirical(EmpiricalDiagnostics),
    /// Linear focal model selected but no focal length has been calibrated.
    Uncalibrated,
}

impl DistanceModel {
    /// Estimate the distance to a target with the given bounding rectangle.
    ///
    /// The caller guarantees positive rectangle dimensions; degenerate
    /// rectangles are rejected earlier by the geometry transform.
    pub(crate) fn estimate(
        &self,
        rect: &BoundingRect,
        target: &TargetSpec,
        focal: FocalLength,
        axis: TargetAxis,
    ) -> DistanceEstimate {
        match self {
            Self::LinearFocal => match focal.get() {
                Some(focal_px) => {
                    let ratio = target.dim_along(axis) / rect.dim_along(axis);
                    DistanceEstimate::Measured(focal_px * ratio)
                }
                None => DistanceEstimate::Uncalibrated,
            },
            Self::Empirical => {
                let height_distance_in =
                    (rect.height - HEIGHT_FIT_INTERCEPT_PX) / HEIGHT_FIT_SLOPE_PX_PER_IN;
                let width_distance_in = WIDTH_FIT_QUADRATIC * rect.width * rect.width
                    + WIDTH_FIT_LINEAR * rect.width
                    + WIDTH_FIT_CONSTANT;
                let extrapolated = !EMPIRICAL_HEIGHT_RANGE_PX.contains(&rect.height)
                    || !EMPIRICAL_WIDTH_RANGE_PX.contains(&rect.width);

                DistanceEstimate::Empirical(EmpiricalDiagnostics {
                    height_distance_in,
                    width_distance_in,
                    average_distance_in: (height_distance_in + width_distance_in) / 2.0,
                    extrapolated,
                })
            }
        }
    }
}

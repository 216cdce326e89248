//! Per-frame observation types produced by the upstream detection pipeline.

use serde::{Deserialize, Serialize};

/// Default physical width of the vision target, in inches.
pub const DEFAULT_TARGET_WIDTH_IN: f64 = 39.25;

/// Default physical height of the vision target, in inches.
pub const DEFAULT_TARGET_HEIGHT_IN: f64 = 17.0;

/// Axis of the target used for focal-length work (calibration and the
/// linear distance model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetAxis {
    /// Use the bounding rectangle's width against the physical width.
    #[default]
    Width,
    /// Use the bounding rectangle's height against the physical height.
    Height,
}

impl std::str::FromStr for TargetAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "width" => Ok(Self::Width),
            "height" => Ok(Self::Height),
            other => Err(format!("unknown target axis: {other:?}")),
        }
    }
}

/// Axis-aligned pixel-space box enclosing the detected target contour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    /// Left edge, in pixels from the frame's left border.
    pub x: f64,
    /// Top edge, in pixels from the frame's top border.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl BoundingRect {
    /// Create a bounding rectangle from its top-left corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Horizontal center of the rectangle, in pixels.
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Vertical center of the rectangle, in pixels.
    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Pixel extent of the rectangle along the given axis.
    pub fn dim_along(&self, axis: TargetAxis) -> f64 {
        match axis {
            TargetAxis::Width => self.width,
            TargetAxis::Height => self.height,
        }
    }
}

/// A single detected target, valid for exactly one frame.
///
/// Produced by the external detection pipeline and discarded after the
/// frame is processed; no identity persists across frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetObservation {
    /// Bounding rectangle of the detected contour.
    pub rect: BoundingRect,
    /// Width of the source frame, in pixels.
    pub frame_width: f64,
    /// Height of the source frame, in pixels.
    pub frame_height: f64,
}

impl TargetObservation {
    /// Create an observation from a rectangle and the frame dimensions.
    pub fn new(rect: BoundingRect, frame_width: f64, frame_height: f64) -> Self {
        Self {
            rect,
            frame_width,
            frame_height,
        }
    }
}

/// Known real-world dimensions of the vision target.
///
/// Immutable for the lifetime of the process; used both for pixel-to-inch
/// conversion and for deriving the focal length during calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Physical width of the target, in inches.
    pub width_in: f64,
    /// Physical height of the target, in inches.
    pub height_in: f64,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            width_in: DEFAULT_TARGET_WIDTH_IN,
            height_in: DEFAULT_TARGET_HEIGHT_IN,
        }
    }
}

impl TargetSpec {
    /// Create a target specification from physical dimensions in inches.
    pub fn new(width_in: f64, height_in: f64) -> Self {
        Self {
            width_in,
            height_in,
        }
    }

    /// Physical extent of the target along the given axis, in inches.
    pub fn dim_along(&self, axis: TargetAxis) -> f64 {
        match axis {
            TargetAxis::Width => self.width_in,
            TargetAxis::Height => self.height_in,
        }
    }
}

//! Pixel-space target geometry and its conversion to physical measurements.

mod model;
mod observation;
mod transform;

pub use model::{
    DistanceEstimate, DistanceModel, EmpiricalDiagnostics, EMPIRICAL_HEIGHT_RANGE_PX,
    EMPIRICAL_WIDTH_RANGE_PX,
};
pub use observation::{
    BoundingRect, TargetAxis, TargetObservation, TargetSpec, DEFAULT_TARGET_HEIGHT_IN,
    DEFAULT_TARGET_WIDTH_IN,
};
pub use transform::{GeometryError, GeometryTransform, Measurements, DEFAULT_FOV_DEG};

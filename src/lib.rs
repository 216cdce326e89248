// Copyright 2026 Target Vision contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Target Vision
//!
//! Turns detected vision-target rectangles into the robot-relative heading,
//! lateral offset and distance the drive code steers by, and keeps the
//! camera's focal length calibrated from an operator-measured distance.
//!
//! Camera capture, color filtering and contour extraction run in an
//! upstream pipeline that streams one JSON result per frame. This crate
//! consumes that stream, publishes measurements into a control-plane table
//! the robot reads, and durably stores the calibrated focal length on the
//! coprocessor's normally read-only filesystem.
//!
//! ## Example
//!
//! ```rust,no_run
//! use target_vision::calibration::{CalibrationController, CalibrationStore, FocalLength};
//! use target_vision::geometry::{GeometryTransform, TargetSpec};
//! use target_vision::pipeline::ReplaySource;
//! use target_vision::table::MemoryTable;
//! use target_vision::tracker::TargetTracker;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let target = TargetSpec::default();
//!     let store = CalibrationStore::new("/home/pi/focal_length.txt");
//!     let focal = store.load().unwrap_or(FocalLength::unset());
//!     let controller = CalibrationController::new(store, target, Default::default(), focal);
//!
//!     let mut tracker = TargetTracker::new(
//!         MemoryTable::new(),
//!         GeometryTransform::new(target),
//!         controller,
//!     );
//!     tracker.run(ReplaySource::stdin()).await;
//!     Ok(())
//! }
//! ```

pub mod calibration;
pub mod geometry;
pub mod pipeline;
pub mod settings;
pub mod table;
pub mod tracker;

pub use calibration::{CalibrationController, CalibrationStore, FocalLength};
pub use geometry::{BoundingRect, GeometryTransform, Measurements, TargetObservation, TargetSpec};
pub use pipeline::{FrameSource, PipelineResult, ReplaySource};
pub use settings::VisionSettings;
pub use table::{ControlPlane, MemoryTable};
pub use tracker::TargetTracker;

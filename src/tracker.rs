//! The frame loop: turn detections into measurements, publish them, and
//! give the calibration controller its tick.

use crate::calibration::CalibrationController;
use crate::geometry::{GeometryTransform, Measurements, TargetObservation};
use crate::pipeline::FrameSource;
use crate::table::{keys, seed_operator_defaults, ControlPlane, INVALID_DISTANCE};

/// Drives one frame source to completion.
///
/// Frames without a detected target publish nothing, so the control plane
/// keeps the last target's measurements until a new target appears. The
/// calibration tick runs after publication; a recalibration therefore takes
/// effect from the next frame on.
pub struct TargetTracker<T: ControlPlane> {
    table: T,
    transform: GeometryTransform,
    controller: CalibrationController,
    frames_seen: u64,
    targets_seen: u64,
}

impl<T: ControlPlane> TargetTracker<T> {
    /// Assemble a tracker from its three collaborators.
    pub fn new(table: T, transform: GeometryTransform, controller: CalibrationController) -> Self {
        Self {
            table,
            transform,
            controller,
            frames_seen: 0,
            targets_seen: 0,
        }
    }

    /// Run until the frame source ends, then flush any in-flight commit.
    pub async fn run<S: FrameSource>(&mut self, mut source: S) {
        seed_operator_defaults(&self.table);
        while let Some(result) = source.next_frame().await {
            self.frames_seen += 1;
            if let Some(observation) = result.observation {
                self.targets_seen += 1;
                self.process(&observation).await;
            }
        }
        self.controller.wait_for_commit().await;
        tracing::info!(
            "Frame source ended after {} frames, {} with a target",
            self.frames_seen,
            self.targets_seen
        );
    }

    async fn process(&mut self, observation: &TargetObservation) {
        let focal = self.controller.focal_length();
        match self.transform.measure(observation, focal) {
            Ok(measurements) => self.publish(&measurements),
            Err(e) => {
                tracing::warn!("Dropping observation: {}", e);
                return;
            }
        }
        self.controller.tick(&self.table, observation).await;
    }

    fn publish(&self, m: &Measurements) {
        self.table.set_f64(keys::DEGREE_OFFSET, m.heading_offset_deg);
        self.table.set_f64(keys::INCH_OFFSET, m.lateral_offset_in);
        self.table.set_f64(
            keys::CURRENT_DISTANCE,
            m.distance_in.unwrap_or(INVALID_DISTANCE),
        );
        self.table.set_f64(keys::PIXEL_WIDTH, m.pixel_width);
        self.table.set_f64(keys::PIXEL_HEIGHT, m.pixel_height);
        self.table.set_f64(keys::PIXEL_Y_DIST, m.pixel_y_dist);
        if let Some(empirical) = &m.empirical {
            self.table
                .set_f64(keys::HEIGHT_DISTANCE, empirical.height_distance_in);
            self.table
                .set_f64(keys::WIDTH_DISTANCE, empirical.width_distance_in);
            self.table
                .set_f64(keys::AVERAGE_DISTANCE, empirical.average_distance_in);
            if empirical.extrapolated {
                tracing::debug!("Empirical fits ran outside their fitted pixel ranges");
            }
        }
        tracing::info!("Target {}", m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CalibrationStore, FocalLength, RemountMode};
    use crate::geometry::{BoundingRect, DistanceModel, TargetSpec};
    use crate::pipeline::PipelineResult;
    use crate::table::MemoryTable;
    use tempfile::TempDir;

    struct Script(std::vec::IntoIter<PipelineResult>);

    impl Script {
        fn new(frames: Vec<PipelineResult>) -> Self {
            Self(frames.into_iter())
        }
    }

    impl FrameSource for Script {
        async fn next_frame(&mut self) -> Option<PipelineResult> {
            self.0.next()
        }
    }

    fn target_frame(rect: BoundingRect) -> PipelineResult {
        PipelineResult {
            observation: Some(TargetObservation::new(rect, 640.0, 480.0)),
        }
    }

    fn empty_frame() -> PipelineResult {
        PipelineResult { observation: None }
    }

    fn tracker_in(dir: &TempDir, table: MemoryTable) -> TargetTracker<MemoryTable> {
        let target = TargetSpec::new(17.0, 17.0);
        let store = CalibrationStore::new(dir.path().join("focal_length.txt"))
            .with_remount(RemountMode::Disabled);
        let controller =
            CalibrationController::new(store, target, Default::default(), FocalLength::unset());
        TargetTracker::new(table, GeometryTransform::new(target), controller)
    }

    #[tokio::test]
    async fn test_publishes_measurements_for_a_centered_target() {
        let dir = TempDir::new().unwrap();
        let table = MemoryTable::default();
        let mut tracker = tracker_in(&dir, table.clone());

        tracker
            .run(Script::new(vec![target_frame(BoundingRect::new(
                290.0, 220.0, 60.0, 40.0,
            ))]))
            .await;

        assert_eq!(table.get_f64(keys::DEGREE_OFFSET, 99.0), 0.0);
        assert_eq!(table.get_f64(keys::INCH_OFFSET, 99.0), 0.0);
        assert_eq!(table.get_f64(keys::PIXEL_WIDTH, 0.0), 60.0);
        assert_eq!(table.get_f64(keys::PIXEL_HEIGHT, 0.0), 40.0);
        assert_eq!(table.get_f64(keys::PIXEL_Y_DIST, 99.0), 0.0);
        // No calibration yet, so the distance publishes as the sentinel.
        assert_eq!(table.get_f64(keys::CURRENT_DISTANCE, 0.0), INVALID_DISTANCE);
    }

    #[tokio::test]
    async fn test_empty_frames_leave_last_measurements_standing() {
        let dir = TempDir::new().unwrap();
        let table = MemoryTable::default();
        let mut tracker = tracker_in(&dir, table.clone());

        tracker
            .run(Script::new(vec![
                target_frame(BoundingRect::new(130.0, 220.0, 60.0, 40.0)),
                empty_frame(),
                empty_frame(),
            ]))
            .await;

        assert_eq!(table.get_f64(keys::DEGREE_OFFSET, 99.0), 15.0);
        assert_eq!(table.get_f64(keys::PIXEL_WIDTH, 0.0), 60.0);
    }

    #[tokio::test]
    async fn test_degenerate_observation_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let table = MemoryTable::default();
        let mut tracker = tracker_in(&dir, table.clone());

        tracker
            .run(Script::new(vec![target_frame(BoundingRect::new(
                100.0, 100.0, 0.0, 40.0,
            ))]))
            .await;

        assert!(!table.contains_key(keys::DEGREE_OFFSET));
    }

    #[tokio::test]
    async fn test_calibration_applies_from_the_next_frame_on() {
        let dir = TempDir::new().unwrap();
        let table = MemoryTable::default();
        let mut tracker = tracker_in(&dir, table.clone());
        table.set_bool(keys::CALIBRATION_ENABLE, true);
        table.set_f64(keys::CALIBRATION_DISTANCE, 120.0);

        // Same pose twice: the first frame is measured before calibration,
        // the second with the fresh focal length reads the true distance.
        let rect = BoundingRect::new(280.0, 220.0, 80.0, 40.0);
        tracker
            .run(Script::new(vec![target_frame(rect), target_frame(rect)]))
            .await;

        assert_eq!(table.get_f64(keys::CURRENT_DISTANCE, 0.0), 120.0);
        assert!(!table.get_bool(keys::CALIBRATION_ENABLE, true));
    }

    #[tokio::test]
    async fn test_empirical_model_publishes_fit_diagnostics() {
        let dir = TempDir::new().unwrap();
        let table = MemoryTable::default();
        let target = TargetSpec::default();
        let store = CalibrationStore::new(dir.path().join("focal_length.txt"))
            .with_remount(RemountMode::Disabled);
        let controller =
            CalibrationController::new(store, target, Default::default(), FocalLength::unset());
        let transform = GeometryTransform::new(target).with_model(DistanceModel::Empirical);
        let mut tracker = TargetTracker::new(table.clone(), transform, controller);

        tracker
            .run(Script::new(vec![target_frame(BoundingRect::new(
                290.0, 220.0, 60.0, 40.0,
            ))]))
            .await;

        let height = (40.0 - 66.1) / -0.145;
        let width = 0.00191 * 60.0 * 60.0 - 1.41 * 60.0 + 231.0;
        assert_eq!(table.get_f64(keys::HEIGHT_DISTANCE, 0.0), height);
        assert_eq!(table.get_f64(keys::WIDTH_DISTANCE, 0.0), width);
        assert_eq!(
            table.get_f64(keys::AVERAGE_DISTANCE, 0.0),
            (height + width) / 2.0
        );
        assert_eq!(
            table.get_f64(keys::CURRENT_DISTANCE, 0.0),
            (height + width) / 2.0
        );
    }
}

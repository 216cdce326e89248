//! Operator-triggered recalibration of the focal length.
//!
//! The operator places the target at a measured distance, publishes that
//! distance, and raises the trigger flag on the control plane. On the next
//! frame with a detected target the controller consumes the flag, recomputes
//! the focal length from the apparent size, and commits it.

use tokio::task::JoinHandle;

use crate::geometry::{TargetAxis, TargetObservation, TargetSpec};
use crate::table::{keys, ControlPlane, INVALID_DISTANCE};

use super::{CalibrationStore, FocalLength, StoreError};

/// Calibration lifecycle. Held across ticks so tests can observe commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    /// No trigger pending and no write in flight.
    Idle,
    /// Trigger consumed this tick; computing the new constant.
    Armed,
    /// A persistence task is in flight.
    Committing,
}

/// What a tick did, when it did anything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationEvent {
    /// A new focal length was computed and committed.
    Recalibrated {
        focal_length: f64,
        known_distance_in: f64,
    },
    /// The trigger fired but the published known distance was unusable.
    Aborted { known_distance_in: f64 },
}

/// Watches the control plane for calibration requests and owns the live
/// focal length.
///
/// The in-memory constant is updated synchronously on the frame loop, so the
/// very next measurement uses it; persistence runs on the blocking pool. If
/// a second trigger lands while a write is still in flight, the newest value
/// is queued and dispatched when the running task completes, so the file
/// always converges to the latest calibration.
#[derive(Debug)]
pub struct CalibrationController {
    store: CalibrationStore,
    target: TargetSpec,
    axis: TargetAxis,
    focal: FocalLength,
    state: CalibrationState,
    pending: Option<JoinHandle<Result<(), StoreError>>>,
    queued: Option<f64>,
}

impl CalibrationController {
    /// Create a controller starting from the focal length loaded at startup.
    pub fn new(
        store: CalibrationStore,
        target: TargetSpec,
        axis: TargetAxis,
        initial: FocalLength,
    ) -> Self {
        Self {
            store,
            target,
            axis,
            focal: initial,
            state: CalibrationState::Idle,
            pending: None,
            queued: None,
        }
    }

    /// The focal length measurements should use right now.
    pub fn focal_length(&self) -> FocalLength {
        self.focal
    }

    /// Where the controller currently is in the calibration lifecycle.
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Service one frame that carries a detected target.
    ///
    /// Reads the trigger flag and clears it before acting, so a request is
    /// consumed exactly once no matter how it was left on the table.
    pub async fn tick<T>(
        &mut self,
        table: &T,
        observation: &TargetObservation,
    ) -> Option<CalibrationEvent>
    where
        T: ControlPlane + ?Sized,
    {
        self.reap_finished().await;

        if !table.get_bool(keys::CALIBRATION_ENABLE, false) {
            return None;
        }
        table.set_bool(keys::CALIBRATION_ENABLE, false);
        self.state = CalibrationState::Armed;

        let known_distance_in = table.get_f64(keys::CALIBRATION_DISTANCE, INVALID_DISTANCE);
        if !known_distance_in.is_finite() || known_distance_in <= 0.0 {
            tracing::warn!(
                "Calibration requested without a usable known distance ({}), ignoring",
                known_distance_in
            );
            self.settle_after_abort();
            return Some(CalibrationEvent::Aborted { known_distance_in });
        }

        let perceived_px = observation.rect.dim_along(self.axis);
        let target_dim_in = self.target.dim_along(self.axis);
        if perceived_px <= 0.0 || target_dim_in <= 0.0 {
            tracing::warn!(
                "Calibration requested against a degenerate target ({} px over {} in), ignoring",
                perceived_px,
                target_dim_in
            );
            self.settle_after_abort();
            return Some(CalibrationEvent::Aborted { known_distance_in });
        }

        let focal_length = known_distance_in * perceived_px / target_dim_in;
        self.focal = FocalLength::set(focal_length);
        if self.pending.is_some() {
            // Keep only the newest value for the disk; the reap dispatches it.
            self.queued = Some(focal_length);
        } else {
            self.pending = Some(self.store.save_async(focal_length));
        }
        self.state = CalibrationState::Committing;
        tracing::info!(
            "Calibrated focal length {} from a {} px target at {} in",
            focal_length,
            perceived_px,
            known_distance_in
        );
        Some(CalibrationEvent::Recalibrated {
            focal_length,
            known_distance_in,
        })
    }

    /// Block until every dispatched and queued persistence task has finished.
    pub async fn wait_for_commit(&mut self) {
        while let Some(handle) = self.pending.take() {
            if let Err(e) = handle.await {
                tracing::error!("Calibration persistence task failed to join: {}", e);
            }
            if let Some(value) = self.queued.take() {
                self.pending = Some(self.store.save_async(value));
            }
        }
        self.state = CalibrationState::Idle;
    }

    /// Collect a finished persistence task, then dispatch any queued value.
    async fn reap_finished(&mut self) {
        let finished = self
            .pending
            .as_ref()
            .is_some_and(|handle| handle.is_finished());
        if !finished {
            return;
        }
        if let Some(handle) = self.pending.take() {
            if let Err(e) = handle.await {
                tracing::error!("Calibration persistence task failed to join: {}", e);
            }
            if let Some(value) = self.queued.take() {
                self.pending = Some(self.store.save_async(value));
            } else {
                self.state = CalibrationState::Idle;
            }
        }
    }

    fn settle_after_abort(&mut self) {
        self.state = if self.pending.is_some() {
            CalibrationState::Committing
        } else {
            CalibrationState::Idle
        };
    }
}

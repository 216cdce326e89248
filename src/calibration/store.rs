//! Durable storage for the focal length on a read-only root filesystem.
//!
//! The coprocessor image mounts its filesystems read-only so power loss
//! cannot corrupt them. Persisting a new calibration therefore brackets the
//! file write with a read-write remount and a read-only restore, issued
//! through `sudo /bin/sh -c` so both mounts flip in one privileged call.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use super::FocalLength;

/// Where the focal length lives on the deployed image.
pub const DEFAULT_FOCAL_LENGTH_PATH: &str = "/home/pi/focal_length.txt";

/// Mounts flipped read-write around a calibration write.
pub const DEFAULT_REMOUNT_TARGETS: [&str; 2] = ["/", "/boot"];

/// Pause between remounting read-write and writing, in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 100;

const SUDO_PATH: &str = "/usr/bin/sudo";

/// How the store gains write access to the calibration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemountMode {
    /// Assume the path is already writable. Used off-robot and in tests.
    Disabled,
    /// Remount the configured targets read-write via sudo, restore read-only after.
    #[default]
    Sudo,
}

impl std::str::FromStr for RemountMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "sudo" => Ok(Self::Sudo),
            other => Err(format!("unknown remount mode: {other:?}")),
        }
    }
}

/// Calibration persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },
    #[error("Calibration file {} holds unusable data: {:?}", .path.display(), .token)]
    IllegalData { path: PathBuf, token: String },
    #[error("Failed to write {}: {}", .path.display(), .source)]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to restore read-only mounts: {0}")]
    MakeReadOnly(String),
}

/// Loads and saves the focal length as a single decimal token in a text file.
///
/// The file format is one `f64` rendered with Rust's shortest round-trip
/// formatting, so a saved value reloads bit-for-bit on any deployment.
///
/// # Example
/// ```rust,no_run
/// use target_vision::calibration::{CalibrationStore, DEFAULT_FOCAL_LENGTH_PATH};
///
/// let store = CalibrationStore::new(DEFAULT_FOCAL_LENGTH_PATH);
/// let focal = store.load();
/// ```
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
    remount: RemountMode,
    targets: Vec<PathBuf>,
    settle: Duration,
    sudo_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CalibrationStore {
    /// Create a store for the given file with the deployed remount defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remount: RemountMode::default(),
            targets: DEFAULT_REMOUNT_TARGETS.iter().map(PathBuf::from).collect(),
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            sudo_path: SUDO_PATH.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Override how write access is obtained.
    pub fn with_remount(mut self, remount: RemountMode) -> Self {
        self.remount = remount;
        self
    }

    /// Override which mounts are flipped read-write around a save.
    pub fn with_remount_targets<I, P>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Override the pause between remounting read-write and writing.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Override the privilege helper invoked for remount commands. Used in
    /// tests and on images where sudo lives elsewhere.
    pub fn with_sudo_path(mut self, sudo_path: impl Into<PathBuf>) -> Self {
        self.sudo_path = sudo_path.into();
        self
    }

    /// The calibration file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored focal length.
    ///
    /// A missing file is the never-calibrated state and loads as unset.
    /// A file that is present but does not hold a positive finite decimal
    /// is reported as [`StoreError::IllegalData`] so the caller can log it
    /// apart from an ordinary read failure.
    pub fn load(&self) -> Result<FocalLength, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FocalLength::unset()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let token = raw.trim();
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => Ok(FocalLength::set(value)),
            _ => Err(StoreError::IllegalData {
                path: self.path.clone(),
                token: token.to_string(),
            }),
        }
    }

    /// Write a focal length through the full remount sequence, blocking the
    /// calling thread. Concurrent saves on clones of this store are
    /// serialized so two remount sequences never interleave.
    pub fn save_blocking(&self, value: f64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_sequence(value)
    }

    /// Spawn [`save_blocking`](Self::save_blocking) on the blocking pool.
    ///
    /// The outcome is logged inside the task; the handle also carries it for
    /// callers that want to await completion.
    pub fn save_async(&self, value: f64) -> JoinHandle<Result<(), StoreError>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let result = store.save_blocking(value);
            match &result {
                Ok(()) => tracing::info!(
                    "Persisted focal length {} to {}",
                    value,
                    store.path.display()
                ),
                Err(StoreError::MakeReadOnly(e)) => tracing::error!(
                    "Focal length {} was written, but the read-only restore failed: {}",
                    value,
                    e
                ),
                Err(e) => tracing::error!("Failed to persist focal length {}: {}", value, e),
            }
            result
        })
    }

    fn write_sequence(&self, value: f64) -> Result<(), StoreError> {
        if self.remount == RemountMode::Sudo {
            match self.remount_all("rw") {
                Ok(()) => {
                    if !self.settle.is_zero() {
                        thread::sleep(self.settle);
                    }
                }
                // The mounts may already be read-write on this image;
                // the write itself decides whether that was true.
                Err(e) => tracing::warn!("Read-write remount failed, writing anyway: {}", e),
            }
        }

        let written =
            fs::write(&self.path, value.to_string()).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            });

        if self.remount == RemountMode::Sudo {
            if let Err(e) = self.remount_all("ro") {
                tracing::error!(
                    "Mounts left read-write after calibration write, remount manually: {}",
                    e
                );
                written?;
                return Err(StoreError::MakeReadOnly(e));
            }
        }
        written
    }

    /// Flip every configured target to the given mount mode in one
    /// privileged shell call, failing if any remount fails.
    fn remount_all(&self, mode: &str) -> Result<(), String> {
        let script = self
            .targets
            .iter()
            .map(|target| format!("/bin/mount -o remount,{} {}", mode, target.display()))
            .collect::<Vec<_>>()
            .join(" && ");

        let output = Command::new(&self.sudo_path)
            .args(["/bin/sh", "-c", &script])
            .output()
            .map_err(|e| e.to_string())?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!(
                "`{}` exited with {}: {}",
                script,
                output.status,
                stderr.trim()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CalibrationStore {
        CalibrationStore::new(dir.path().join("focal_length.txt"))
            .with_remount(RemountMode::Disabled)
    }

    #[test]
    fn test_missing_file_loads_unset() {
        let dir = TempDir::new().unwrap();
        let focal = store_in(&dir).load().unwrap();
        assert!(!focal.is_set());
    }

    #[test]
    fn test_save_then_load_round_trips_exactly() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save_blocking(564.7058823529412).unwrap();
        assert_eq!(store.load().unwrap().get(), Some(564.7058823529412));
    }

    #[test]
    fn test_stored_format_is_one_bare_decimal_token() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save_blocking(240.5).unwrap();
        let raw = std::fs::read_to_string(dir.path().join("focal_length.txt")).unwrap();
        assert_eq!(raw, "240.5");
    }

    #[test]
    fn test_surrounding_whitespace_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(dir.path().join("focal_length.txt"), " 312.25 \n").unwrap();
        assert_eq!(store.load().unwrap().get(), Some(312.25));
    }

    #[test]
    fn test_garbage_content_is_illegal_data() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(dir.path().join("focal_length.txt"), "not a number\n").unwrap();
        assert!(matches!(
            store.load().unwrap_err(),
            StoreError::IllegalData { .. }
        ));
    }

    #[test]
    fn test_non_positive_value_is_illegal_data() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(dir.path().join("focal_length.txt"), "-1").unwrap();
        assert!(matches!(
            store.load().unwrap_err(),
            StoreError::IllegalData { .. }
        ));
    }

    #[test]
    fn test_remount_mode_parses_from_str() {
        assert_eq!("sudo".parse::<RemountMode>().unwrap(), RemountMode::Sudo);
        assert_eq!(
            "disabled".parse::<RemountMode>().unwrap(),
            RemountMode::Disabled
        );
        assert!("rw".parse::<RemountMode>().is_err());
    }

    #[tokio::test]
    async fn test_save_async_completes_and_is_readable() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save_async(17.5).await.unwrap().unwrap();
        assert_eq!(store.load().unwrap().get(), Some(17.5));
    }

    #[cfg(unix)]
    mod remount {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        // Stands in for sudo: records which remount phase ran, then exits
        // with the code configured for that phase.
        fn fake_sudo(dir: &TempDir, rw_exit: i32, ro_exit: i32) -> PathBuf {
            let log = dir.path().join("phases.log");
            let path = dir.path().join("sudo");
            let script = format!(
                "#!/bin/sh\n\
                 case \"$3\" in\n\
                 *remount,rw*) echo rw >> \"{log}\"; exit {rw_exit} ;;\n\
                 *remount,ro*) echo ro >> \"{log}\"; exit {ro_exit} ;;\n\
                 esac\n\
                 exit 1\n",
                log = log.display(),
            );
            std::fs::write(&path, script).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        }

        fn phases(dir: &TempDir) -> String {
            std::fs::read_to_string(dir.path().join("phases.log")).unwrap_or_default()
        }

        fn sudo_store(dir: &TempDir, rw_exit: i32, ro_exit: i32) -> CalibrationStore {
            CalibrationStore::new(dir.path().join("focal_length.txt"))
                .with_remount(RemountMode::Sudo)
                .with_settle(Duration::from_millis(0))
                .with_sudo_path(fake_sudo(dir, rw_exit, ro_exit))
        }

        #[test]
        fn test_read_only_restore_runs_after_a_failed_write() {
            let dir = TempDir::new().unwrap();
            let store = sudo_store(&dir, 0, 0);
            // Occupy the file path with a directory so the write fails.
            std::fs::create_dir(dir.path().join("focal_length.txt")).unwrap();

            let err = store.save_blocking(42.0).unwrap_err();
            assert!(matches!(err, StoreError::Write { .. }));
            assert_eq!(phases(&dir), "rw\nro\n");
        }

        #[test]
        fn test_failed_rw_remount_still_attempts_the_write() {
            let dir = TempDir::new().unwrap();
            let store = sudo_store(&dir, 1, 0);

            store.save_blocking(311.5).unwrap();
            assert_eq!(store.load().unwrap().get(), Some(311.5));
            assert_eq!(phases(&dir), "rw\nro\n");
        }

        #[tokio::test]
        async fn test_failed_read_only_restore_surfaces_after_the_write() {
            let dir = TempDir::new().unwrap();
            let store = sudo_store(&dir, 0, 1);

            let result = store.save_async(423.5).await.unwrap();
            assert!(matches!(result, Err(StoreError::MakeReadOnly(_))));
            // The value still landed before the restore failed.
            assert_eq!(store.load().unwrap().get(), Some(423.5));
        }

        #[test]
        fn test_write_failure_outranks_the_failed_restore() {
            let dir = TempDir::new().unwrap();
            let store = sudo_store(&dir, 0, 1);
            std::fs::create_dir(dir.path().join("focal_length.txt")).unwrap();

            let err = store.save_blocking(42.0).unwrap_err();
            assert!(matches!(err, StoreError::Write { .. }));
            assert_eq!(phases(&dir), "rw\nro\n");
        }
    }
}

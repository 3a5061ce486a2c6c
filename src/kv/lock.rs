//! Data directory locking.
//!
//! One process owns a data directory at a time. The lock is an OS-level
//! exclusive file lock (`flock` on Unix, `LockFileEx` on Windows), so a
//! crashed process never leaves the directory wedged.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use super::errors::{EngineError, EngineResult};

const LOCK_FILE: &str = "echo.lock";
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// An exclusive lock on a data directory, released on drop.
pub struct DataDirLock {
    // Held open to keep the OS lock alive.
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    /// Acquire the lock, retrying until `timeout` elapses.
    ///
    /// Creates the data directory if it does not exist. If another process
    /// still holds the lock at the deadline, fails with `Locked`.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> EngineResult<Self> {
        fs::create_dir_all(data_dir).map_err(|e| {
            EngineError::io(
                format!("create data directory {}", data_dir.display()),
                e,
            )
        })?;

        let path = data_dir.join(LOCK_FILE);
        let file = File::create(&path)
            .map_err(|e| EngineError::io(format!("create lock file {}", path.display()), e))?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file, path }),
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Err(EngineError::Locked(path));
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => {
                    return Err(EngineError::io(
                        format!("lock data directory {}", data_dir.display()),
                        e,
                    ))
                }
            }
        }
    }

    /// Path of the lock file, for diagnostics.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

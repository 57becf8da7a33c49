//! FrameQueue - the primary directory as a work queue
//!
//! A pass holds `.astm-bridge.lock` for its whole duration and claims each
//! frame by renaming it to `<name>.claimed` before reading it.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};
use crate::relay::{list_frames, move_file};

/// Lock file created in the queue directory
pub const LOCK_FILE_NAME: &str = ".astm-bridge.lock";

/// Suffix appended to a frame while it is claimed
pub const CLAIM_SUFFIX: &str = ".claimed";

/// Primary-directory queue
#[derive(Debug, Clone)]
pub struct FrameQueue {
    dir: PathBuf,
    stale_after: Duration,
}

impl FrameQueue {
    pub fn new(dir: impl Into<PathBuf>, stale_after: Duration) -> Self {
        Self {
            dir: dir.into(),
            stale_after,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Take the pass lock, breaking a lock older than the stale age
    ///
    /// The lock file carries an owner token so that a pass whose lock was
    /// broken never removes its successor's lock.
    pub fn lock(&self) -> Result<PassLock> {
        let path = self.dir.join(LOCK_FILE_NAME);
        let owner = format!("owner={}-{:016x}", std::process::id(), rand::random::<u64>());

        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let stamp = format!("{owner}\nat={}\n", chrono::Local::now());
                    if let Err(e) = file.write_all(stamp.as_bytes()) {
                        drop(file);
                        if let Err(remove) = fs::remove_file(&path) {
                            debug!(error = %remove, "could not remove unwritten lock file");
                        }
                        return Err(IngestionError::fs(path, e));
                    }
                    return Ok(PassLock { path, owner });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if !self.is_stale(&path) {
                        return Err(IngestionError::QueueLocked { path });
                    }
                    warn!(lock = %path.display(), "breaking stale pass lock");
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        // another pass broke it first
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(IngestionError::fs(&path, e)),
                    }
                }
                Err(e) => return Err(IngestionError::fs(path, e)),
            }
        }

        Err(IngestionError::QueueLocked { path })
    }

    fn is_stale(&self, lock: &Path) -> bool {
        let age = fs::metadata(lock)
            .and_then(|m| m.modified())
            .ok()
            .map(|modified| SystemTime::now().duration_since(modified).unwrap_or_default());
        age.is_some_and(|age| age >= self.stale_after)
    }

    /// Put claims left by an interrupted pass back into the queue.
    ///
    /// Call while holding the lock.
    pub fn recover_claims(&self, _lock: &PassLock) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(IngestionError::fs(&self.dir, e)),
        };

        let mut restored = 0;
        for entry in entries {
            let entry = entry.map_err(|e| IngestionError::fs(&self.dir, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(CLAIM_SUFFIX)) else {
                continue;
            };
            if !contracts::is_frame_file_name(name) {
                continue;
            }

            let original = self.dir.join(name);
            if original.exists() {
                warn!(file = %name, "claimed copy and original both present, keeping claim for inspection");
                continue;
            }
            fs::rename(entry.path(), &original).map_err(|e| IngestionError::fs(&original, e))?;
            restored += 1;
        }

        if restored > 0 {
            info!(restored, "restored claims from an interrupted pass");
        }
        Ok(restored)
    }

    /// Unclaimed frame names, sorted
    pub fn pending(&self) -> Result<Vec<String>> {
        match list_frames(&self.dir) {
            Err(IngestionError::FileSystem { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Claim one frame by renaming it
    pub fn claim(&self, name: &str) -> Result<ClaimedFrame> {
        let original = self.dir.join(name);
        let claimed = self.dir.join(format!("{name}{CLAIM_SUFFIX}"));
        fs::rename(&original, &claimed).map_err(|e| IngestionError::fs(&original, e))?;
        Ok(ClaimedFrame {
            name: name.to_string(),
            original,
            claimed,
        })
    }
}

/// Held for the duration of a pass; removes the lock file on drop
#[derive(Debug)]
pub struct PassLock {
    path: PathBuf,
    owner: String,
}

impl PassLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the lock file still carries this pass's owner token
    pub fn is_held(&self) -> bool {
        fs::read_to_string(&self.path)
            .map(|text| text.lines().next() == Some(self.owner.as_str()))
            .unwrap_or(false)
    }

    /// Bump the lock's mtime so a long pass is not mistaken for a stale one.
    ///
    /// Returns `false` when another pass has taken the lock over.
    pub fn refresh(&self) -> bool {
        if !self.is_held() {
            warn!(lock = %self.path.display(), "pass lock was taken over by another pass");
            return false;
        }
        let touched = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|file| file.set_modified(SystemTime::now()));
        if let Err(e) = touched {
            warn!(lock = %self.path.display(), error = %e, "failed to refresh pass lock");
        }
        true
    }
}

impl Drop for PassLock {
    fn drop(&mut self) {
        if !self.is_held() {
            warn!(lock = %self.path.display(), "pass lock no longer ours, leaving it in place");
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to remove pass lock");
        }
    }
}

/// A frame renamed out of the queue
#[derive(Debug)]
pub struct ClaimedFrame {
    name: String,
    original: PathBuf,
    claimed: PathBuf,
}

impl ClaimedFrame {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.claimed
    }

    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.claimed).map_err(|e| IngestionError::fs(&self.claimed, e))
    }

    /// Move into `dir` under the original name
    pub fn archive(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| IngestionError::fs(dir, e))?;
        let target = dir.join(&self.name);
        move_file(&self.claimed, &target).map_err(|e| IngestionError::fs(&target, e))?;
        Ok(target)
    }

    /// Return the frame to the queue for the next pass
    pub fn release(self) -> Result<PathBuf> {
        fs::rename(&self.claimed, &self.original)
            .map_err(|e| IngestionError::fs(&self.claimed, e))?;
        Ok(self.original)
    }
}

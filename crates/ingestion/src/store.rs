//! MessageStore - durable, write-once frame files

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Local};
use contracts::{MessageFrame, FRAME_EXTENSION};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::error::{IngestionError, Result};

/// Attempts before `save` gives up on finding a free name
pub const MAX_NAME_ATTEMPTS: usize = 3;

/// Odd multiplier: `seq * STEP` is a bijection on u32
const STEP: u32 = 0x9E37_79B9;

/// Generates `<prefix>_<YYYYMMDD_HHMMSS_mmm>_<random>_<checksum>.astm`
#[derive(Debug)]
pub struct FilenameGenerator {
    prefix: String,
    base: u32,
    seq: AtomicU32,
}

impl FilenameGenerator {
    /// Generator with a random per-process base
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_base(prefix, rand::random())
    }

    pub fn with_base(prefix: impl Into<String>, base: u32) -> Self {
        Self {
            prefix: prefix.into(),
            base,
            seq: AtomicU32::new(0),
        }
    }

    /// Name for `content` stamped with the current local time
    pub fn next_name(&self, content: &str) -> String {
        self.name_at(Local::now(), content)
    }

    pub fn name_at(&self, at: DateTime<Local>, content: &str) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let random = self.base.wrapping_add(seq.wrapping_mul(STEP));
        format!(
            "{}_{}_{:08x}_{}.{}",
            self.prefix,
            at.format("%Y%m%d_%H%M%S_%3f"),
            random,
            content_checksum(content),
            FRAME_EXTENSION
        )
    }
}

/// First 8 hex chars of the SHA-256 of `content`
pub fn content_checksum(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(&digest[..4])
}

/// Writes frames into one directory
#[derive(Debug)]
pub struct MessageStore {
    dir: PathBuf,
    names: FilenameGenerator,
}

impl MessageStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            names: FilenameGenerator::new(prefix),
        }
    }

    pub fn with_generator(dir: impl Into<PathBuf>, names: FilenameGenerator) -> Self {
        Self {
            dir: dir.into(),
            names,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one frame.
    ///
    /// The content goes to a hidden temp file first and is then linked to its
    /// final name, so readers never observe a partial frame and an existing
    /// file is never replaced.
    #[instrument(name = "store_save", skip(self, content), fields(dir = %self.dir.display(), bytes = content.len()))]
    pub fn save(&self, content: &str) -> Result<MessageFrame> {
        fs::create_dir_all(&self.dir).map_err(|e| IngestionError::fs(&self.dir, e))?;

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let file_name = self.names.next_name(content);
            let path = self.dir.join(&file_name);
            let tmp = self.dir.join(format!(".{file_name}.tmp"));

            write_new(&tmp, content)?;
            match publish(&tmp, &path) {
                Ok(()) => {
                    debug!(file = %file_name, "frame stored");
                    return Ok(MessageFrame {
                        file_name,
                        path,
                        content: content.to_string(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    remove_quietly(&tmp);
                    warn!(file = %file_name, attempt, "frame name already taken, regenerating");
                }
                Err(e) => {
                    remove_quietly(&tmp);
                    return Err(IngestionError::fs(path, e));
                }
            }
        }

        Err(IngestionError::NameExhausted {
            dir: self.dir.clone(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }
}

fn write_new(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| IngestionError::fs(path, e))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| IngestionError::fs(path, e))
}

/// Move `tmp` to `path` without ever replacing an existing `path`
pub(crate) fn publish(tmp: &Path, path: &Path) -> std::io::Result<()> {
    match fs::hard_link(tmp, path) {
        Ok(()) => {
            remove_quietly(tmp);
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(e),
        // filesystems without hard links
        Err(_) => {
            if path.exists() {
                return Err(ErrorKind::AlreadyExists.into());
            }
            fs::rename(tmp, path)
        }
    }
}

pub(crate) fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove temp file");
        }
    }
}

//! # Ingestion
//!
//! Instrument-facing half of the bridge.
//!
//! Responsibilities:
//! - Receive raw transmissions over TCP or serial (`FrameListener`)
//! - Persist each EOT-terminated frame as a write-once `.astm` file (`MessageStore`)
//! - Relay the fallback listener's backlog into the primary directory (`BackupRelay`)
//! - Serve the primary directory as a locked, claim-by-rename work queue (`FrameQueue`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::FrameListener;
//! use contracts::ListenerRole;
//!
//! let listener = FrameListener::from_blueprint(&blueprint, ListenerRole::Primary, audit);
//! let stats = listener.run().await?;
//! println!("stored {} frames", stats.frames_stored);
//! ```

mod accumulator;
mod audit;
mod error;
mod listener;
mod queue;
mod relay;
mod stats;
mod store;

// Re-exports
pub use accumulator::{DecodedFrame, FrameAccumulator};
pub use error::{IngestionError, Result};
pub use listener::FrameListener;
pub use queue::{ClaimedFrame, FrameQueue, PassLock, CLAIM_SUFFIX, LOCK_FILE_NAME};
pub use relay::{BackupRelay, RelayReport};
pub use stats::{ListenerMetrics, ListenerStats};
pub use store::{content_checksum, FilenameGenerator, MessageStore, MAX_NAME_ATTEMPTS};

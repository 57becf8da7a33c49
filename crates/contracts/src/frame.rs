//! MessageFrame / ProtocolEntry - listener output and parser output
//!
//! A frame is one instrument transmission persisted as a `.astm` file.
//! Entries are decoded from a frame on every processing pass and never stored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// Start of Text (E1381 link framing)
pub const STX: u8 = 0x02;

/// End of Text (E1381 link framing)
pub const ETX: u8 = 0x03;

/// End of Transmission - frame boundary on the wire
pub const EOT: u8 = 0x04;

/// Carriage return - record separator inside link framing
pub const CR: u8 = 0x0D;

/// File extension of persisted frames (without the dot)
pub const FRAME_EXTENSION: &str = "astm";

/// One persisted instrument transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFrame {
    /// Generated file name (`<prefix>_<timestamp>_<random>_<checksum>.astm`)
    pub file_name: String,

    /// Full path of the stored file
    pub path: PathBuf,

    /// Raw decoded text, including any link framing and the trailing EOT
    pub content: String,
}

/// One decoded result record
///
/// `device_id` and `subject_id` are inherited from the most recent header and
/// subject records of the same frame; they are `None` until such a record appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEntry {
    /// Analyzer identifier from the header record
    pub device_id: Option<DeviceId>,

    /// Specimen / patient / animal identifier from the subject record
    pub subject_id: Option<String>,

    /// Test code (last `^` component of the universal test id)
    pub test_code: String,

    /// Raw measurement value
    pub test_value: String,
}

/// Whether a directory entry name looks like a persisted frame
pub fn is_frame_file_name(name: &str) -> bool {
    name.strip_suffix(FRAME_EXTENSION)
        .is_some_and(|stem| stem.ends_with('.') && stem.len() > 1 && !stem.starts_with('.'))
}

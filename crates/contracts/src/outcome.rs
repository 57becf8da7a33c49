//! Per-file and per-pass outcomes

use serde::{Deserialize, Serialize};

/// Outcome of one frame file within a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// The primary directory held nothing to process
    NoFiles,
    /// Every entry delivered; file archived
    Success,
    /// At least one delivery failed; file left for the next pass
    Partial,
    /// Read/parse/archive failure; file left for the next pass
    Error,
}

impl FileOutcome {
    /// Classify a file from the success flags of its deliveries.
    ///
    /// A file without entries has nothing left to deliver and counts as success.
    pub fn from_deliveries<I>(delivered: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        if delivered.into_iter().all(|ok| ok) {
            Self::Success
        } else {
            Self::Partial
        }
    }

    /// Short label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFiles => "no_files",
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

/// Tri-state result of one orchestrator pass: `{true, false, absent}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every file fully delivered (`true`)
    Success,
    /// Some file was Partial or Error (`false`)
    Failure,
    /// No frame files were found (absent)
    NothingToProcess,
}

impl RunOutcome {
    /// Aggregate file outcomes; `NoFiles` markers are ignored.
    pub fn aggregate<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a FileOutcome>,
    {
        let mut seen_any = false;
        for outcome in outcomes {
            match outcome {
                FileOutcome::NoFiles => {}
                FileOutcome::Success => seen_any = true,
                FileOutcome::Partial | FileOutcome::Error => return Self::Failure,
            }
        }

        if seen_any {
            Self::Success
        } else {
            Self::NothingToProcess
        }
    }

    /// Tri-state view consumed by the caller deciding on fallback activation
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Self::Success => Some(true),
            Self::Failure => Some(false),
            Self::NothingToProcess => None,
        }
    }
}

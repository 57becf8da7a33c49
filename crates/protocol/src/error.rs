//! Protocol errors

use contracts::ContractError;
use thiserror::Error;

/// Frame decoding failure
///
/// One malformed record fails the whole frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A record is shorter than its type requires
    #[error("record {line} ({record_type}): missing field {index}")]
    MissingField {
        /// 1-based record number within the frame
        line: usize,
        /// `H`, `P` or `R`
        record_type: char,
        /// Zero-based field index that was required
        index: usize,
    },
}

impl From<ParseError> for ContractError {
    fn from(err: ParseError) -> Self {
        ContractError::Parse {
            message: err.to_string(),
        }
    }
}

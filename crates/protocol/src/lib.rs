//! # Protocol
//!
//! ASTM decoding and backend record mapping.
//!
//! - `ProtocolParser`: E1394 records (optionally inside E1381 STX/ETX framing)
//!   to `ProtocolEntry` values
//! - `RecordMapper`: `ProtocolEntry` to `BackendPayload`
//!
//! ## Usage Example
//!
//! ```ignore
//! use protocol::{ProtocolParser, RecordMapper};
//!
//! let mapper = RecordMapper::new(&blueprint.mapping);
//! for entry in ProtocolParser::parse(&frame.content)? {
//!     let payload = mapper.map(&entry);
//!     // deliver payload
//! }
//! ```

mod error;
mod mapper;
mod parser;

pub use error::ParseError;
pub use mapper::{RecordMapper, DEFAULT_TEST_NAMES};
pub use parser::ProtocolParser;

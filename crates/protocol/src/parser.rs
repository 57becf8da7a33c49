//! ProtocolParser - E1394 records out of an optionally E1381-framed frame

use contracts::{DeviceId, ProtocolEntry, CR, ETX, STX};
use tracing::trace;

use crate::error::ParseError;

const HEADER_DEVICE_FIELD: usize = 4;
const SUBJECT_ID_FIELD: usize = 3;
const RESULT_TEST_FIELD: usize = 2;
const RESULT_VALUE_FIELD: usize = 3;

/// Stateless frame decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolParser;

impl ProtocolParser {
    /// Decode every result record of `text`, in order.
    ///
    /// Device and subject ids carry forward from the latest header and
    /// subject records of this frame.
    pub fn parse(text: &str) -> Result<Vec<ProtocolEntry>, ParseError> {
        let mut entries = Vec::new();
        let mut device_id: Option<DeviceId> = None;
        let mut subject_id: Option<String> = None;

        for (idx, raw) in records(text).enumerate() {
            let line = idx + 1;
            let record = trim_record(raw);
            if record.is_empty() {
                continue;
            }

            let fields: Vec<&str> = record.split('|').collect();
            let Some(record_type) = record_type(fields[0]) else {
                continue;
            };
            let field = |index: usize| {
                fields.get(index).copied().ok_or(ParseError::MissingField {
                    line,
                    record_type,
                    index,
                })
            };

            match record_type {
                'H' => {
                    device_id = non_empty(field(HEADER_DEVICE_FIELD)?).map(DeviceId::from);
                }
                'P' => {
                    subject_id = non_empty(field(SUBJECT_ID_FIELD)?).map(str::to_string);
                }
                'R' => {
                    let universal_id = field(RESULT_TEST_FIELD)?;
                    let test_value = field(RESULT_VALUE_FIELD)?;
                    let test_code = universal_id.rsplit('^').next().unwrap_or(universal_id);
                    entries.push(ProtocolEntry {
                        device_id: device_id.clone(),
                        subject_id: subject_id.clone(),
                        test_code: test_code.to_string(),
                        test_value: test_value.to_string(),
                    });
                }
                other => trace!(line, record_type = %other, "record ignored"),
            }
        }

        Ok(entries)
    }

    /// Best-effort header scan; never fails
    pub fn device_id(text: &str) -> Option<DeviceId> {
        records(text)
            .map(trim_record)
            .filter(|record| record_type(record.split('|').next().unwrap_or("")) == Some('H'))
            .find_map(|record| {
                record
                    .split('|')
                    .nth(HEADER_DEVICE_FIELD)
                    .and_then(non_empty)
                    .map(DeviceId::from)
            })
    }
}

/// Split the frame into raw records.
///
/// With link framing the body between the first STX and the following ETX is
/// split on CR; otherwise the text is split on any line break.
fn records(text: &str) -> Box<dyn Iterator<Item = &str> + '_> {
    if let Some(body) = framed_body(text) {
        Box::new(body.trim().split(CR as char))
    } else {
        Box::new(text.trim().split(['\r', '\n']))
    }
}

fn framed_body(text: &str) -> Option<&str> {
    let start = text.find(STX as char)? + 1;
    let len = text[start..].find(ETX as char)?;
    Some(&text[start..start + len])
}

fn trim_record(record: &str) -> &str {
    record.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}

/// Record type letter, skipping an E1381 frame number (`1H` → `H`)
fn record_type(first_field: &str) -> Option<char> {
    let mut chars = first_field.trim_start_matches(|c: char| c.is_ascii_digit()).chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

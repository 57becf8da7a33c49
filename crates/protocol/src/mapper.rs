//! RecordMapper - ProtocolEntry → BackendPayload

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime};
use contracts::{BackendPayload, CallMode, MappingConfig, ProtocolEntry, TestData};

/// Built-in test-code translations
pub const DEFAULT_TEST_NAMES: [(&str, &str); 3] = [
    ("RBC", "Measuring weight"),
    ("WBC", "White Cell Count"),
    ("HGB", "Hemoglobin Level"),
];

const REMARKS: &str = " ";

/// Translates decoded entries into backend records
#[derive(Debug, Clone)]
pub struct RecordMapper {
    names: HashMap<String, String>,
    test_type_id: u32,
    group_id: u32,
    call_mode: CallMode,
    test_id: Option<String>,
}

impl Default for RecordMapper {
    fn default() -> Self {
        Self::new(&MappingConfig::default())
    }
}

impl RecordMapper {
    /// Defaults overlaid with the configured translations
    pub fn new(config: &MappingConfig) -> Self {
        let mut names: HashMap<String, String> = DEFAULT_TEST_NAMES
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect();
        names.extend(config.test_names.clone());

        Self {
            names,
            test_type_id: config.test_type_id,
            group_id: config.group_id,
            call_mode: config.call_mode,
            test_id: config.test_id.clone(),
        }
    }

    /// Display name for a test code; unknown codes pass through
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.names.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Map with the current local time
    pub fn map(&self, entry: &ProtocolEntry) -> BackendPayload {
        self.map_at(entry, Local::now().naive_local())
    }

    pub fn map_at(&self, entry: &ProtocolEntry, now: NaiveDateTime) -> BackendPayload {
        let test_id = match self.call_mode {
            CallMode::UpdateTest => self.test_id.clone(),
            CallMode::AddTest => None,
        };

        BackendPayload {
            test_data: TestData {
                test_type_id: self.test_type_id,
                call_mode: self.call_mode,
                group_id: self.group_id,
                test_name: self.display_name(&entry.test_code).to_string(),
                rat_no: entry.subject_id.clone(),
                test_time: now.format("%I:%M %p").to_string(),
                test_date: now.format("%d-%m-%Y").to_string(),
                test_value: entry.test_value.clone(),
                remarks: REMARKS.to_string(),
                test_id,
            },
        }
    }
}

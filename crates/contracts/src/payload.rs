//! BackendPayload - RecordMapper output, DeliveryClient input
//!
//! Wire shape expected by the ERP `process_glp_test_data` endpoint:
//!
//! ```json
//! { "test_data": { "test_type_id": 1, "call_mode": "ADD_TEST", "group_id": 1,
//!   "test_name": "White Cell Count", "rat_no": "R-17", "test_time": "09:41 AM",
//!   "test_date": "17-10-2026", "test_value": "6.2", "remarks": " " } }
//! ```

use serde::{Deserialize, Serialize};

/// Status treated as a successful delivery
pub const DELIVERY_OK: u16 = 200;

/// Status reported when the request never produced an HTTP response
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// ERP operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallMode {
    /// Create a new test record
    #[default]
    AddTest,
    /// Update an existing test record (requires `test_id`)
    UpdateTest,
}

/// One record delivered to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendPayload {
    pub test_data: TestData,
}

/// Body of a backend record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestData {
    pub test_type_id: u32,
    pub call_mode: CallMode,
    pub group_id: u32,

    /// Display name after test-code translation
    pub test_name: String,

    /// Subject identifier (null when the frame had no subject record)
    pub rat_no: Option<String>,

    /// 12-hour processing time, `%I:%M %p`
    pub test_time: String,

    /// Processing date, `%d-%m-%Y`
    pub test_date: String,

    pub test_value: String,
    pub remarks: String,

    /// Correlating record id for updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
}

/// Result of one delivery attempt: `(status, body)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// HTTP status, or [`TRANSPORT_FAILURE_STATUS`] when no response arrived
    pub status: u16,

    /// Response body, or the transport error text
    pub body: String,

    /// `true` when `status` is synthetic
    pub transport_failure: bool,
}

impl DeliveryReport {
    /// Report for a real HTTP response
    pub fn response(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            transport_failure: false,
        }
    }

    /// Report for a request that never got a response
    pub fn transport_failure(error: impl Into<String>) -> Self {
        Self {
            status: TRANSPORT_FAILURE_STATUS,
            body: error.into(),
            transport_failure: true,
        }
    }

    /// Only 200 counts as delivered
    pub fn is_success(&self) -> bool {
        self.status == DELIVERY_OK && !self.transport_failure
    }

    /// 401/403 from the backend
    pub fn is_auth_rejected(&self) -> bool {
        !self.transport_failure && matches!(self.status, 401 | 403)
    }
}

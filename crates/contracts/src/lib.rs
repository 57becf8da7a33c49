//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the bridge.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data Flow
//! - `MessageFrame`: raw transmission persisted by the listener
//! - `ProtocolEntry`: one decoded result record
//! - `BackendPayload`: the record delivered to the ERP
//! - `StatusRecord`: audit trail written by every pipeline step

mod audit;
mod blueprint;
mod device_id;
mod error;
mod frame;
mod outcome;
mod payload;
mod sink;

pub use audit::*;
pub use blueprint::*;
pub use device_id::DeviceId;
pub use error::*;
pub use frame::*;
pub use outcome::*;
pub use payload::*;
pub use sink::*;

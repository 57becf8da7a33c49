//! Sink implementations
//!
//! Contains HttpSink and LogSink.

mod http;
mod log;

pub use self::http::HttpSink;
pub use self::log::LogSink;

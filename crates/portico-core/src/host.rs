//! Interfaces the host transport layer implements for the engine.

use std::sync::Arc;

use crate::session::Session;

/// Accessor over one inbound request.
pub trait ApiRequest: Send + Sync {
    /// The named request value as text, or `None` if absent.
    fn value(&self, name: &str) -> Option<String>;

    /// The session this request belongs to.
    fn session(&self) -> Arc<Session>;
}

/// Writer for one response channel.
///
/// The host must keep the channel open until one of these is called — for
/// asynchronous operations that happens on a spawned task after dispatch
/// has already returned.
pub trait ApiResponse: Send + Sync {
    /// Write the serialized operation result.
    fn write_result(&self, value: serde_json::Value) -> anyhow::Result<()>;

    /// Signal the single generic error response. The engine never leaks
    /// which kind of failure occurred.
    fn send_error(&self) -> anyhow::Result<()>;
}

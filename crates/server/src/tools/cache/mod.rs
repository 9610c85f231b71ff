//! Cache-related MCP tools.
//!
//! Read-only views of the store: overall status and the pending queue.

pub mod pending;
pub mod status;

pub use pending::{PendingListParams, pending_impl};
pub use status::status_impl;

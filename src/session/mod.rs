//! Session client modules.
//!
//! - `client`: session handle, connection worker, and reconnect handling.
//! - `proto`: wire conventions shared with the chat backend.
//! - `handler`: application-facing callback surface.

/// Session handle and connection worker.
pub mod client;
/// Callback traits and event kinds.
pub mod handler;
/// Outbound envelope and inbound frame classification.
pub mod proto;

//! Resilient, session-aware websocket client for multi-turn chat backends.
//!
//! The crate is organized around one component, [`SessionClient`]: a stateful
//! wrapper over a duplex channel that survives transient network failures
//! without losing conversational context.
//!
//! - `session`: client handle, connection worker, wire conventions, and the
//!   callback surface.
//! - `transport`: duplex transport seam and its websocket implementation.
//! - `config`: explicit connection configuration.
//! - `reconnect`: bounded fixed-interval reconnect policy.

/// Connection configuration.
pub mod config;
/// Reconnect policy helpers.
pub mod reconnect;
/// Session client, worker, protocol conventions, and callbacks.
pub mod session;
/// Duplex transport seam and websocket implementation.
pub mod transport;

pub use config::SessionConfig;
pub use session::client::{SendOptions, SessionClient, SessionError};
pub use session::handler::{EventCallback, EventKind, MessageHandler};

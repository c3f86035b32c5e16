//! Duplex transport seam.
//!
//! The session state machine is agnostic to the concrete transport behind it.
//! A [`Connector`] creates a duplex [`Channel`] given a target and identity
//! metadata; the channel yields inbound [`ChannelEvent`]s and accepts text
//! frames. `ws` implements both over tokio-tungstenite.

pub mod ws;

use async_trait::async_trait;
use thiserror::Error;

pub use ws::WsConnector;

/// Address, port, and route identifying the remote endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectTarget {
    /// Address including scheme, eg `ws://localhost`.
    pub address: String,
    /// Target port.
    pub port: u16,
    /// Route appended to the address.
    pub route: String,
}

impl ConnectTarget {
    /// Renders the full connect URL.
    pub fn url(&self) -> String {
        format!("{}:{}{}", self.address, self.port, self.route)
    }
}

/// Identity metadata attached to every connection attempt.
///
/// Transports that cannot carry custom metadata may omit it without failing
/// the attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectMetadata {
    /// Stable token correlating reconnects to one logical session.
    pub session_id: String,
    /// Token distinguishing this client instance from others sharing the
    /// session id.
    pub client_session_id: String,
    /// Server-assigned conversation id, once known.
    pub conversation_id: Option<String>,
}

/// Inbound notification from a [`Channel`].
#[derive(Debug)]
pub enum ChannelEvent {
    /// Text frame.
    Text(String),
    /// Binary frame; the session layer decides whether it decodes as text.
    Binary(Vec<u8>),
    /// The peer closed the channel or the stream ended.
    Closed,
    /// Transport-level failure.
    Error(TransportError),
}

/// Errors produced by transport implementations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying websocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Metadata value could not be converted to a header value.
    #[error("invalid metadata header: {0}")]
    InvalidMetadata(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),
}

/// Creates duplex channels to a remote endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a channel to `target` carrying `metadata`.
    async fn connect(
        &self,
        target: &ConnectTarget,
        metadata: &ConnectMetadata,
    ) -> Result<Box<dyn Channel>, TransportError>;
}

/// An established duplex channel.
#[async_trait]
pub trait Channel: Send {
    /// Transmits a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits for the next inbound event.
    ///
    /// Implementations handle keepalive frames internally; only events the
    /// session layer acts on are surfaced.
    async fn next_event(&mut self) -> ChannelEvent;

    /// Closes the channel. Errors during close are ignored.
    async fn close(&mut self);
}

//! tokio-tungstenite implementation of the transport seam.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::transport::{Channel, ChannelEvent, ConnectMetadata, ConnectTarget, Connector, TransportError};

const SESSION_ID_HEADER: &str = "Session-ID";
const CLIENT_SESSION_HEADER: &str = "Client-Session";
const CONVERSATION_ID_HEADER: &str = "Chat-ID";

/// Connector producing websocket channels with identity headers attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        target: &ConnectTarget,
        metadata: &ConnectMetadata,
    ) -> Result<Box<dyn Channel>, TransportError> {
        let mut request = target.url().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(SESSION_ID_HEADER, metadata.session_id.parse()?);
        headers.insert(CLIENT_SESSION_HEADER, metadata.client_session_id.parse()?);
        if let Some(conversation_id) = &metadata.conversation_id {
            headers.insert(CONVERSATION_ID_HEADER, conversation_id.parse()?);
        }

        let (socket, _) = connect_async(request).await?;
        Ok(Box::new(WsChannel { socket }))
    }
}

/// Established websocket channel.
///
/// Ping frames are answered inline; only text, binary, close, and error
/// events reach the session layer.
pub struct WsChannel {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(TransportError::WebSocket)
    }

    async fn next_event(&mut self) -> ChannelEvent {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return ChannelEvent::Text(text.to_string()),
                Some(Ok(Message::Binary(bytes))) => return ChannelEvent::Binary(bytes.to_vec()),
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(err) = self.socket.send(Message::Pong(payload)).await {
                        return ChannelEvent::Error(TransportError::WebSocket(err));
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => return ChannelEvent::Closed,
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(err)) => return ChannelEvent::Error(TransportError::WebSocket(err)),
                None => return ChannelEvent::Closed,
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.socket.close(None).await;
    }
}

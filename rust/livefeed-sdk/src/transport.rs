//! Transport seam between the connection task and the network.
//!
//! [`WsConnector`] is the production implementation on top of
//! tokio-tungstenite. Tests and embedders can supply their own
//! [`Connector`] to drive the client without a socket.

use crate::endpoint::Endpoint;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Establishes one transport session per call.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &Endpoint) -> anyhow::Result<Box<dyn Transport>>;
}

/// One live connection.
#[async_trait]
pub trait Transport: Send {
    /// Next inbound frame. `None` once the peer has closed the connection.
    async fn recv(&mut self) -> Option<anyhow::Result<Vec<u8>>>;

    /// Keepalive probe. An error is treated as a lost connection.
    async fn ping(&mut self) -> anyhow::Result<()>;

    /// Best-effort graceful shutdown.
    async fn close(&mut self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Endpoint) -> anyhow::Result<Box<dyn Transport>> {
        let (ws, response) = connect_async(endpoint.as_str()).await?;
        tracing::debug!("websocket handshake with {} ({})", endpoint, response.status());
        Ok(Box::new(WsTransport { ws }))
    }
}

pub struct WsTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Option<anyhow::Result<Vec<u8>>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.into_bytes())),
                Ok(Message::Binary(bytes)) => return Some(Ok(bytes)),
                Ok(Message::Ping(payload)) => {
                    if let Err(e) = self.ws.send(Message::Pong(payload)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!("close frame received: {:?}", frame);
                    return None;
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn ping(&mut self) -> anyhow::Result<()> {
        self.ws.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!("websocket close: {}", e);
        }
    }
}

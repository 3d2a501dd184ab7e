//! Transport seam between the channel actor and the network.
//!
//! The actor only ever sees text frames. [`WebSocketConnector`] is the
//! production implementation; tests plug in in-memory transports.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::errors::ChannelError;

/// One open bidirectional connection carrying JSON text frames.
#[async_trait]
pub trait Transport: Send {
    /// Send a single text frame.
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Wait for the next text frame. `None` means the peer closed.
    ///
    /// Must be cancel-safe: the actor polls it inside `select!`.
    async fn next_text(&mut self) -> Option<Result<String, ChannelError>>;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

/// Factory for new transports, called on every (re)connect.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Target description used in logs.
    fn endpoint(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn Transport>, ChannelError>;
}

/// Connects to a WebSocket notification endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Box<dyn Transport>, ChannelError> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        debug!(event = "core.channel.websocket_opened", url = %self.url);

        Ok(Box::new(WebSocketTransport { stream }))
    }
}

struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::Transport {
                message: e.to_string(),
            })
    }

    async fn next_text(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => return None,
                // Ping/pong control frames are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(ChannelError::Transport {
                        message: e.to_string(),
                    }));
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

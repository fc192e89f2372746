// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the real-time channel.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing
//!
//! A [`Connector`] performs the handshake and hands back a connected
//! [`Transport`]; the connection manager owns at most one of those at a time.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use orb_core::{SyncMessage, INTENTIONAL_CLOSE_CODE};

/// Boxed future returned by transport and API traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Handshake did not complete in time.
    #[error("connection timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Serialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Why a channel closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// WebSocket close code; `None` when the link dropped without a close frame.
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseReason {
    /// Client-initiated teardown.
    pub fn intentional() -> Self {
        CloseReason {
            code: Some(INTENTIONAL_CLOSE_CODE),
            reason: "client disconnect".to_string(),
        }
    }

    /// Link lost without a close handshake.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        CloseReason {
            code: None,
            reason: reason.into(),
        }
    }

    pub fn is_intentional(&self) -> bool {
        self.code == Some(INTENTIONAL_CLOSE_CODE)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "code {} ({})", code, self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// What a transport yields from `recv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A raw text payload, not yet decoded.
    Text(String),
    /// The channel is gone; no further reads will succeed.
    Closed(CloseReason),
}

/// A connected duplex channel.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send {
    /// Send a message to the server.
    fn send(&mut self, msg: SyncMessage) -> BoxFuture<'_, TransportResult<()>>;

    /// Receive the next payload.
    ///
    /// Read errors surface as [`Inbound::Closed`]. Must be cancel safe.
    fn recv(&mut self) -> BoxFuture<'_, Inbound>;

    /// Close the channel with the given code.
    fn close(&mut self, reason: CloseReason) -> BoxFuture<'_, TransportResult<()>>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

/// Opens transports.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport + 'static;

    /// Perform the handshake against `url`.
    ///
    /// The future owns everything it needs so it can run on a spawned task.
    fn connect(&self, url: String) -> BoxFuture<'static, TransportResult<Self::Transport>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector for real WebSocket endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    fn connect(&self, url: String) -> BoxFuture<'static, TransportResult<WebSocketTransport>> {
        Box::pin(async move {
            let (ws_stream, _) = tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            Ok(WebSocketTransport::new(ws_stream))
        })
    }
}

/// WebSocket transport implementation using tokio-tungstenite.
pub struct WebSocketTransport {
    /// The WebSocket connection, if still open.
    ws: Option<WebSocketConnection>,
}

/// Internal WebSocket connection wrapper.
struct WebSocketConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl WebSocketTransport {
    fn new(ws_stream: WsStream) -> Self {
        let (sink, stream) = ws_stream.split();
        WebSocketTransport {
            ws: Some(WebSocketConnection { sink, stream }),
        }
    }
}

impl Transport for WebSocketTransport {
    fn send(&mut self, msg: SyncMessage) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            let json = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            if let Err(e) = ws.sink.send(Message::Text(json.into())).await {
                // Connection is broken, clear it
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, Inbound> {
        Box::pin(async move {
            let Some(ws) = self.ws.as_mut() else {
                return Inbound::Closed(CloseReason::abnormal("not connected"));
            };

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => return Inbound::Text(text.as_str().to_owned()),
                    Some(Ok(Message::Close(frame))) => {
                        self.ws = None;
                        let reason = match frame {
                            Some(frame) => CloseReason {
                                code: Some(u16::from(frame.code)),
                                reason: frame.reason.as_str().to_owned(),
                            },
                            None => CloseReason::abnormal("closed without status"),
                        };
                        return Inbound::Closed(reason);
                    }
                    // Ping/pong is answered by tungstenite; binary is not part of the protocol
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        self.ws = None;
                        return Inbound::Closed(CloseReason::abnormal(e.to_string()));
                    }
                    None => {
                        self.ws = None;
                        return Inbound::Closed(CloseReason::abnormal("stream ended"));
                    }
                }
            }
        })
    }

    fn close(&mut self, reason: CloseReason) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            let Some(mut ws) = self.ws.take() else {
                return Ok(());
            };
            let frame = CloseFrame {
                code: CloseCode::from(reason.code.unwrap_or(INTENTIONAL_CLOSE_CODE)),
                reason: reason.reason.into(),
            };
            ws.sink
                .send(Message::Close(Some(frame)))
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            let _ = ws.sink.close().await;
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;

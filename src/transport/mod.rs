// ABOUTME: Real-time transport seam between the connection manager and the socket implementation
// A connector opens a link; a link is a pair of channels carrying frames out and signals in

pub mod websocket;

pub use websocket::WsConnector;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// RFC 6455 normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered the upgrade request with a non-101 status.
    #[error("Handshake rejected with HTTP status {status}")]
    HandshakeRejected { status: u16 },
    #[error("Invalid transport address: {0}")]
    InvalidAddress(String),
    #[error("Connection failed: {0}")]
    Connect(String),
}

/// Frames the manager asks the transport to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingFrame {
    Text(String),
    /// Close with the normal closure code, then stop writing.
    Close,
}

/// What the transport reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    Text(String),
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// Where and how to authenticate a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub url: String,
    pub token: String,
    /// Put the token in the query string instead of an `Authorization` header.
    pub token_in_query: bool,
}

/// An open connection.
#[derive(Debug)]
pub struct TransportLink {
    pub outgoing: mpsc::UnboundedSender<OutgoingFrame>,
    pub incoming: mpsc::UnboundedReceiver<TransportSignal>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, request: ConnectRequest) -> Result<TransportLink, TransportError>;
}

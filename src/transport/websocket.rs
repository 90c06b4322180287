// ABOUTME: tokio-tungstenite connector for the room-scoped chat WebSocket
// Splits the socket into a writer task and a reader task bridged by channels

use super::{
    ConnectRequest, Connector, OutgoingFrame, TransportError, TransportLink, TransportSignal,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Final URL for a request, token appended when it travels in the query.
pub fn request_url(request: &ConnectRequest) -> Result<reqwest::Url, TransportError> {
    let mut url = reqwest::Url::parse(&request.url)
        .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", request.url, e)))?;
    if request.token_in_query {
        url.query_pairs_mut().append_pair("token", &request.token);
    }
    Ok(url)
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, request: ConnectRequest) -> Result<TransportLink, TransportError> {
        let url = request_url(&request)?;
        info!("Opening chat socket to {}", request.url);

        let mut ws_request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidAddress(e.to_string()))?;
        if !request.token_in_query {
            let value = HeaderValue::from_str(&format!("Bearer {}", request.token))
                .map_err(|e| TransportError::InvalidAddress(format!("bad token header: {}", e)))?;
            ws_request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws_stream, response) = connect_async(ws_request).await.map_err(|e| match e {
            tungstenite::Error::Http(response) => {
                warn!("Chat socket upgrade rejected: {}", response.status());
                TransportError::HandshakeRejected {
                    status: response.status().as_u16(),
                }
            }
            other => {
                error!("Chat socket connection failed: {}", other);
                TransportError::Connect(other.to_string())
            }
        })?;
        debug!("Chat socket handshake status: {:?}", response.status());

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutgoingFrame>();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<TransportSignal>();

        tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                match frame {
                    OutgoingFrame::Text(text) => {
                        if let Err(e) = ws_sender.send(tungstenite::Message::Text(text)).await {
                            error!("Failed to write chat frame: {}", e);
                            break;
                        }
                    }
                    OutgoingFrame::Close => {
                        let close = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client closed".into(),
                        };
                        if let Err(e) = ws_sender.send(tungstenite::Message::Close(Some(close))).await {
                            debug!("Close frame not delivered: {}", e);
                        }
                        break;
                    }
                }
            }
            debug!("Chat socket writer finished");
        });

        tokio::spawn(async move {
            while let Some(message) = ws_receiver.next().await {
                let signal = match message {
                    Ok(tungstenite::Message::Text(text)) => TransportSignal::Text(text),
                    Ok(tungstenite::Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                            .unwrap_or((None, String::new()));
                        let _ = incoming_tx.send(TransportSignal::Closed { code, reason });
                        return;
                    }
                    // Control and binary frames are handled by tungstenite or unused.
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = incoming_tx.send(TransportSignal::Error(e.to_string()));
                        return;
                    }
                };
                if incoming_tx.send(signal).is_err() {
                    return;
                }
            }
            let _ = incoming_tx.send(TransportSignal::Closed {
                code: None,
                reason: "stream ended".to_string(),
            });
        });

        Ok(TransportLink {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        })
    }
}

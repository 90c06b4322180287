// ABOUTME: Scripted in-process connector for exercising the connection loop without a socket

use crate::transport::{
    ConnectRequest, Connector, OutgoingFrame, TransportError, TransportLink, TransportSignal,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// How the next connect attempt should go.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scripted {
    Open,
    Reject(u16),
    Fail,
}

/// The far end of an opened link, handed to the test.
pub(crate) struct FakeServer {
    pub to_client: mpsc::UnboundedSender<TransportSignal>,
    pub from_client: mpsc::UnboundedReceiver<OutgoingFrame>,
}

impl FakeServer {
    pub fn say(&self, text: &str) {
        let _ = self.to_client.send(TransportSignal::Text(text.to_string()));
    }

    pub fn close(&self, code: Option<u16>) {
        let _ = self.to_client.send(TransportSignal::Closed {
            code,
            reason: String::new(),
        });
    }
}

pub(crate) struct ScriptedConnector {
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ConnectRequest>>,
    servers: mpsc::UnboundedSender<FakeServer>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Scripted>) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeServer>) {
        let (servers, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            servers,
        });
        (connector, rx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ConnectRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, request: ConnectRequest) -> Result<TransportLink, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();

        match next {
            Some(Scripted::Open) => {
                let (out_tx, out_rx) = mpsc::unbounded_channel();
                let (in_tx, in_rx) = mpsc::unbounded_channel();
                let _ = self.servers.send(FakeServer {
                    to_client: in_tx,
                    from_client: out_rx,
                });
                Ok(TransportLink {
                    outgoing: out_tx,
                    incoming: in_rx,
                })
            }
            Some(Scripted::Reject(status)) => Err(TransportError::HandshakeRejected { status }),
            Some(Scripted::Fail) | None => {
                Err(TransportError::Connect("connection refused".to_string()))
            }
        }
    }
}

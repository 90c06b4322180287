// ABOUTME: Connection manager owning the chat transport lifecycle for one room
// Handles connect, keep-alive, abnormal-closure detection, reconnection and teardown

use crate::chat::protocol::{ChatRecord, Frame, PING, PONG};
use crate::config::{ChatConfig, ReconnectPolicy};
use crate::credentials::{bearer_token, CredentialStore};
use crate::error::ChatError;
use crate::transport::{
    ConnectRequest, Connector, OutgoingFrame, TransportError, TransportLink, TransportSignal,
    NORMAL_CLOSURE,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

// ============================================
// States and events
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
    ClosedNormal,
    ClosedAbnormal,
    Reconnecting { attempt: u32 },
}

/// Reported to the session, one at a time, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    Message(ChatRecord),
    /// The server refused the upgrade. Not retried.
    HandshakeRejected { status: u16 },
    /// Abnormal closure; a reconnection follows unless the policy is exhausted.
    ConnectivityLost { reason: String },
    Reconnecting { attempt: u32, delay: Duration },
    /// No bearer token. Not retried.
    AuthenticationRequired,
    /// Attempt cap reached.
    GaveUp { attempts: u32 },
    /// The server closed the socket with a normal closure code.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub url: String,
    pub token_in_query: bool,
    pub keepalive_interval: Duration,
    pub keepalive_timeout: Option<Duration>,
    pub reconnect: ReconnectPolicy,
}

impl ConnectionSettings {
    pub fn for_room(config: &ChatConfig, room_id: &str) -> Self {
        Self {
            url: config.room_url(room_id),
            token_in_query: config.token_in_query,
            keepalive_interval: config.keepalive_interval(),
            keepalive_timeout: config.keepalive_timeout(),
            reconnect: config.reconnect_policy(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type OutgoingSlot = Arc<Mutex<Option<mpsc::UnboundedSender<OutgoingFrame>>>>;

/// One connect intent: its loop task, its teardown flag and its writer.
struct ActiveHandle {
    torn_down: Arc<AtomicBool>,
    outgoing: OutgoingSlot,
    task: JoinHandle<()>,
}

impl ActiveHandle {
    /// Close without triggering this handle's reconnection logic.
    fn shut_down(self) {
        {
            let mut slot = lock(&self.outgoing);
            self.torn_down.store(true, Ordering::SeqCst);
            if let Some(tx) = slot.take() {
                let _ = tx.send(OutgoingFrame::Close);
            }
        }
        self.task.abort();
    }
}

// ============================================
// Manager
// ============================================

pub struct ConnectionManager {
    settings: ConnectionSettings,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    active: Mutex<Option<ActiveHandle>>,
}

impl ConnectionManager {
    pub fn new(
        settings: ConnectionSettings,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialStore>,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            settings,
            connector,
            credentials,
            state: Arc::new(state),
            events,
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Whether a connect intent is live (connecting, open or backing off).
    /// A loop that ended on its own (normal close, rejection, no token, attempt cap) is not.
    pub fn is_active(&self) -> bool {
        lock(&self.active)
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Start connecting. Any previous handle is closed first and will not reconnect.
    pub fn connect(&self) {
        let mut active = lock(&self.active);
        if let Some(previous) = active.take() {
            info!("Replacing existing chat connection");
            previous.shut_down();
        }

        let torn_down = Arc::new(AtomicBool::new(false));
        let outgoing: OutgoingSlot = Arc::new(Mutex::new(None));
        let ctx = LoopContext {
            settings: self.settings.clone(),
            connector: self.connector.clone(),
            credentials: self.credentials.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
            torn_down: torn_down.clone(),
            outgoing: outgoing.clone(),
        };

        info!("Starting chat connection loop");
        let task = tokio::spawn(ctx.run());
        *active = Some(ActiveHandle {
            torn_down,
            outgoing,
            task,
        });
    }

    /// Queue a text frame. Fails fast when not open; nothing is buffered.
    pub fn send_text(&self, text: String) -> Result<(), ChatError> {
        if !self.is_open() {
            return Err(ChatError::NotConnected);
        }

        let active = lock(&self.active);
        let handle = active.as_ref().ok_or(ChatError::NotConnected)?;
        let slot = lock(&handle.outgoing);
        let tx = slot.as_ref().ok_or(ChatError::NotConnected)?;
        tx.send(OutgoingFrame::Text(text))
            .map_err(|_| ChatError::NotConnected)
    }

    /// Close the connection normally and cancel keep-alive and pending reconnection.
    pub fn teardown(&self) {
        let previous = lock(&self.active).take();
        if let Some(handle) = previous {
            info!("Tearing down chat connection");
            self.state.send_replace(ConnectionState::Closing);
            handle.shut_down();
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ============================================
// Connection loop
// ============================================

enum LinkOutcome {
    TornDown,
    ClosedNormal,
    Abnormal(String),
}

struct LoopContext {
    settings: ConnectionSettings,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    torn_down: Arc<AtomicBool>,
    outgoing: OutgoingSlot,
}

impl LoopContext {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn set_state(&self, next: ConnectionState) {
        // Teardown flips the flag under this lock, so a torn-down loop never publishes.
        let _slot = lock(&self.outgoing);
        self.publish(next);
    }

    fn publish(&self, next: ConnectionState) {
        if self.is_torn_down() {
            return;
        }
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("Connection state {:?} -> {:?}", previous, next);
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.is_torn_down() {
            return;
        }
        if self.events.send(event).is_err() {
            debug!("Connection event dropped; session is gone");
        }
    }

    async fn run(self) {
        let mut attempt: u32 = 0;

        loop {
            if self.is_torn_down() {
                return;
            }
            self.set_state(ConnectionState::Connecting);

            let Some(token) = bearer_token(self.credentials.as_ref()).await else {
                warn!("No bearer token; chat connection aborted");
                self.emit(ConnectionEvent::AuthenticationRequired);
                self.set_state(ConnectionState::Disconnected);
                return;
            };
            if self.is_torn_down() {
                debug!("Torn down while reading credentials");
                return;
            }

            let request = ConnectRequest {
                url: self.settings.url.clone(),
                token,
                token_in_query: self.settings.token_in_query,
            };

            let outcome = match self.connector.connect(request).await {
                Ok(link) => {
                    attempt = 0;
                    self.drive(link).await
                }
                Err(TransportError::HandshakeRejected { status }) => {
                    info!("Chat handshake rejected with status {}", status);
                    self.set_state(ConnectionState::ClosedAbnormal);
                    self.emit(ConnectionEvent::HandshakeRejected { status });
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
                Err(e) => LinkOutcome::Abnormal(e.to_string()),
            };

            match outcome {
                LinkOutcome::TornDown => return,
                LinkOutcome::ClosedNormal => {
                    info!("Chat server closed the connection normally");
                    self.set_state(ConnectionState::ClosedNormal);
                    self.emit(ConnectionEvent::Closed);
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
                LinkOutcome::Abnormal(reason) => {
                    error!("Chat connection lost: {}", reason);
                    self.set_state(ConnectionState::ClosedAbnormal);
                    self.emit(ConnectionEvent::ConnectivityLost { reason });
                }
            }

            attempt += 1;
            if !self.settings.reconnect.allows(attempt) {
                warn!("Max reconnection attempts reached");
                self.emit(ConnectionEvent::GaveUp {
                    attempts: attempt - 1,
                });
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            let delay = self.settings.reconnect.delay_for(attempt);
            self.set_state(ConnectionState::Reconnecting { attempt });
            self.emit(ConnectionEvent::Reconnecting { attempt, delay });
            sleep(delay).await;

            if self.is_torn_down() {
                debug!("Torn down during reconnection backoff");
                return;
            }
            info!("Attempting to reconnect (attempt {})", attempt);
        }
    }

    /// Pump one open link until it closes.
    async fn drive(&self, link: TransportLink) -> LinkOutcome {
        let TransportLink {
            outgoing,
            mut incoming,
        } = link;

        {
            let mut slot = lock(&self.outgoing);
            if self.is_torn_down() {
                let _ = outgoing.send(OutgoingFrame::Close);
                return LinkOutcome::TornDown;
            }
            *slot = Some(outgoing.clone());
            self.publish(ConnectionState::Open);
        }
        info!("Chat connection established");
        self.emit(ConnectionEvent::Opened);

        let mut ticker = interval(self.settings.keepalive_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // Skip first immediate tick
        let mut last_inbound = Instant::now();

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(timeout) = self.settings.keepalive_timeout {
                        if last_inbound.elapsed() >= timeout {
                            break LinkOutcome::Abnormal("keep-alive timed out".to_string());
                        }
                    }
                    if outgoing.send(OutgoingFrame::Text(PING.to_string())).is_err() {
                        break LinkOutcome::Abnormal("transport writer stopped".to_string());
                    }
                    debug!("Keep-alive ping sent");
                }

                signal = incoming.recv() => {
                    match signal {
                        Some(TransportSignal::Text(text)) => {
                            last_inbound = Instant::now();
                            self.handle_text(&text, &outgoing);
                        }
                        Some(TransportSignal::Closed { code, reason }) => {
                            if self.is_torn_down() {
                                break LinkOutcome::TornDown;
                            }
                            if code == Some(NORMAL_CLOSURE) {
                                break LinkOutcome::ClosedNormal;
                            }
                            break LinkOutcome::Abnormal(format!("closed with code {:?} {}", code, reason));
                        }
                        Some(TransportSignal::Error(e)) => {
                            if self.is_torn_down() {
                                break LinkOutcome::TornDown;
                            }
                            break LinkOutcome::Abnormal(e);
                        }
                        None => {
                            if self.is_torn_down() {
                                break LinkOutcome::TornDown;
                            }
                            break LinkOutcome::Abnormal("transport ended".to_string());
                        }
                    }
                }
            }
        };

        lock(&self.outgoing).take();
        outcome
    }

    fn handle_text(&self, text: &str, outgoing: &mpsc::UnboundedSender<OutgoingFrame>) {
        match Frame::parse(text) {
            Ok(Frame::Pong) => debug!("Keep-alive acknowledged"),
            Ok(Frame::Ping) => {
                let _ = outgoing.send(OutgoingFrame::Text(PONG.to_string()));
            }
            Ok(Frame::Event(record)) => {
                debug!("Received chat event from {}", record.sender);
                self.emit(ConnectionEvent::Message(record));
            }
            Err(e) => warn!("Failed to parse chat frame: {}", e),
        }
    }
}

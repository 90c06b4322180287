// ABOUTME: Chat session orchestrator: one open consultation room and everything it owns
// Loads consultation and history, drives the connection, applies events and exposes the display model

use crate::api::ConsultationApi;
use crate::app::notification::Notification;
use crate::chat::connection::{ConnectionEvent, ConnectionManager, ConnectionSettings, ConnectionState};
use crate::chat::grouping::{group_messages, DateLabels, DisplayItem};
use crate::chat::outbound::{Outbound, SendReport};
use crate::chat::protocol::ChatRecord;
use crate::chat::session_state::{resolve_after_rejection, resolve_for, SessionState};
use crate::chat::store::{MessageStore, RemoteOutcome};
use crate::chat::timestamp::{now_local_string, Clock};
use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::error::ChatError;
use crate::models::{ConsultationSession, UserIdentity};
use crate::transport::Connector;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Collaborators a session is built from.
#[derive(Clone)]
pub struct SessionDeps {
    pub api: Arc<dyn ConsultationApi>,
    pub credentials: Arc<dyn CredentialStore>,
    pub connector: Arc<dyn Connector>,
    pub clock: Arc<dyn Clock>,
    pub config: AppConfig,
}

/// Route parameters for entering a chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    pub consultation_id: String,
    pub room_id: String,
}

impl SessionParams {
    pub fn new(consultation_id: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            consultation_id: consultation_id.into(),
            room_id: room_id.into(),
        }
    }

    fn validate(&self) -> Result<(), ChatError> {
        if self.consultation_id.trim().is_empty() {
            return Err(ChatError::MissingParameter("consultation id"));
        }
        if self.room_id.trim().is_empty() {
            return Err(ChatError::MissingParameter("room id"));
        }
        Ok(())
    }
}

pub struct ChatSession {
    api: Arc<dyn ConsultationApi>,
    clock: Arc<dyn Clock>,
    sender_role: String,
    labels: DateLabels,
    room_id: String,
    identity: UserIdentity,
    consultation: ConsultationSession,
    state: SessionState,
    store: MessageStore,
    connection: ConnectionManager,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    notifications: Vec<Notification>,
    closed: bool,
}

impl ChatSession {
    /// Enter a chat room. Every error returned here is a fatal load error.
    pub async fn open(deps: SessionDeps, params: SessionParams) -> Result<Self, ChatError> {
        params.validate()?;

        let identity = UserIdentity::load(deps.credentials.as_ref())
            .await
            .ok_or(ChatError::Unauthenticated)?;

        if !deps.config.clock.server_shares_wall_clock {
            warn!("Server and device clocks are configured as different zones; chat times and session windows may be off");
        }

        let consultation = deps
            .api
            .get_consultation(&params.consultation_id)
            .await
            .map_err(ChatError::ConsultationLoad)?;

        if !consultation.supports_chat() {
            return Err(ChatError::NoChatRoom(consultation.id));
        }
        if consultation.room_id.as_deref() != Some(params.room_id.as_str()) {
            warn!(
                "Route room {} differs from consultation room {:?}",
                params.room_id, consultation.room_id
            );
        }

        let state = resolve_for(&consultation, deps.clock.now());
        info!("Consultation {} resolved to {}", consultation.id, state);

        let records = match deps.api.get_chat_history(&params.room_id).await {
            Ok(records) => records,
            Err(e) if e.is_not_found() => {
                debug!("No chat history for room {}", params.room_id);
                Vec::new()
            }
            Err(e) => return Err(ChatError::HistoryLoad(e)),
        };

        let fallback = now_local_string(deps.clock.as_ref());
        let mut store = MessageStore::new(identity.user_id.clone());
        store.load_history(
            records
                .into_iter()
                .map(|record| record.into_message(&identity, &consultation.counterpart_name, &fallback))
                .collect(),
        );

        let (tx, events) = mpsc::unbounded_channel();
        let connection = ConnectionManager::new(
            ConnectionSettings::for_room(&deps.config.chat, &params.room_id),
            deps.connector.clone(),
            deps.credentials.clone(),
            tx,
        );

        let session = Self {
            api: deps.api,
            clock: deps.clock,
            sender_role: deps.config.chat.sender_role.clone(),
            labels: DateLabels::new(deps.config.display.locale),
            room_id: params.room_id,
            identity,
            consultation,
            state,
            store,
            connection,
            events,
            notifications: Vec::new(),
            closed: false,
        };

        if session.state.is_active() {
            session.connection.connect();
        }
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn consultation(&self) -> &ConsultationSession {
        &self.consultation
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Display sequence for an inverted list, newest first.
    pub fn display_items(&self) -> Vec<DisplayItem> {
        group_messages(self.store.messages(), self.clock.now(), &self.labels)
    }

    /// Send text and/or images. Fails with `NotConnected` unless the room is open.
    pub async fn send(&mut self, text: Option<&str>, images: &[String]) -> Result<SendReport, ChatError> {
        if self.closed || !self.state.is_active() {
            return Err(ChatError::NotConnected);
        }

        let outbound = Outbound {
            room_id: &self.room_id,
            identity: &self.identity,
            sender_role: &self.sender_role,
            api: self.api.as_ref(),
            connection: &self.connection,
            clock: self.clock.as_ref(),
        };
        outbound
            .send(&mut self.store, text, images, &mut self.notifications)
            .await
    }

    /// Wait for the next connection event and apply it.
    pub async fn next_update(&mut self) -> Option<ConnectionEvent> {
        let event = self.events.recv().await?;
        self.apply_event(event.clone());
        Some(event)
    }

    /// Apply one event to completion.
    pub fn apply_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                debug!("Chat room {} is open", self.room_id);
            }
            ConnectionEvent::Message(record) => self.receive(record),
            ConnectionEvent::HandshakeRejected { status } => {
                let next = resolve_after_rejection(&self.consultation, self.clock.now());
                info!("Server refused room {} ({}); session is now {}", self.room_id, status, next);
                self.connection.teardown();
                self.state = next;
            }
            ConnectionEvent::ConnectivityLost { reason } => {
                debug!("Connectivity lost: {}", reason);
                self.notify(Notification::error(
                    "Connection Error",
                    "Lost connection to chat. Reconnecting...",
                ));
            }
            ConnectionEvent::Reconnecting { attempt, delay } => {
                debug!("Reconnect attempt {} in {:?}", attempt, delay);
            }
            ConnectionEvent::AuthenticationRequired => {
                self.connection.teardown();
                self.notify(Notification::error(
                    "Authentication Error",
                    ChatError::Unauthenticated.to_string(),
                ));
            }
            ConnectionEvent::GaveUp { attempts } => {
                self.connection.teardown();
                self.notify(Notification::error(
                    "Connection Error",
                    format!("Could not reconnect after {} attempts.", attempts),
                ));
            }
            ConnectionEvent::Closed => {
                let next = resolve_for(&self.consultation, self.clock.now());
                info!("Chat room {} closed by server; session is {}", self.room_id, next);
                self.connection.teardown();
                self.state = next;
                self.notify(Notification::info("Chat Closed", "The chat connection was closed."));
            }
        }
    }

    fn receive(&mut self, record: ChatRecord) {
        let fallback = now_local_string(self.clock.as_ref());
        let message = record.into_message(&self.identity, &self.consultation.counterpart_name, &fallback);
        match self.store.append_remote(message) {
            RemoteOutcome::Inserted => debug!("Message added ({} total)", self.store.len()),
            RemoteOutcome::EchoConfirmed(index) => debug!("Own message at {} confirmed", index),
            RemoteOutcome::EchoIgnored | RemoteOutcome::Duplicate => {}
        }
    }

    /// Re-fetch the consultation (screen focus) and follow any state change.
    /// A failed fetch keeps the current state and raises a notice.
    pub async fn refresh(&mut self) -> SessionState {
        match self.api.get_consultation(&self.consultation.id).await {
            Ok(consultation) => {
                self.consultation = consultation;
                self.reevaluate();
            }
            Err(e) => {
                warn!("Failed to refresh consultation {}: {}", self.consultation.id, e);
                self.notify(Notification::error(
                    "Refresh Failed",
                    ChatError::ConsultationLoad(e).to_string(),
                ));
            }
        }
        self.state
    }

    /// Re-resolve against the clock without fetching; connects or disconnects as needed.
    pub fn reevaluate(&mut self) -> SessionState {
        if self.closed {
            return self.state;
        }

        let next = resolve_for(&self.consultation, self.clock.now());
        if next != self.state {
            info!("Session {} moved {} -> {}", self.consultation.id, self.state, next);
        }
        self.state = next;

        if next.is_active() {
            if !self.connection.is_active() {
                self.connection.connect();
            }
        } else if self.connection.is_active() {
            self.connection.teardown();
        }
        self.state
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Live notifications; expired ones are dropped.
    pub fn notifications(&mut self) -> &[Notification] {
        self.notifications.retain(|n| !n.is_expired());
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Leave the room: close normally and stop reconnecting.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        info!("Leaving chat room {}", self.room_id);
        self.connection.teardown();
        self.closed = true;
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockConsultationApi};
    use crate::chat::testing::{FakeServer, Scripted, ScriptedConnector};
    use crate::chat::timestamp::FixedClock;
    use crate::credentials::{keys, MemoryCredentialStore};
    use crate::models::{ConsultationMode, ConsultationStatus, MessageId, MessageKind};
    use crate::transport::OutgoingFrame;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn consultation(status: ConsultationStatus) -> ConsultationSession {
        ConsultationSession {
            id: "c-1".to_string(),
            mode: ConsultationMode::Remote,
            status,
            counterpart_name: "Budi".to_string(),
            counterpart_city: Some("Bandung".to_string()),
            start: "2024-01-01T10:00:00".to_string(),
            end: "2024-01-01T11:00:00".to_string(),
            location: None,
            location_note: None,
            room_id: Some("room-1".to_string()),
            total: None,
            created_at: None,
        }
    }

    fn credentials() -> Arc<MemoryCredentialStore> {
        Arc::new(MemoryCredentialStore::with_entries([
            (keys::USER_TOKEN, "tok"),
            (keys::USER_ID, "arch-1"),
            (keys::USERNAME, "Sari"),
        ]))
    }

    fn api_returning(status: ConsultationStatus, history: Result<Vec<ChatRecord>, ApiError>) -> MockConsultationApi {
        let mut api = MockConsultationApi::new();
        let record = consultation(status);
        api.expect_get_consultation()
            .returning(move |id| {
                assert_eq!(id, "c-1");
                Ok(record.clone())
            });
        let mut history = Some(history);
        api.expect_get_chat_history()
            .times(1)
            .returning(move |_| history.take().unwrap_or_else(|| Ok(Vec::new())));
        api
    }

    fn deps(api: MockConsultationApi, connector: Arc<ScriptedConnector>) -> (SessionDeps, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at("2024-01-01T10:30:00").unwrap());
        let deps = SessionDeps {
            api: Arc::new(api),
            credentials: credentials(),
            connector,
            clock: clock.clone(),
            config: AppConfig::default(),
        };
        (deps, clock)
    }

    async fn open_active(
        api: MockConsultationApi,
    ) -> (ChatSession, FakeServer, Arc<ScriptedConnector>) {
        let (connector, mut servers) = ScriptedConnector::new(vec![Scripted::Open]);
        let (deps, _) = deps(api, connector.clone());
        let mut session = ChatSession::open(deps, SessionParams::new("c-1", "room-1"))
            .await
            .unwrap();
        assert_eq!(session.next_update().await, Some(ConnectionEvent::Opened));
        let server = servers.recv().await.unwrap();
        (session, server, connector)
    }

    /// Next non-keepalive frame written by the client.
    async fn next_chat_frame(server: &mut FakeServer) -> String {
        loop {
            match server.from_client.recv().await {
                Some(OutgoingFrame::Text(text)) if text == "PING" => continue,
                Some(OutgoingFrame::Text(text)) => return text,
                other => panic!("expected a chat frame, got {:?}", other),
            }
        }
    }

    fn history_record(id: &str, sender: &str, content: &str, at: &str) -> ChatRecord {
        ChatRecord {
            id: Some(id.to_string()),
            room_id: Some("room-1".to_string()),
            sender: sender.to_string(),
            sender_role: None,
            content: content.to_string(),
            kind: MessageKind::Text,
            sent_at: None,
            created_at: Some(at.to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_session_sends_and_absorbs_echo() {
        let api = api_returning(ConsultationStatus::Scheduled, Ok(Vec::new()));
        let (mut session, mut server, connector) = open_active(api).await;

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(connector.calls(), 1);
        assert_eq!(session.connection_state(), ConnectionState::Open);

        let report = session.send(Some("Hello"), &[]).await.unwrap();
        assert_eq!(report.sent.len(), 1);
        assert_eq!(session.store().len(), 1);
        let entry = session.store().get(0).unwrap();
        assert!(entry.is_from_user);
        assert!(entry.is_pending());

        let json = next_chat_frame(&mut server).await;
        let sent: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(sent["sender"], "arch-1");
        assert_eq!(sent["senderRole"], "architect");
        assert_eq!(sent["content"], "Hello");
        assert_eq!(sent["type"], "TEXT");
        assert_eq!(sent["sentAt"], "2024-01-01T10:30:00.000");

        server.say(r#"{"id":"srv-1","sender":"arch-1","content":"Hello","type":"TEXT","createdAt":"2024-01-01T10:30:01"}"#);
        assert!(matches!(session.next_update().await, Some(ConnectionEvent::Message(_))));

        assert_eq!(session.store().len(), 1);
        let entry = session.store().get(0).unwrap();
        assert_eq!(entry.id, MessageId::Confirmed("srv-1".to_string()));
        assert_eq!(entry.sent_at, "2024-01-01T10:30:01");
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_message_is_displayed() {
        let history = vec![history_record("h-1", "u-9", "Selamat pagi", "2024-01-01T09:00:00Z")];
        let api = api_returning(ConsultationStatus::InProgress, Ok(history));
        let (mut session, server, _) = open_active(api).await;

        server.say(r#"{"id":"m-2","sender":"u-9","content":"Halo","type":"TEXT","createdAt":"2024-01-01T10:31:00"}"#);
        session.next_update().await;

        assert_eq!(session.store().len(), 2);
        let items = session.display_items();
        assert_eq!(items.len(), 3);
        match &items[0] {
            DisplayItem::Message { message, time_label, .. } => {
                assert_eq!(message.content, "Halo");
                assert_eq!(message.sender_name, "Budi");
                assert_eq!(time_label, "10.31");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&items[2], DisplayItem::DateSeparator { label, .. } if label == "Hari ini"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_session_does_not_connect_and_404_is_empty_history() {
        let api = api_returning(ConsultationStatus::AwaitingPayment, Err(ApiError::NotFound));
        let (connector, _servers) = ScriptedConnector::new(vec![Scripted::Open]);
        let (deps, _) = deps(api, connector.clone());

        let mut session = ChatSession::open(deps, SessionParams::new("c-1", "room-1"))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        assert_eq!(session.state(), SessionState::Waiting);
        assert!(session.store().is_empty());
        assert_eq!(connector.calls(), 0);
        assert!(matches!(
            session.send(Some("Hi"), &[]).await,
            Err(ChatError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_history_failure_is_fatal() {
        let api = api_returning(
            ConsultationStatus::Scheduled,
            Err(ApiError::Status { code: 500, message: "boom".to_string() }),
        );
        let (connector, _servers) = ScriptedConnector::new(vec![]);
        let (deps, _) = deps(api, connector);

        let err = ChatSession::open(deps, SessionParams::new("c-1", "room-1"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::HistoryLoad(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_missing_parameters_are_fatal_before_any_fetch() {
        let (connector, _servers) = ScriptedConnector::new(vec![]);
        let (deps, _) = deps(MockConsultationApi::new(), connector);

        let err = ChatSession::open(deps, SessionParams::new("c-1", "  "))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::MissingParameter(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_consultation_without_room_is_fatal() {
        let mut api = MockConsultationApi::new();
        api.expect_get_consultation().returning(|_| {
            let mut record = consultation(ConsultationStatus::Scheduled);
            record.room_id = None;
            Ok(record)
        });
        let (connector, _servers) = ScriptedConnector::new(vec![]);
        let (deps, _) = deps(api, connector);

        let err = ChatSession::open(deps, SessionParams::new("c-1", "room-1"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ChatError::NoChatRoom(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_rejection_moves_to_waiting_quietly() {
        let api = api_returning(ConsultationStatus::Scheduled, Ok(Vec::new()));
        let (connector, _servers) = ScriptedConnector::new(vec![Scripted::Reject(403)]);
        let (deps, _) = deps(api, connector.clone());

        let mut session = ChatSession::open(deps, SessionParams::new("c-1", "room-1"))
            .await
            .unwrap();
        assert_eq!(
            session.next_update().await,
            Some(ConnectionEvent::HandshakeRejected { status: 403 })
        );

        assert_eq!(session.state(), SessionState::Waiting);
        assert!(session.notifications().is_empty());
        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abnormal_closure_notifies() {
        let api = api_returning(ConsultationStatus::InProgress, Ok(Vec::new()));
        let (mut session, server, _) = open_active(api).await;

        server.close(Some(1006));
        assert!(matches!(
            session.next_update().await,
            Some(ConnectionEvent::ConnectivityLost { .. })
        ));
        let notices = session.take_notifications();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_error());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_batch_continues_past_failed_upload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG").unwrap();
        let good = format!("file://{}", file.path().display());

        let mut api = api_returning(ConsultationStatus::InProgress, Ok(Vec::new()));
        api.expect_upload_chat_file()
            .times(1)
            .returning(|room, upload| {
                assert_eq!(room, "room-1");
                assert_eq!(upload.bytes, b"\x89PNG".to_vec());
                Ok("https://cdn.example/img-1.png".to_string())
            });
        let (mut session, mut server, _) = open_active(api).await;

        let images = vec!["file:///missing/photo.jpg".to_string(), good];
        let report = session.send(Some("Lihat gambar"), &images).await.unwrap();

        assert_eq!(report.sent.len(), 2);
        assert_eq!(report.failed, 1);
        let contents: Vec<_> = session.store().messages().iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec!["https://cdn.example/img-1.png", "Lihat gambar"]);

        let notices = session.take_notifications();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Upload Failed");

        let first = next_chat_frame(&mut server).await;
        assert!(first.contains("\"type\":\"IMAGE\""));
        assert!(first.contains("https://cdn.example/img-1.png"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_to_ended_tears_down() {
        let mut api = MockConsultationApi::new();
        let mut statuses = vec![ConsultationStatus::Ended, ConsultationStatus::InProgress];
        api.expect_get_consultation()
            .returning(move |_| Ok(consultation(statuses.pop().unwrap_or(ConsultationStatus::Ended))));
        api.expect_get_chat_history().returning(|_| Ok(Vec::new()));
        let (mut session, mut server, _) = open_active(api).await;

        assert_eq!(session.refresh().await, SessionState::Ended);
        let mut last = None;
        while let Some(frame) = server.from_client.recv().await {
            last = Some(frame);
        }
        assert_eq!(last, Some(OutgoingFrame::Close));
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_reconnection() {
        let api = api_returning(ConsultationStatus::InProgress, Ok(Vec::new()));
        let (mut session, server, connector) = open_active(api).await;

        server.close(Some(1006));
        session.next_update().await;
        session.close();
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;

        assert!(session.is_closed());
        assert_eq!(connector.calls(), 1);
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reevaluate_reconnects_after_server_closed_the_room() {
        let api = api_returning(ConsultationStatus::InProgress, Ok(Vec::new()));
        let (connector, mut servers) = ScriptedConnector::new(vec![Scripted::Open, Scripted::Open]);
        let (deps, _) = deps(api, connector.clone());
        let mut session = ChatSession::open(deps, SessionParams::new("c-1", "room-1"))
            .await
            .unwrap();
        assert_eq!(session.next_update().await, Some(ConnectionEvent::Opened));

        servers.recv().await.unwrap().close(Some(1000));
        assert_eq!(session.next_update().await, Some(ConnectionEvent::Closed));
        assert_eq!(session.state(), SessionState::Active);
        assert!(!session.connection.is_active());

        assert_eq!(session.reevaluate(), SessionState::Active);
        assert_eq!(session.next_update().await, Some(ConnectionEvent::Opened));
        assert_eq!(connector.calls(), 2);

        let mut server = servers.recv().await.unwrap();
        session.send(Some("Masih di sini?"), &[]).await.unwrap();
        let json = next_chat_frame(&mut server).await;
        assert!(json.contains("Masih di sini?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_notifies_and_login_lets_reevaluate_connect() {
        let api = api_returning(ConsultationStatus::InProgress, Ok(Vec::new()));
        let (connector, _servers) = ScriptedConnector::new(vec![Scripted::Open]);
        let (mut deps, _) = deps(api, connector.clone());
        let store = Arc::new(MemoryCredentialStore::with_entries([
            (keys::USER_ID, "arch-1"),
            (keys::USERNAME, "Sari"),
        ]));
        deps.credentials = store.clone();

        let mut session = ChatSession::open(deps, SessionParams::new("c-1", "room-1"))
            .await
            .unwrap();
        assert_eq!(
            session.next_update().await,
            Some(ConnectionEvent::AuthenticationRequired)
        );
        assert_eq!(connector.calls(), 0);

        let notices = session.take_notifications();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Authentication Error");
        assert!(notices[0].is_error());

        store.set(keys::USER_TOKEN, "fresh").await.unwrap();
        session.reevaluate();
        assert_eq!(session.next_update().await, Some(ConnectionEvent::Opened));
        assert_eq!(connector.last_request().unwrap().token, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_echo_confirms_uploaded_placeholder() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG").unwrap();
        let local = format!("file://{}", file.path().display());

        let mut api = api_returning(ConsultationStatus::InProgress, Ok(Vec::new()));
        api.expect_upload_chat_file()
            .times(1)
            .returning(|_, _| Ok("https://cdn.example/img-2.png".to_string()));
        let (mut session, mut server, _) = open_active(api).await;

        let report = session.send(None, &[local]).await.unwrap();
        assert_eq!(report.sent.len(), 1);
        let frame = next_chat_frame(&mut server).await;
        assert!(frame.contains("https://cdn.example/img-2.png"));
        assert!(session.store().get(0).unwrap().is_pending());

        server.say(r#"{"id":"srv-7","sender":"arch-1","content":"https://cdn.example/img-2.png","type":"IMAGE","createdAt":"2024-01-01T10:30:05"}"#);
        assert!(matches!(session.next_update().await, Some(ConnectionEvent::Message(_))));

        assert_eq!(session.store().len(), 1);
        let entry = session.store().get(0).unwrap();
        assert_eq!(entry.id, MessageId::Confirmed("srv-7".to_string()));
        assert!(entry.is_image());
        assert_eq!(entry.content, "https://cdn.example/img-2.png");
        assert_eq!(entry.sent_at, "2024-01-01T10:30:05");
    }
}

// ABOUTME: Outbound message pipeline: optimistic insert, optional image upload, then transmit
// Images go first, one at a time, then the text; a failed item never aborts the batch

use crate::api::{ConsultationApi, FileUpload};
use crate::app::notification::Notification;
use crate::chat::connection::ConnectionManager;
use crate::chat::protocol::ChatRecord;
use crate::chat::store::MessageStore;
use crate::chat::timestamp::{now_local_string, Clock};
use crate::error::ChatError;
use crate::models::{ChatMessage, MessageId, MessageKind, PendingId, UserIdentity};
use tracing::{debug, info, warn};

/// Everything a send needs besides the store it writes into.
pub struct Outbound<'a> {
    pub room_id: &'a str,
    pub identity: &'a UserIdentity,
    pub sender_role: &'a str,
    pub api: &'a dyn ConsultationApi,
    pub connection: &'a ConnectionManager,
    pub clock: &'a dyn Clock,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Transmitted entries, in call order. They stay pending until echoed.
    pub sent: Vec<PendingId>,
    pub failed: usize,
}

impl SendReport {
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty() && self.failed == 0
    }
}

impl<'a> Outbound<'a> {
    /// Send optional text plus any number of device-local images.
    ///
    /// Refuses up front when the connection is not open. After that, per-item
    /// failures discard the item's placeholder and add a notice instead of erroring.
    pub async fn send(
        &self,
        store: &mut MessageStore,
        text: Option<&str>,
        images: &[String],
        notices: &mut Vec<Notification>,
    ) -> Result<SendReport, ChatError> {
        if !self.connection.is_open() {
            return Err(ChatError::NotConnected);
        }

        let mut report = SendReport::default();

        for uri in images {
            match self.send_image(store, uri).await {
                Ok(pending) => report.sent.push(pending),
                Err(notice) => {
                    report.failed += 1;
                    notices.push(notice);
                }
            }
        }

        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            match self.send_text(store, text) {
                Ok(pending) => report.sent.push(pending),
                Err(notice) => {
                    report.failed += 1;
                    notices.push(notice);
                }
            }
        }

        info!(
            "Sent {} message(s) to room {}, {} failed",
            report.sent.len(),
            self.room_id,
            report.failed
        );
        Ok(report)
    }

    fn send_text(&self, store: &mut MessageStore, text: &str) -> Result<PendingId, Notification> {
        let sent_at = now_local_string(self.clock);
        let pending = store.append_optimistic(self.compose(text, MessageKind::Text, &sent_at));

        if let Err(e) = self.transmit(text, MessageKind::Text, &sent_at) {
            warn!("Failed to send text message: {}", e);
            store.discard(pending);
            return Err(Notification::error("Send Failed", e.to_string()));
        }
        Ok(pending)
    }

    async fn send_image(&self, store: &mut MessageStore, uri: &str) -> Result<PendingId, Notification> {
        let sent_at = now_local_string(self.clock);
        let pending = store.append_optimistic(self.compose(uri, MessageKind::Image, &sent_at));
        debug!("Uploading image {}", uri);

        let url = match self.upload(uri).await {
            Ok(url) => url,
            Err(message) => {
                warn!("Image upload failed for {}: {}", uri, message);
                store.discard(pending);
                return Err(Notification::error(
                    "Upload Failed",
                    format!("Failed to upload image. {}", message),
                ));
            }
        };

        if store.reconcile(pending, url.as_str()).is_err() {
            // Placeholder is gone; nothing left to transmit for.
            warn!("Upload finished for a placeholder that no longer exists");
            return Err(Notification::error("Upload Failed", "The message was removed before upload finished."));
        }

        if let Err(e) = self.transmit(&url, MessageKind::Image, &sent_at) {
            warn!("Failed to send image message: {}", e);
            store.discard(pending);
            return Err(Notification::error("Send Failed", e.to_string()));
        }
        Ok(pending)
    }

    async fn upload(&self, uri: &str) -> Result<String, String> {
        let file = FileUpload::read_local(uri).await.map_err(|e| e.to_string())?;
        self.api
            .upload_chat_file(self.room_id, file)
            .await
            .map_err(|e| e.to_string())
    }

    fn compose(&self, content: &str, kind: MessageKind, sent_at: &str) -> ChatMessage {
        ChatMessage {
            // Replaced by the store.
            id: MessageId::Pending(PendingId::new()),
            content: content.to_string(),
            kind,
            sent_at: sent_at.to_string(),
            sender_id: self.identity.user_id.clone(),
            sender_name: self.identity.display_name().to_string(),
            is_from_user: true,
        }
    }

    fn transmit(&self, content: &str, kind: MessageKind, sent_at: &str) -> Result<(), ChatError> {
        let record = ChatRecord::outbound(
            self.identity.user_id.as_str(),
            self.sender_role,
            content,
            kind,
            sent_at,
        );
        self.connection.send_text(record.to_json()?)
    }
}

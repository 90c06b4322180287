// ABOUTME: Ordered, de-duplicated message collection for the open chat room
// Holds history, optimistic sends and peer messages in one insertion-ordered list

use crate::models::{ChatMessage, MessageId, PendingId};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No pending message with id {0}")]
    UnknownPending(PendingId),
}

/// What happened to a message handed to [`MessageStore::append_remote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Inserted,
    /// Our own send came back and promoted the pending entry at this index.
    EchoConfirmed(usize),
    /// Our own message with nothing pending to match.
    EchoIgnored,
    /// A message with this id is already stored.
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct MessageStore {
    local_user_id: String,
    entries: Vec<ChatMessage>,
}

impl MessageStore {
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.entries.get(index)
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.entries.iter().position(|m| &m.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|m| m.is_pending()).count()
    }

    /// Replace everything with a history snapshot. Repeated ids keep their first occurrence.
    pub fn load_history(&mut self, messages: Vec<ChatMessage>) {
        let mut seen = HashSet::new();
        let total = messages.len();
        self.entries = messages
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        if self.entries.len() != total {
            warn!("Dropped {} duplicate history entries", total - self.entries.len());
        }
        debug!("Loaded {} history messages", self.entries.len());
    }

    /// Append a locally composed message under a fresh temporary id.
    pub fn append_optimistic(&mut self, mut message: ChatMessage) -> PendingId {
        let pending = PendingId::new();
        message.id = MessageId::Pending(pending);
        message.is_from_user = true;
        self.entries.push(message);
        pending
    }

    /// Swap the content of a pending entry in place (e.g. local URI -> uploaded URL).
    pub fn reconcile(&mut self, pending: PendingId, content: impl Into<String>) -> Result<(), StoreError> {
        let entry = self
            .pending_mut(pending)
            .ok_or(StoreError::UnknownPending(pending))?;
        entry.content = content.into();
        Ok(())
    }

    /// Promote a pending entry to confirmed, keeping its slot.
    pub fn confirm(
        &mut self,
        pending: PendingId,
        server_id: Option<String>,
        sent_at: Option<String>,
    ) -> Result<usize, StoreError> {
        let index = self
            .pending_index(pending)
            .ok_or(StoreError::UnknownPending(pending))?;
        let entry = &mut self.entries[index];
        entry.id = MessageId::Confirmed(server_id.unwrap_or_else(|| pending.to_string()));
        if let Some(sent_at) = sent_at {
            entry.sent_at = sent_at;
        }
        Ok(index)
    }

    /// Remove a pending entry that can no longer be delivered.
    pub fn discard(&mut self, pending: PendingId) -> Option<ChatMessage> {
        let index = self.pending_index(pending)?;
        Some(self.entries.remove(index))
    }

    /// Insert a message that arrived over the transport.
    pub fn append_remote(&mut self, message: ChatMessage) -> RemoteOutcome {
        if self.position(&message.id).is_some() {
            debug!("Ignoring duplicate message {}", message.id);
            return RemoteOutcome::Duplicate;
        }

        if message.sender_id == self.local_user_id {
            return self.absorb_echo(message);
        }

        self.entries.push(message);
        RemoteOutcome::Inserted
    }

    fn absorb_echo(&mut self, echo: ChatMessage) -> RemoteOutcome {
        let matching = self.entries.iter().position(|m| {
            m.is_pending() && m.kind == echo.kind && m.content == echo.content
        });

        let Some(index) = matching else {
            debug!("Ignoring echo of own message {}", echo.id);
            return RemoteOutcome::EchoIgnored;
        };

        let entry = &mut self.entries[index];
        if let MessageId::Confirmed(_) = echo.id {
            entry.id = echo.id;
        } else if let MessageId::Pending(pending) = entry.id {
            entry.id = MessageId::Confirmed(pending.to_string());
        }
        entry.sent_at = echo.sent_at;
        debug!("Echo confirmed pending message at index {}", index);
        RemoteOutcome::EchoConfirmed(index)
    }

    fn pending_index(&self, pending: PendingId) -> Option<usize> {
        self.position(&MessageId::Pending(pending))
    }

    fn pending_mut(&mut self, pending: PendingId) -> Option<&mut ChatMessage> {
        let index = self.pending_index(pending)?;
        self.entries.get_mut(index)
    }
}

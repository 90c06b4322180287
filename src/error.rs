// ABOUTME: Error taxonomy for chat sessions
// Fatal load errors abort session entry; everything else is reported and recovered from

use crate::api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Missing required information to load chat: {0}")]
    MissingParameter(&'static str),

    #[error("Failed to load consultation details: {0}")]
    ConsultationLoad(#[source] ApiError),

    #[error("Consultation {0} has no chat room")]
    NoChatRoom(String),

    #[error("Failed to load chat history: {0}")]
    HistoryLoad(#[source] ApiError),

    #[error("Cannot connect to chat. Please log in again.")]
    Unauthenticated,

    #[error("You are not connected to the chat.")]
    NotConnected,

    #[error("Failed to encode chat message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ChatError {
    /// Fatal errors end the session view; the user has to navigate away.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChatError::MissingParameter(_)
                | ChatError::ConsultationLoad(_)
                | ChatError::NoChatRoom(_)
                | ChatError::HistoryLoad(_)
        )
    }
}

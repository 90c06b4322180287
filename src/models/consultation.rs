// ABOUTME: Consultation data model representing one architect-client engagement
// Status and scheduled window together drive the chat session state

use crate::chat::timestamp::{parse_local, LocalInstant};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsultationMode {
    #[serde(rename = "online")]
    Remote, // Chat consultation
    #[serde(rename = "offline")]
    InPerson, // Face-to-face at a physical location
}

impl ConsultationMode {
    pub fn as_wire(&self) -> &'static str {
        match self {
            ConsultationMode::Remote => "online",
            ConsultationMode::InPerson => "offline",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConsultationMode::Remote => "Chat",
            ConsultationMode::InPerson => "Tatap Muka",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsultationStatus {
    #[serde(rename = "waiting-for-payment")]
    AwaitingPayment,
    // The backend has shipped both spellings.
    #[serde(rename = "waiting-for-confirmation", alias = "waiting-for-conifrmation")]
    AwaitingConfirmation,
    Scheduled,
    InProgress,
    Ended,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ConsultationStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            ConsultationStatus::AwaitingPayment => "waiting-for-payment",
            ConsultationStatus::AwaitingConfirmation => "waiting-for-confirmation",
            ConsultationStatus::Scheduled => "scheduled",
            ConsultationStatus::InProgress => "in-progress",
            ConsultationStatus::Ended => "ended",
            ConsultationStatus::Cancelled => "cancelled",
            ConsultationStatus::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConsultationStatus::AwaitingPayment => "Menunggu pembayaran",
            ConsultationStatus::AwaitingConfirmation => "Menunggu konfirmasi",
            ConsultationStatus::Scheduled => "Dijadwalkan",
            ConsultationStatus::InProgress => "Berlangsung",
            ConsultationStatus::Ended | ConsultationStatus::Unknown => "Berakhir",
            ConsultationStatus::Cancelled => "Dibatalkan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationSession {
    pub id: String,
    #[serde(rename = "type")]
    pub mode: ConsultationMode,
    pub status: ConsultationStatus,
    #[serde(rename = "userName")]
    pub counterpart_name: String,
    #[serde(rename = "userCity", default)]
    pub counterpart_city: Option<String>,
    #[serde(rename = "startDate")]
    pub start: String,
    #[serde(rename = "endDate")]
    pub end: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "locationDescription", default)]
    pub location_note: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ConsultationSession {
    pub fn start_instant(&self) -> LocalInstant {
        parse_local(&self.start)
    }

    pub fn end_instant(&self) -> LocalInstant {
        parse_local(&self.end)
    }

    /// Both ends parse and `start <= end`.
    pub fn has_valid_window(&self) -> bool {
        match (self.start_instant().value(), self.end_instant().value()) {
            (Some(start), Some(end)) => start <= end,
            _ => false,
        }
    }

    /// Only sessions with a room can chat.
    pub fn supports_chat(&self) -> bool {
        self.room_id.as_deref().is_some_and(|room| !room.is_empty())
    }

    pub fn is_in_person(&self) -> bool {
        self.mode == ConsultationMode::InPerson
    }
}

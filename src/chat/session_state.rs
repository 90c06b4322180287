// ABOUTME: Derives the chat session lifecycle (waiting / active / ended) from consultation status and window

use crate::chat::timestamp::LocalInstant;
use crate::models::{ConsultationSession, ConsultationStatus};
use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Waiting,
    Active,
    Ended,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Waiting => "waiting",
            SessionState::Active => "active",
            SessionState::Ended => "ended",
        })
    }
}

/// First matching rule wins:
/// 1. ended / cancelled -> `Ended`
/// 2. in-progress -> `Active`
/// 3. scheduled: inside `[start, end)` -> `Active`, at or past `end` -> `Ended`, else `Waiting`
/// 4. anything else -> `Waiting`
///
/// An unparseable window never makes a session active or ended; it stays `Waiting`.
pub fn resolve_session_state(
    status: ConsultationStatus,
    start: LocalInstant,
    end: LocalInstant,
    now: NaiveDateTime,
) -> SessionState {
    match status {
        ConsultationStatus::Ended | ConsultationStatus::Cancelled => SessionState::Ended,
        ConsultationStatus::InProgress => SessionState::Active,
        ConsultationStatus::Scheduled => {
            let (Some(start), Some(end)) = (start.value(), end.value()) else {
                return SessionState::Waiting;
            };
            if now >= start && now < end {
                SessionState::Active
            } else if now >= end {
                SessionState::Ended
            } else {
                SessionState::Waiting
            }
        }
        ConsultationStatus::AwaitingPayment
        | ConsultationStatus::AwaitingConfirmation
        | ConsultationStatus::Unknown => SessionState::Waiting,
    }
}

pub fn resolve_for(consultation: &ConsultationSession, now: NaiveDateTime) -> SessionState {
    resolve_session_state(
        consultation.status,
        consultation.start_instant(),
        consultation.end_instant(),
        now,
    )
}

/// State to adopt after the server refused the transport handshake. The refusal
/// is authoritative, so an `Active` resolution is not believed.
pub fn resolve_after_rejection(consultation: &ConsultationSession, now: NaiveDateTime) -> SessionState {
    match resolve_for(consultation, now) {
        SessionState::Active => SessionState::Waiting,
        other => other,
    }
}

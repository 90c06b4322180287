// ABOUTME: Core data models for consultations, chat messages and the signed-in architect

pub mod consultation;
pub mod message;
pub mod user;

pub use consultation::{ConsultationMode, ConsultationSession, ConsultationStatus};
pub use message::{ChatMessage, MessageId, MessageKind, PendingId};
pub use user::{ArchitectProfile, LoginData, UserIdentity};

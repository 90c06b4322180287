// ABOUTME: Real-time chat core for a consultation room
// Timestamps, session state, message store, grouping, connection and the session that ties them together

pub mod connection;
pub mod grouping;
pub mod outbound;
pub mod protocol;
pub mod session;
pub mod session_state;
pub mod store;
pub mod timestamp;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{ConnectionEvent, ConnectionManager, ConnectionSettings, ConnectionState};
pub use grouping::{group_messages, DateLabels, DisplayItem, Locale};
pub use outbound::SendReport;
pub use session::{ChatSession, SessionDeps, SessionParams};
pub use session_state::{resolve_session_state, SessionState};
pub use store::{MessageStore, RemoteOutcome, StoreError};
pub use timestamp::{Clock, FixedClock, SystemClock};

// ABOUTME: Presentation-side helpers around the chat core: notices, list filters and chat input

pub mod filters;
pub mod input;
pub mod notification;

pub use filters::{HistoryFilter, InPersonFilter};
pub use input::ChatInput;
pub use notification::{Notification, NotificationType};

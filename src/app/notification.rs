// ABOUTME: Transient, non-blocking notices raised by a chat session
// Each carries a title and message and expires on its own after a few seconds

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub created_at: Instant,
    pub duration: Duration,
}

impl Notification {
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);

    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type,
            created_at: Instant::now(),
            duration: Self::DEFAULT_DURATION,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationType::Error)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, NotificationType::Info)
    }

    pub fn is_error(&self) -> bool {
        self.notification_type == NotificationType::Error
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.duration
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_notification_is_live() {
        let notice = Notification::error("Upload Failed", "Failed to upload image.");
        assert!(notice.is_error());
        assert!(!notice.is_expired());
        assert_eq!(notice.to_string(), "Upload Failed: Failed to upload image.");
    }

    #[test]
    fn test_notification_expires() {
        let mut notice = Notification::info("Connection", "Reconnecting");
        notice.duration = Duration::ZERO;
        std::thread::sleep(Duration::from_millis(2));
        assert!(notice.is_expired());
    }
}

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn upload_succeeded() -> Self {
        Self {
            title: "Success".to_string(),
            description: "Profile photo updated successfully".to_string(),
            severity: Severity::Success,
        }
    }

    pub fn upload_failed() -> Self {
        Self {
            title: "Error".to_string(),
            description: "Error in updating profile image".to_string(),
            severity: Severity::Error,
        }
    }
}

/// Receives terminal outcomes. Fire-and-forget: a sink must not block and
/// cannot fail the attempt.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success => log::info!(
                "{}: {}",
                notification.title,
                notification.description
            ),
            Severity::Error => log::error!(
                "{}: {}",
                notification.title,
                notification.description
            ),
        }
    }
}

/// Forwards notifications to whoever renders them.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotificationSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.sender.send(notification) {
            log::warn!("Failed to deliver notification (non-critical): {}", e.0.title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelNotificationSink::new();
        sink.notify(Notification::upload_failed());
        sink.notify(Notification::upload_succeeded());

        assert_eq!(rx.try_recv().unwrap().severity, Severity::Error);
        assert_eq!(rx.try_recv().unwrap().severity, Severity::Success);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelNotificationSink::new();
        drop(rx);
        sink.notify(Notification::upload_succeeded());
    }
}

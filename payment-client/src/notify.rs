//! User-facing notifications.
//!
//! Operations report their outcome to a [`Notifier`]. The library ships a
//! tracing-backed sink and a recording sink; front ends plug in their own.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

/// Tone of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    /// The operation went through.
    Success,
    /// The operation failed, was declined, or is being retried.
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Short message shown to the person using the client.
///
/// # Examples
///
/// ```
/// use payment_client::notify::{Notification, NotificationLevel};
///
/// let notification = Notification::success("Payment processed successfully!");
/// assert_eq!(notification.level, NotificationLevel::Success);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Tone.
    pub level: NotificationLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Notification {
    /// Creates a success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Success, message: message.into() }
    }

    /// Creates an error notification.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Error, message: message.into() }
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Delivers one notification. Must not block.
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification);
    }
}

/// Logs notifications with target `notification`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => {
                tracing::info!(target: "notification", level = %notification.level, "{}", notification.message);
            }
            NotificationLevel::Error => {
                tracing::warn!(target: "notification", level = %notification.level, "{}", notification.message);
            }
        }
    }
}

/// Keeps every notification in memory, in delivery order.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the recorded messages only.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|n| n.message).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap_or_else(PoisonError::into_inner).push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_keeps_order() {
        let recorder = RecordingNotifier::new();
        recorder.notify(Notification::error("Connection failed. Retrying... (1/2)"));
        recorder.notify(Notification::success("Payment processed successfully!"));

        assert_eq!(
            recorder.notifications(),
            vec![
                Notification::error("Connection failed. Retrying... (1/2)"),
                Notification::success("Payment processed successfully!"),
            ]
        );
    }

    #[test]
    fn test_clones_share_buffer() {
        let recorder = RecordingNotifier::new();
        let shared: Arc<dyn Notifier> = Arc::new(recorder.clone());
        shared.notify(Notification::success("Created successfully!"));

        assert_eq!(recorder.messages(), vec!["Created successfully!".to_owned()]);
    }

    #[test]
    fn test_take_drains() {
        let recorder = RecordingNotifier::new();
        recorder.notify(Notification::error("Failed to fetch"));

        assert_eq!(recorder.take().len(), 1);
        assert!(recorder.notifications().is_empty());
    }

    #[test]
    fn test_level_serialization() {
        let json = serde_json::to_value(Notification::error("Transaction not found")).unwrap();
        assert_eq!(json, serde_json::json!({ "level": "error", "message": "Transaction not found" }));
    }

    #[derive(Clone, Default)]
    struct FieldCapture(Arc<Mutex<Vec<(String, String)>>>);

    impl tracing::field::Visit for FieldCapture {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
            self.0
                .lock()
                .unwrap()
                .push((field.name().to_owned(), format!("{value:?}")));
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FieldCapture {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            event.record(&mut self.clone());
        }
    }

    #[test]
    fn test_tracing_notifier_records_text_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let capture = FieldCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        tracing::subscriber::with_default(subscriber, || {
            TracingNotifier.notify(Notification::error("Failed to delete"));
        });

        let fields = capture.0.lock().unwrap().clone();
        let messages: Vec<_> = fields.iter().filter(|(name, _)| name == "message").collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, "Failed to delete");
        assert!(fields.iter().any(|(name, value)| name == "level" && value == "error"));
    }
}

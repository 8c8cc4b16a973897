// Outbound notification channel.
// Every store mutation except update_session emits one of these. Delivery is
// fire-and-forget: the store never waits on the receiver.

use log::{debug, warn};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};

pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            description: description.into(),
            variant: Variant::Default,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }
}

/// Sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
}

impl Notifier {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Notifier { tx }, rx)
    }

    /// Queue a notification without waiting. A full or closed channel drops it.
    pub fn notify(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                warn!("Notification channel full, dropping '{}'", n.title);
            }
            Err(TrySendError::Closed(n)) => {
                debug!("Notification receiver gone, dropping '{}'", n.title);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_is_fire_and_forget() {
        let (notifier, mut rx) = Notifier::channel(1);

        notifier.notify(Notification::new("first", "kept"));
        // Channel is full now; this one is dropped instead of blocking
        notifier.notify(Notification::new("second", "dropped"));

        let first = rx.try_recv().expect("first notification should be queued");
        assert_eq!(first.title, "first");
        assert_eq!(first.variant, Variant::Default);
        assert!(rx.try_recv().is_err());

        // Closed receiver must not panic
        drop(rx);
        notifier.notify(Notification::destructive("third", "nobody listening"));
    }
}

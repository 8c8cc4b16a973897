// Outgoing messages. Append-only; the only status change is sent -> delivered.

use chrono::Local;
use log::{debug, info};

use super::Store;
use crate::models::{DeliveryStatus, LogLevel, LogSource, Message};
use crate::notifications::Notification;

impl Store {
    /// Record an outgoing message and schedule its delivery.
    ///
    /// The message is in the collection when this returns; delivery happens later.
    /// `session_id` is not checked against the known sessions.
    pub async fn send_message(&self, session_id: &str, to: &str, content: &str) -> Message {
        let message = self.append_message(session_id, to, content).await;
        self.notify(Notification::new(
            "Mensagem enviada",
            format!("Mensagem enviada para {}", to),
        ));
        message
    }

    // Shared by send_message and bulk sends. No notification here.
    pub(crate) async fn append_message(&self, session_id: &str, to: &str, content: &str) -> Message {
        let message = {
            let mut state = self.inner.state.lock().await;
            let message = Message {
                id: state.ids.next("msg"),
                session_id: session_id.to_string(),
                to: to.to_string(),
                content: content.to_string(),
                timestamp: Local::now(),
                status: DeliveryStatus::Sent,
            };
            state.messages.push(message.clone());
            state.record(
                LogLevel::Info,
                LogSource::Message,
                format!("Mensagem enviada para {}", to),
                Some(serde_json::json!({ "to": to, "content": content })),
            );
            message
        };
        info!("Message {} queued for {} via session {}", message.id, to, session_id);

        let store = self.clone();
        let id = message.id.clone();
        let delay = self.inner.timing.delivery_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.mark_delivered(&id).await;
        });

        message
    }

    async fn mark_delivered(&self, id: &str) {
        let mut state = self.inner.state.lock().await;
        match state.message_mut(id) {
            Some(message) => {
                message.status = DeliveryStatus::Delivered;
                debug!("Message {} delivered", id);
            }
            None => debug!("Message {} vanished before delivery", id),
        }
    }

    /// Count per delivery status, in `DeliveryStatus::ALL` order.
    pub async fn message_status_counts(&self) -> Vec<(DeliveryStatus, usize)> {
        let state = self.inner.state.lock().await;
        DeliveryStatus::ALL
            .iter()
            .map(|&status| (status, state.messages.iter().filter(|m| m.status == status).count()))
            .collect()
    }
}

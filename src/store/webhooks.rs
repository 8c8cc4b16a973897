// Webhook registrations. Tests are simulated; no HTTP request is made.

use chrono::Local;
use log::{debug, info, warn};

use super::Store;
use crate::error::{Result, ZapError};
use crate::models::{LogLevel, LogSource, Webhook, WebhookEvent, WebhookStatus};
use crate::notifications::Notification;

impl Store {
    pub async fn webhooks(&self) -> Vec<Webhook> {
        self.inner.state.lock().await.webhooks.clone()
    }

    /// Recent webhook events, optionally restricted to one webhook.
    pub async fn webhook_events(&self, webhook_id: Option<&str>) -> Vec<WebhookEvent> {
        let state = self.inner.state.lock().await;
        state
            .webhook_events
            .iter()
            .filter(|e| webhook_id.map_or(true, |id| e.webhook_id == id))
            .cloned()
            .collect()
    }

    pub async fn add_webhook(&self, url: &str) -> Webhook {
        let webhook = {
            let mut state = self.inner.state.lock().await;
            let webhook = Webhook {
                id: state.ids.next("webhook"),
                url: url.to_string(),
                status: WebhookStatus::Inactive,
                last_test: None,
                created_at: Local::now(),
            };
            state.webhooks.push(webhook.clone());
            state.record(LogLevel::Info, LogSource::Webhook, format!("Webhook {} adicionado", url), None);
            webhook
        };

        info!("Registered webhook {} -> {}", webhook.id, url);
        self.notify(Notification::new("Webhook adicionado", "Novo webhook configurado com sucesso"));
        webhook
    }

    pub async fn remove_webhook(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.lock().await;
            let before = state.webhooks.len();
            state.webhooks.retain(|w| w.id != id);
            let removed = state.webhooks.len() != before;
            if removed {
                state.record(LogLevel::Warning, LogSource::Webhook, format!("Webhook {} removido", id), None);
            }
            removed
        };

        debug!("remove_webhook {}: removed={}", id, removed);
        self.notify(Notification::new("Webhook removido", "Webhook foi removido com sucesso"));
        removed
    }

    /// Simulate a test delivery, then mark the webhook active.
    ///
    /// Fails with `WebhookNotFound` if the id is unknown, or if the webhook is
    /// removed while the test is running.
    pub async fn test_webhook(&self, id: &str) -> Result<Webhook> {
        let url = {
            let state = self.inner.state.lock().await;
            match state.webhooks.iter().find(|w| w.id == id) {
                Some(webhook) => webhook.url.clone(),
                None => return Err(ZapError::WebhookNotFound(id.to_string())),
            }
        };

        debug!("Testing webhook {} at {}", id, url);
        tokio::time::sleep(self.inner.timing.webhook_test_delay()).await;

        let tested = {
            let mut state = self.inner.state.lock().await;
            let tested = match state.webhook_mut(id) {
                Some(webhook) => {
                    webhook.status = WebhookStatus::Active;
                    webhook.last_test = Some(Local::now());
                    webhook.clone()
                }
                None => {
                    warn!("Webhook {} removed during test", id);
                    return Err(ZapError::WebhookNotFound(id.to_string()));
                }
            };
            state.record(LogLevel::Success, LogSource::Webhook, format!("Webhook {} respondeu ao teste", url), None);
            tested
        };

        self.notify(Notification::new("Teste concluído", "Webhook está respondendo corretamente"));
        Ok(tested)
    }
}

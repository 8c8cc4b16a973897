// Bulk sends: one personalized message per recipient, paced by a delay.
//
// Each message goes through the same append path as send_message, so it shows up
// in the message list and gets the usual delivery transition.

use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::Store;
use crate::error::{Result, ZapError};
use crate::models::{LogLevel, LogSource};
use crate::notifications::Notification;

pub const NAME_PLACEHOLDER: &str = "{nome}";
pub const DEFAULT_PREVIEW_LIMIT: usize = 5;
pub const DEFAULT_DELAY_BETWEEN: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRecipient {
    pub name: String,
    pub phone: String,
}

impl BulkRecipient {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        BulkRecipient { name: name.into(), phone: phone.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPreview {
    pub name: String,
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct BulkCampaign {
    pub session_id: String,
    pub recipients: Vec<BulkRecipient>,
    pub template: String,
    pub delay_between: Duration,
    /// Scale each delay by a random factor in [0.7, 1.3).
    pub randomize_delay: bool,
}

impl BulkCampaign {
    pub fn new(session_id: impl Into<String>, template: impl Into<String>, recipients: Vec<BulkRecipient>) -> Self {
        BulkCampaign {
            session_id: session_id.into(),
            recipients,
            template: template.into(),
            delay_between: DEFAULT_DELAY_BETWEEN,
            randomize_delay: true,
        }
    }

    /// Replaces the first `{nome}` with the recipient's name.
    pub fn render(&self, recipient: &BulkRecipient) -> String {
        self.template.replacen(NAME_PLACEHOLDER, &recipient.name, 1)
    }

    pub fn preview(&self, limit: usize) -> Vec<BulkPreview> {
        self.recipients
            .iter()
            .take(limit)
            .map(|r| BulkPreview {
                name: r.name.clone(),
                phone: r.phone.clone(),
                message: self.render(r),
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(ZapError::InvalidCampaign("no session selected".to_string()));
        }
        if self.template.trim().is_empty() {
            return Err(ZapError::InvalidCampaign("empty message template".to_string()));
        }
        if self.recipients.is_empty() {
            return Err(ZapError::InvalidCampaign("no recipients".to_string()));
        }
        Ok(())
    }

    fn next_delay(&self) -> Duration {
        if self.randomize_delay {
            let factor: f64 = rand::thread_rng().gen_range(0.7..1.3);
            self.delay_between.mul_f64(factor)
        } else {
            self.delay_between
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkProgress {
    pub sent: usize,
    pub total: usize,
}

impl BulkProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.sent as f64 * 100.0 / self.total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub campaign_id: Uuid,
    pub sent: usize,
    pub total: usize,
    pub stopped: bool,
    pub message_ids: Vec<String>,
}

/// A running bulk send.
pub struct BulkHandle {
    pub campaign_id: Uuid,
    progress: watch::Receiver<BulkProgress>,
    stop: Arc<Notify>,
    task: JoinHandle<BulkReport>,
}

impl BulkHandle {
    pub fn progress(&self) -> watch::Receiver<BulkProgress> {
        self.progress.clone()
    }

    /// Ask the campaign to stop before its next message.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    pub async fn wait(self) -> Result<BulkReport> {
        Ok(self.task.await?)
    }
}

impl Store {
    /// Validate and start a campaign in the background.
    pub fn start_bulk(&self, campaign: BulkCampaign) -> Result<BulkHandle> {
        campaign.validate()?;

        let campaign_id = Uuid::new_v4();
        let total = campaign.recipients.len();
        let (progress_tx, progress_rx) = watch::channel(BulkProgress { sent: 0, total });
        let stop = Arc::new(Notify::new());

        info!("Starting bulk campaign {} ({} recipients, session {})", campaign_id, total, campaign.session_id);

        let store = self.clone();
        let stop_signal = stop.clone();
        let task = tokio::spawn(async move {
            store.run_campaign(campaign_id, campaign, progress_tx, stop_signal).await
        });

        Ok(BulkHandle { campaign_id, progress: progress_rx, stop, task })
    }

    /// Run a campaign to completion.
    pub async fn run_bulk(&self, campaign: BulkCampaign) -> Result<BulkReport> {
        self.start_bulk(campaign)?.wait().await
    }

    async fn run_campaign(
        &self,
        campaign_id: Uuid,
        campaign: BulkCampaign,
        progress: watch::Sender<BulkProgress>,
        stop: Arc<Notify>,
    ) -> BulkReport {
        let total = campaign.recipients.len();
        let mut message_ids = Vec::with_capacity(total);
        let mut stopped = false;

        for (index, recipient) in campaign.recipients.iter().enumerate() {
            let delay = campaign.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.notified() => {
                    stopped = true;
                    break;
                }
            }

            let content = campaign.render(recipient);
            let message = self.append_message(&campaign.session_id, &recipient.phone, &content).await;
            message_ids.push(message.id);

            let sent = index + 1;
            let _ = progress.send(BulkProgress { sent, total });
            self.notify(Notification::new(
                format!("Mensagem enviada ({}/{})", sent, total),
                format!("Para: {} - {}", recipient.name, recipient.phone),
            ));
        }

        let sent = message_ids.len();
        {
            let mut state = self.inner.state.lock().await;
            let level = if stopped { LogLevel::Warning } else { LogLevel::Success };
            state.record(
                level,
                LogSource::Bulk,
                format!("Envio em massa: {} de {} mensagens enviadas", sent, total),
                Some(serde_json::json!({ "campaign": campaign_id.to_string(), "session": campaign.session_id })),
            );
        }

        if stopped {
            warn!("Bulk campaign {} stopped after {}/{}", campaign_id, sent, total);
            self.notify(Notification::destructive(
                "Envio interrompido",
                format!("{} de {} mensagens enviadas", sent, total),
            ));
        } else {
            info!("Bulk campaign {} finished ({} messages)", campaign_id, sent);
            self.notify(Notification::new(
                "Envio concluído!",
                format!("{} mensagens foram enviadas com sucesso", sent),
            ));
        }

        BulkReport { campaign_id, sent, total, stopped, message_ids }
    }
}

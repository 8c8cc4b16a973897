// Application state store for zapboard
// Owns every collection the dashboard shows. Mutations are split across
// submodules by entity, each adding methods to Store.

use chrono::{Duration as ChronoDuration, Local};
use log::{debug, info};
use serde_json::json;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, watch, Mutex as TokioMutex};
use tokio::task::JoinHandle;

pub mod activity;
pub mod bulk;
pub mod contacts;
pub mod groups;
pub mod messages;
pub mod sessions;
pub mod settings;
pub mod webhooks;

pub use activity::LogFilter;
pub use bulk::{BulkCampaign, BulkHandle, BulkPreview, BulkProgress, BulkRecipient, BulkReport};
pub use contacts::ContactFilter;
pub use groups::mock_groups;

use crate::config::{AppConfig, Timing};
use crate::models::{
    ApiSettings, Contact, ContactCategory, Group, LogEntry, LogLevel, LogSource, Message, Session,
    SessionStatus, Stats, Webhook, WebhookEvent, WebhookEventKind, WebhookStatus,
};
use crate::notifications::{Notification, Notifier, NOTIFICATION_CHANNEL_CAPACITY};

/// Monotonic id source shared by all collections of one store.
#[derive(Debug)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator { next: 1 }
    }

    pub fn next(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next);
        self.next += 1;
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything guarded by the store lock.
#[derive(Debug, Default)]
pub struct StoreState {
    pub sessions: Vec<Session>,
    pub contacts: Vec<Contact>,
    pub messages: Vec<Message>,
    pub groups: Vec<Group>,
    pub api_settings: ApiSettings,
    pub webhooks: Vec<Webhook>,
    pub webhook_events: Vec<WebhookEvent>,
    pub logs: Vec<LogEntry>,
    pub ids: IdGenerator,
}

impl StoreState {
    fn new(api_settings: ApiSettings) -> Self {
        StoreState { api_settings, ..Default::default() }
    }

    pub fn session_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn webhook_mut(&mut self, id: &str) -> Option<&mut Webhook> {
        self.webhooks.iter_mut().find(|w| w.id == id)
    }

    pub fn stats(&self) -> Stats {
        let today = Local::now().date_naive();
        Stats {
            active_sessions: self
                .sessions
                .iter()
                .filter(|s| s.status == SessionStatus::Connected)
                .count(),
            messages_today: self
                .messages
                .iter()
                .filter(|m| m.timestamp.date_naive() == today)
                .count(),
            total_contacts: self.contacts.len(),
            total_groups: self.groups.len(),
        }
    }

    // Mock state the dashboard starts with
    fn seed(&mut self) {
        let now = Local::now();

        self.sessions = vec![
            Session {
                id: "1".to_string(),
                client_name: "Empresa XYZ".to_string(),
                webhook_url: "https://webhook.site/xyz".to_string(),
                status: SessionStatus::Connected,
                created_at: now,
                qr_code: None,
            },
            Session {
                id: "2".to_string(),
                client_name: "Loja ABC".to_string(),
                webhook_url: "https://webhook.site/abc".to_string(),
                status: SessionStatus::WaitingQr,
                created_at: now,
                qr_code: None,
            },
        ];

        self.contacts = vec![
            Contact {
                id: "1".to_string(),
                name: "João Silva".to_string(),
                phone: "5511999999999".to_string(),
                category: ContactCategory::Cliente,
                created_at: now,
            },
            Contact {
                id: "2".to_string(),
                name: "Maria Santos".to_string(),
                phone: "5511888888888".to_string(),
                category: ContactCategory::Lead,
                created_at: now,
            },
        ];

        self.webhooks = vec![
            Webhook {
                id: "1".to_string(),
                url: "https://webhook.site/abc123".to_string(),
                status: WebhookStatus::Active,
                last_test: Some(now),
                created_at: now,
            },
            Webhook {
                id: "2".to_string(),
                url: "https://myapp.com/webhook/whatsapp".to_string(),
                status: WebhookStatus::Error,
                last_test: Some(now - ChronoDuration::days(1)),
                created_at: now - ChronoDuration::days(3),
            },
        ];

        self.webhook_events = vec![
            WebhookEvent {
                id: "1".to_string(),
                kind: WebhookEventKind::Message,
                data: json!({ "from": "5511999999999", "message": "Olá!" }),
                timestamp: now,
                webhook_id: "1".to_string(),
            },
            WebhookEvent {
                id: "2".to_string(),
                kind: WebhookEventKind::Status,
                data: json!({ "session": "session1", "status": "connected" }),
                timestamp: now - ChronoDuration::minutes(5),
                webhook_id: "1".to_string(),
            },
        ];

        // Oldest first; reads reverse the order
        self.logs = vec![
            LogEntry {
                id: "4".to_string(),
                timestamp: now - ChronoDuration::seconds(90),
                level: LogLevel::Error,
                source: LogSource::Api,
                message: "Falha na autenticação da API".to_string(),
                details: Some(json!({ "error": "Invalid API key", "code": 401 })),
            },
            LogEntry {
                id: "3".to_string(),
                timestamp: now - ChronoDuration::seconds(60),
                level: LogLevel::Warning,
                source: LogSource::Webhook,
                message: "Webhook timeout - tentativa 2/3".to_string(),
                details: Some(json!({ "url": "https://webhook.site/abc123", "timeout": 5000 })),
            },
            LogEntry {
                id: "2".to_string(),
                timestamp: now - ChronoDuration::seconds(30),
                level: LogLevel::Info,
                source: LogSource::Message,
                message: "Mensagem enviada para +5511999999999".to_string(),
                details: Some(json!({ "to": "+5511999999999", "content": "Olá! Como posso ajudar?" })),
            },
            LogEntry {
                id: "1".to_string(),
                timestamp: now,
                level: LogLevel::Success,
                source: LogSource::Session,
                message: "Sessão \"Empresa XYZ\" conectada com sucesso".to_string(),
                details: None,
            },
        ];
    }
}

pub(crate) struct StoreInner {
    pub(crate) state: TokioMutex<StoreState>,
    pub(crate) notifier: Notifier,
    pub(crate) timing: Timing,
    pub(crate) ticker: StdMutex<Option<JoinHandle<()>>>,
    // Set by start_auto_refresh, cleared by stop_auto_refresh; survives a 0 interval
    pub(crate) auto_refresh_enabled: AtomicBool,
    pub(crate) refresh_ticks: Arc<watch::Sender<u64>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(handle) = ticker.take() {
                handle.abort();
            }
        }
    }
}

/// Handle to the application state. Cloning is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Store {
    /// Store preloaded with the dashboard's mock data.
    pub fn new(config: &AppConfig) -> (Self, mpsc::Receiver<Notification>) {
        Self::build(config, true)
    }

    /// Store with no entities, only the configured settings.
    pub fn empty(config: &AppConfig) -> (Self, mpsc::Receiver<Notification>) {
        Self::build(config, false)
    }

    fn build(config: &AppConfig, seeded: bool) -> (Self, mpsc::Receiver<Notification>) {
        let mut state = StoreState::new(config.api.clone());
        if seeded {
            state.seed();
            info!("Store seeded with mock data");
        }

        let (notifier, rx) = Notifier::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let inner = StoreInner {
            state: TokioMutex::new(state),
            notifier,
            timing: config.timing.clone(),
            ticker: StdMutex::new(None),
            auto_refresh_enabled: AtomicBool::new(false),
            refresh_ticks: Arc::new(watch::channel(0).0),
        };
        (Store { inner: Arc::new(inner) }, rx)
    }

    pub(crate) fn notify(&self, notification: Notification) {
        debug!("Notify: {} - {}", notification.title, notification.description);
        self.inner.notifier.notify(notification);
    }

    pub fn timing(&self) -> &Timing {
        &self.inner.timing
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.inner.state.lock().await.sessions.clone()
    }

    pub async fn active_sessions(&self) -> Vec<Session> {
        self.inner
            .state
            .lock()
            .await
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Connected)
            .cloned()
            .collect()
    }

    pub async fn contacts(&self) -> Vec<Contact> {
        self.inner.state.lock().await.contacts.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.state.lock().await.messages.clone()
    }

    pub async fn groups(&self) -> Vec<Group> {
        self.inner.state.lock().await.groups.clone()
    }

    pub async fn api_settings(&self) -> ApiSettings {
        self.inner.state.lock().await.api_settings.clone()
    }

    pub async fn stats(&self) -> Stats {
        self.inner.state.lock().await.stats()
    }

    /// There is no gateway to probe; the dashboard always reports online.
    pub fn is_api_online(&self) -> bool {
        true
    }
}

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ZapError;

/// Connection lifecycle of a session.
///
/// Only `Initializing -> WaitingQr` happens on its own. Nothing in the store moves a
/// session to `Connected`; that is left to `update_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Connected,
    WaitingQr,
    Disconnected,
    Initializing,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        SessionStatus::Connected,
        SessionStatus::WaitingQr,
        SessionStatus::Disconnected,
        SessionStatus::Initializing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Connected => "connected",
            SessionStatus::WaitingQr => "waiting-qr",
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Initializing => "initializing",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ZapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "connected" => Ok(SessionStatus::Connected),
            "waiting-qr" | "waiting_qr" => Ok(SessionStatus::WaitingQr),
            "disconnected" => Ok(SessionStatus::Disconnected),
            "initializing" => Ok(SessionStatus::Initializing),
            _ => Err(ZapError::UnknownVariant { kind: "session status", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub client_name: String,
    pub webhook_url: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
}

/// Partial update for a session. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionUpdate {
    pub client_name: Option<String>,
    pub webhook_url: Option<String>,
    pub status: Option<SessionStatus>,
    pub qr_code: Option<String>,
}

impl SessionUpdate {
    pub fn status(status: SessionStatus) -> Self {
        SessionUpdate { status: Some(status), ..Default::default() }
    }

    pub fn apply(&self, session: &mut Session) {
        if let Some(name) = &self.client_name {
            session.client_name = name.clone();
        }
        if let Some(url) = &self.webhook_url {
            session.webhook_url = url.clone();
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(qr) = &self.qr_code {
            session.qr_code = Some(qr.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContactCategory {
    #[default]
    Cliente,
    Lead,
    Fornecedor,
    Outro,
}

impl ContactCategory {
    pub const ALL: [ContactCategory; 4] =
        [ContactCategory::Cliente, ContactCategory::Lead, ContactCategory::Fornecedor, ContactCategory::Outro];
}

impl fmt::Display for ContactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContactCategory::Cliente => "Cliente",
            ContactCategory::Lead => "Lead",
            ContactCategory::Fornecedor => "Fornecedor",
            ContactCategory::Outro => "Outro",
        };
        f.write_str(name)
    }
}

impl FromStr for ContactCategory {
    type Err = ZapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cliente" => Ok(ContactCategory::Cliente),
            "lead" => Ok(ContactCategory::Lead),
            "fornecedor" => Ok(ContactCategory::Fornecedor),
            "outro" => Ok(ContactCategory::Outro),
            _ => Err(ZapError::UnknownVariant { kind: "contact category", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub category: ContactCategory,
    pub created_at: DateTime<Local>,
}

/// Contact fields supplied by the caller; id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub category: ContactCategory,
}

impl NewContact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        NewContact {
            name: name.into(),
            phone: phone.into(),
            category: ContactCategory::default(),
        }
    }

    pub fn with_category(mut self, category: ContactCategory) -> Self {
        self.category = category;
        self
    }
}

/// Delivery state of an outgoing message.
///
/// The store only ever moves `Sent -> Delivered`. `Read` and `Failed` exist for
/// callers that set them through other means.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 4] =
        [DeliveryStatus::Sent, DeliveryStatus::Delivered, DeliveryStatus::Read, DeliveryStatus::Failed];
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
            DeliveryStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub to: String,
    pub content: String,
    pub timestamp: DateTime<Local>,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub participants_count: u32,
    pub unread_count: u32,
}

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_AUTO_REFRESH_MS: u64 = 10000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub api_url: String,
    /// Milliseconds.
    pub timeout: u64,
    /// Milliseconds between auto-refresh ticks.
    pub auto_refresh_interval: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT_MS,
            auto_refresh_interval: DEFAULT_AUTO_REFRESH_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettingsUpdate {
    pub api_url: Option<String>,
    pub timeout: Option<u64>,
    pub auto_refresh_interval: Option<u64>,
}

impl ApiSettingsUpdate {
    pub fn apply(&self, settings: &mut ApiSettings) {
        if let Some(url) = &self.api_url {
            settings.api_url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.timeout = timeout;
        }
        if let Some(interval) = self.auto_refresh_interval {
            settings.auto_refresh_interval = interval;
        }
    }
}

/// Aggregate counts, recomputed on every read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub active_sessions: usize,
    pub messages_today: usize,
    pub total_contacts: usize,
    pub total_groups: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Active,
    Inactive,
    Error,
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WebhookStatus::Active => "active",
            WebhookStatus::Inactive => "inactive",
            WebhookStatus::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub url: String,
    pub status: WebhookStatus,
    pub last_test: Option<DateTime<Local>>,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEventKind {
    Message,
    Status,
    Qr,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: WebhookEventKind,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Local>,
    pub webhook_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ZapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "success" => Ok(LogLevel::Success),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(ZapError::UnknownVariant { kind: "log level", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSource {
    Session,
    Message,
    Webhook,
    Api,
    Bulk,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Session => "SESSION",
            LogSource::Message => "MESSAGE",
            LogSource::Webhook => "WEBHOOK",
            LogSource::Api => "API",
            LogSource::Bulk => "BULK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub source: LogSource,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

// Export line format: [timestamp] [LEVEL] [SOURCE] message
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            self.level.as_str().to_uppercase(),
            self.source.as_str(),
            self.message
        )
    }
}

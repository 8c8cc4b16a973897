// Activity log kept alongside the store collections

use chrono::Local;
use log::info;

use super::{Store, StoreState};
use crate::models::{LogEntry, LogLevel, LogSource};
use crate::notifications::Notification;

/// Filter for reading or exporting the activity log. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub level: Option<LogLevel>,
    pub search: Option<String>,
}

impl LogFilter {
    pub fn level(level: LogLevel) -> Self {
        LogFilter { level: Some(level), search: None }
    }

    pub fn search(term: impl Into<String>) -> Self {
        LogFilter { level: None, search: Some(term.into()) }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }
        match &self.search {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                entry.message.to_lowercase().contains(&term)
                    || entry.source.as_str().to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

impl StoreState {
    pub(crate) fn record(
        &mut self,
        level: LogLevel,
        source: LogSource,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let entry = LogEntry {
            id: self.ids.next("log"),
            timestamp: Local::now(),
            level,
            source,
            message: message.into(),
            details,
        };
        self.logs.push(entry);
    }
}

impl Store {
    /// Matching entries, newest first.
    pub async fn logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        let state = self.inner.state.lock().await;
        state.logs.iter().rev().filter(|e| filter.matches(e)).cloned().collect()
    }

    pub async fn clear_logs(&self) {
        let cleared = {
            let mut state = self.inner.state.lock().await;
            let count = state.logs.len();
            state.logs.clear();
            count
        };
        info!("Cleared {} activity log entries", cleared);
        self.notify(Notification::new("Logs limpos", "Todos os logs foram removidos"));
    }

    /// Render matching entries one per line, newest first.
    ///
    /// Nothing is written to disk; the caller saves or prints the text. The
    /// "Logs exportados" notification still goes out on every call.
    pub async fn export_logs(&self, filter: &LogFilter) -> String {
        let text = self
            .logs(filter)
            .await
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.notify(Notification::new("Logs exportados", "Arquivo de logs baixado com sucesso"));
        text
    }
}

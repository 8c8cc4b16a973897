// Session lifecycle: create, partial update, delete.
//
// initializing --(qr delay)--> waiting-qr is the only automatic transition.
// Moving to connected is never modeled here; update_session can set any status.

use chrono::Local;
use log::{debug, info};
use serde_json::json;

use super::Store;
use crate::models::{LogLevel, LogSource, Session, SessionStatus, SessionUpdate};
use crate::notifications::Notification;

impl Store {
    /// Create a session in `Initializing` and schedule its move to `WaitingQr`.
    pub async fn create_session(&self, client_name: &str, webhook_url: &str) -> Session {
        let session = {
            let mut state = self.inner.state.lock().await;
            let session = Session {
                id: state.ids.next("session"),
                client_name: client_name.to_string(),
                webhook_url: webhook_url.to_string(),
                status: SessionStatus::Initializing,
                created_at: Local::now(),
                qr_code: None,
            };
            state.sessions.push(session.clone());
            state.record(
                LogLevel::Info,
                LogSource::Session,
                format!("Sessão \"{}\" criada", client_name),
                Some(json!({ "id": session.id, "webhookUrl": webhook_url })),
            );
            session
        };

        info!("Created session {} for {}", session.id, client_name);
        self.notify(Notification::new(
            "Sessão criada",
            format!("Nova sessão criada para {}", client_name),
        ));

        let store = self.clone();
        let id = session.id.clone();
        let delay = self.inner.timing.session_qr_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.advance_to_waiting_qr(&id).await;
        });

        session
    }

    // Deferred half of create_session. The session may be gone by now.
    async fn advance_to_waiting_qr(&self, id: &str) {
        let mut state = self.inner.state.lock().await;
        let client_name = match state.session_mut(id) {
            Some(session) => {
                session.status = SessionStatus::WaitingQr;
                session.client_name.clone()
            }
            None => {
                debug!("Session {} removed before QR stage, skipping", id);
                return;
            }
        };
        state.record(
            LogLevel::Info,
            LogSource::Session,
            format!("Sessão \"{}\" aguardando QR code", client_name),
            None,
        );
        debug!("Session {} is now waiting for QR", id);
    }

    /// Merge `update` into the session. Returns false when the id is unknown.
    pub async fn update_session(&self, id: &str, update: SessionUpdate) -> bool {
        let mut state = self.inner.state.lock().await;
        let status = match state.session_mut(id) {
            Some(session) => {
                update.apply(session);
                session.status
            }
            None => {
                debug!("update_session: no session {}", id);
                return false;
            }
        };
        state.record(
            LogLevel::Info,
            LogSource::Session,
            format!("Sessão {} atualizada ({})", id, status),
            None,
        );
        true
    }

    /// Remove a session. The notification goes out whether or not the id existed.
    pub async fn delete_session(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.lock().await;
            let before = state.sessions.len();
            state.sessions.retain(|s| s.id != id);
            let removed = state.sessions.len() != before;
            if removed {
                state.record(LogLevel::Warning, LogSource::Session, format!("Sessão {} removida", id), None);
            }
            removed
        };

        if removed {
            info!("Deleted session {}", id);
        } else {
            debug!("delete_session: no session {}", id);
        }
        self.notify(Notification::new("Sessão removida", "A sessão foi removida com sucesso"));
        removed
    }

    /// Count per status, in `SessionStatus::ALL` order.
    pub async fn session_status_counts(&self) -> Vec<(SessionStatus, usize)> {
        let state = self.inner.state.lock().await;
        SessionStatus::ALL
            .iter()
            .map(|&status| (status, state.sessions.iter().filter(|s| s.status == status).count()))
            .collect()
    }

    /// Simulated status check. Returns false without notifying for an unknown session.
    pub async fn refresh_session(&self, id: &str) -> bool {
        self.run_session_check(id, SessionCheck::Refresh).await
    }

    /// Simulated test message through the session.
    pub async fn test_session(&self, id: &str) -> bool {
        self.run_session_check(id, SessionCheck::Test).await
    }

    async fn run_session_check(&self, id: &str, check: SessionCheck) -> bool {
        if self.inner.state.lock().await.session_mut(id).is_none() {
            debug!("{:?} on unknown session {}", check, id);
            return false;
        }
        let (title, description) = check.started();
        self.notify(Notification::new(title, description));

        let store = self.clone();
        let id = id.to_string();
        let delay = match check {
            SessionCheck::Refresh => self.inner.timing.session_refresh_delay(),
            SessionCheck::Test => self.inner.timing.session_test_delay(),
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.finish_session_check(&id, check).await;
        });
        true
    }

    // The session may have been deleted while the check was pending
    async fn finish_session_check(&self, id: &str, check: SessionCheck) {
        let (title, description) = check.finished();
        {
            let mut state = self.inner.state.lock().await;
            if state.session_mut(id).is_none() {
                debug!("Session {} removed during {:?}, skipping", id, check);
                return;
            }
            state.record(LogLevel::Info, LogSource::Session, format!("{} ({})", title, id), None);
        }
        self.notify(Notification::new(title, description));
    }
}

#[derive(Debug, Clone, Copy)]
enum SessionCheck {
    Refresh,
    Test,
}

impl SessionCheck {
    fn started(self) -> (&'static str, &'static str) {
        match self {
            SessionCheck::Refresh => ("Atualizando sessão...", "Verificando status da conexão"),
            SessionCheck::Test => ("Testando conexão...", "Enviando mensagem de teste"),
        }
    }

    fn finished(self) -> (&'static str, &'static str) {
        match self {
            SessionCheck::Refresh => ("Sessão atualizada", "Status da sessão foi verificado"),
            SessionCheck::Test => ("Teste concluído", "Conexão está funcionando corretamente"),
        }
    }
}

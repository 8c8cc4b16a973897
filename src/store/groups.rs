use log::{debug, info};

use super::Store;
use crate::models::{Group, LogLevel, LogSource};
use crate::notifications::Notification;

/// The fixed group set every load returns.
pub fn mock_groups() -> Vec<Group> {
    vec![
        Group { id: "1".to_string(), name: "Grupo Vendas".to_string(), participants_count: 25, unread_count: 3 },
        Group { id: "2".to_string(), name: "Equipe Suporte".to_string(), participants_count: 12, unread_count: 0 },
        Group { id: "3".to_string(), name: "Clientes VIP".to_string(), participants_count: 48, unread_count: 7 },
    ]
}

impl Store {
    /// Replace the group collection with the mock set. `session_id` is only logged.
    pub async fn load_groups(&self, session_id: &str) -> Vec<Group> {
        let groups = mock_groups();
        {
            let mut state = self.inner.state.lock().await;
            state.groups = groups.clone();
            state.record(
                LogLevel::Info,
                LogSource::Session,
                format!("{} grupos carregados da sessão {}", groups.len(), session_id),
                None,
            );
        }

        info!("Loaded {} groups for session {}", groups.len(), session_id);
        self.notify(Notification::new(
            "Grupos carregados",
            format!("{} grupos encontrados", groups.len()),
        ));
        groups
    }

    /// Simulated contact extraction from a loaded group.
    ///
    /// Returns false without notifying when the group is not loaded. Nothing is added
    /// to the contact list.
    pub async fn extract_group_contacts(&self, group_id: &str) -> bool {
        let group = {
            let state = self.inner.state.lock().await;
            state.groups.iter().find(|g| g.id == group_id).cloned()
        };
        let group = match group {
            Some(group) => group,
            None => {
                debug!("extract_group_contacts: group {} not loaded", group_id);
                return false;
            }
        };

        self.notify(Notification::new(
            "Extração iniciada",
            format!("Extraindo contatos do grupo: {}", group.name),
        ));

        let store = self.clone();
        let delay = self.inner.timing.group_extraction_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.notify(Notification::new(
                "Contatos extraídos",
                format!("{} contatos foram extraídos do grupo {}", group.participants_count, group.name),
            ));
        });
        true
    }
}

use chrono::Local;
use log::{debug, info};

use super::Store;
use crate::models::{Contact, ContactCategory, LogLevel, LogSource, NewContact};
use crate::notifications::Notification;

/// Contact list search. `None` category means every category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFilter {
    pub search: Option<String>,
    pub category: Option<ContactCategory>,
}

impl ContactFilter {
    pub fn search(term: impl Into<String>) -> Self {
        ContactFilter { search: Some(term.into()), category: None }
    }

    pub fn category(category: ContactCategory) -> Self {
        ContactFilter { search: None, category: Some(category) }
    }

    /// Name matches case-insensitively, phone as a plain substring.
    pub fn matches(&self, contact: &Contact) -> bool {
        if let Some(category) = self.category {
            if contact.category != category {
                return false;
            }
        }
        match &self.search {
            Some(term) if !term.is_empty() => {
                contact.name.to_lowercase().contains(&term.to_lowercase()) || contact.phone.contains(term.as_str())
            }
            _ => true,
        }
    }
}

impl Store {
    pub async fn contacts_filtered(&self, filter: &ContactFilter) -> Vec<Contact> {
        let state = self.inner.state.lock().await;
        state.contacts.iter().filter(|c| filter.matches(c)).cloned().collect()
    }

    /// Count per category, in `ContactCategory::ALL` order, zeros included.
    pub async fn category_counts(&self) -> Vec<(ContactCategory, usize)> {
        let state = self.inner.state.lock().await;
        ContactCategory::ALL
            .iter()
            .map(|&category| (category, state.contacts.iter().filter(|c| c.category == category).count()))
            .collect()
    }

    pub async fn add_contact(&self, data: NewContact) -> Contact {
        let contact = {
            let mut state = self.inner.state.lock().await;
            let contact = Contact {
                id: state.ids.next("contact"),
                name: data.name,
                phone: data.phone,
                category: data.category,
                created_at: Local::now(),
            };
            state.contacts.push(contact.clone());
            state.record(
                LogLevel::Info,
                LogSource::Api,
                format!("Contato \"{}\" adicionado", contact.name),
                None,
            );
            contact
        };

        info!("Added contact {} ({})", contact.id, contact.name);
        self.notify(Notification::new(
            "Contato adicionado",
            format!("{} foi adicionado aos contatos", contact.name),
        ));
        contact
    }

    /// Remove by id. Notifies even when nothing matched.
    pub async fn remove_contact(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.lock().await;
            let before = state.contacts.len();
            state.contacts.retain(|c| c.id != id);
            let removed = state.contacts.len() != before;
            if removed {
                state.record(LogLevel::Info, LogSource::Api, format!("Contato {} removido", id), None);
            }
            removed
        };

        debug!("remove_contact {}: removed={}", id, removed);
        self.notify(Notification::new("Contato removido", "O contato foi removido com sucesso"));
        removed
    }

    /// Append a batch of contacts sharing one creation timestamp.
    pub async fn import_contacts(&self, batch: Vec<NewContact>) -> Vec<Contact> {
        let count = batch.len();
        let imported = {
            let mut state = self.inner.state.lock().await;
            let created_at = Local::now();
            let imported: Vec<Contact> = batch
                .into_iter()
                .map(|data| Contact {
                    id: state.ids.next("contact"),
                    name: data.name,
                    phone: data.phone,
                    category: data.category,
                    created_at,
                })
                .collect();
            state.contacts.extend(imported.iter().cloned());
            state.record(
                LogLevel::Success,
                LogSource::Api,
                format!("{} contatos importados", count),
                None,
            );
            imported
        };

        info!("Imported {} contacts", count);
        self.notify(Notification::new(
            "Contatos importados",
            format!("{} contatos foram importados", count),
        ));
        imported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::ContactCategory;

    #[tokio::test]
    async fn test_import_shares_timestamp_and_keeps_order() {
        let (store, mut rx) = Store::empty(&AppConfig::default());

        let imported = store
            .import_contacts(vec![
                NewContact::new("A", "1"),
                NewContact::new("B", "2").with_category(ContactCategory::Fornecedor),
                NewContact::new("C", "3"),
            ])
            .await;

        assert_eq!(imported.len(), 3);
        assert!(imported.iter().all(|c| c.created_at == imported[0].created_at));
        assert_eq!(imported[1].category, ContactCategory::Fornecedor);

        let names: Vec<String> = store.contacts().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.description, "3 contatos foram importados");
    }

    #[tokio::test]
    async fn test_filter_by_search_and_category() {
        let (store, _rx) = Store::new(&AppConfig::default());
        store
            .add_contact(NewContact::new("Pedro Oliveira", "5521777777777").with_category(ContactCategory::Lead))
            .await;

        let names = |contacts: Vec<Contact>| contacts.into_iter().map(|c| c.name).collect::<Vec<_>>();

        assert_eq!(names(store.contacts_filtered(&ContactFilter::search("MARIA")).await), vec!["Maria Santos"]);
        assert_eq!(names(store.contacts_filtered(&ContactFilter::search("55219")).await), Vec::<String>::new());
        assert_eq!(names(store.contacts_filtered(&ContactFilter::search("552177")).await), vec!["Pedro Oliveira"]);
        assert_eq!(
            names(store.contacts_filtered(&ContactFilter::category(ContactCategory::Lead)).await),
            vec!["Maria Santos", "Pedro Oliveira"]
        );

        let both = ContactFilter { search: Some("silva".to_string()), category: Some(ContactCategory::Lead) };
        assert!(store.contacts_filtered(&both).await.is_empty());
        assert_eq!(store.contacts_filtered(&ContactFilter::default()).await.len(), 3);
    }

    #[tokio::test]
    async fn test_category_counts_include_zeros() {
        let (store, _rx) = Store::new(&AppConfig::default());
        store.import_contacts(vec![NewContact::new("A", "1"), NewContact::new("B", "2")]).await;

        assert_eq!(
            store.category_counts().await,
            vec![
                (ContactCategory::Cliente, 3),
                (ContactCategory::Lead, 1),
                (ContactCategory::Fornecedor, 0),
                (ContactCategory::Outro, 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_import_still_notifies() {
        let (store, mut rx) = Store::empty(&AppConfig::default());

        assert!(store.import_contacts(Vec::new()).await.is_empty());
        assert_eq!(rx.try_recv().unwrap().description, "0 contatos foram importados");
    }
}

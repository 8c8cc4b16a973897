// Re-export needed modules for testing
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod store;

// Re-export main types for convenience
pub use error::{Result, ZapError};
pub use models::*;
pub use notifications::{Notification, Variant};
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn session(status: SessionStatus) -> Session {
        Session {
            id: "s1".to_string(),
            client_name: "Empresa XYZ".to_string(),
            webhook_url: "https://webhook.site/xyz".to_string(),
            status,
            created_at: Local::now(),
            qr_code: None,
        }
    }

    #[test]
    fn test_session_status_round_trip_names() {
        // Status names match the wire strings the dashboard uses
        assert_eq!(SessionStatus::WaitingQr.to_string(), "waiting-qr");
        assert_eq!("waiting-qr".parse::<SessionStatus>().unwrap(), SessionStatus::WaitingQr);
        assert_eq!("CONNECTED".parse::<SessionStatus>().unwrap(), SessionStatus::Connected);

        let json = serde_json::to_string(&SessionStatus::WaitingQr).unwrap();
        assert_eq!(json, "\"waiting-qr\"");

        match "online".parse::<SessionStatus>() {
            Err(ZapError::UnknownVariant { kind, value }) => {
                assert_eq!(kind, "session status");
                assert_eq!(value, "online");
            }
            other => panic!("Expected UnknownVariant, got {:?}", other),
        }
    }

    #[test]
    fn test_session_update_merges() {
        let mut s = session(SessionStatus::Initializing);

        // Empty update changes nothing
        let before = s.clone();
        SessionUpdate::default().apply(&mut s);
        assert_eq!(s, before);

        SessionUpdate {
            client_name: Some("Loja ABC".to_string()),
            ..Default::default()
        }
        .apply(&mut s);
        assert_eq!(s.client_name, "Loja ABC");
        assert_eq!(s.status, SessionStatus::Initializing);

        // Status can be set directly, skipping the QR stage
        SessionUpdate::status(SessionStatus::Connected).apply(&mut s);
        assert_eq!(s.status, SessionStatus::Connected);
    }

    #[test]
    fn test_contact_category_default_and_parse() {
        let contact = NewContact::new("A", "1");
        assert_eq!(contact.category, ContactCategory::Cliente);

        // Missing category in JSON falls back to Cliente too
        let parsed: NewContact = serde_json::from_str(r#"{"name":"B","phone":"2"}"#).unwrap();
        assert_eq!(parsed.category, ContactCategory::Cliente);

        assert_eq!("fornecedor".parse::<ContactCategory>().unwrap(), ContactCategory::Fornecedor);
        assert!("vip".parse::<ContactCategory>().is_err());
        assert_eq!(ContactCategory::Outro.to_string(), "Outro");
    }

    #[test]
    fn test_delivery_status_names() {
        assert_eq!(DeliveryStatus::Sent.to_string(), "sent");
        assert_eq!(serde_json::to_string(&DeliveryStatus::Delivered).unwrap(), "\"delivered\"");
        assert_ne!(DeliveryStatus::Read, DeliveryStatus::Failed);
    }

    #[test]
    fn test_api_settings_update() {
        let mut settings = ApiSettings::default();
        assert_eq!(settings.api_url, "http://localhost:3000/api");
        assert_eq!(settings.timeout, 5000);
        assert_eq!(settings.auto_refresh_interval, 10000);

        ApiSettingsUpdate {
            api_url: Some("https://gateway.local/api".to_string()),
            ..Default::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.api_url, "https://gateway.local/api");
        assert_eq!(settings.timeout, 5000);
    }

    #[test]
    fn test_log_entry_export_line() {
        let entry = LogEntry {
            id: "log-1".to_string(),
            timestamp: Local::now(),
            level: LogLevel::Warning,
            source: LogSource::Webhook,
            message: "Webhook timeout".to_string(),
            details: None,
        };
        let line = entry.to_string();
        assert!(line.ends_with("] [WARNING] [WEBHOOK] Webhook timeout"));
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
    }
}

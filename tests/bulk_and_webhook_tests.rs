// Bulk sends, webhooks, activity log and settings
// These cover the dashboard pages that sit on top of the core collections

mod common;
use common::{drain, drain_titles, empty_store, seeded_store};

use std::io::Write;
use tokio::time::Duration;

use zapboard::config::{load_config_from, AppConfig};
use zapboard::models::{DeliveryStatus, LogLevel, LogSource, WebhookStatus};
use zapboard::store::{BulkCampaign, BulkRecipient, LogFilter};
use zapboard::{Store, Variant, ZapError};

fn three_recipients() -> Vec<BulkRecipient> {
    vec![
        BulkRecipient::new("João Silva", "5511999999999"),
        BulkRecipient::new("Maria Santos", "5511888888888"),
        BulkRecipient::new("Pedro Oliveira", "5511777777777"),
    ]
}

fn fixed_campaign(recipients: Vec<BulkRecipient>) -> BulkCampaign {
    let mut campaign = BulkCampaign::new("1", "Olá {nome}! Temos uma oferta especial para você.", recipients);
    campaign.delay_between = Duration::from_millis(2000);
    campaign.randomize_delay = false;
    campaign
}

//------------------------------------------------------------------------------
// BULK SENDS
//------------------------------------------------------------------------------

/// One personalized message per recipient, progress notifications in order
#[tokio::test(start_paused = true)]
async fn test_bulk_run_appends_one_message_per_recipient() {
    let (store, mut rx) = seeded_store();

    let report = store.run_bulk(fixed_campaign(three_recipients())).await.unwrap();
    assert_eq!(report.sent, 3);
    assert_eq!(report.total, 3);
    assert!(!report.stopped);
    assert_eq!(report.message_ids.len(), 3);

    let messages = store.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].content, "Olá João Silva! Temos uma oferta especial para você.");
    assert_eq!(messages[2].to, "5511777777777");
    assert!(messages.iter().all(|m| m.session_id == "1"));

    assert_eq!(
        drain_titles(&mut rx),
        vec![
            "Mensagem enviada (1/3)",
            "Mensagem enviada (2/3)",
            "Mensagem enviada (3/3)",
            "Envio concluído!",
        ]
    );

    // Bulk messages get the normal delivery transition
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(store.messages().await.iter().all(|m| m.status == DeliveryStatus::Delivered));

    let bulk_logs = store.logs(&LogFilter::search("envio em massa")).await;
    assert_eq!(bulk_logs.len(), 1);
    assert_eq!(bulk_logs[0].source, LogSource::Bulk);
    assert_eq!(bulk_logs[0].level, LogLevel::Success);
}

/// Progress is published on the watch channel
#[tokio::test(start_paused = true)]
async fn test_bulk_progress_updates() {
    let (store, _rx) = empty_store();

    let handle = store.start_bulk(fixed_campaign(three_recipients())).unwrap();
    let progress = handle.progress();
    assert_eq!(progress.borrow().sent, 0);
    assert_eq!(progress.borrow().total, 3);

    tokio::time::sleep(Duration::from_millis(4100)).await;
    assert_eq!(progress.borrow().sent, 2);

    let report = handle.wait().await.unwrap();
    assert_eq!(report.sent, 3);
    assert_eq!(progress.borrow().percent(), 100.0);
}

/// Stopping halts before the next message
#[tokio::test(start_paused = true)]
async fn test_bulk_stop() {
    let (store, mut rx) = empty_store();

    let handle = store.start_bulk(fixed_campaign(three_recipients())).unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    handle.stop();

    let report = handle.wait().await.unwrap();
    assert!(report.stopped);
    assert_eq!(report.sent, 1);
    assert_eq!(store.messages().await.len(), 1);

    let notifications = drain(&mut rx);
    let last = notifications.last().unwrap();
    assert_eq!(last.title, "Envio interrompido");
    assert_eq!(last.description, "1 de 3 mensagens enviadas");
    assert_eq!(last.variant, Variant::Destructive);
}

/// Incomplete campaigns are rejected before anything is sent
#[tokio::test]
async fn test_bulk_rejects_empty_campaign() {
    let (store, mut rx) = empty_store();

    let result = store.run_bulk(BulkCampaign::new("1", "Olá {nome}", Vec::new())).await;
    assert!(matches!(result, Err(ZapError::InvalidCampaign(_))));

    let result = store.run_bulk(BulkCampaign::new("", "Olá {nome}", three_recipients())).await;
    assert!(matches!(result, Err(ZapError::InvalidCampaign(_))));

    assert!(store.messages().await.is_empty());
    assert!(drain(&mut rx).is_empty());
}

//------------------------------------------------------------------------------
// WEBHOOKS
//------------------------------------------------------------------------------

/// A failing seeded webhook recovers after a test
#[tokio::test(start_paused = true)]
async fn test_webhook_test_marks_active() {
    let (store, mut rx) = seeded_store();

    let before = store.webhooks().await;
    assert_eq!(before.len(), 2);
    assert_eq!(before[1].status, WebhookStatus::Error);

    let tested = store.test_webhook("2").await.unwrap();
    assert_eq!(tested.status, WebhookStatus::Active);
    assert!(tested.last_test.unwrap() > before[1].last_test.unwrap());
    assert_eq!(drain_titles(&mut rx), vec!["Teste concluído"]);

    assert!(store.remove_webhook("2").await);
    assert!(!store.remove_webhook("2").await);
    assert_eq!(store.webhooks().await.len(), 1);
    assert_eq!(drain_titles(&mut rx), vec!["Webhook removido", "Webhook removido"]);
}

//------------------------------------------------------------------------------
// ACTIVITY LOG
//------------------------------------------------------------------------------

/// Mutations show up in the activity log, newest first
#[tokio::test]
async fn test_mutations_are_logged() {
    let (store, _rx) = empty_store();

    store.create_session("Empresa XYZ", "https://webhook.site/xyz").await;
    store.send_message("1", "5511999999999", "Oi").await;

    let logs = store.logs(&LogFilter::default()).await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].source, LogSource::Message);
    assert_eq!(logs[1].source, LogSource::Session);

    let exported = store.export_logs(&LogFilter::search("empresa")).await;
    assert_eq!(exported.lines().count(), 1);
    assert!(exported.contains("[INFO] [SESSION] Sessão \"Empresa XYZ\" criada"));
}

//------------------------------------------------------------------------------
// CONFIG
//------------------------------------------------------------------------------

/// Timing from the config file drives the simulated delays
#[tokio::test(start_paused = true)]
async fn test_config_timing_drives_store() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "api": {{ "api_url": "https://gateway.local/api" }}, "timing": {{ "session_qr_delay_ms": 50 }} }}"#
    )
    .unwrap();

    let config: AppConfig = load_config_from(file.path()).unwrap();
    let (store, _rx) = Store::empty(&config);
    assert_eq!(store.api_settings().await.api_url, "https://gateway.local/api");

    let session = store.create_session("Rápida", "https://hook").await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    let sessions = store.sessions().await;
    assert_eq!(sessions[0].id, session.id);
    assert_eq!(sessions[0].status, zapboard::SessionStatus::WaitingQr);
}

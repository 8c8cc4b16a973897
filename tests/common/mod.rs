// Common test utilities for integration tests
// This module contains shared code for all integration tests
#![allow(dead_code)]

use std::sync::Once;

use log::LevelFilter;
use tokio::sync::mpsc;

use zapboard::config::AppConfig;
use zapboard::{Notification, Store};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Store with the dashboard's mock data
pub fn seeded_store() -> (Store, mpsc::Receiver<Notification>) {
    setup_logging();
    Store::new(&AppConfig::default())
}

/// Store with no entities
pub fn empty_store() -> (Store, mpsc::Receiver<Notification>) {
    setup_logging();
    Store::empty(&AppConfig::default())
}

/// Everything queued on the notification channel right now
pub fn drain(rx: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

/// Titles of everything queued right now
pub fn drain_titles(rx: &mut mpsc::Receiver<Notification>) -> Vec<String> {
    drain(rx).into_iter().map(|n| n.title).collect()
}

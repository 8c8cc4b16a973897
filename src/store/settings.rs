// API settings and the auto-refresh ticker.
// The ticker has no effect beyond a debug line; it only follows the configured interval.

use log::{debug, info, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};

use super::Store;
use crate::models::{ApiSettings, ApiSettingsUpdate, LogLevel, LogSource};
use crate::notifications::Notification;

impl Store {
    /// Merge `update` into the settings; restarts the ticker if auto-refresh is on and the interval changed.
    pub async fn update_api_settings(&self, update: ApiSettingsUpdate) -> ApiSettings {
        let settings = self.apply_settings(update).await;
        self.notify(Notification::new(
            "Configurações salvas",
            "As configurações da API foram atualizadas",
        ));
        settings
    }

    async fn apply_settings(&self, update: ApiSettingsUpdate) -> ApiSettings {
        let (settings, interval_changed) = {
            let mut state = self.inner.state.lock().await;
            let previous_interval = state.api_settings.auto_refresh_interval;
            update.apply(&mut state.api_settings);
            let settings = state.api_settings.clone();
            state.record(
                LogLevel::Info,
                LogSource::Api,
                "Configurações da API atualizadas",
                Some(serde_json::json!({ "apiUrl": settings.api_url, "timeout": settings.timeout })),
            );
            (settings.clone(), settings.auto_refresh_interval != previous_interval)
        };

        info!("API settings updated: {:?}", settings);
        if interval_changed && self.auto_refresh_enabled() {
            self.spawn_ticker(settings.auto_refresh_interval);
        }
        settings
    }

    pub async fn reset_api_settings(&self) -> ApiSettings {
        let defaults = ApiSettings::default();
        let update = ApiSettingsUpdate {
            api_url: Some(defaults.api_url),
            timeout: Some(defaults.timeout),
            auto_refresh_interval: Some(defaults.auto_refresh_interval),
        };
        let settings = self.apply_settings(update).await;
        self.notify(Notification::new(
            "Configurações restauradas",
            "Todas as configurações foram restauradas para o padrão",
        ));
        settings
    }

    /// Simulated probe of the configured API. Always succeeds after the delay.
    pub async fn test_connection(&self) -> bool {
        let api_url = self.api_settings().await.api_url;
        debug!("Testing connection to {}", api_url);
        tokio::time::sleep(self.inner.timing.connection_test_delay()).await;

        {
            let mut state = self.inner.state.lock().await;
            state.record(LogLevel::Success, LogSource::Api, format!("Conexão com {} verificada", api_url), None);
        }
        self.notify(Notification::new(
            "Conexão bem-sucedida",
            "A API está respondendo corretamente",
        ));
        true
    }

    /// Start the auto-refresh ticker at the current interval. Needs a running runtime.
    ///
    /// Auto-refresh stays enabled until `stop_auto_refresh`, so a later interval
    /// change restarts the ticker even if an interval of 0 paused it.
    pub async fn start_auto_refresh(&self) {
        self.inner.auto_refresh_enabled.store(true, Ordering::SeqCst);
        let interval = self.api_settings().await.auto_refresh_interval;
        self.spawn_ticker(interval);
    }

    pub fn stop_auto_refresh(&self) {
        self.inner.auto_refresh_enabled.store(false, Ordering::SeqCst);
        self.abort_ticker();
        debug!("Auto-refresh stopped");
    }

    pub fn auto_refresh_enabled(&self) -> bool {
        self.inner.auto_refresh_enabled.load(Ordering::SeqCst)
    }

    /// Whether a ticker task is alive right now.
    pub fn auto_refresh_running(&self) -> bool {
        match self.inner.ticker.lock() {
            Ok(slot) => slot.as_ref().map(|h| !h.is_finished()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Tick counter bumped on every auto-refresh. Closes once the store and its ticker are gone.
    pub fn refresh_ticks(&self) -> watch::Receiver<u64> {
        self.inner.refresh_ticks.subscribe()
    }

    fn abort_ticker(&self) {
        let mut slot = match self.inner.ticker.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn spawn_ticker(&self, interval_ms: u64) {
        self.abort_ticker();
        if interval_ms == 0 {
            warn!("Auto-refresh interval is 0, ticker paused");
            return;
        }

        // Weak so the ticker never keeps the store alive
        let weak = Arc::downgrade(&self.inner);
        let ticks = self.inner.refresh_ticks.clone();
        let period = Duration::from_millis(interval_ms);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if weak.strong_count() == 0 {
                    break;
                }
                ticks.send_modify(|n| *n += 1);
                debug!("Auto-refresh tick ({} ms)", interval_ms);
            }
        });

        let mut slot = match self.inner.ticker.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(handle);
        info!("Auto-refresh every {} ms", interval_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (store, mut rx) = Store::empty(&AppConfig::default());

        let settings = store
            .update_api_settings(ApiSettingsUpdate { timeout: Some(9000), ..Default::default() })
            .await;
        assert_eq!(settings.timeout, 9000);
        assert_eq!(settings.api_url, "http://localhost:3000/api");
        assert_eq!(settings.auto_refresh_interval, 10000);
        assert_eq!(rx.try_recv().unwrap().title, "Configurações salvas");

        let reset = store.reset_api_settings().await;
        assert_eq!(reset, ApiSettings::default());
        assert_eq!(rx.try_recv().unwrap().title, "Configurações restauradas");
        assert!(rx.try_recv().is_err());
    }

    fn refresh_every(ms: u64) -> ApiSettingsUpdate {
        ApiSettingsUpdate { auto_refresh_interval: Some(ms), ..Default::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_follows_interval_changes() {
        let (store, _rx) = Store::empty(&AppConfig::default());
        assert!(!store.auto_refresh_running());

        store.start_auto_refresh().await;
        assert!(store.auto_refresh_running());

        store.update_api_settings(refresh_every(0)).await;
        assert!(!store.auto_refresh_running());
        assert!(store.auto_refresh_enabled());

        // Back to a real interval after 0
        store.update_api_settings(refresh_every(5000)).await;
        assert!(store.auto_refresh_running());

        let mut ticks = store.refresh_ticks();
        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(*ticks.borrow_and_update(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_restarts_between_intervals() {
        let (store, _rx) = Store::empty(&AppConfig::default());
        store.start_auto_refresh().await;
        let mut ticks = store.refresh_ticks();

        tokio::time::sleep(Duration::from_millis(10100)).await;
        assert_eq!(*ticks.borrow_and_update(), 1);

        store.update_api_settings(refresh_every(3000)).await;
        assert!(store.auto_refresh_running());

        // New period counts from the change
        tokio::time::sleep(Duration::from_millis(6100)).await;
        assert_eq!(*ticks.borrow_and_update(), 3);
        assert!(store.auto_refresh_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_without_auto_refresh_starts_nothing() {
        let (store, _rx) = Store::empty(&AppConfig::default());
        store.update_api_settings(refresh_every(5000)).await;
        assert!(!store.auto_refresh_running());

        store.start_auto_refresh().await;
        store.stop_auto_refresh();
        store.update_api_settings(refresh_every(7000)).await;
        assert!(!store.auto_refresh_running());
        assert!(!store.auto_refresh_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_stops_with_last_handle() {
        let (store, _rx) = Store::empty(&AppConfig::default());
        store.start_auto_refresh().await;
        let mut ticks = store.refresh_ticks();

        let clone = store.clone();
        drop(store);
        tokio::time::sleep(Duration::from_millis(10100)).await;
        assert_eq!(*ticks.borrow_and_update(), 1);
        assert!(clone.auto_refresh_running());

        drop(clone);
        // Only the ticker task held the sender besides the store
        assert!(ticks.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_probe_succeeds() {
        let (store, mut rx) = Store::empty(&AppConfig::default());
        assert!(store.test_connection().await);
        assert_eq!(rx.try_recv().unwrap().title, "Conexão bem-sucedida");
    }
}

use crate::{
    constants::{MAX_CONNECTION_ATTEMPTS, MAX_RETRIES},
    error::Result,
    services::llm_client::LlmClient,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Snapshot of the supervisor's connection state. `fallback_active` and
/// `connected` are never both true; `connected` implies at least one
/// successful probe since the last start()/restart().
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub fallback_active: bool,
    pub last_error: Option<String>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub connection_attempts: u32,
    pub max_connection_attempts: u32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            connected: false,
            fallback_active: false,
            last_error: None,
            retry_count: 0,
            max_retries: MAX_RETRIES,
            connection_attempts: 0,
            max_connection_attempts: MAX_CONNECTION_ATTEMPTS,
        }
    }
}

/// Owns the single process-wide handle to the language-model client and
/// decides whether chat requests go to the model or the canned responder.
///
/// Every call into the model client is caught here: failure degrades to
/// fallback mode, it never propagates past the supervisor boundary.
pub struct AiSupervisor {
    client: Arc<dyn LlmClient>,
    status: RwLock<ConnectionStatus>,
    health_check: Mutex<Option<JoinHandle<()>>>,
    /// Bumped whenever the timer is stopped or re-armed. In-flight probes
    /// carry the generation they were spawned under and drop their result
    /// once it no longer matches, so a stale probe from before a restart
    /// cannot flip a freshly reconnected supervisor into fallback.
    probe_generation: AtomicU64,
    health_interval: Duration,
}

impl AiSupervisor {
    pub fn new(client: Arc<dyn LlmClient>, health_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            client,
            status: RwLock::new(ConnectionStatus::default()),
            health_check: Mutex::new(None),
            probe_generation: AtomicU64::new(0),
            health_interval,
        })
    }

    /// Construct the connection: one synchronous probe, then recurring
    /// health checks on success. Returns false (and activates fallback)
    /// on any probe failure.
    pub async fn start(self: &Arc<Self>) -> bool {
        {
            let mut status = self.status.write().await;
            status.connection_attempts += 1;
        }

        match self.client.probe().await {
            Ok(_) => {
                {
                    let mut status = self.status.write().await;
                    status.connected = true;
                    status.fallback_active = false;
                    status.last_error = None;
                    status.retry_count = 0;
                }
                self.start_health_check().await;
                tracing::info!("AI supervisor connected to language model");
                true
            }
            Err(err) => {
                tracing::warn!("AI supervisor start failed: {}", err);
                self.enable_fallback_mode(&err.to_string()).await;
                false
            }
        }
    }

    /// Arm the recurring probe. Always replaces any previous timer, so at
    /// most one is alive regardless of how often this is called. Each tick
    /// probes in its own task; a slow probe never delays the next tick.
    pub async fn start_health_check(self: &Arc<Self>) {
        // Invalidate probes spawned under the previous timer.
        self.probe_generation.fetch_add(1, Ordering::SeqCst);

        let supervisor = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(supervisor.health_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick fires immediately; start() already probed.
            interval.tick().await;
            loop {
                interval.tick().await;
                let generation = supervisor.probe_generation.load(Ordering::SeqCst);
                let probe_target = supervisor.clone();
                tokio::spawn(async move {
                    probe_target.health_probe_once(generation).await;
                });
            }
        });

        let mut slot = self.health_check.lock().await;
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Cancel the active timer if any. Safe to call when idle. In-flight
    /// probes keep running but their results are dropped.
    pub async fn stop_health_check(&self) {
        self.probe_generation.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.health_check.lock().await;
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    /// Route chat to the canned responder until the next restart.
    /// Idempotent; calling it while already in fallback just refreshes
    /// `last_error`.
    pub async fn enable_fallback_mode(&self, reason: &str) {
        let mut status = self.status.write().await;
        if !status.fallback_active {
            tracing::warn!("Fallback mode enabled: {}", reason);
        }
        status.fallback_active = true;
        status.connected = false;
        status.last_error = Some(reason.to_string());
    }

    /// Full reconnect: cancel health checks, reset counters, re-run
    /// start(). Returns what start() returns.
    pub async fn restart(self: &Arc<Self>) -> bool {
        tracing::info!("AI supervisor restarting");
        self.stop_health_check().await;
        {
            let mut status = self.status.write().await;
            status.connected = false;
            status.retry_count = 0;
        }
        self.start().await
    }

    /// Guarded model call. A failure flips the supervisor into fallback
    /// mode before the error is returned, so the caller only needs to pick
    /// the canned path.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        match self.client.generate(prompt).await {
            Ok(text) => Ok(text),
            Err(err) => {
                self.enable_fallback_mode(&err.to_string()).await;
                Err(err)
            }
        }
    }

    pub async fn get_status(&self) -> ConnectionStatus {
        self.status.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.status.read().await.connected
    }

    async fn health_probe_once(self: Arc<Self>, generation: u64) {
        let result = self.client.probe().await;
        if self.probe_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Dropping health probe result from a stale timer");
            return;
        }
        match result {
            Ok(_) => {
                tracing::debug!("Health probe ok");
            }
            Err(err) => {
                {
                    let mut status = self.status.write().await;
                    status.retry_count += 1;
                }
                self.enable_fallback_mode(&err.to_string()).await;
            }
        }
    }

    #[cfg(test)]
    pub async fn health_check_active(&self) -> bool {
        self.health_check.lock().await.is_some()
    }
}

impl Drop for AiSupervisor {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.health_check.try_lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

    struct MockLlm {
        healthy: AtomicBool,
        probes: AtomicUsize,
        probe_delay_ms: AtomicU64,
    }

    impl MockLlm {
        fn new(healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                healthy: AtomicBool::new(healthy),
                probes: AtomicUsize::new(0),
                probe_delay_ms: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl crate::services::llm_client::LlmClient for MockLlm {
        async fn probe(&self) -> Result<String> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            let delay = self.probe_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.healthy.load(Ordering::SeqCst) {
                Ok("OK".to_string())
            } else {
                Err(AppError::ModelUnavailable("probe refused".to_string()))
            }
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok("generated".to_string())
            } else {
                Err(AppError::ModelUnavailable("generate refused".to_string()))
            }
        }
    }

    fn supervisor_with(client: Arc<MockLlm>) -> Arc<AiSupervisor> {
        AiSupervisor::new(client, Duration::from_millis(20))
    }

    #[tokio::test]
    async fn successful_start_connects_and_clears_fallback() {
        let supervisor = supervisor_with(MockLlm::new(true));
        assert!(supervisor.start().await);

        let status = supervisor.get_status().await;
        assert!(status.connected);
        assert!(!status.fallback_active);
        assert!(status.last_error.is_none());
        assert_eq!(status.retry_count, 0);
        assert_eq!(status.connection_attempts, 1);
        supervisor.stop_health_check().await;
    }

    #[tokio::test]
    async fn failed_start_activates_fallback_with_reason() {
        let supervisor = supervisor_with(MockLlm::new(false));
        assert!(!supervisor.start().await);

        let status = supervisor.get_status().await;
        assert!(!status.connected);
        assert!(status.fallback_active);
        assert!(status.last_error.as_deref().unwrap_or("").contains("probe refused"));
    }

    #[tokio::test]
    async fn enable_fallback_mode_is_idempotent() {
        let supervisor = supervisor_with(MockLlm::new(true));
        supervisor.enable_fallback_mode("first reason").await;
        supervisor.enable_fallback_mode("second reason").await;

        let status = supervisor.get_status().await;
        assert!(!status.connected);
        assert!(status.fallback_active);
        assert_eq!(status.last_error.as_deref(), Some("second reason"));
    }

    #[tokio::test]
    async fn health_probe_failure_flips_to_fallback() {
        let client = MockLlm::new(true);
        let supervisor = supervisor_with(client.clone());
        assert!(supervisor.start().await);

        client.healthy.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;

        let status = supervisor.get_status().await;
        assert!(!status.connected);
        assert!(status.fallback_active);
        assert!(status.retry_count >= 1);
        supervisor.stop_health_check().await;
    }

    #[tokio::test]
    async fn repeated_restarts_keep_a_single_timer() {
        let supervisor = supervisor_with(MockLlm::new(true));
        assert!(supervisor.start().await);
        assert!(supervisor.restart().await);
        assert!(supervisor.restart().await);

        // The handle slot holds at most one timer; restart always aborts
        // the previous one before re-arming.
        assert!(supervisor.health_check_active().await);
        supervisor.stop_health_check().await;
        assert!(!supervisor.health_check_active().await);
        // stop is safe when idle
        supervisor.stop_health_check().await;
    }

    #[tokio::test]
    async fn restart_after_fallback_reconnects() {
        let client = MockLlm::new(false);
        let supervisor = supervisor_with(client.clone());
        assert!(!supervisor.start().await);

        client.healthy.store(true, Ordering::SeqCst);
        assert!(supervisor.restart().await);

        let status = supervisor.get_status().await;
        assert!(status.connected);
        assert!(!status.fallback_active);
        assert_eq!(status.connection_attempts, 2);
        supervisor.stop_health_check().await;
    }

    #[tokio::test]
    async fn stale_probe_cannot_flip_a_restarted_supervisor() {
        let client = MockLlm::new(true);
        let supervisor = supervisor_with(client.clone());
        assert!(supervisor.start().await);

        // Next tick spawns a slow, failing probe that will outlive the
        // restart below.
        client.healthy.store(false, Ordering::SeqCst);
        client.probe_delay_ms.store(150, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;

        client.healthy.store(true, Ordering::SeqCst);
        client.probe_delay_ms.store(0, Ordering::SeqCst);
        assert!(supervisor.restart().await);

        // Let the stale probe land; its failure must be dropped.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = supervisor.get_status().await;
        assert!(status.connected);
        assert!(!status.fallback_active);
        assert_eq!(status.retry_count, 0);
        supervisor.stop_health_check().await;
    }
}

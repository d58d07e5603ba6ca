//! Daemon lifecycle: signal handling, the blocking run loop thread, and
//! restart-on-crash supervision.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use ledctl_engine::{EngineConfig, InMemoryRequestChannel, RunLoop};
use ledctl_plugin::PluginRegistry;
use ledctl_watchdog::Watchdog;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::config_watcher;

/// Daemon-level supervision settings, layered on top of the engine's own
/// [`EngineConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Restart the run loop if its thread dies unexpectedly.
    pub auto_restart: bool,
    /// Maximum number of restarts before giving up and exiting.
    pub max_restart_attempts: u32,
    /// Delay, in seconds, before each restart attempt.
    pub restart_delay_s: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { auto_restart: true, max_restart_attempts: 3, restart_delay_s: 5 }
    }
}

/// Owns the shutdown signal and restart bookkeeping for one run of `ledctld`.
pub struct ServiceDaemon {
    config: DaemonConfig,
    engine_config: EngineConfig,
    config_path: PathBuf,
    shutdown_tx: broadcast::Sender<()>,
    restart_count: Arc<AtomicU32>,
}

impl ServiceDaemon {
    /// Build a daemon around an already-loaded engine configuration.
    ///
    /// `config_path` is kept so the daemon can watch it for hot-reload;
    /// `engine_config` is assumed to already reflect that file's contents.
    #[must_use]
    pub fn new(engine_config: EngineConfig, config_path: PathBuf, config: DaemonConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { config, engine_config, config_path, shutdown_tx, restart_count: Arc::new(AtomicU32::new(0)) }
    }

    /// Run the engine in the foreground until a shutdown signal arrives,
    /// restarting the run loop thread on an unexpected crash.
    ///
    /// # Errors
    ///
    /// Returns an error if the run loop thread dies repeatedly and the
    /// restart budget is exhausted, or restarts are disabled.
    pub async fn run(self, registry: PluginRegistry) -> Result<()> {
        info!("starting display engine daemon");

        let shutdown = Arc::new(AtomicBool::new(false));
        tokio::spawn(Self::watch_for_shutdown_signal(self.shutdown_tx.clone(), Arc::clone(&shutdown)));

        let mut attempts = 0_u32;
        let mut registry = Some(registry);

        loop {
            let channel = match &self.engine_config.request_channel_snapshot_path {
                Some(path) => Arc::new(InMemoryRequestChannel::with_snapshot(path.clone())),
                None => Arc::new(InMemoryRequestChannel::new()),
            };

            let mut run_loop = RunLoop::new(
                registry.take().unwrap_or_default(),
                Watchdog::default(),
                channel,
                self.engine_config.clone(),
            );

            let _watcher = match config_watcher::watch(&self.config_path) {
                Ok((watcher, reload_rx)) => {
                    run_loop.set_config_reload_channel(reload_rx);
                    Some(watcher)
                }
                Err(err) => {
                    warn!(%err, path = ?self.config_path, "failed to start config file watcher; hot-reload disabled");
                    None
                }
            };

            let shutdown_for_loop = Arc::clone(&shutdown);

            let result = tokio::task::spawn_blocking(move || {
                run_loop.run(&shutdown_for_loop);
            })
            .await;

            if shutdown.load(Ordering::Relaxed) {
                info!("run loop exited after shutdown signal");
                return Ok(());
            }

            let Err(join_err) = result else {
                info!("run loop returned without a shutdown signal; exiting");
                return Ok(());
            };

            error!(%join_err, "run loop thread terminated unexpectedly");

            if !self.config.auto_restart {
                return Err(join_err).context("run loop crashed and auto-restart is disabled");
            }

            attempts += 1;
            self.restart_count.store(attempts, Ordering::SeqCst);
            if attempts > self.config.max_restart_attempts {
                return Err(join_err)
                    .context(format!("run loop crashed {attempts} times, exceeding the restart budget"));
            }

            warn!(
                attempt = attempts,
                max = self.config.max_restart_attempts,
                delay_s = self.config.restart_delay_s,
                "restarting run loop after crash"
            );
            tokio::time::sleep(Duration::from_secs(self.config.restart_delay_s)).await;
            registry = Some(PluginRegistry::new());
        }
    }

    async fn watch_for_shutdown_signal(shutdown_tx: broadcast::Sender<()>, shutdown: Arc<AtomicBool>) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
                error!("failed to register SIGTERM handler");
                return;
            };
            let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
                error!("failed to register SIGINT handler");
                return;
            };
            let Ok(mut sighup) = signal(SignalKind::hangup()) else {
                error!("failed to register SIGHUP handler");
                return;
            };

            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM"),
                _ = sigint.recv() => info!("received SIGINT"),
                _ = sighup.recv() => info!("received SIGHUP"),
            }
        }

        #[cfg(windows)]
        {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(%err, "error waiting for Ctrl+C");
                return;
            }
            info!("received Ctrl+C");
        }

        shutdown.store(true, Ordering::Relaxed);
        let _ = shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_allows_three_restarts() {
        let config = DaemonConfig::default();
        assert!(config.auto_restart);
        assert_eq!(config.max_restart_attempts, 3);
    }
}

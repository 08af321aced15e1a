//! Process supervisor: signal-driven graceful shutdown and bounded restarts.
//!
//! The bot's run loop is executed inside [`Supervisor::run`]. A SIGINT or
//! SIGTERM notifies the operator, persists state and stops the loop. A
//! failing loop is restarted after a fixed backoff, at most `max_restarts`
//! times in a row; after that the process gives up and tells the operator.

pub mod state;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::assistant::Messenger;
use state::{ShutdownReason, StateStore, SupervisorState};

pub const MAX_RESTARTS: u32 = 5;
pub const RESTART_BACKOFF: Duration = Duration::from_secs(30);
/// A run that stays up this long resets the consecutive-restart count.
pub const STABLE_RUN: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub max_restarts: u32,
    pub backoff: Duration,
    pub stable_after: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_restarts: MAX_RESTARTS,
            backoff: RESTART_BACKOFF,
            stable_after: STABLE_RUN,
        }
    }
}

/// How the supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Graceful,
    RestartLimit,
}

impl Exit {
    pub fn code(self) -> i32 {
        match self {
            Exit::Graceful => 0,
            Exit::RestartLimit => 1,
        }
    }
}

/// Handed to every run of the loop; resolves once shutdown was requested.
#[derive(Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    pub async fn requested(&mut self) {
        let _ = self.0.wait_for(|requested| *requested).await;
    }
}

pub struct Supervisor {
    store: StateStore,
    messenger: Arc<dyn Messenger>,
    operator_chat: Option<i64>,
    config: SupervisorConfig,
    shutting_down: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Supervisor {
    pub fn new(
        store: StateStore,
        messenger: Arc<dyn Messenger>,
        operator_chat: Option<i64>,
        config: SupervisorConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            messenger,
            operator_chat,
            config,
            shutting_down: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal(self.shutdown_tx.subscribe())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Report the previous run and tell the operator we're up.
    pub async fn startup(&self) -> SupervisorState {
        let state = self.store.load();
        debug!("State file: {:?}", self.store.path());
        let last = state.last_update.as_deref().unwrap_or("никогда");
        info!(
            "🚀 Starting (previous restarts: {}, last update: {}, last shutdown: {:?})",
            state.restart_count, last, state.shutdown_reason
        );
        self.notify_operator(&format!(
            "🟢 Бот запущен\nПерезапусков: {}\nПоследнее обновление: {}",
            state.restart_count, last
        ))
        .await;
        state
    }

    /// Best-effort message to the operator chat.
    pub async fn notify_operator(&self, text: &str) {
        let Some(chat_id) = self.operator_chat else {
            return;
        };
        match self.messenger.send_message(chat_id, text, None).await {
            Ok(_) => debug!("Notified operator ({})", chat_id),
            Err(e) => warn!("Failed to notify operator: {e}"),
        }
    }

    /// Start graceful shutdown: notify, persist, stop the loop. Returns
    /// `false` when shutdown was already under way.
    pub async fn shutdown(&self, cause: &str) -> bool {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            debug!("Ignoring {cause}: already shutting down");
            return false;
        }

        info!("🛑 Received {cause}, shutting down gracefully");
        self.notify_operator(&format!(
            "🔴 Бот останавливается...\nПричина: {}\nВремя: {}",
            cause,
            chrono::Local::now().format("%H:%M:%S")
        ))
        .await;

        if let Err(e) = self.store.save(ShutdownReason::Graceful) {
            error!("Failed to save state: {e}");
        }

        self.shutdown_tx.send_replace(true);
        info!("Graceful shutdown complete");
        true
    }

    /// Listen for SIGINT/SIGTERM in the background.
    #[cfg(unix)]
    pub fn install_signal_handlers(self: &Arc<Self>) -> Result<(), String> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())
            .map_err(|e| format!("Failed to install SIGTERM handler: {e}"))?;
        let mut interrupt = signal(SignalKind::interrupt())
            .map_err(|e| format!("Failed to install SIGINT handler: {e}"))?;

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let cause = tokio::select! {
                    Some(()) = terminate.recv() => "SIGTERM",
                    Some(()) = interrupt.recv() => "SIGINT",
                    else => break,
                };
                supervisor.shutdown(cause).await;
            }
        });

        info!("Signal handlers installed");
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn install_signal_handlers(self: &Arc<Self>) -> Result<(), String> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                supervisor.shutdown("Ctrl-C").await;
            }
        });
        warn!("Only Ctrl-C is supported on this platform");
        Ok(())
    }

    /// Probe the messaging connection. Never fails.
    pub async fn health_check(&self) -> bool {
        match self.messenger.ping().await {
            Ok(username) => {
                debug!("Health check ok (@{})", username);
                true
            }
            Err(e) => {
                error!("Health check failed: {e}");
                false
            }
        }
    }

    /// Drive the run loop until graceful shutdown or until the restart limit.
    ///
    /// `run_once` is called for every (re)start. It should return `Ok` once
    /// the given [`ShutdownSignal`] fires; returning at any other time, with
    /// an error, or by panicking counts as a fatal failure.
    pub async fn run<F, Fut>(&self, mut run_once: F) -> Exit
    where
        F: FnMut(ShutdownSignal) -> Fut,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let mut restarts: u32 = 0;

        loop {
            if self.is_shutting_down() {
                return Exit::Graceful;
            }

            let started = Instant::now();
            let result = tokio::spawn(run_once(self.shutdown_signal())).await;

            if self.is_shutting_down() {
                info!("Run loop stopped");
                return Exit::Graceful;
            }

            let failure = match result {
                Ok(Ok(())) => "run loop stopped unexpectedly".to_string(),
                Ok(Err(e)) => e,
                Err(e) => format!("run loop panicked: {e}"),
            };
            error!("💥 Fatal error: {failure}");

            if let Err(e) = self.store.save(ShutdownReason::Interrupted) {
                error!("Failed to save state: {e}");
            }

            if started.elapsed() >= self.config.stable_after {
                restarts = 0;
            }

            if restarts >= self.config.max_restarts {
                error!("Restart limit ({}) reached, giving up", self.config.max_restarts);
                self.notify_operator(&format!(
                    "⛔ Бот остановлен: достигнут лимит перезапусков ({}).\n\
                     Последняя ошибка: {}\nТребуется ручное вмешательство.",
                    self.config.max_restarts, failure
                ))
                .await;
                return Exit::RestartLimit;
            }

            restarts += 1;
            warn!(
                "Restarting in {}s (attempt {}/{})",
                self.config.backoff.as_secs(),
                restarts,
                self.config.max_restarts
            );

            let mut signal = self.shutdown_signal();
            tokio::select! {
                _ = tokio::time::sleep(self.config.backoff) => {}
                _ = signal.requested() => return Exit::Graceful,
            }

            self.notify_operator(&format!(
                "🔄 Перезапуск {}/{}\nОшибка: {}",
                restarts, self.config.max_restarts, failure
            ))
            .await;
        }
    }
}

//! Interrupt handling
//!
//! A [`ShutdownCoordinator`] is flipped once by the signal listener. The run
//! checks it at stage boundaries and races its blocking waits against
//! [`ShutdownCoordinator::cancelled`]. A second interrupt exits at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Shared cancellation signal
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    is_shutting_down: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            is_shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a receiver for shutdown signals
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Check if shutdown was requested
    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }

    /// Request shutdown; later calls are no-ops
    pub fn shutdown(&self) {
        self.raise();
    }

    /// Returns false when shutdown was already requested
    fn raise(&self) -> bool {
        if self.is_shutting_down.swap(true, Ordering::SeqCst) {
            return false;
        }

        info!("Interrupt received, finishing current step and cleaning up");
        let _ = self.shutdown_tx.send(true);
        true
    }

    /// Resolves once shutdown was requested; never resolves otherwise
    pub async fn cancelled(&self) {
        let mut rx = self.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// React to one interrupt: the first requests shutdown, any later one
    /// (or one arriving after shutdown was already requested) forces exit
    pub fn on_signal(&self) -> SignalAction {
        if self.raise() {
            SignalAction::Shutdown
        } else {
            SignalAction::ForceExit
        }
    }

    /// Handle SIGINT and SIGTERM (Ctrl+C elsewhere) until a second one forces exit
    pub async fn handle_signals(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) = match (
                signal(SignalKind::terminate()),
                signal(SignalKind::interrupt()),
            ) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Failed to register signal handlers: {}", e);
                    return;
                }
            };

            loop {
                let received = tokio::select! {
                    r = sigterm.recv() => r.map(|_| "SIGTERM"),
                    r = sigint.recv() => r.map(|_| "SIGINT"),
                };
                let Some(name) = received else {
                    return;
                };
                info!("Received {}", name);
                if self.on_signal() == SignalAction::ForceExit {
                    force_exit();
                }
            }
        }

        #[cfg(not(unix))]
        {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to register ctrl-c handler: {}", e);
                    return;
                }
                info!("Received Ctrl+C");
                if self.on_signal() == SignalAction::ForceExit {
                    force_exit();
                }
            }
        }
    }

    /// Spawn the signal listener in the background
    pub fn listen(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.handle_signals().await })
    }
}

/// What an interrupt leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Stop at the next stage boundary and clean up
    Shutdown,
    /// Leave immediately, skipping cleanup
    ForceExit,
}

fn force_exit() -> ! {
    warn!("Second interrupt received, exiting without cleanup; created resources may remain");
    std::process::exit(130)
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

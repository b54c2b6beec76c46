use crate::errors::FatalError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Why the process is stopping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM
    Signal,
    /// A component reported a failure it cannot recover from
    Requested(String),
}

/// Coordinates graceful shutdown between signal handling, request
/// handlers and the server loop.
///
/// The first trigger wins; later ones are ignored.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    tx: broadcast::Sender<()>,
    shutdown_initiated: Arc<AtomicBool>,
    reason: Arc<OnceLock<ShutdownReason>>,
}

impl ShutdownCoordinator {
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (tx, rx) = broadcast::channel(1);
        let coordinator = Self {
            tx,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            reason: Arc::new(OnceLock::new()),
        };
        (coordinator, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// The trigger that started shutdown, if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().cloned()
    }

    /// Start shutdown on behalf of a signal.
    pub fn shutdown(&self) {
        self.initiate(ShutdownReason::Signal);
    }

    /// Start shutdown because of an unrecoverable failure.
    pub fn request_shutdown(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(reason = %reason, "Shutdown requested");
        self.initiate(ShutdownReason::Requested(reason));
    }

    fn initiate(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            self.shutdown_initiated.store(true, Ordering::SeqCst);
            info!("Initiating graceful shutdown");
            let _ = self.tx.send(());
        }
    }

    /// Resolve once shutdown has been initiated by any trigger.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutting_down() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Resolve on SIGINT, SIGTERM or a programmatic request, whichever
    /// comes first. Signals mark the reason as [`ShutdownReason::Signal`].
    pub async fn wait_for_signal(&self) {
        tokio::select! {
            _ = ctrl_c() => {
                info!("Received SIGINT (Ctrl+C)");
                self.shutdown();
            },
            _ = terminate() => {
                info!("Received SIGTERM");
                self.shutdown();
            },
            _ = self.wait() => {},
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new().0
    }
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Middleware forwarding [`FatalError`] responses to the coordinator.
///
/// ```ignore
/// let app = router.layer(axum::middleware::from_fn_with_state(
///     coordinator.clone(),
///     escalate_fatal_errors,
/// ));
/// ```
pub async fn escalate_fatal_errors(
    State(coordinator): State<ShutdownCoordinator>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if let Some(fatal) = response.extensions().get::<FatalError>() {
        coordinator.request_shutdown(fatal.reason.clone());
    }

    response
}

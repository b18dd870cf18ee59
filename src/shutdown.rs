use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::Notify;
use tracing::{info, warn};

/// Whether the process is still running normally.
///
/// Cloned into every component that needs to notice an external interrupt. Once triggered it stays
/// triggered.
#[derive(Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` until [`Shutdown::trigger`] is called.
    pub fn is_ok(&self) -> bool {
        !self.triggered.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Resolves once the shutdown has been triggered, immediately if it already was.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // register before checking the flag so a trigger in between isn't missed
        notified.as_mut().enable();
        if !self.is_ok() {
            return;
        }
        notified.await;
    }
}

/// Triggers `shutdown` when the process receives an interrupt signal.
pub fn install_signal_handler(shutdown: Shutdown) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt signal received, shutting down");
                shutdown.trigger();
            }
            Err(e) => warn!("couldn't listen for the interrupt signal: {}", e),
        }
    });
}

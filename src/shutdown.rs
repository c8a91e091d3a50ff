use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received. Services take child tokens of it.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn({
        let token = token.clone();
        async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
            token.cancel();
        }
    });

    Ok(token)
}

/// The loops of one running service.
pub struct ServiceHandle {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl ServiceHandle {
    pub fn new(token: CancellationToken, handles: Vec<JoinHandle<()>>) -> Self {
        ServiceHandle { token, handles }
    }

    pub fn is_stopped(&self) -> bool {
        self.handles.iter().all(|h| h.is_finished())
    }

    /// Cancel every loop and wait for each to exit.
    pub async fn stop(self) {
        self.token.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "service loop ended abnormally");
            }
        }
    }
}

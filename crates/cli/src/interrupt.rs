//! Ctrl-C handling for long-running commands.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels its token on the first Ctrl-C received while it is alive.
///
/// Create one before the first await a command makes and keep it until the
/// command is done, so a Ctrl-C at any point in between is seen.
pub(crate) struct Interrupt {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl Interrupt {
    pub(crate) fn listen() -> Self {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupted");
                trigger.cancel();
            }
        });
        Self { token, listener }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Interrupt {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Run `fut` unless `cancel` fires first; `None` means it was abandoned
pub(crate) async fn interruptible<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

use std::{future::Future, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::error::Cancelled;

/// Sleeps for `duration` unless `token` is cancelled first.
pub async fn pause(duration: Duration, token: &CancellationToken) -> Result<(), Cancelled> {
    tokio::select! {
        _ = token.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Drives `fut` to completion, abandoning it if `token` is cancelled.
pub async fn guard<F: Future>(fut: F, token: &CancellationToken) -> Result<F::Output, Cancelled> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Cancelled),
        out = fut => Ok(out),
    }
}

/// Cancels `token` on Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("quit requested, abandoning in-flight work");
            token.cancel();
        }
    });
}

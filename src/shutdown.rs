// src/shutdown.rs
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel the returned token on the first SIGINT or SIGTERM.
///
/// The refresh loop watches this token; nothing else needs to know about signals.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "cannot install signal handlers; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
                token_clone.cancel();
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, stopping"),
            _ = sigint.recv() => info!("received SIGINT, stopping"),
        }
        token_clone.cancel();
    });

    token
}

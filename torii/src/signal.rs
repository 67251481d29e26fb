#[cfg(target_family = "unix")]
use tokio::signal::unix::SignalKind;

/// Resolves on Ctrl+C, or on SIGTERM/SIGQUIT on unix
pub async fn shutdown() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(?error, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(target_family = "unix")]
    let second_signal = async {
        let (Ok(mut terminate), Ok(mut quit)) = (
            tokio::signal::unix::signal(SignalKind::terminate()),
            tokio::signal::unix::signal(SignalKind::quit()),
        ) else {
            error!("failed to install unix signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = terminate.recv() => (),
            _ = quit.recv() => (),
        }
    };
    #[cfg(not(target_family = "unix"))]
    let second_signal = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => (),
        () = second_signal => (),
    }

    info!("shutdown signal received");
}

//! HTTP server lifecycle.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::router::api_router;
use crate::core_state::CoreState;

/// Bind `addr` and serve the API until `shutdown` resolves.
pub async fn serve<F>(core: Arc<CoreState>, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "API server listening");

    axum::serve(listener, api_router(core))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_state::testing::state_with;
    use crate::pipeline::insights::MockLlmClient;

    #[tokio::test]
    async fn serves_until_shutdown_signal() {
        let dir = tempfile::tempdir().unwrap();
        let core = Arc::new(state_with(dir.path(), MockLlmClient::new("{}")));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = tokio::spawn(serve(core, addr, async move {
            let _ = rx.await;
        }));

        let _ = tx.send(());
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}

use crate::{create_router, AppState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

pub struct Server {
    state: AppState,
    host: String,
    port: u16,
}

impl Server {
    pub fn new(state: AppState, host: impl Into<String>, port: u16) -> Self {
        Self {
            state,
            host: host.into(),
            port,
        }
    }

    pub async fn run(self) -> std::io::Result<()> {
        let router = create_router(self.state);

        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        let addr = listener.local_addr()?;

        info!("Server listening on http://{}", addr);
        info!("Reports available:");
        info!("  GET /{{platform}}/resumo - Per-account summary CSV");
        info!("  GET /geral - All insights CSV");
        info!("  GET /geral/resumo - Per-platform totals CSV");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}

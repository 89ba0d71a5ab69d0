//! Server execution logic.

use std::{
    future::{Future, IntoFuture},
    path::Path,
    sync::Arc,
};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    config::ServerConfig,
    domain::{ActiveUsers, UserFactory},
    usecase::MatchMaker,
};

use super::{
    handler::{get_stats, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Chat roulette server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerConfig::default());
/// server.run().await?;
/// ```
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bind to the configured address and serve until Ctrl+C / SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind, if serving fails, or if
    /// the match maker stops.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Chat server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/chat", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` completes.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (registry, mut match_maker) = MatchMaker::spawn();

        let app_state = Arc::new(AppState {
            registry: Arc::new(registry),
            active_users: Arc::new(ActiveUsers::new()),
            user_factory: UserFactory::default(),
            chat_config: self.config.chat.clone(),
            ping_interval: self.config.ping_interval,
        });
        let app = router(app_state, &self.config.static_dir);

        let server = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .into_future();

        tokio::select! {
            result = server => {
                match_maker.abort();
                result?;
                Ok(())
            }
            result = &mut match_maker => {
                // The router holds a handle, so the match maker only stops on failure.
                match result {
                    Ok(Ok(())) => Err("match maker stopped unexpectedly".into()),
                    Ok(Err(e)) => {
                        tracing::error!("Match maker failed: {}", e);
                        Err(e.into())
                    }
                    Err(e) => {
                        tracing::error!("Match maker task panicked: {}", e);
                        Err(e.into())
                    }
                }
            }
        }
    }
}

fn router(app_state: Arc<AppState>, static_dir: &Path) -> Router {
    let index = static_dir.join("index.html");

    Router::new()
        // WebSocket エンドポイント
        .route("/chat", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .route("/api/stats", get(get_stats))
        // 静的ファイル
        .fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

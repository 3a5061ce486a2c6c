//! HTTP server assembly.

use std::io;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::message::MessageStore;
use crate::observability::{Logger, Severity};

use super::config::HttpConfig;
use super::routes::{api_routes, AppState};

/// The assembled service: message API under `/api`, static front-end at `/`.
pub struct HttpServer {
    config: HttpConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(store: MessageStore, config: HttpConfig) -> Self {
        let state = Arc::new(AppState { store });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let router = Router::new()
            .nest("/api", api_routes(state))
            .fallback_service(ServeDir::new(&config.static_dir))
            .layer(cors);

        Self { config, router }
    }

    /// The router, exposed for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve until the process is stopped.
    pub async fn serve(self) -> io::Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;

        Logger::log(
            Severity::Info,
            "server_started",
            &[
                ("addr", &addr),
                ("static_dir", &self.config.static_dir.display().to_string()),
            ],
        );

        axum::serve(listener, self.router).await
    }
}

//! Web服务器

use crate::handlers::{self, AppState};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

/// 创建API路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::api_root))
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/reports",
            post(handlers::ingest_report).get(handlers::list_reports),
        )
        .route("/api/v1/reports/orphaned", get(handlers::orphaned_results))
        .route("/api/v1/reports/:id", get(handlers::get_report))
        .route("/api/v1/reports/:id/analyze", post(handlers::analyze_report))
        .route("/api/v1/reports/:id/file-url", get(handlers::report_file_url))
        .route("/api/v1/notifications", get(handlers::list_notifications))
        .route(
            "/api/v1/notifications/unread-count",
            get(handlers::unread_count),
        )
        .route(
            "/api/v1/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(handlers::mark_all_notifications_read),
        )
        .with_state(state)
        .layer(axum::middleware::from_fn(log_requests))
}

async fn log_requests(request: Request, next: Next) -> Response {
    info!("API request: {} {}", request.method(), request.uri());
    let response = next.run(request).await;
    info!("API response: {}", response.status());
    response
}

/// API服务器
pub struct WebServer {
    app: Router,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        let app = create_router(state).layer(CorsLayer::permissive());
        Self { app }
    }

    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        info!("Starting API server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}

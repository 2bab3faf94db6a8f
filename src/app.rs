use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    http::{Request, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::field::Empty;

use crate::state::AppState;
use crate::{auth, tours};

async fn health() -> &'static str {
    "ok"
}

/// Users and tours APIs under `/api/v1`, with request tracing and permissive CORS.
pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(tours::router())
        .route("/health", get(health));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    tracing::info_span!(
                        "api_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        status = Empty,
                        latency_ms = Empty,
                    )
                })
                .on_response(
                    |res: &Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", status.as_u16());
                        span.record("latency_ms", latency.as_millis() as u64);
                        if status.is_server_error() {
                            tracing::error!(%status, "request finished with server error");
                        } else {
                            tracing::debug!(%status, "request finished");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into());
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "tours api listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod handlers;

use crate::adapters::http::HttpTransport;
use crate::config::RelayConfig;
use crate::core::dispatcher::{BatchDispatcher, DispatchSettings};
use crate::utils::error::{RelayError, Result};
use axum::{extract::DefaultBodyLimit, routing, Router};
use std::convert::Infallible;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;

pub use handlers::AppState;

pub fn add_routes(
    router: Router,
    state: AppState,
    max_body_size: usize,
    concurrency_limit: usize,
) -> Router {
    router
        .route("/", routing::get(index))
        .route("/_readiness", routing::get(index))
        .route("/_liveness", routing::get(index))
        .route(
            "/api",
            routing::post(handlers::post_events)
                .with_state(state)
                .layer::<_, Infallible>(ConcurrencyLimitLayer::new(concurrency_limit))
                .layer(DefaultBodyLimit::max(max_body_size)),
        )
}

pub async fn index() -> &'static str {
    "contact-relay"
}

pub fn app_state(config: &RelayConfig) -> Result<AppState> {
    let transport = HttpTransport::from_config(&config.dispatch)?;
    let dispatcher =
        BatchDispatcher::new(transport).with_settings(DispatchSettings::from(&config.dispatch));

    Ok(AppState {
        dispatcher: Arc::new(dispatcher),
        default_batch_size: config.dispatch.batch_size,
    })
}

pub fn router(config: &RelayConfig) -> Result<Router> {
    let state = app_state(config)?;
    Ok(add_routes(
        Router::new(),
        state,
        config.server.max_body_size,
        config.server.concurrency_limit,
    ))
}

/// Binds `server.bind` and serves until Ctrl-C.
pub async fn serve(config: &RelayConfig) -> Result<()> {
    let app = router(config)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| RelayError::ServerError {
            message: format!("failed to bind {}: {}", config.server.bind, e),
        })?;

    tracing::info!("🌐 Relay listening on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::ServerError {
            message: e.to_string(),
        })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down relay");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn index() {
        let app = router(&RelayConfig::default()).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"contact-relay");
    }

    #[tokio::test]
    async fn liveness() {
        let app = router(&RelayConfig::default()).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_liveness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}

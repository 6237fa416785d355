//! ChowHub Storefront library.
//!
//! Hosts one cart per browsing session and renders the consumer pages. The
//! binary in `main.rs` only loads configuration, sets up telemetry, and
//! serves [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, middleware::from_fn, middleware::from_fn_with_state, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the full storefront router.
///
/// Page and cart routes run behind [`middleware::attach_cart`]; health
/// routes do not.
pub fn app(state: AppState) -> Router {
    let session_layer =
        middleware::create_session_layer(state.config(), state.sessions().clone());

    let pages = routes::routes().route_layer(from_fn_with_state(
        state.clone(),
        middleware::attach_cart,
    ));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(pages)
        .layer(session_layer)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        cart_session_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the hosted backend cannot serve the
/// menu.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().list_meals().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Readiness check failed: {e}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use secrecy::SecretString;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{BackendConfig, CartConfig, StorefrontConfig};
    use crate::middleware::SessionCart;

    fn test_state() -> AppState {
        state_with(CartConfig::default())
    }

    fn state_with(cart: CartConfig) -> AppState {
        AppState::new(StorefrontConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig {
                url: Url::parse("http://127.0.0.1:9").unwrap(),
                anon_key: SecretString::from("k"),
            },
            cart,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_skips_cart_middleware() {
        let state = test_state();
        let response = app(state.clone())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        state.carts().run_pending_tasks();
        assert!(state.carts().is_empty());
    }

    #[tokio::test]
    async fn test_cart_count_attaches_session_cart() {
        let state = test_state();
        let response = app(state.clone())
            .oneshot(Request::get("/cart/count").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("set-cookie"));
        state.carts().run_pending_tasks();
        assert_eq!(state.carts().len(), 1);
    }

    /// The `chowhub_session=<id>` pair from a response, if one was set.
    fn session_cookie(response: &axum::http::Response<Body>) -> Option<String> {
        response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("chowhub_session="))
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_active_session_outlives_idle_timeout() {
        let state = state_with(CartConfig {
            idle_timeout: Duration::from_secs(2),
            ..CartConfig::default()
        });
        let router = app(state.clone());

        let first = router
            .clone()
            .oneshot(Request::get("/cart/count").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = session_cookie(&first).unwrap();

        // Keep the session busy for well past one idle timeout.
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(700)).await;
            let response = router
                .clone()
                .oneshot(
                    Request::get("/cart/count")
                        .header("cookie", &cookie)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                session_cookie(&response).as_deref(),
                Some(cookie.as_str()),
                "session was replaced while in use"
            );
        }

        state.carts().run_pending_tasks();
        assert_eq!(state.carts().len(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_session_is_purged() {
        let state = state_with(CartConfig {
            idle_timeout: Duration::from_millis(200),
            ..CartConfig::default()
        });
        let response = app(state.clone())
            .oneshot(Request::get("/cart/count").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(session_cookie(&response).is_some());

        tokio::time::sleep(Duration::from_millis(500)).await;
        state.sessions().run_pending_tasks().await;
        state.carts().run_pending_tasks();

        assert!(state.sessions().is_empty());
        assert!(state.carts().is_empty());
    }

    #[tokio::test]
    async fn test_unwired_route_fails_fast() {
        let router: Router = Router::new().route(
            "/",
            get(|SessionCart(cart): SessionCart| async move { cart.revision().to_string() }),
        );

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

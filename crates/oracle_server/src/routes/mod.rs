//! Route modules for the oracle server
//!
//! This module contains endpoint group-specific routers:
//! - health: Health check and readiness endpoints
//! - reports: Baseline report registration and lookup
//! - scenarios: Scenario creation, polling, cancellation and report documents

pub mod health;
pub mod reports;
pub mod scenarios;

use axum::Router;
use oracle_pipeline::ScenarioService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Scenario pipeline
    pub service: ScenarioService,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: ScenarioService) -> Self {
        Self {
            service,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the main application router by merging all route modules
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::routes())
        .merge(reports::routes())
        .merge(scenarios::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Fixtures shared by the route tests
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use oracle_agents::{CritiqueStage, DebateStage, RetryPolicy, ScriptedProvider};
    use oracle_pipeline::PipelineConfig;
    use oracle_sim::SimulationConfig;
    use std::sync::Arc;
    use std::time::Duration;

    pub const APPROVE: &str = r#"{"verdict":"approve","comparative_analysis":["Consistent with history"]}"#;

    /// State whose providers answer from scripts
    pub fn scripted_state(critic: ScriptedProvider) -> AppState {
        let retry = RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            multiplier: 1.0,
            attempt_timeout: Duration::from_secs(10),
        };
        let service = ScenarioService::new(
            CritiqueStage::new(Arc::new(critic), retry.clone()),
            DebateStage::new(
                Arc::new(ScriptedProvider::always("Upside is clear.\nRECOMMENDATION: BUY")),
                Arc::new(ScriptedProvider::always("Fair enough.\nRECOMMENDATION: BUY")),
                retry,
                4,
            ),
            PipelineConfig {
                simulation: SimulationConfig::builder()
                    .trials(1_000)
                    .seed(42)
                    .build()
                    .unwrap(),
                ..PipelineConfig::default()
            },
        );
        AppState::new(service)
    }

    pub fn default_state() -> AppState {
        scripted_state(ScriptedProvider::always(APPROVE))
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: impl Into<String>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.into()))
            .unwrap()
    }

    pub async fn json_body(response: Response<Body>) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_merges_all_route_groups() {
        let router = build_router(default_state());

        let response = router.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(get("/api/v1/reports/00000000-0000-0000-0000-000000000000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(get("/api/v1/scenarios/00000000-0000-0000-0000-000000000000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let router = build_router(default_state());
        let response = router.oneshot(get("/unknown/path")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_headers_are_present() {
        let router = build_router(default_state());
        let request = axum::http::Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:3000")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_app_state_uptime() {
        let state = default_state();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(state.start_time.elapsed().as_millis() >= 10);
    }
}

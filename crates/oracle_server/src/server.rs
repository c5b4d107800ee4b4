//! Server startup and binding
//!
//! Provides functionality to start the Axum server with configurable host/port
//! and to shut it down gracefully, cancelling scenario runs still in flight.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use oracle_pipeline::ScenarioService;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::routes::{self, AppState};

/// Reason recorded on runs interrupted by shutdown
pub const SHUTDOWN_REASON: &str = "server shutting down";

/// Server instance that can be started
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Scenario pipeline shared with the handlers
    service: ScenarioService,
    /// The built router
    router: Router,
}

impl Server {
    /// Create a new server instance around an already wired service
    pub fn new(config: ServerConfig, service: ScenarioService) -> Self {
        let router = routes::build_router(AppState::new(service.clone()));

        Self {
            config,
            service,
            router,
        }
    }

    /// Get the socket address the server will bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address '{}': {}", self.config.socket_addr(), e),
            )
        })
    }

    /// Run the server until Ctrl-C
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.run_with_listener(listener, ctrl_c()).await
    }

    /// Run the server on a specific listener until `shutdown` resolves
    ///
    /// Once `shutdown` fires, active scenario runs are cancelled and in-flight
    /// requests get `shutdown_timeout_secs` to drain.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!("Server listening on {}", addr);

        let service = self.service.clone();
        let drain = Duration::from_secs(self.config.shutdown_timeout_secs);
        let (stopped_tx, stopped_rx) = tokio::sync::oneshot::channel::<()>();

        let graceful = async move {
            shutdown.await;
            let cancelled = service.cancel_all(SHUTDOWN_REASON).await;
            tracing::info!(cancelled, "Shutdown requested");
            let _ = stopped_tx.send(());
        };

        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(graceful)
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => result,
            _ = async {
                let _ = stopped_rx.await;
                tokio::time::sleep(drain).await;
            } => {
                tracing::warn!(timeout_secs = drain.as_secs(), "Connections did not drain in time");
                Ok(())
            }
        }
    }

    /// Create a test server and return the bound address
    ///
    /// This binds to port 0 to get a random available port, starts the server
    /// in a background task, and returns the actual bound address.
    #[cfg(test)]
    pub async fn spawn_test_server(
        config: ServerConfig,
        service: ScenarioService,
    ) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Self::new(config, service);
        let handle = tokio::spawn(async move {
            server
                .run_with_listener(listener, std::future::pending())
                .await
                .ok();
        });

        // Give the server a moment to start
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        (addr, handle)
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::default_state;
    use oracle_core::types::FinancialReport;
    use reqwest::StatusCode;

    fn test_service() -> ScenarioService {
        default_state().service
    }

    #[test]
    fn test_server_socket_addr() {
        let mut config = ServerConfig::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;

        let server = Server::new(config, test_service());
        assert_eq!(server.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_invalid_host_is_an_error() {
        let mut config = ServerConfig::default();
        config.host = "not a host".to_string();

        let server = Server::new(config, test_service());
        assert!(server.socket_addr().is_err());
    }

    #[tokio::test]
    async fn test_server_health_endpoint() {
        let (addr, handle) = Server::spawn_test_server(ServerConfig::default(), test_service()).await;

        let response = reqwest::Client::new()
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");

        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_server_scenario_round_trip_over_http() {
        let (addr, handle) = Server::spawn_test_server(ServerConfig::default(), test_service()).await;
        let client = reqwest::Client::new();

        let registered: serde_json::Value = client
            .post(format!("http://{}/api/v1/reports", addr))
            .json(&FinancialReport::sample())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let report_id = registered["id"].as_str().unwrap().to_string();

        let response = client
            .post(format!("http://{}/api/v1/scenarios", addr))
            .json(&serde_json::json!({
                "report_id": report_id,
                "revenue_growth_delta_bps": 150,
                "opex_delta_bps": 0,
                "discount_rate_delta_bps": 25,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let created: serde_json::Value = response.json().await.unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let deadline = std::time::Instant::now() + Duration::from_secs(30);
        let status = loop {
            let snapshot: serde_json::Value = client
                .get(format!("http://{}/api/v1/scenarios/{}/status", addr, id))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if snapshot["status"] == "COMPLETED" || snapshot["status"] == "FAILED" {
                break snapshot;
            }
            assert!(std::time::Instant::now() < deadline, "scenario never finished");
            tokio::time::sleep(Duration::from_millis(10)).await;
        };
        assert_eq!(status["status"], "COMPLETED");
        assert_eq!(status["progress"], 100);

        handle.abort();
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = Server::new(ServerConfig::default(), test_service());

        let handle = tokio::spawn(async move {
            server
                .run_with_listener(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router delegating every path to the gateway pipeline
//! - Wire up middleware (tracing)
//! - Apply route table reloads received from the config watcher
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, GatewayConfig};
use crate::http::gateway::Gateway;
use crate::observability::{LogSink, TracingSink};

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    gateway: Arc<Gateway>,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server logging access entries through `tracing`.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: GatewayConfig, sink: Arc<dyn LogSink>) -> Result<Self, ConfigError> {
        let gateway = Arc::new(Gateway::from_config(&config, sink)?);
        let router = Self::build_router(gateway.clone());
        Ok(Self {
            router,
            gateway,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(gateway: Arc<Gateway>) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(gateway)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving through something other than [`run`](Self::run).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.gateway.routes().snapshot().len(),
            "HTTP server starting"
        );

        let gateway = self.gateway.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => {
                        let Some(config) = update else { break };
                        if let Err(e) = gateway.reload(&config) {
                            tracing::error!(error = %e, "Rejected route table reload, keeping current routes");
                        }
                    }
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn gateway_handler(State(gateway): State<Arc<Gateway>>, request: Request<Body>) -> Response {
    gateway.handle(request).await
}

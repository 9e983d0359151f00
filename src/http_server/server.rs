//! # HTTP Server
//!
//! Main HTTP server combining the health and query routers, plus the
//! background sweep that evicts idle rate-limit buckets.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::config::HttpServerConfig;
use super::routes::{health_routes, query_routes};
use crate::app::App;
use crate::config::RateLimitSettings;
use crate::pipeline::QueryPipeline;
use crate::ratelimit::RateLimiter;

/// HTTP server for the query pipeline
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
    limiter: Arc<RateLimiter>,
    sweep: RateLimitSettings,
}

impl HttpServer {
    /// Create a server from the application's shared services
    pub fn new(app: &App) -> Self {
        let config = app.config.server.clone();
        let router = build_router(app.pipeline.clone(), &config);
        Self {
            config,
            router,
            limiter: app.limiter.clone(),
            sweep: app.config.rate_limit.clone(),
        }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.address()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server and run until ctrl-c
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self.config.bind_addr()?;

        let listener = TcpListener::bind(addr).await?;
        let sweeper = spawn_idle_sweep(
            self.limiter.clone(),
            self.sweep.sweep_interval(),
            self.sweep.idle_ttl(),
        );

        info!(
            %addr,
            cors_origins = ?self.config.cors_origins,
            "docpilot listening"
        );

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();
        served
    }
}

/// Build the combined router with all endpoints
pub fn build_router(pipeline: Arc<QueryPipeline>, config: &HttpServerConfig) -> Router {
    Router::new()
        .merge(health_routes(pipeline.clone()))
        .nest("/api", query_routes(pipeline))
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer())
}

/// Periodically drops buckets idle for longer than `idle_ttl`
pub fn spawn_idle_sweep(
    limiter: Arc<RateLimiter>,
    every: Duration,
    idle_ttl: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = limiter.evict_idle(idle_ttl);
            if evicted > 0 {
                debug!(evicted, remaining = limiter.len(), "evicted idle rate buckets");
            }
        }
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}

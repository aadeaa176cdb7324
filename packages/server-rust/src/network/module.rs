//! Network module with deferred startup lifecycle.
//!
//! `new()` creates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use soapdispatch_core::Dispatcher;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    dispatch_handler, health_handler, help_handler, liveness_handler, readiness_handler,
    wsdl_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;

/// Assembles routes and middleware around `state`.
///
/// Routes:
/// - `GET /` -- WSDL; `POST /` -- dispatch
/// - `GET /{operation}` -- sample request (`?response` for the response);
///   `POST /{operation}` -- dispatch
/// - `GET /health`, `/health/live`, `/health/ready`
#[must_use]
pub fn build_app(state: AppState, config: &NetworkConfig) -> Router {
    Router::new()
        .route("/", get(wsdl_handler).post(dispatch_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/{operation}", get(help_handler).post(dispatch_handler))
        .layer(build_http_layers(config))
        .with_state(state)
}

/// Owns the HTTP server lifecycle for one dispatcher.
pub struct NetworkModule {
    config: NetworkConfig,
    dispatcher: Arc<Dispatcher>,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            dispatcher,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    #[must_use]
    pub fn build_router(&self) -> Router {
        build_app(self.state(), &self.config)
    }

    fn state(&self) -> AppState {
        AppState {
            dispatcher: Arc::clone(&self.dispatcher),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        }
    }

    /// Binds the TCP listener and returns the bound port (OS-assigned for 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then drains in-flight SOAP calls
    /// for up to `drain_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server hits a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .expect("start() must be called before serve()");
        let router = self.build_router();

        self.shutdown.set_ready();
        info!(service = %self.dispatcher.config().name, "serving SOAP over HTTP");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.shutdown.trigger_shutdown();
        if self.shutdown.wait_for_drain(self.config.drain_timeout).await {
            info!("All in-flight calls drained");
        } else {
            warn!(
                in_flight = self.shutdown.in_flight_count(),
                "Drain timeout expired with in-flight calls remaining"
            );
        }
        Ok(())
    }
}

//! HTTP handler definitions for the SOAP server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports the handler functions used by the router.

pub mod health;
pub mod soap;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use soap::{dispatch_handler, help_handler, wsdl_handler};

use std::sync::Arc;
use std::time::Instant;

use soapdispatch_core::Dispatcher;

use super::{NetworkConfig, ShutdownController};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Operation registry and dispatch entry points.
    pub dispatcher: Arc<Dispatcher>,
    /// Health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    AppState {
        dispatcher: Arc::new(crate::service::sample_dispatcher(
            crate::service::sample_config(),
        )),
        shutdown: Arc::new(ShutdownController::new()),
        config: Arc::new(NetworkConfig::default()),
        start_time: Instant::now(),
    }
}

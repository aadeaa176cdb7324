//! SOAP endpoint handlers: WSDL, per-operation samples, and dispatch.

use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use soapdispatch_core::HelpError;
use tracing::{debug, error};

use super::AppState;

const TEXT_XML: &str = "text/xml; charset=utf-8";

fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, TEXT_XML)], body).into_response()
}

fn internal_error(message: String) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

/// `GET /` -- the WSDL for every registered operation.
pub async fn wsdl_handler(State(state): State<AppState>) -> Response {
    match state.dispatcher.describe() {
        Ok(wsdl) => xml_response(wsdl),
        Err(err) => {
            error!(error = %err, "failed to render WSDL");
            internal_error(err.to_string())
        }
    }
}

/// `GET /{operation}` -- sample request, or the sample response for any
/// query other than `request`.
pub async fn help_handler(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    match state.dispatcher.help(&operation) {
        Ok(help) => {
            if matches!(query.as_deref(), None | Some("" | "request")) {
                xml_response(help.request)
            } else {
                xml_response(help.response)
            }
        }
        Err(err @ HelpError::UnknownOperation(_)) => {
            debug!(operation = %operation, "help requested for unknown operation");
            (StatusCode::NOT_FOUND, err.to_string()).into_response()
        }
        Err(err) => {
            error!(operation = %operation, error = %err, "failed to render samples");
            internal_error(err.to_string())
        }
    }
}

/// `POST /` and `POST /{operation}` -- dispatch the envelope in the body.
///
/// Faults are ordinary 200 responses. The dispatcher runs synchronously, so
/// it is moved onto the blocking pool together with the in-flight guard.
pub async fn dispatch_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let guard = state.shutdown.in_flight_guard();
    let dispatcher = Arc::clone(&state.dispatcher);

    let result = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        dispatcher.dispatch_bytes(&body)
    })
    .await;

    match result {
        Ok(response) => xml_response(response),
        Err(err) => {
            error!(error = %err, "dispatch task failed");
            internal_error("dispatch task failed".to_string())
        }
    }
}

//! Gate responses.
//!
//! - Granted → 200 with the decision as JSON
//! - Denied → 403 with the decision as JSON
//! - No route → 404, store or check failure → 500, both as `{"error": ...}`

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::access::AccessError;
use crate::routing::RouteError;

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub granted: bool,
    pub route: String,
    pub path: String,
    pub account: String,
    pub parameters: BTreeMap<String, String>,
    pub request_id: String,
}

impl IntoResponse for GateDecision {
    fn into_response(self) -> Response {
        let status = if self.granted {
            StatusCode::OK
        } else {
            StatusCode::FORBIDDEN
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug)]
pub struct GateError {
    status: StatusCode,
    message: String,
}

impl GateError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody { error: self.message });
        (self.status, body).into_response()
    }
}

impl From<RouteError> for GateError {
    fn from(err: RouteError) -> Self {
        if err.is_not_found() {
            GateError::not_found(err.to_string())
        } else {
            GateError::internal(err.to_string())
        }
    }
}

impl From<AccessError> for GateError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Routing(e) => e.into(),
            other => GateError::internal(other.to_string()),
        }
    }
}

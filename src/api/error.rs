//! API error types and the error aggregation middleware
//!
//! Handlers fail with an [`ErrorReport`]: the ordered list of everything that
//! went wrong while serving the request. The report rides on the response
//! extensions until [`aggregate_errors`] turns it into the single error
//! response the caller sees.

use crate::ledger::LedgerError;
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Gateway error taxonomy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Malformed or missing input, invalid address or amount
    #[error("{0}")]
    Validation(String),
    /// The ledger already exists for this node
    #[error("{0}")]
    Conflict(String),
    /// Reported verbatim by the ledger or key store
    #[error("{0}")]
    Collaborator(String),
    /// The request body could not be read, usually because the caller went away
    #[error("{0}")]
    TransportArtifact(String),
}

impl GatewayError {
    /// Whether the caller can act on this error
    pub fn is_actionable(&self) -> bool {
        !matches!(self, GatewayError::TransportArtifact(_))
    }
}

impl From<LedgerError> for GatewayError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyExists => GatewayError::Conflict(err.to_string()),
            other => GatewayError::Collaborator(other.to_string()),
        }
    }
}

/// Errors raised while handling one request, in the order they were raised
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport(Vec<GatewayError>);

impl ErrorReport {
    pub fn new(errors: Vec<GatewayError>) -> Self {
        Self(errors)
    }

    pub fn errors(&self) -> &[GatewayError] {
        &self.0
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ErrorReport {}

impl From<GatewayError> for ErrorReport {
    fn from(err: GatewayError) -> Self {
        Self(vec![err])
    }
}

impl From<LedgerError> for ErrorReport {
    fn from(err: LedgerError) -> Self {
        GatewayError::from(err).into()
    }
}

impl IntoResponse for ErrorReport {
    fn into_response(self) -> Response {
        let mut response = StatusCode::BAD_REQUEST.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: Vec<String>,
}

/// Render the request's error report, if any, as one response
///
/// Transport artifacts are dropped. When nothing actionable is left the
/// response is a bare 400 without a body.
pub async fn aggregate_errors(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let mut response = next.run(request).await;
    let Some(ErrorReport(errors)) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };

    let (actionable, artifacts): (Vec<_>, Vec<_>) =
        errors.into_iter().partition(GatewayError::is_actionable);

    for artifact in &artifacts {
        debug!("{} {}: suppressed transport error: {}", method, uri, artifact);
    }

    if actionable.is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let messages: Vec<String> = actionable.iter().map(ToString::to_string).collect();
    warn!("{} {} rejected: {:?}", method, uri, messages);

    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: messages })).into_response()
}

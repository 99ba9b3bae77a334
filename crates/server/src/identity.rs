//! Request identity: trace IDs and the uploader name.
//!
//! There is no authentication here. The uploader is whatever a trusted
//! reverse proxy puts in the configured identity header.

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs. Longer values are truncated.
const MAX_TRACE_ID_LEN: usize = 128;

/// Maximum length for uploader names.
const MAX_UPLOADER_LEN: usize = 128;

/// Name recorded when no identity header is present.
pub const ANONYMOUS: &str = "anonymous";

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, dropping non-printable
    /// characters. Falls back to a fresh ID if nothing usable remains.
    pub fn from_client(value: &str) -> Self {
        let sanitized = sanitize(value, MAX_TRACE_ID_LEN);
        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who is making the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uploader(pub String);

impl Uploader {
    pub fn from_header(value: Option<&str>) -> Self {
        let name = value.map(|v| sanitize(v, MAX_UPLOADER_LEN)).unwrap_or_default();
        let name = name.trim();
        if name.is_empty() {
            Self(ANONYMOUS.to_string())
        } else {
            Self(name.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn sanitize(value: &str, max_len: usize) -> String {
    value
        .chars()
        .take(max_len)
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect()
}

/// Attach a [`TraceId`] and an [`Uploader`] to every request and run it in a
/// span carrying both.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let trace_id = req
        .headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new);
    let uploader = Uploader::from_header(
        req.headers()
            .get(state.config.server.identity_header.as_str())
            .and_then(|v| v.to_str().ok()),
    );

    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        user = %uploader.as_str()
    );
    req.extensions_mut().insert(trace_id);
    req.extensions_mut().insert(uploader);

    next.run(req).instrument(span).await
}

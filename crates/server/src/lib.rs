//! HTTP server for the depot app-distribution service.
//!
//! This crate provides:
//! - The transfer core (ingest with progress, ranged egress)
//! - Multipart upload with a Server-Sent Events progress stream
//! - Ranged, resumable downloads and external-URL redirects
//! - Project and version management endpoints
//! - Prometheus metrics and request identity middleware

pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod transfer;

pub use error::ApiError;
pub use identity::{TraceId, Uploader};
pub use routes::create_router;
pub use state::AppState;

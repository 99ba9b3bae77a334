//! Route configuration.

use crate::handlers;
use crate::handlers::uploads::MULTIPART_ALLOWANCE;
use crate::identity::identity_middleware;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.size_limit().saturating_add(MULTIPART_ALLOWANCE))
        .unwrap_or(usize::MAX);

    let api_routes = Router::new()
        // Health check (unauthenticated for load balancers and probes)
        .route("/api/health", get(handlers::health_check))
        // Transfers
        .route(
            "/api/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/download/{project_id}/{version_id}",
            get(handlers::download),
        )
        // Catalog management
        .route(
            "/api/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/api/projects/{project_id}",
            get(handlers::get_project).delete(handlers::delete_project),
        )
        .route(
            "/api/projects/{project_id}/versions/{version_id}",
            delete(handlers::delete_version),
        );

    let mut router = Router::new().merge(api_routes);

    // When enabled, restrict /metrics at the network level.
    if state.config.server.metrics_enabled {
        router = router.merge(Router::new().route("/metrics", get(metrics_handler)));
    }

    let cors = state
        .config
        .server
        .cors_origin
        .as_deref()
        .and_then(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .map(|origin| {
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers(Any)
        });

    // Order of execution: TraceLayer -> CORS -> identity -> handler
    let router = router.layer(middleware::from_fn_with_state(
        state.clone(),
        identity_middleware,
    ));
    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

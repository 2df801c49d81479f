use crate::{handlers, AppState};
use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Identity and directory
        .route("/", get(handlers::root))
        .route("/api", get(handlers::api_root))

        // Upstream lookups
        .route("/api/platforms", get(handlers::api_platforms))
        .route("/api/accounts", get(handlers::api_accounts))
        .route("/api/fields", get(handlers::api_fields))
        .route("/api/insights", get(handlers::api_insights))

        // Cross-platform reports; static segments win over `{platform}`
        .route("/platform", get(handlers::platform_list))
        .route("/geral", get(handlers::general_report))
        .route("/geral/resumo", get(handlers::general_summary))

        // Single platform
        .route("/{platform}", get(handlers::platform_detail))
        .route("/{platform}/resumo", get(handlers::platform_summary))

        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
}

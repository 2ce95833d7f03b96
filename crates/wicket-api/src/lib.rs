pub mod cookies;
pub mod error;
pub mod middleware;
pub mod routes;

use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, get_service, post},
    Json, Router,
};
use serde_json::json;
use std::path::Path;
use tower_http::services::ServeDir;
use wicket_core::AppState;

/// Full application router. With `web_dir` the exported admin UI is served
/// from disk; otherwise built-in HTML shells stand in for it. The admin gate
/// wraps every route and the fallback, and decides on the normalized path.
pub fn build_router(state: AppState, web_dir: Option<&Path>) -> Router {
    let admin = match web_dir {
        Some(dir) => {
            let files = get_service(ServeDir::new(dir));
            Router::new()
                .route("/admin", files.clone())
                .route("/admin/", files.clone())
                .route("/admin/{*path}", files)
        }
        None => Router::new()
            .route("/admin", get(routes::pages::admin_page))
            .route("/admin/", get(routes::pages::admin_page))
            .route("/admin/login", get(routes::pages::login_page))
            .route("/admin/login/", get(routes::pages::login_page))
            .route("/admin/{*path}", get(routes::pages::admin_page)),
    };

    let router = Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/session", get(routes::auth::session))
        .route("/api/auth/logout", post(routes::auth::logout))
        .merge(admin);

    let router = match web_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(from_fn_with_state(state.clone(), middleware::admin_gate))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "wicket" })),
    )
}

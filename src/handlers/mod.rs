// HTTP surface: route table and the helpers shared across handlers.

pub mod auth;
pub mod forms;
pub mod preferences;
pub mod public;
pub mod staff;
pub mod student;

use axum::{
    body::Body,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::app_state::AppState;
use crate::infrastructure::middleware::{
    auth_context, require_student, AuthContext, CurrentUser,
};
use crate::infrastructure::session;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let student_routes = Router::new()
        .route("/material-clase", get(student::class_materials))
        .layer(middleware::from_fn(require_student));

    let app = Router::new()
        .route("/health", get(health))
        .route("/", get(public::index))
        .route("/contact", get(public::contact_page).post(public::submit_contact))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route(
            "/manage-facets",
            get(preferences::manage_facets_page).post(preferences::update_preferences),
        )
        .merge(student_routes)
        .nest("/staff", staff::router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_context))
        .nest_service("/media", ServeDir::new(&state.config.media.root))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        );

    app.with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "portfolio-cms" }))
}

/// Success body with a user-facing notice.
pub(crate) fn notice(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": message }))
}

/// Resolve the caller or produce the login redirect for handlers that only
/// require authentication, not a particular role.
pub(crate) fn current_or_login(
    ctx: &AuthContext,
    path: &str,
) -> Result<CurrentUser, Response> {
    match &ctx.0 {
        Some(current) => Ok(current.clone()),
        None => Err(Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, format!("/login?next={}", path))
            .header(
                header::SET_COOKIE,
                session::flash_cookie("You must sign in to access this section."),
            )
            .body(Body::empty())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())),
    }
}

// Registration, login, and logout.

use axum::{
    extract::{Query, State},
    http::header,
    response::{AppendHeaders, IntoResponse, Json, Redirect},
    Extension,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::middleware::AuthContext;
use crate::infrastructure::password::verify_password;
use crate::infrastructure::session::{clear_session_cookie, session_cookie, Session, SESSION_COOKIE};
use crate::models::facet::Facet;
use crate::models::user::{Role, User};
use crate::services::registration::{self, RegistrationForm};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

/// Registration form data: site branding plus the active facets offered for
/// selection.
pub async fn register_page(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let settings = state.settings.get().await;
    let facets = Facet::list_active(&state.pool).await?;
    Ok(Json(json!({
        "site_settings": settings,
        "facets": facets,
    })))
}

/// Create the account, establish its session, and point the client home with
/// role-specific welcome copy.
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegistrationForm>,
) -> AppResult<impl IntoResponse> {
    let user = registration::register(&state, &form).await?;
    let session = Session::create(&state.pool, user.id, state.config.sessions.ttl_secs).await?;
    info!(username = %user.username, "user registered");

    let message = match form.role {
        Role::Student => format!(
            "Welcome, {}! Your account has been created — the class material section is now available to you.",
            user.username
        ),
        Role::Visitor => format!(
            "Welcome, {}! Your account has been created.",
            user.username
        ),
    };

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(&session.token, state.config.sessions.ttl_secs),
        )]),
        Json(json!({
            "success": true,
            "message": message,
            "redirect": "/",
        })),
    ))
}

pub async fn login_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<NextQuery>,
) -> AppResult<impl IntoResponse> {
    if ctx.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let settings = state.settings.get().await;
    Ok(Json(json!({
        "site_settings": settings,
        "next": query.next,
    }))
    .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(form): Json<LoginForm>,
) -> AppResult<impl IntoResponse> {
    if ctx.0.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let user = User::by_username(&state.pool, form.username.trim()).await?;
    let user = match user {
        Some(user) if verify_password(&form.password, &user.password_hash) => user,
        _ => {
            return Err(AppError::Unauthorized(
                "Invalid username or password.".to_string(),
            ))
        }
    };

    let session = Session::create(&state.pool, user.id, state.config.sessions.ttl_secs).await?;
    info!(username = %user.username, "user logged in");

    let redirect = sanitize_next(form.next.as_deref());
    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(&session.token, state.config.sessions.ttl_secs),
        )]),
        Json(json!({
            "success": true,
            "message": format!("Welcome back, {}!", user.username),
            "redirect": redirect,
        })),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    headers: axum::http::HeaderMap,
) -> AppResult<impl IntoResponse> {
    if ctx.0.is_some() {
        if let Some(token) = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| crate::infrastructure::session::cookie_value(cookies, SESSION_COOKIE))
        {
            Session::delete(&state.pool, token).await?;
        }
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Json(json!({
            "success": true,
            "message": "You have been signed out.",
            "redirect": "/",
        })),
    ))
}

/// The post-login target must stay on this site: only absolute paths pass,
/// anything else falls back to the index.
fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_next;

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(sanitize_next(Some("/staff")), "/staff");
        assert_eq!(sanitize_next(Some("https://evil.test")), "/");
        assert_eq!(sanitize_next(Some("//evil.test")), "/");
        assert_eq!(sanitize_next(None), "/");
    }
}

// Public endpoints: the index tree and contact intake.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::middleware::AuthContext;
use crate::models::contact::{ContactFields, ContactMessage};
use crate::services::content;

/// The landing page tree. Authenticated callers get their preferred facets
/// in preference order; everyone else gets the full active set.
pub async fn index(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> AppResult<impl IntoResponse> {
    let user_id = ctx.0.as_ref().map(|current| current.user.id);
    let facets = content::assemble_facets(&state.pool, user_id).await?;
    let settings = state.settings.get().await;

    Ok(Json(json!({
        "site_settings": settings,
        "facets": facets,
    })))
}

pub async fn contact_page(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let settings = state.settings.get().await;
    Ok(Json(json!({ "site_settings": settings })))
}

/// Accept a visitor message. Field validation runs first; the per-IP
/// sliding-window cap rejects the submission before anything is persisted.
pub async fn submit_contact(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(fields): Json<ContactFields>,
) -> AppResult<impl IntoResponse> {
    crate::models::contact::validate(&fields)?;

    if !state.contact_limiter.try_acquire(addr.ip()) {
        return Err(AppError::TooManyRequests(
            "You have sent too many messages. Please try again later.".to_string(),
        ));
    }

    let message = ContactMessage::create(&state.pool, &fields).await?;
    info!(message_id = message.id, "contact message received");

    Ok(super::notice("Your message has been sent."))
}

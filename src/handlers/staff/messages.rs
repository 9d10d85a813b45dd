// Contact message review: list, detail, mark-read, reply, delete.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::models::contact::ContactMessage;

#[derive(Debug, Deserialize)]
pub struct ReplyForm {
    pub reply: String,
}

pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let messages = ContactMessage::list_all(&state.pool).await?;
    let unread_count = ContactMessage::unread_count(&state.pool).await?;
    Ok(Json(json!({
        "messages": messages,
        "unread_count": unread_count,
    })))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let message = ContactMessage::by_id(&state.pool, id).await?;
    Ok(Json(json!({ "message": message })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    ContactMessage::mark_read(&state.pool, id).await?;
    Ok(super::super::notice("Message marked as read."))
}

pub async fn reply(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<ReplyForm>,
) -> AppResult<impl IntoResponse> {
    let message = ContactMessage::reply(&state.pool, id, &form.reply).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Reply saved.",
        "contact_message": message,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    ContactMessage::delete(&state.pool, id).await?;
    Ok(super::super::notice("Message deleted."))
}

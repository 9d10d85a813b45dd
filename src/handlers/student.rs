// The student-only class material section. The student guard runs as route
// middleware; by the time this handler executes the caller is a student.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::services::classroom;

pub async fn class_materials(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let topics = classroom::assemble_topics(&state.pool).await?;
    let settings = state.settings.get().await;
    Ok(Json(json!({
        "site_settings": settings,
        "topics": topics,
    })))
}

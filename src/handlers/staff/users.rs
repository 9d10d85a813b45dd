// User administration. The staff flag is editable by any staff member; the
// superuser flag is honored only when the acting user is a superuser and is
// silently ignored otherwise.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::middleware::AuthContext;
use crate::models::user::{Role, User, UserProfile};

#[derive(Debug, Deserialize)]
pub struct UserUpdateForm {
    pub role: Role,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: Option<bool>,
}

pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let users = User::list_all(&state.pool).await?;
    let mut entries = Vec::with_capacity(users.len());
    for user in users {
        let profile = UserProfile::for_user(&state.pool, user.id).await?;
        entries.push(json!({ "user": user, "profile": profile }));
    }
    Ok(Json(json!({ "users": entries })))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(form): Json<UserUpdateForm>,
) -> AppResult<impl IntoResponse> {
    let actor = ctx
        .0
        .as_ref()
        .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;

    let profile = UserProfile::update(
        &state.pool,
        id,
        form.role,
        form.display_name.trim(),
        form.external_id.trim(),
        form.city.trim(),
    )
    .await?;

    let user = User::apply_permissions(
        &state.pool,
        id,
        form.is_staff,
        form.is_superuser,
        actor.user.is_superuser,
    )
    .await?;

    info!(user_id = id, actor = %actor.user.username, "user updated");
    Ok(Json(json!({
        "success": true,
        "message": format!("User \"{}\" updated.", user.username),
        "user": user,
        "profile": profile,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let actor = ctx
        .0
        .as_ref()
        .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;
    if actor.user.id == id {
        return Err(AppError::Validation(
            "You cannot delete your own account.".to_string(),
        ));
    }

    let user = User::by_id(&state.pool, id).await?;
    User::delete(&state.pool, id).await?;
    info!(user_id = id, actor = %actor.user.username, "user deleted");
    Ok(super::super::notice(&format!(
        "User \"{}\" deleted.",
        user.username
    )))
}

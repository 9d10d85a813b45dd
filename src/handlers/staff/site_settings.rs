// Site configuration panel: one row, edited in place. Saving refreshes the
// in-process cache so the public pages pick the change up immediately.

use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::handlers::forms::parse_multipart;

pub async fn show(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let settings = state.settings.get().await;
    Ok(Json(json!({ "settings": settings })))
}

pub async fn update(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let mut settings = state.settings.get().await;

    if let Some(value) = form.text("site_name") {
        let value = value.trim();
        if !value.is_empty() {
            settings.site_name = value.to_string();
        }
    }
    settings.description = form.text_or_default("description");
    settings.contact_email = form.text_or_default("contact_email");
    settings.phone = form.text_or_default("phone");
    settings.address = form.text_or_default("address");
    settings.facebook_url = form.text_or_default("facebook_url");
    settings.instagram_url = form.text_or_default("instagram_url");
    settings.twitter_url = form.text_or_default("twitter_url");
    settings.linkedin_url = form.text_or_default("linkedin_url");
    settings.youtube_url = form.text_or_default("youtube_url");
    if let Some(value) = form.text("hero_text") {
        settings.hero_text = value.to_string();
    }
    if let Some(value) = form.text("hero_subtitle") {
        settings.hero_subtitle = value.to_string();
    }

    if let Some(upload) = form.file("logo") {
        let path = state
            .storage
            .store("site", &upload.file_name, &upload.bytes)
            .await?;
        settings.logo = Some(path);
    }
    if let Some(upload) = form.file("hero_image") {
        let path = state
            .storage
            .store("site/hero", &upload.file_name, &upload.bytes)
            .await?;
        settings.hero_image = Some(path);
    }
    if let Some(upload) = form.file("hero_video") {
        let path = state
            .storage
            .store("site/hero", &upload.file_name, &upload.bytes)
            .await?;
        settings.hero_video = Some(path);
    }

    settings.save(&state.pool).await?;
    let refreshed = state.settings.refresh(&state.pool).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Site settings updated.",
        "settings": refreshed,
    })))
}

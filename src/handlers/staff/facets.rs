// Facet management: list with milestone counts, create/edit with an optional
// hero image upload, and cascading delete.

use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Json},
};
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::handlers::forms::{parse_multipart, ParsedForm};
use crate::models::facet::{Facet, FacetFields};

fn fields_from_form(form: &ParsedForm) -> AppResult<FacetFields> {
    Ok(FacetFields {
        title: form.required("title")?,
        description: form.text_or_default("description"),
        background_color: form.text_or_default("background_color"),
        sort_order: form.i64_or("sort_order", 0)?,
        slug: form.text("slug").map(str::to_owned),
        active: form.flag("active", true),
    })
}

pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let facets = Facet::list_with_counts(&state.pool).await?;
    Ok(Json(json!({ "facets": facets })))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let facet = Facet::by_id(&state.pool, id).await?;
    Ok(Json(json!({ "facet": facet })))
}

pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let fields = fields_from_form(&form)?;
    let mut facet = Facet::create(&state.pool, &fields).await?;

    if let Some(upload) = form.file("hero_image") {
        let path = state
            .storage
            .store("facets/hero", &upload.file_name, &upload.bytes)
            .await?;
        Facet::set_hero_image(&state.pool, facet.id, &path).await?;
        facet = Facet::by_id(&state.pool, facet.id).await?;
    }

    info!(facet_id = facet.id, title = %facet.title, "facet created");
    Ok(Json(json!({
        "success": true,
        "message": format!("Facet \"{}\" created.", facet.title),
        "facet": facet,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let fields = fields_from_form(&form)?;
    let mut facet = Facet::update(&state.pool, id, &fields).await?;

    if let Some(upload) = form.file("hero_image") {
        let path = state
            .storage
            .store("facets/hero", &upload.file_name, &upload.bytes)
            .await?;
        Facet::set_hero_image(&state.pool, id, &path).await?;
        facet = Facet::by_id(&state.pool, id).await?;
    }

    Ok(Json(json!({
        "success": true,
        "message": format!("Facet \"{}\" updated.", facet.title),
        "facet": facet,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let facet = Facet::by_id(&state.pool, id).await?;
    Facet::delete(&state.pool, id).await?;
    info!(facet_id = id, "facet deleted");
    Ok(super::super::notice(&format!(
        "Facet \"{}\" deleted.",
        facet.title
    )))
}

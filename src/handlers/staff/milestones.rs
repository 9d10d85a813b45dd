// Milestone management, including the per-milestone image gallery.

use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Json},
};
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::handlers::forms::{parse_multipart, ParsedForm};
use crate::models::facet::Facet;
use crate::models::milestone::{ImageSize, Milestone, MilestoneFields, MilestoneImage};

fn fields_from_form(form: &ParsedForm) -> AppResult<MilestoneFields> {
    let image_size = match form.text("image_size") {
        None => ImageSize::default(),
        Some(value) => match value.trim() {
            "" => ImageSize::default(),
            "small" => ImageSize::Small,
            "medium" => ImageSize::Medium,
            "large" => ImageSize::Large,
            "full" => ImageSize::Full,
            other => {
                return Err(crate::error::AppError::Validation(format!(
                    "Unknown image size '{}'",
                    other
                )))
            }
        },
    };

    Ok(MilestoneFields {
        facet_id: form
            .opt_i64("facet_id")?
            .ok_or_else(|| crate::error::AppError::Validation("Field 'facet_id' is required".to_string()))?,
        title: form.required("title")?,
        description: form.text_or_default("description"),
        year: form.opt_i64("year")?,
        video_url: form.text("video_url").map(str::to_owned),
        image_size,
        sort_order: form.i64_or("sort_order", 0)?,
        active: form.flag("active", true),
    })
}

async fn store_media(
    state: &AppState,
    form: &ParsedForm,
    milestone_id: i64,
) -> AppResult<()> {
    if let Some(upload) = form.file("image") {
        let path = state
            .storage
            .store("milestones", &upload.file_name, &upload.bytes)
            .await?;
        Milestone::set_image(&state.pool, milestone_id, &path).await?;
    }
    if let Some(upload) = form.file("video_file") {
        let path = state
            .storage
            .store("milestones/video", &upload.file_name, &upload.bytes)
            .await?;
        Milestone::set_video_file(&state.pool, milestone_id, &path).await?;
    }
    Ok(())
}

pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let milestones = Milestone::list_all(&state.pool).await?;
    Ok(Json(json!({ "milestones": milestones })))
}

pub async fn list_for_facet(
    State(state): State<AppState>,
    Path(facet_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let facet = Facet::by_id(&state.pool, facet_id).await?;
    let milestones = Milestone::list_by_facet(&state.pool, facet_id).await?;
    Ok(Json(json!({ "facet": facet, "milestones": milestones })))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let milestone = Milestone::by_id(&state.pool, id).await?;
    let images = MilestoneImage::list_by_milestone(&state.pool, id).await?;
    Ok(Json(json!({ "milestone": milestone, "images": images })))
}

pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let fields = fields_from_form(&form)?;
    let milestone = Milestone::create(&state.pool, &fields).await?;
    store_media(&state, &form, milestone.id).await?;
    let milestone = Milestone::by_id(&state.pool, milestone.id).await?;

    info!(milestone_id = milestone.id, title = %milestone.title, "milestone created");
    Ok(Json(json!({
        "success": true,
        "message": format!("Milestone \"{}\" created.", milestone.title),
        "milestone": milestone,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let fields = fields_from_form(&form)?;
    Milestone::update(&state.pool, id, &fields).await?;
    store_media(&state, &form, id).await?;
    let milestone = Milestone::by_id(&state.pool, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Milestone \"{}\" updated.", milestone.title),
        "milestone": milestone,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let milestone = Milestone::by_id(&state.pool, id).await?;
    Milestone::delete(&state.pool, id).await?;
    info!(milestone_id = id, "milestone deleted");
    Ok(super::super::notice(&format!(
        "Milestone \"{}\" deleted.",
        milestone.title
    )))
}

// ---- gallery images ----

pub async fn list_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Milestone::by_id(&state.pool, id).await?;
    let images = MilestoneImage::list_by_milestone(&state.pool, id).await?;
    Ok(Json(json!({ "images": images })))
}

pub async fn add_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let upload = form.file("image").ok_or_else(|| {
        crate::error::AppError::Validation("An image upload is required".to_string())
    })?;
    let sort_order = form.i64_or("sort_order", 0)?;

    let path = state
        .storage
        .store("milestones/gallery", &upload.file_name, &upload.bytes)
        .await?;
    let image = MilestoneImage::create(&state.pool, id, &path, sort_order).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Image added.",
        "image": image,
    })))
}

pub async fn update_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let sort_order = form.i64_or("sort_order", 0)?;
    let active = form.flag("active", true);
    let image = MilestoneImage::update(&state.pool, id, sort_order, active).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Image updated.",
        "image": image,
    })))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    MilestoneImage::delete(&state.pool, id).await?;
    Ok(super::super::notice("Image removed."))
}

// Topic and material management. Material submissions carry their PDF /
// video / presentation lists as structured records — each with an optional
// existing id, a delete flag, and either a URL or a reference to an uploaded
// file part — so one request can create, update, and remove attachments
// together.

use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::forms::{parse_multipart, ParsedForm};
use crate::models::material::{
    AttachmentChange, Material, MaterialFields, MaterialPdf, MaterialPresentation, MaterialVideo,
    Topic, TopicFields,
};

#[derive(Debug, Deserialize)]
pub struct TopicFilter {
    #[serde(default)]
    pub topic_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AttachmentRecord {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    label: String,
    #[serde(default)]
    url: Option<String>,
    /// Name of the multipart file part carrying this attachment's upload.
    #[serde(default)]
    file_slot: Option<String>,
    #[serde(default)]
    sort_order: i64,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default)]
    delete: bool,
}

#[derive(Debug, Deserialize)]
struct MaterialPayload {
    topic_id: i64,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    sort_order: i64,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default)]
    pdfs: Vec<AttachmentRecord>,
    #[serde(default)]
    videos: Vec<AttachmentRecord>,
    #[serde(default)]
    presentations: Vec<AttachmentRecord>,
}

fn default_true() -> bool {
    true
}

// ---- topics ----

pub async fn list_topics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let topics = Topic::list_with_counts(&state.pool).await?;
    Ok(Json(json!({ "topics": topics })))
}

pub async fn topic_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let topic = Topic::by_id(&state.pool, id).await?;
    let materials = Material::list_by_topic(&state.pool, id).await?;
    Ok(Json(json!({ "topic": topic, "materials": materials })))
}

pub async fn create_topic(
    State(state): State<AppState>,
    Json(fields): Json<TopicFields>,
) -> AppResult<impl IntoResponse> {
    let topic = Topic::create(&state.pool, &fields).await?;
    info!(topic_id = topic.id, title = %topic.title, "topic created");
    Ok(Json(json!({
        "success": true,
        "message": format!("Topic \"{}\" created.", topic.title),
        "topic": topic,
    })))
}

pub async fn update_topic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(fields): Json<TopicFields>,
) -> AppResult<impl IntoResponse> {
    let topic = Topic::update(&state.pool, id, &fields).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Topic \"{}\" updated.", topic.title),
        "topic": topic,
    })))
}

pub async fn delete_topic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let topic = Topic::by_id(&state.pool, id).await?;
    Topic::delete(&state.pool, id).await?;
    info!(topic_id = id, "topic deleted");
    Ok(super::super::notice(&format!(
        "Topic \"{}\" deleted.",
        topic.title
    )))
}

// ---- materials ----

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<TopicFilter>,
) -> AppResult<impl IntoResponse> {
    let materials = match filter.topic_id {
        Some(topic_id) => Material::list_by_topic(&state.pool, topic_id).await?,
        None => Material::list_all(&state.pool).await?,
    };
    Ok(Json(json!({ "materials": materials })))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let material = Material::by_id(&state.pool, id).await?;
    let pdfs = MaterialPdf::list_by_material(&state.pool, id).await?;
    let videos = MaterialVideo::list_by_material(&state.pool, id).await?;
    let presentations = MaterialPresentation::list_by_material(&state.pool, id).await?;
    Ok(Json(json!({
        "material": material,
        "pdfs": pdfs,
        "videos": videos,
        "presentations": presentations,
    })))
}

pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let payload = read_payload(&form)?;
    let (fields, pdfs, videos, presentations) = resolve_payload(&state, &form, payload).await?;

    let material = Material::create(&state.pool, &fields, &pdfs, &videos, &presentations).await?;
    info!(material_id = material.id, title = %material.title, "material created");
    Ok(Json(json!({
        "success": true,
        "message": format!("Material \"{}\" created.", material.title),
        "material": material,
    })))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = parse_multipart(multipart).await?;
    let payload = read_payload(&form)?;
    let (fields, pdfs, videos, presentations) = resolve_payload(&state, &form, payload).await?;

    let material =
        Material::update(&state.pool, id, &fields, &pdfs, &videos, &presentations).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Material \"{}\" updated.", material.title),
        "material": material,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let material = Material::by_id(&state.pool, id).await?;
    Material::delete(&state.pool, id).await?;
    info!(material_id = id, "material deleted");
    Ok(super::super::notice(&format!(
        "Material \"{}\" deleted.",
        material.title
    )))
}

fn read_payload(form: &ParsedForm) -> AppResult<MaterialPayload> {
    let raw = form.required("payload")?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Validation(format!("Malformed material payload: {}", e)))
}

/// Turn the submitted payload into model-level changes, storing any uploads
/// its records point at.
async fn resolve_payload(
    state: &AppState,
    form: &ParsedForm,
    payload: MaterialPayload,
) -> AppResult<(
    MaterialFields,
    Vec<AttachmentChange>,
    Vec<AttachmentChange>,
    Vec<AttachmentChange>,
)> {
    let fields = MaterialFields {
        topic_id: payload.topic_id,
        title: payload.title,
        description: payload.description,
        sort_order: payload.sort_order,
        active: payload.active,
    };

    let pdfs = resolve_records(state, form, &payload.pdfs, "materials/pdfs").await?;
    let videos = resolve_records(state, form, &payload.videos, "materials/videos").await?;
    let presentations =
        resolve_records(state, form, &payload.presentations, "materials/presentations").await?;

    Ok((fields, pdfs, videos, presentations))
}

async fn resolve_records(
    state: &AppState,
    form: &ParsedForm,
    records: &[AttachmentRecord],
    subdir: &str,
) -> AppResult<Vec<AttachmentChange>> {
    let mut changes = Vec::with_capacity(records.len());
    for record in records {
        let file = match &record.file_slot {
            Some(slot) => {
                let upload = form.file(slot).ok_or_else(|| {
                    AppError::Validation(format!("Missing upload for file slot '{}'", slot))
                })?;
                Some(
                    state
                        .storage
                        .store(subdir, &upload.file_name, &upload.bytes)
                        .await?,
                )
            }
            None => None,
        };
        changes.push(AttachmentChange {
            id: record.id,
            label: record.label.clone(),
            url: record.url.clone(),
            file,
            sort_order: record.sort_order,
            active: record.active,
            delete: record.delete,
        });
    }
    Ok(changes)
}

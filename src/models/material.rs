// The student-only content hierarchy: topics contain materials, materials
// carry PDF / video / presentation attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, SqliteConnection};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub sort_order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TopicWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub topic: Topic,
    pub material_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub topic_id: i64,
    pub title: String,
    pub description: String,
    pub sort_order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MaterialPdf {
    pub id: i64,
    pub material_id: i64,
    pub file: String,
    pub label: String,
    pub sort_order: i64,
    pub active: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MaterialVideo {
    pub id: i64,
    pub material_id: i64,
    pub url: Option<String>,
    pub file: Option<String>,
    pub label: String,
    pub sort_order: i64,
    pub active: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MaterialPresentation {
    pub id: i64,
    pub material_id: i64,
    pub file: String,
    pub label: String,
    pub sort_order: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialFields {
    pub topic_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// One attachment change from a staff submission, with any uploaded file
/// already resolved to its stored path. `id` present means update (or delete
/// when the flag is set); absent means create.
#[derive(Debug, Clone, Default)]
pub struct AttachmentChange {
    pub id: Option<i64>,
    pub label: String,
    pub url: Option<String>,
    pub file: Option<String>,
    pub sort_order: i64,
    pub active: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    Video,
    Presentation,
}

impl AttachmentKind {
    fn table(&self) -> &'static str {
        match self {
            AttachmentKind::Pdf => "material_pdfs",
            AttachmentKind::Video => "material_videos",
            AttachmentKind::Presentation => "material_presentations",
        }
    }
}

impl Topic {
    pub async fn by_id(pool: &SqlitePool, id: i64) -> AppResult<Topic> {
        sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))
    }

    pub async fn list_with_counts(pool: &SqlitePool) -> AppResult<Vec<TopicWithCount>> {
        let rows = sqlx::query_as::<_, TopicWithCount>(
            r#"
            SELECT t.*, COUNT(m.id) AS material_count
            FROM topics t
            LEFT JOIN materials m ON m.topic_id = t.id
            GROUP BY t.id
            ORDER BY t.sort_order, t.title
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_active(pool: &SqlitePool) -> AppResult<Vec<Topic>> {
        let rows = sqlx::query_as::<_, Topic>(
            "SELECT * FROM topics WHERE active = 1 ORDER BY sort_order, title",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(pool: &SqlitePool, fields: &TopicFields) -> AppResult<Topic> {
        if fields.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO topics (title, description, sort_order, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(fields.sort_order)
        .bind(fields.active)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
        Topic::by_id(pool, result.last_insert_rowid()).await
    }

    pub async fn update(pool: &SqlitePool, id: i64, fields: &TopicFields) -> AppResult<Topic> {
        if fields.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        Topic::by_id(pool, id).await?;
        sqlx::query(
            "UPDATE topics SET title = ?, description = ?, sort_order = ?, active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(fields.sort_order)
        .bind(fields.active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        Topic::by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Topic {} not found", id)));
        }
        Ok(())
    }
}

impl Material {
    pub async fn by_id(pool: &SqlitePool, id: i64) -> AppResult<Material> {
        sqlx::query_as::<_, Material>("SELECT * FROM materials WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Material {} not found", id)))
    }

    pub async fn list_by_topic(pool: &SqlitePool, topic_id: i64) -> AppResult<Vec<Material>> {
        let rows = sqlx::query_as::<_, Material>(
            "SELECT * FROM materials WHERE topic_id = ? ORDER BY sort_order, title",
        )
        .bind(topic_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Material>> {
        let rows = sqlx::query_as::<_, Material>(
            r#"
            SELECT m.* FROM materials m
            JOIN topics t ON t.id = m.topic_id
            ORDER BY t.sort_order, m.sort_order, m.title
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Active materials for a set of topics in one query. Prefetch step for
    /// the student tree.
    pub async fn active_for_topics(pool: &SqlitePool, topic_ids: &[i64]) -> AppResult<Vec<Material>> {
        if topic_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM materials WHERE active = 1 AND topic_id IN (");
        let mut separated = builder.separated(", ");
        for id in topic_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY sort_order, title");
        let rows = builder.build_query_as::<Material>().fetch_all(pool).await?;
        Ok(rows)
    }

    /// Create the material and apply its attachment batches in one
    /// transaction.
    pub async fn create(
        pool: &SqlitePool,
        fields: &MaterialFields,
        pdfs: &[AttachmentChange],
        videos: &[AttachmentChange],
        presentations: &[AttachmentChange],
    ) -> AppResult<Material> {
        if fields.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        Topic::by_id(pool, fields.topic_id).await?;

        let mut tx = pool.begin().await?;
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO materials (topic_id, title, description, sort_order, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(fields.topic_id)
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(fields.sort_order)
        .bind(fields.active)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        apply_attachments(&mut tx, id, AttachmentKind::Pdf, pdfs).await?;
        apply_attachments(&mut tx, id, AttachmentKind::Video, videos).await?;
        apply_attachments(&mut tx, id, AttachmentKind::Presentation, presentations).await?;

        tx.commit().await?;
        Material::by_id(pool, id).await
    }

    /// Update the material's own fields and apply attachment creations,
    /// in-place updates, and deletions from the same submission, all in one
    /// transaction.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        fields: &MaterialFields,
        pdfs: &[AttachmentChange],
        videos: &[AttachmentChange],
        presentations: &[AttachmentChange],
    ) -> AppResult<Material> {
        if fields.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        Material::by_id(pool, id).await?;
        Topic::by_id(pool, fields.topic_id).await?;

        let mut tx = pool.begin().await?;
        sqlx::query(
            "UPDATE materials SET topic_id = ?, title = ?, description = ?, sort_order = ?, active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(fields.topic_id)
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(fields.sort_order)
        .bind(fields.active)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        apply_attachments(&mut tx, id, AttachmentKind::Pdf, pdfs).await?;
        apply_attachments(&mut tx, id, AttachmentKind::Video, videos).await?;
        apply_attachments(&mut tx, id, AttachmentKind::Presentation, presentations).await?;

        tx.commit().await?;
        Material::by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM materials WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Material {} not found", id)));
        }
        Ok(())
    }
}

impl MaterialPdf {
    pub async fn active_for_materials(
        pool: &SqlitePool,
        material_ids: &[i64],
    ) -> AppResult<Vec<MaterialPdf>> {
        fetch_active_attachments::<MaterialPdf>(pool, AttachmentKind::Pdf, material_ids).await
    }

    pub async fn list_by_material(pool: &SqlitePool, material_id: i64) -> AppResult<Vec<MaterialPdf>> {
        let rows = sqlx::query_as::<_, MaterialPdf>(
            "SELECT * FROM material_pdfs WHERE material_id = ? ORDER BY sort_order",
        )
        .bind(material_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

impl MaterialVideo {
    pub async fn active_for_materials(
        pool: &SqlitePool,
        material_ids: &[i64],
    ) -> AppResult<Vec<MaterialVideo>> {
        fetch_active_attachments::<MaterialVideo>(pool, AttachmentKind::Video, material_ids).await
    }

    pub async fn list_by_material(
        pool: &SqlitePool,
        material_id: i64,
    ) -> AppResult<Vec<MaterialVideo>> {
        let rows = sqlx::query_as::<_, MaterialVideo>(
            "SELECT * FROM material_videos WHERE material_id = ? ORDER BY sort_order",
        )
        .bind(material_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

impl MaterialPresentation {
    pub async fn active_for_materials(
        pool: &SqlitePool,
        material_ids: &[i64],
    ) -> AppResult<Vec<MaterialPresentation>> {
        fetch_active_attachments::<MaterialPresentation>(
            pool,
            AttachmentKind::Presentation,
            material_ids,
        )
        .await
    }

    pub async fn list_by_material(
        pool: &SqlitePool,
        material_id: i64,
    ) -> AppResult<Vec<MaterialPresentation>> {
        let rows = sqlx::query_as::<_, MaterialPresentation>(
            "SELECT * FROM material_presentations WHERE material_id = ? ORDER BY sort_order",
        )
        .bind(material_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

async fn fetch_active_attachments<T>(
    pool: &SqlitePool,
    kind: AttachmentKind,
    material_ids: &[i64],
) -> AppResult<Vec<T>>
where
    T: for<'r> FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
{
    if material_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT * FROM {} WHERE active = 1 AND material_id IN (",
        kind.table()
    ));
    let mut separated = builder.separated(", ");
    for id in material_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY sort_order");
    let rows = builder.build_query_as::<T>().fetch_all(pool).await?;
    Ok(rows)
}

/// Apply one kind's attachment changes inside the material's transaction.
/// Validation: PDFs and presentations need a file; videos need a URL or a
/// file, both on creation and after an in-place update.
async fn apply_attachments(
    tx: &mut SqliteConnection,
    material_id: i64,
    kind: AttachmentKind,
    changes: &[AttachmentChange],
) -> AppResult<()> {
    let table = kind.table();
    for change in changes {
        match change.id {
            Some(attachment_id) if change.delete => {
                sqlx::query(&format!(
                    "DELETE FROM {} WHERE id = ? AND material_id = ?",
                    table
                ))
                .bind(attachment_id)
                .bind(material_id)
                .execute(&mut *tx)
                .await?;
            }
            Some(attachment_id) => {
                update_attachment(tx, material_id, kind, attachment_id, change).await?;
            }
            None if change.delete => {
                // a delete flag on a row that was never created is a no-op
            }
            None => {
                insert_attachment(tx, material_id, kind, change).await?;
            }
        }
    }
    Ok(())
}

async fn insert_attachment(
    tx: &mut SqliteConnection,
    material_id: i64,
    kind: AttachmentKind,
    change: &AttachmentChange,
) -> AppResult<()> {
    match kind {
        AttachmentKind::Video => {
            let url = non_empty(&change.url);
            let file = non_empty(&change.file);
            if url.is_none() && file.is_none() {
                return Err(AppError::Validation(
                    "A video needs a URL or an uploaded file".to_string(),
                ));
            }
            sqlx::query(
                "INSERT INTO material_videos (material_id, url, file, label, sort_order, active) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(material_id)
            .bind(url)
            .bind(file)
            .bind(&change.label)
            .bind(change.sort_order)
            .bind(change.active)
            .execute(&mut *tx)
            .await?;
        }
        AttachmentKind::Pdf | AttachmentKind::Presentation => {
            let file = non_empty(&change.file).ok_or_else(|| {
                AppError::Validation("An uploaded file is required".to_string())
            })?;
            sqlx::query(&format!(
                "INSERT INTO {} (material_id, file, label, sort_order, active) VALUES (?, ?, ?, ?, ?)",
                kind.table()
            ))
            .bind(material_id)
            .bind(file)
            .bind(&change.label)
            .bind(change.sort_order)
            .bind(change.active)
            .execute(&mut *tx)
            .await?;
        }
    }
    Ok(())
}

async fn update_attachment(
    tx: &mut SqliteConnection,
    material_id: i64,
    kind: AttachmentKind,
    attachment_id: i64,
    change: &AttachmentChange,
) -> AppResult<()> {
    match kind {
        AttachmentKind::Video => {
            let existing = sqlx::query_as::<_, MaterialVideo>(
                "SELECT * FROM material_videos WHERE id = ? AND material_id = ?",
            )
            .bind(attachment_id)
            .bind(material_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Video attachment {} not found", attachment_id))
            })?;

            let url = non_empty(&change.url).or(existing.url);
            let file = non_empty(&change.file).or(existing.file);
            if url.is_none() && file.is_none() {
                return Err(AppError::Validation(
                    "A video needs a URL or an uploaded file".to_string(),
                ));
            }
            sqlx::query(
                "UPDATE material_videos SET url = ?, file = ?, label = ?, sort_order = ?, active = ? WHERE id = ?",
            )
            .bind(url)
            .bind(file)
            .bind(&change.label)
            .bind(change.sort_order)
            .bind(change.active)
            .bind(attachment_id)
            .execute(&mut *tx)
            .await?;
        }
        AttachmentKind::Pdf | AttachmentKind::Presentation => {
            let table = kind.table();
            let result = match non_empty(&change.file) {
                Some(file) => {
                    sqlx::query(&format!(
                        "UPDATE {} SET file = ?, label = ?, sort_order = ?, active = ? WHERE id = ? AND material_id = ?",
                        table
                    ))
                    .bind(file)
                    .bind(&change.label)
                    .bind(change.sort_order)
                    .bind(change.active)
                    .bind(attachment_id)
                    .bind(material_id)
                    .execute(&mut *tx)
                    .await?
                }
                None => {
                    sqlx::query(&format!(
                        "UPDATE {} SET label = ?, sort_order = ?, active = ? WHERE id = ? AND material_id = ?",
                        table
                    ))
                    .bind(&change.label)
                    .bind(change.sort_order)
                    .bind(change.active)
                    .bind(attachment_id)
                    .bind(material_id)
                    .execute(&mut *tx)
                    .await?
                }
            };
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!(
                    "Attachment {} not found",
                    attachment_id
                )));
            }
        }
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

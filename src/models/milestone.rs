// Milestones: dated achievement cards nested under a facet, plus their
// gallery images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppError, AppResult};

/// Presentation preset controlling how large the milestone image renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    Medium,
    Large,
    Full,
}

impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::Medium
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Milestone {
    pub id: i64,
    pub facet_id: i64,
    pub title: String,
    pub description: String,
    pub year: Option<i64>,
    pub image: Option<String>,
    pub video_file: Option<String>,
    pub video_url: Option<String>,
    pub image_size: ImageSize,
    pub sort_order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MilestoneImage {
    pub id: i64,
    pub milestone_id: i64,
    pub image: String,
    pub sort_order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneFields {
    pub facet_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

fn validate_fields(fields: &MilestoneFields) -> AppResult<()> {
    if fields.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if let Some(year) = fields.year {
        if !(1900..=2100).contains(&year) {
            return Err(AppError::Validation(
                "Year must be between 1900 and 2100".to_string(),
            ));
        }
    }
    Ok(())
}

impl Milestone {
    pub async fn by_id(pool: &SqlitePool, id: i64) -> AppResult<Milestone> {
        sqlx::query_as::<_, Milestone>("SELECT * FROM milestones WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Milestone {} not found", id)))
    }

    /// Every milestone across facets, in global display order:
    /// (facet order, milestone order, year, title).
    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<Milestone>> {
        let rows = sqlx::query_as::<_, Milestone>(
            r#"
            SELECT m.* FROM milestones m
            JOIN facets f ON f.id = m.facet_id
            ORDER BY f.sort_order, m.sort_order, m.year, m.title
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_facet(pool: &SqlitePool, facet_id: i64) -> AppResult<Vec<Milestone>> {
        let rows = sqlx::query_as::<_, Milestone>(
            "SELECT * FROM milestones WHERE facet_id = ? ORDER BY sort_order, year, title",
        )
        .bind(facet_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Active milestones for a set of facets in one query, ordered within each
    /// facet by (order, year). Prefetch step for the public tree.
    pub async fn active_for_facets(
        pool: &SqlitePool,
        facet_ids: &[i64],
    ) -> AppResult<Vec<Milestone>> {
        if facet_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM milestones WHERE active = 1 AND facet_id IN (");
        let mut separated = builder.separated(", ");
        for id in facet_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY sort_order, year, title");

        let rows = builder
            .build_query_as::<Milestone>()
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn create(pool: &SqlitePool, fields: &MilestoneFields) -> AppResult<Milestone> {
        validate_fields(fields)?;
        // the facet must exist; surfaces as 404 rather than a constraint error
        super::facet::Facet::by_id(pool, fields.facet_id).await?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO milestones
                (facet_id, title, description, year, video_url, image_size, sort_order, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fields.facet_id)
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(fields.year)
        .bind(normalized_url(&fields.video_url))
        .bind(fields.image_size)
        .bind(fields.sort_order)
        .bind(fields.active)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Milestone::by_id(pool, result.last_insert_rowid()).await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        fields: &MilestoneFields,
    ) -> AppResult<Milestone> {
        validate_fields(fields)?;
        Milestone::by_id(pool, id).await?;
        super::facet::Facet::by_id(pool, fields.facet_id).await?;

        sqlx::query(
            r#"
            UPDATE milestones SET facet_id = ?, title = ?, description = ?, year = ?,
                video_url = ?, image_size = ?, sort_order = ?, active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(fields.facet_id)
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(fields.year)
        .bind(normalized_url(&fields.video_url))
        .bind(fields.image_size)
        .bind(fields.sort_order)
        .bind(fields.active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        Milestone::by_id(pool, id).await
    }

    pub async fn set_image(pool: &SqlitePool, id: i64, path: &str) -> AppResult<()> {
        sqlx::query("UPDATE milestones SET image = ?, updated_at = ? WHERE id = ?")
            .bind(path)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_video_file(pool: &SqlitePool, id: i64, path: &str) -> AppResult<()> {
        sqlx::query("UPDATE milestones SET video_file = ?, updated_at = ? WHERE id = ?")
            .bind(path)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM milestones WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Milestone {} not found", id)));
        }
        Ok(())
    }
}

impl MilestoneImage {
    pub async fn by_id(pool: &SqlitePool, id: i64) -> AppResult<MilestoneImage> {
        sqlx::query_as::<_, MilestoneImage>("SELECT * FROM milestone_images WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Milestone image {} not found", id)))
    }

    pub async fn list_by_milestone(
        pool: &SqlitePool,
        milestone_id: i64,
    ) -> AppResult<Vec<MilestoneImage>> {
        let rows = sqlx::query_as::<_, MilestoneImage>(
            "SELECT * FROM milestone_images WHERE milestone_id = ? ORDER BY sort_order, created_at DESC",
        )
        .bind(milestone_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Active gallery images for a set of milestones in one query.
    /// Prefetch step for the public tree.
    pub async fn active_for_milestones(
        pool: &SqlitePool,
        milestone_ids: &[i64],
    ) -> AppResult<Vec<MilestoneImage>> {
        if milestone_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM milestone_images WHERE active = 1 AND milestone_id IN (");
        let mut separated = builder.separated(", ");
        for id in milestone_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY sort_order");

        let rows = builder
            .build_query_as::<MilestoneImage>()
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn create(
        pool: &SqlitePool,
        milestone_id: i64,
        image: &str,
        sort_order: i64,
    ) -> AppResult<MilestoneImage> {
        Milestone::by_id(pool, milestone_id).await?;
        let result = sqlx::query(
            "INSERT INTO milestone_images (milestone_id, image, sort_order, active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(milestone_id)
        .bind(image)
        .bind(sort_order)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        MilestoneImage::by_id(pool, result.last_insert_rowid()).await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        sort_order: i64,
        active: bool,
    ) -> AppResult<MilestoneImage> {
        MilestoneImage::by_id(pool, id).await?;
        sqlx::query("UPDATE milestone_images SET sort_order = ?, active = ? WHERE id = ?")
            .bind(sort_order)
            .bind(active)
            .bind(id)
            .execute(pool)
            .await?;
        MilestoneImage::by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM milestone_images WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Milestone image {} not found", id)));
        }
        Ok(())
    }
}

fn normalized_url(url: &Option<String>) -> Option<String> {
    url.as_ref()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
}

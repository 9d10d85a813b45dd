// Facets: the top-level biographical sections of the public site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Facet {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub hero_image: Option<String>,
    pub background_color: String,
    pub sort_order: i64,
    pub slug: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Facet row annotated with its milestone count, for the staff list.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FacetWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub facet: Facet,
    pub milestone_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacetFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Turn a title into a URL-safe slug: lowercase ASCII alphanumerics with
/// single dashes between words.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

impl Facet {
    pub async fn by_id(pool: &SqlitePool, id: i64) -> AppResult<Facet> {
        sqlx::query_as::<_, Facet>("SELECT * FROM facets WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Facet {} not found", id)))
    }

    pub async fn active_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Facet>> {
        let facet = sqlx::query_as::<_, Facet>("SELECT * FROM facets WHERE id = ? AND active = 1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(facet)
    }

    /// All active facets in their configured display order.
    pub async fn list_active(pool: &SqlitePool) -> AppResult<Vec<Facet>> {
        let facets = sqlx::query_as::<_, Facet>(
            "SELECT * FROM facets WHERE active = 1 ORDER BY sort_order, title",
        )
        .fetch_all(pool)
        .await?;
        Ok(facets)
    }

    /// Active facets the user holds a preference for, ordered by
    /// (preference priority, facet order). The preference order wins over the
    /// facets' own configuration.
    pub async fn list_preferred(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<Facet>> {
        let facets = sqlx::query_as::<_, Facet>(
            r#"
            SELECT f.* FROM facets f
            JOIN user_facet_preferences p ON p.facet_id = f.id
            WHERE p.user_id = ? AND f.active = 1
            ORDER BY p.priority, f.sort_order
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(facets)
    }

    /// Every facet with its milestone count, for the staff panel.
    pub async fn list_with_counts(pool: &SqlitePool) -> AppResult<Vec<FacetWithCount>> {
        let rows = sqlx::query_as::<_, FacetWithCount>(
            r#"
            SELECT f.*, COUNT(m.id) AS milestone_count
            FROM facets f
            LEFT JOIN milestones m ON m.facet_id = f.id
            GROUP BY f.id
            ORDER BY f.sort_order, f.title
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(pool: &SqlitePool, fields: &FacetFields) -> AppResult<Facet> {
        if fields.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        let slug = resolve_slug(pool, fields, None).await?;
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO facets (title, description, background_color, sort_order, slug, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(&fields.background_color)
        .bind(fields.sort_order)
        .bind(&slug)
        .bind(fields.active)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Facet::by_id(pool, result.last_insert_rowid()).await
    }

    pub async fn update(pool: &SqlitePool, id: i64, fields: &FacetFields) -> AppResult<Facet> {
        if fields.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        // 404 before touching anything
        Facet::by_id(pool, id).await?;
        let slug = resolve_slug(pool, fields, Some(id)).await?;
        sqlx::query(
            r#"
            UPDATE facets SET title = ?, description = ?, background_color = ?,
                sort_order = ?, slug = ?, active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(fields.title.trim())
        .bind(&fields.description)
        .bind(&fields.background_color)
        .bind(fields.sort_order)
        .bind(&slug)
        .bind(fields.active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        Facet::by_id(pool, id).await
    }

    pub async fn set_hero_image(pool: &SqlitePool, id: i64, path: &str) -> AppResult<()> {
        sqlx::query("UPDATE facets SET hero_image = ?, updated_at = ? WHERE id = ?")
            .bind(path)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete the facet. Milestones and their gallery images go with it.
    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM facets WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Facet {} not found", id)));
        }
        Ok(())
    }
}

/// Pick the slug for a facet: an explicit one wins, otherwise derive it from
/// the title; either way uniquify against existing rows with a numeric suffix.
async fn resolve_slug(
    pool: &SqlitePool,
    fields: &FacetFields,
    existing_id: Option<i64>,
) -> AppResult<String> {
    let base = match &fields.slug {
        Some(s) if !s.trim().is_empty() => slugify(s),
        _ => slugify(&fields.title),
    };
    let base = if base.is_empty() {
        "facet".to_string()
    } else {
        base
    };

    let mut candidate = base.clone();
    let mut suffix = 2;
    loop {
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM facets WHERE slug = ?")
            .bind(&candidate)
            .fetch_optional(pool)
            .await?;
        match taken {
            Some(id) if Some(id) != existing_id => {
                candidate = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            _ => return Ok(candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("El Alquimista"), "el-alquimista");
        assert_eq!(slugify("  Leading & Trailing!  "), "leading-trailing");
        assert_eq!(slugify("already-slugged"), "already-slugged");
    }

    #[test]
    fn slugify_drops_non_ascii() {
        assert_eq!(slugify("Año Nuevo"), "a-o-nuevo");
        assert_eq!(slugify("!!!"), "");
    }
}

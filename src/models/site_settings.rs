// Site-wide configuration: a single well-known row plus an in-process cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tokio::sync::RwLock;

use crate::error::AppResult;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SiteSettings {
    pub id: i64,
    pub site_name: String,
    pub logo: Option<String>,
    pub hero_image: Option<String>,
    pub hero_video: Option<String>,
    pub hero_text: String,
    pub hero_subtitle: String,
    pub description: String,
    pub contact_email: String,
    pub phone: String,
    pub address: String,
    pub facebook_url: String,
    pub instagram_url: String,
    pub twitter_url: String,
    pub linkedin_url: String,
    pub youtube_url: String,
    pub updated_at: DateTime<Utc>,
}

impl SiteSettings {
    /// Load the settings row, creating it with defaults on first access.
    pub async fn load(pool: &SqlitePool) -> AppResult<Self> {
        sqlx::query(
            "INSERT OR IGNORE INTO site_settings (id, hero_text, updated_at) VALUES (1, 'PORTFOLIO', ?)",
        )
        .bind(Utc::now())
        .execute(pool)
        .await?;

        let settings = sqlx::query_as::<_, SiteSettings>("SELECT * FROM site_settings WHERE id = 1")
            .fetch_one(pool)
            .await?;
        Ok(settings)
    }

    /// Persist the full row. Timestamps the update.
    pub async fn save(&mut self, pool: &SqlitePool) -> AppResult<()> {
        self.updated_at = Utc::now();
        sqlx::query(
            r#"
            UPDATE site_settings SET
                site_name = ?, logo = ?, hero_image = ?, hero_video = ?,
                hero_text = ?, hero_subtitle = ?, description = ?,
                contact_email = ?, phone = ?, address = ?,
                facebook_url = ?, instagram_url = ?, twitter_url = ?,
                linkedin_url = ?, youtube_url = ?, updated_at = ?
            WHERE id = 1
            "#,
        )
        .bind(&self.site_name)
        .bind(&self.logo)
        .bind(&self.hero_image)
        .bind(&self.hero_video)
        .bind(&self.hero_text)
        .bind(&self.hero_subtitle)
        .bind(&self.description)
        .bind(&self.contact_email)
        .bind(&self.phone)
        .bind(&self.address)
        .bind(&self.facebook_url)
        .bind(&self.instagram_url)
        .bind(&self.twitter_url)
        .bind(&self.linkedin_url)
        .bind(&self.youtube_url)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Cached copy of the settings row, loaded once at startup and refreshed
/// whenever staff save a change.
pub struct SettingsCache {
    inner: RwLock<SiteSettings>,
}

impl SettingsCache {
    pub async fn load(pool: &SqlitePool) -> AppResult<Self> {
        let settings = SiteSettings::load(pool).await?;
        Ok(Self {
            inner: RwLock::new(settings),
        })
    }

    pub async fn get(&self) -> SiteSettings {
        self.inner.read().await.clone()
    }

    /// Re-read the row after a write.
    pub async fn refresh(&self, pool: &SqlitePool) -> AppResult<SiteSettings> {
        let settings = SiteSettings::load(pool).await?;
        *self.inner.write().await = settings.clone();
        Ok(settings)
    }
}

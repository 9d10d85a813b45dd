use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::{
    config::Config,
    database,
    infrastructure::{
        mailer::{LogMailer, Mailer},
        rate_limit::RateLimiter,
        storage::{FileStorage, LocalFileStorage},
    },
    models::site_settings::SettingsCache,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub settings: Arc<SettingsCache>,
    pub contact_limiter: Arc<RateLimiter>,
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = database::connect(&config.database.url).await?;
        database::init_schema(&pool).await?;
        Self::with_pool(config, pool).await
    }

    /// Build state over an existing pool. Tests use this with an in-memory
    /// database.
    pub async fn with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let settings = Arc::new(SettingsCache::load(&pool).await?);
        let contact_limiter = Arc::new(RateLimiter::new(
            config.contact.rate_limit,
            Duration::from_secs(config.contact.rate_window_secs),
            config.contact.rate_capacity,
        ));
        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(&config.media.root));

        Ok(Self {
            pool,
            config,
            settings,
            contact_limiter,
            mailer: Arc::new(LogMailer),
            storage,
        })
    }
}

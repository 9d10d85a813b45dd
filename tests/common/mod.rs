// Shared setup for integration tests: application state over a fresh
// in-memory database.

use portfolio_cms::{
    app_state::AppState,
    config::Config,
    database,
    models::facet::{Facet, FacetFields},
};
use sqlx::SqlitePool;

pub async fn test_state() -> AppState {
    let pool = database::connect_in_memory().await.unwrap();
    let mut config = Config::from_env().unwrap();
    config.media.root = std::env::temp_dir()
        .join("portfolio-cms-tests")
        .to_string_lossy()
        .into_owned();
    AppState::with_pool(config, pool).await.unwrap()
}

pub async fn make_facet(pool: &SqlitePool, title: &str, sort_order: i64) -> Facet {
    Facet::create(
        pool,
        &FacetFields {
            title: title.to_string(),
            description: String::new(),
            background_color: String::new(),
            sort_order,
            slug: None,
            active: true,
        },
    )
    .await
    .unwrap()
}

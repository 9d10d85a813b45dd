// Staff dashboard: entity counts and the latest activity.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::models::contact::ContactMessage;
use crate::models::facet::Facet;

pub async fn dashboard(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let pool = &state.pool;

    let total_facets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facets")
        .fetch_one(pool)
        .await?;
    let active_facets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facets WHERE active = 1")
        .fetch_one(pool)
        .await?;
    let total_milestones: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM milestones")
        .fetch_one(pool)
        .await?;
    let active_milestones: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM milestones WHERE active = 1")
            .fetch_one(pool)
            .await?;
    let unread_messages = ContactMessage::unread_count(pool).await?;
    let total_messages = ContactMessage::count(pool).await?;

    let recent_facets = sqlx::query_as::<_, Facet>(
        "SELECT * FROM facets ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(pool)
    .await?;
    let recent_messages = ContactMessage::recent(pool, 5).await?;

    Ok(Json(json!({
        "stats": {
            "total_facets": total_facets,
            "active_facets": active_facets,
            "total_milestones": total_milestones,
            "active_milestones": active_milestones,
            "unread_messages": unread_messages,
            "total_messages": total_messages,
        },
        "recent_facets": recent_facets,
        "recent_messages": recent_messages,
    })))
}

// Self-service facet preference management for signed-in users.

use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::infrastructure::middleware::AuthContext;
use crate::models::facet::Facet;
use crate::models::user::{PreferenceEntry, UserFacetPreference};

#[derive(Debug, Deserialize)]
pub struct PreferenceSubmission {
    #[serde(default)]
    pub facets: Vec<PreferenceEntry>,
}

/// Every active facet annotated with the caller's selection state and
/// priority, for the management form.
pub async fn manage_facets_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    uri: Uri,
) -> Response {
    let current = match super::current_or_login(&ctx, uri.path()) {
        Ok(current) => current,
        Err(redirect) => return redirect,
    };

    let result: Result<_, AppError> = async {
        let facets = Facet::list_active(&state.pool).await?;
        let preferences = UserFacetPreference::for_user(&state.pool, current.user.id).await?;
        Ok((facets, preferences))
    }
    .await;

    match result {
        Ok((facets, preferences)) => {
            let facets_data: Vec<_> = facets
                .into_iter()
                .map(|facet| {
                    let selected = preferences.iter().find(|p| p.facet_id == facet.id);
                    json!({
                        "facet": facet,
                        "is_selected": selected.is_some(),
                        "priority": selected.map(|p| p.priority).unwrap_or(0),
                    })
                })
                .collect();
            Json(json!({ "facets": facets_data })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Replace the caller's preference set with the submitted one.
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    uri: Uri,
    Json(submission): Json<PreferenceSubmission>,
) -> Response {
    let current = match super::current_or_login(&ctx, uri.path()) {
        Ok(current) => current,
        Err(redirect) => return redirect,
    };

    match UserFacetPreference::replace_for_user(&state.pool, current.user.id, &submission.facets)
        .await
    {
        Ok(_) => super::notice("Your facet preferences have been updated.").into_response(),
        Err(err) => err.into_response(),
    }
}

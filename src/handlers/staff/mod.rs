// Staff administrative panel. Every route here sits behind the staff guard.

pub mod dashboard;
pub mod facets;
pub mod materials;
pub mod messages;
pub mod milestones;
pub mod site_settings;
pub mod users;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::infrastructure::middleware::require_staff;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route(
            "/settings",
            get(site_settings::show).put(site_settings::update),
        )
        .route("/facets", get(facets::list).post(facets::create))
        .route(
            "/facets/{id}",
            get(facets::detail).put(facets::update).delete(facets::delete),
        )
        .route("/facets/{id}/milestones", get(milestones::list_for_facet))
        .route("/milestones", get(milestones::list).post(milestones::create))
        .route(
            "/milestones/{id}",
            get(milestones::detail)
                .put(milestones::update)
                .delete(milestones::delete),
        )
        .route(
            "/milestones/{id}/images",
            get(milestones::list_images).post(milestones::add_image),
        )
        .route(
            "/milestone-images/{id}",
            put(milestones::update_image).delete(milestones::delete_image),
        )
        .route("/messages", get(messages::list))
        .route(
            "/messages/{id}",
            get(messages::detail).delete(messages::delete),
        )
        .route("/messages/{id}/read", post(messages::mark_read))
        .route("/messages/{id}/reply", post(messages::reply))
        .route("/topics", get(materials::list_topics).post(materials::create_topic))
        .route(
            "/topics/{id}",
            get(materials::topic_detail)
                .put(materials::update_topic)
                .delete(materials::delete_topic),
        )
        .route(
            "/materials",
            get(materials::list).post(materials::create),
        )
        .route(
            "/materials/{id}",
            get(materials::detail)
                .put(materials::update)
                .delete(materials::delete),
        )
        .route("/users", get(users::list))
        .route("/users/{id}", put(users::update).delete(users::delete))
        .layer(middleware::from_fn(require_staff))
}

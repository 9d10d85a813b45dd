// Behavior of the public facet tree: ordering, preference filtering, and the
// derived slide count.

mod common;

use portfolio_cms::models::milestone::{ImageSize, Milestone, MilestoneFields, MilestoneImage};
use portfolio_cms::models::user::{PreferenceEntry, UserFacetPreference};
use portfolio_cms::services::content::assemble_facets;
use portfolio_cms::services::registration::{register, RegistrationForm};

use common::{make_facet, test_state};

fn milestone_fields(facet_id: i64, title: &str, sort_order: i64, active: bool) -> MilestoneFields {
    MilestoneFields {
        facet_id,
        title: title.to_string(),
        description: String::new(),
        year: Some(2020),
        video_url: None,
        image_size: ImageSize::Medium,
        sort_order,
        active,
    }
}

fn registration(username: &str, facets: Vec<PreferenceEntry>) -> RegistrationForm {
    RegistrationForm {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "sufficiently-long".to_string(),
        password_confirm: "sufficiently-long".to_string(),
        role: Default::default(),
        display_name: String::new(),
        external_id: String::new(),
        city: String::new(),
        facets,
    }
}

#[tokio::test]
async fn total_slides_is_one_plus_active_milestones() {
    let state = test_state().await;
    let facet = make_facet(&state.pool, "Alchemy", 0).await;

    for i in 0..3 {
        Milestone::create(&state.pool, &milestone_fields(facet.id, &format!("m{}", i), i, true))
            .await
            .unwrap();
    }
    // an inactive milestone must not count
    Milestone::create(&state.pool, &milestone_fields(facet.id, "hidden", 9, false))
        .await
        .unwrap();

    let views = assemble_facets(&state.pool, None).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].milestones.len(), 3);
    assert_eq!(views[0].total_slides, 4);
}

#[tokio::test]
async fn anonymous_sees_all_active_facets_in_configured_order() {
    let state = test_state().await;
    let second = make_facet(&state.pool, "Second", 2).await;
    let first = make_facet(&state.pool, "First", 1).await;
    let hidden = make_facet(&state.pool, "Hidden", 0).await;
    sqlx::query("UPDATE facets SET active = 0 WHERE id = ?")
        .bind(hidden.id)
        .execute(&state.pool)
        .await
        .unwrap();

    let views = assemble_facets(&state.pool, None).await.unwrap();
    let ids: Vec<i64> = views.iter().map(|v| v.facet.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn preferences_filter_and_reorder_the_tree() {
    let state = test_state().await;
    let a = make_facet(&state.pool, "A", 0).await;
    let b = make_facet(&state.pool, "B", 1).await;
    let c = make_facet(&state.pool, "C", 2).await;

    let user = register(
        &state,
        &registration(
            "prefuser",
            vec![
                PreferenceEntry { facet_id: b.id, priority: 0 },
                PreferenceEntry { facet_id: a.id, priority: 1 },
            ],
        ),
    )
    .await
    .unwrap();

    let views = assemble_facets(&state.pool, Some(user.id)).await.unwrap();
    let ids: Vec<i64> = views.iter().map(|v| v.facet.id).collect();
    // exactly the preferred facets, priority order beating configured order,
    // and never a facet outside the preference set
    assert_eq!(ids, vec![b.id, a.id]);
    assert!(!ids.contains(&c.id));
}

#[tokio::test]
async fn zero_preferences_means_an_empty_tree() {
    let state = test_state().await;
    make_facet(&state.pool, "Visible", 0).await;

    let user = register(&state, &registration("loner", Vec::new()))
        .await
        .unwrap();

    let views = assemble_facets(&state.pool, Some(user.id)).await.unwrap();
    assert!(views.is_empty());
}

#[tokio::test]
async fn registration_preferences_drive_index_order() {
    let state = test_state().await;
    // A sorts after B by configured order; the preference priorities must win
    let a = make_facet(&state.pool, "A", 5).await;
    let b = make_facet(&state.pool, "B", 1).await;

    let user = register(
        &state,
        &registration(
            "ordered",
            vec![
                PreferenceEntry { facet_id: a.id, priority: 0 },
                PreferenceEntry { facet_id: b.id, priority: 1 },
            ],
        ),
    )
    .await
    .unwrap();

    let prefs = UserFacetPreference::for_user(&state.pool, user.id)
        .await
        .unwrap();
    assert_eq!(prefs.len(), 2);

    let views = assemble_facets(&state.pool, Some(user.id)).await.unwrap();
    let ids: Vec<i64> = views.iter().map(|v| v.facet.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[tokio::test]
async fn inactive_facet_ids_are_skipped_at_registration() {
    let state = test_state().await;
    let active = make_facet(&state.pool, "Active", 0).await;
    let inactive = make_facet(&state.pool, "Inactive", 1).await;
    sqlx::query("UPDATE facets SET active = 0 WHERE id = ?")
        .bind(inactive.id)
        .execute(&state.pool)
        .await
        .unwrap();

    let user = register(
        &state,
        &registration(
            "skipper",
            vec![
                PreferenceEntry { facet_id: active.id, priority: 0 },
                PreferenceEntry { facet_id: inactive.id, priority: 1 },
                PreferenceEntry { facet_id: 9999, priority: 2 },
            ],
        ),
    )
    .await
    .unwrap();

    let prefs = UserFacetPreference::for_user(&state.pool, user.id)
        .await
        .unwrap();
    assert_eq!(prefs.len(), 1);
    assert_eq!(prefs[0].facet_id, active.id);
}

#[tokio::test]
async fn milestone_gallery_images_come_back_in_order() {
    let state = test_state().await;
    let facet = make_facet(&state.pool, "Gallery", 0).await;
    let milestone = Milestone::create(&state.pool, &milestone_fields(facet.id, "m", 0, true))
        .await
        .unwrap();

    MilestoneImage::create(&state.pool, milestone.id, "milestones/gallery/b.jpg", 2)
        .await
        .unwrap();
    MilestoneImage::create(&state.pool, milestone.id, "milestones/gallery/a.jpg", 1)
        .await
        .unwrap();
    let hidden = MilestoneImage::create(&state.pool, milestone.id, "milestones/gallery/x.jpg", 0)
        .await
        .unwrap();
    MilestoneImage::update(&state.pool, hidden.id, 0, false)
        .await
        .unwrap();

    let views = assemble_facets(&state.pool, None).await.unwrap();
    let images = &views[0].milestones[0].images;
    let paths: Vec<&str> = images.iter().map(|i| i.image.as_str()).collect();
    assert_eq!(
        paths,
        vec!["milestones/gallery/a.jpg", "milestones/gallery/b.jpg"]
    );
}

#[tokio::test]
async fn video_urls_surface_as_embeds() {
    let state = test_state().await;
    let facet = make_facet(&state.pool, "Videos", 0).await;
    let mut fields = milestone_fields(facet.id, "talk", 0, true);
    fields.video_url = Some("https://youtu.be/dQw4w9WgXcQ".to_string());
    Milestone::create(&state.pool, &fields).await.unwrap();

    let views = assemble_facets(&state.pool, None).await.unwrap();
    let embed = views[0].milestones[0].video_embed.as_ref().unwrap();
    assert_eq!(embed.video_id.as_deref(), Some("dQw4w9WgXcQ"));
}

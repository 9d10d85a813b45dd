// Staff-side behavior: cascading deletes, material attachment validation,
// permission gating, message replies, and contact intake limits.

mod common;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, Json, State};
use portfolio_cms::error::AppError;
use portfolio_cms::handlers::public::submit_contact;
use portfolio_cms::models::contact::{ContactFields, ContactMessage};
use portfolio_cms::models::facet::{Facet, FacetFields};
use portfolio_cms::models::material::{
    AttachmentChange, Material, MaterialFields, MaterialVideo, Topic, TopicFields,
};
use portfolio_cms::models::milestone::{ImageSize, Milestone, MilestoneFields, MilestoneImage};
use portfolio_cms::models::user::{Role, User};
use portfolio_cms::services::registration::{register, RegistrationForm};

use common::{make_facet, test_state};

fn registration(username: &str) -> RegistrationForm {
    RegistrationForm {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "sufficiently-long".to_string(),
        password_confirm: "sufficiently-long".to_string(),
        role: Role::Visitor,
        display_name: String::new(),
        external_id: String::new(),
        city: String::new(),
        facets: Vec::new(),
    }
}

fn contact(name: &str) -> ContactFields {
    ContactFields {
        name: name.to_string(),
        email: "visitor@example.com".to_string(),
        body: "A perfectly reasonable message.".to_string(),
    }
}

#[tokio::test]
async fn deleting_a_facet_cascades_to_milestones_and_images() {
    let state = test_state().await;
    let facet = make_facet(&state.pool, "Doomed", 0).await;
    let milestone = Milestone::create(
        &state.pool,
        &MilestoneFields {
            facet_id: facet.id,
            title: "m".to_string(),
            description: String::new(),
            year: None,
            video_url: None,
            image_size: ImageSize::Medium,
            sort_order: 0,
            active: true,
        },
    )
    .await
    .unwrap();
    MilestoneImage::create(&state.pool, milestone.id, "milestones/gallery/a.jpg", 0)
        .await
        .unwrap();

    Facet::delete(&state.pool, facet.id).await.unwrap();

    let milestones: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM milestones")
        .fetch_one(&state.pool)
        .await
        .unwrap();
    let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM milestone_images")
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!((milestones, images), (0, 0));
}

#[tokio::test]
async fn video_attachment_needs_url_or_file() {
    let state = test_state().await;
    let topic = Topic::create(
        &state.pool,
        &TopicFields {
            title: "Topic".to_string(),
            description: String::new(),
            sort_order: 0,
            active: true,
        },
    )
    .await
    .unwrap();

    let bare_video = AttachmentChange {
        label: "no source".to_string(),
        ..Default::default()
    };
    let err = Material::create(
        &state.pool,
        &MaterialFields {
            topic_id: topic.id,
            title: "Mat".to_string(),
            description: String::new(),
            sort_order: 0,
            active: true,
        },
        &[],
        &[bare_video],
        &[],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // the failed attachment rolled back the whole creation
    let materials: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials")
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(materials, 0);

    // with a URL the same submission goes through
    let with_url = AttachmentChange {
        label: "talk".to_string(),
        url: Some("https://vimeo.com/123".to_string()),
        active: true,
        ..Default::default()
    };
    let material = Material::create(
        &state.pool,
        &MaterialFields {
            topic_id: topic.id,
            title: "Mat".to_string(),
            description: String::new(),
            sort_order: 0,
            active: true,
        },
        &[],
        &[with_url],
        &[],
    )
    .await
    .unwrap();

    let videos = MaterialVideo::list_by_material(&state.pool, material.id)
        .await
        .unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].url.as_deref(), Some("https://vimeo.com/123"));
}

#[tokio::test]
async fn attachment_batch_updates_and_deletes_in_place() {
    let state = test_state().await;
    let topic = Topic::create(
        &state.pool,
        &TopicFields {
            title: "T".to_string(),
            description: String::new(),
            sort_order: 0,
            active: true,
        },
    )
    .await
    .unwrap();
    let fields = MaterialFields {
        topic_id: topic.id,
        title: "Mat".to_string(),
        description: String::new(),
        sort_order: 0,
        active: true,
    };

    let material = Material::create(
        &state.pool,
        &fields,
        &[],
        &[
            AttachmentChange {
                label: "keep".to_string(),
                url: Some("https://vimeo.com/1".to_string()),
                active: true,
                ..Default::default()
            },
            AttachmentChange {
                label: "drop".to_string(),
                url: Some("https://vimeo.com/2".to_string()),
                active: true,
                ..Default::default()
            },
        ],
        &[],
    )
    .await
    .unwrap();

    let videos = MaterialVideo::list_by_material(&state.pool, material.id)
        .await
        .unwrap();
    let keep = videos.iter().find(|v| v.label == "keep").unwrap();
    let drop = videos.iter().find(|v| v.label == "drop").unwrap();

    // one submission renames the first and deletes the second
    Material::update(
        &state.pool,
        material.id,
        &fields,
        &[],
        &[
            AttachmentChange {
                id: Some(keep.id),
                label: "renamed".to_string(),
                sort_order: 3,
                active: true,
                ..Default::default()
            },
            AttachmentChange {
                id: Some(drop.id),
                delete: true,
                ..Default::default()
            },
        ],
        &[],
    )
    .await
    .unwrap();

    let videos = MaterialVideo::list_by_material(&state.pool, material.id)
        .await
        .unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].label, "renamed");
    assert_eq!(videos[0].sort_order, 3);
    // the URL survives an update that did not resubmit it
    assert_eq!(videos[0].url.as_deref(), Some("https://vimeo.com/1"));
}

#[tokio::test]
async fn superuser_flag_requires_a_superuser_actor() {
    let state = test_state().await;
    let target = register(&state, &registration("target")).await.unwrap();

    // a plain staff member cannot escalate the flag; the attempt is ignored
    let updated = User::apply_permissions(&state.pool, target.id, true, Some(true), false)
        .await
        .unwrap();
    assert!(updated.is_staff);
    assert!(!updated.is_superuser);

    // a superuser can
    let updated = User::apply_permissions(&state.pool, target.id, true, Some(true), true)
        .await
        .unwrap();
    assert!(updated.is_superuser);

    // and can revoke it again
    let updated = User::apply_permissions(&state.pool, target.id, true, Some(false), true)
        .await
        .unwrap();
    assert!(!updated.is_superuser);
}

#[tokio::test]
async fn contact_intake_caps_at_ten_per_hour_per_ip() {
    let state = test_state().await;
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)), 40000);

    for i in 0..10 {
        submit_contact(
            State(state.clone()),
            ConnectInfo(addr),
            Json(contact(&format!("Visitor {}", i))),
        )
        .await
        .unwrap();
    }

    let err = match submit_contact(State(state.clone()), ConnectInfo(addr), Json(contact("Eleventh")))
        .await
    {
        Ok(_) => panic!("expected the eleventh submission to be rejected"),
        Err(e) => e,
    };
    assert!(matches!(err, AppError::TooManyRequests(_)));

    // the rejected submission persisted nothing
    let count = ContactMessage::count(&state.pool).await.unwrap();
    assert_eq!(count, 10);

    // another address is unaffected
    let other = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 8)), 40000);
    submit_contact(State(state.clone()), ConnectInfo(other), Json(contact("Someone Else")))
        .await
        .unwrap();
}

#[tokio::test]
async fn replying_stamps_time_and_marks_read() {
    let state = test_state().await;
    let message = ContactMessage::create(&state.pool, &contact("Asker")).await.unwrap();
    assert!(!message.read);

    let replied = ContactMessage::reply(&state.pool, message.id, "Thanks for writing.")
        .await
        .unwrap();
    assert!(replied.read);
    assert_eq!(replied.reply.as_deref(), Some("Thanks for writing."));
    assert!(replied.replied_at.is_some());

    // an empty reply is rejected
    assert!(ContactMessage::reply(&state.pool, message.id, "   ").await.is_err());
}

#[tokio::test]
async fn slugs_derive_from_titles_and_uniquify() {
    let state = test_state().await;
    let first = make_facet(&state.pool, "The Leader", 0).await;
    assert_eq!(first.slug, "the-leader");

    let second = make_facet(&state.pool, "The Leader", 1).await;
    assert_eq!(second.slug, "the-leader-2");

    // an explicit slug wins over derivation
    let explicit = Facet::create(
        &state.pool,
        &FacetFields {
            title: "Different Title".to_string(),
            description: String::new(),
            background_color: String::new(),
            sort_order: 2,
            slug: Some("custom-slug".to_string()),
            active: true,
        },
    )
    .await
    .unwrap();
    assert_eq!(explicit.slug, "custom-slug");
}

#[tokio::test]
async fn settings_cache_refreshes_after_save() {
    let state = test_state().await;
    let mut settings = state.settings.get().await;
    settings.site_name = "RENAMED".to_string();
    settings.save(&state.pool).await.unwrap();

    // the cache still holds the old copy until it is refreshed
    state.settings.refresh(&state.pool).await.unwrap();
    assert_eq!(state.settings.get().await.site_name, "RENAMED");
}

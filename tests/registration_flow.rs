// Registration, sessions, and preference management.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use portfolio_cms::error::{AppError, AppResult};
use portfolio_cms::infrastructure::mailer::{Mailer, OutboundEmail};
use portfolio_cms::infrastructure::password::verify_password;
use portfolio_cms::infrastructure::session::Session;
use portfolio_cms::models::user::{
    PreferenceEntry, Role, User, UserFacetPreference, UserProfile,
};
use portfolio_cms::services::registration::{register, RegistrationForm};

use common::{make_facet, test_state};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> AppResult<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Transport that always fails, to prove registration survives it.
struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: OutboundEmail) -> AppResult<()> {
        Err(AppError::Internal("mail transport down".to_string()))
    }
}

fn form(username: &str) -> RegistrationForm {
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

#[tokio::test]
async fn registration_creates_user_profile_and_hashed_credential() {
    let state = test_state().await;
    let mut submitted = form("ana");
    submitted.role = Role::Student;
    submitted.display_name = "Ana".to_string();
    submitted.city = "Santiago".to_string();

    let user = register(&state, &submitted).await.unwrap();
    assert!(!user.is_staff);
    assert!(verify_password("sufficiently-long", &user.password_hash));

    let profile = UserProfile::for_user(&state.pool, user.id).await.unwrap();
    assert_eq!(profile.role, Role::Student);
    assert_eq!(profile.display_name, "Ana");
    assert_eq!(profile.city, "Santiago");
}

#[tokio::test]
async fn duplicate_username_and_email_are_rejected() {
    let state = test_state().await;
    register(&state, &form("taken")).await.unwrap();

    let err = register(&state, &form("taken")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let mut same_email = form("someone-else");
    same_email.email = "taken@example.com".to_string();
    let err = register(&state, &same_email).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn weak_credentials_are_rejected() {
    let state = test_state().await;

    let mut short = form("shorty");
    short.password = "abc".to_string();
    short.password_confirm = "abc".to_string();
    assert!(register(&state, &short).await.is_err());

    let mut numeric = form("digits");
    numeric.password = "1234567890".to_string();
    numeric.password_confirm = "1234567890".to_string();
    assert!(register(&state, &numeric).await.is_err());

    let mut mismatch = form("mismatch");
    mismatch.password_confirm = "something-else-entirely".to_string();
    assert!(register(&state, &mismatch).await.is_err());

    let mut bad_name = form("no");
    assert!(register(&state, &bad_name).await.is_err());
    bad_name.username = "bad name!".to_string();
    assert!(register(&state, &bad_name).await.is_err());
}

#[tokio::test]
async fn welcome_email_carries_name_and_role() {
    let mut state = test_state().await;
    let recorder = Arc::new(RecordingMailer::default());
    state.mailer = recorder.clone();

    let mut submitted = form("student1");
    submitted.role = Role::Student;
    submitted.display_name = "Estudiante Uno".to_string();
    register(&state, &submitted).await.unwrap();

    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "student1@example.com");
    assert!(sent[0].body.contains("Estudiante Uno"));
    assert!(sent[0].body.contains("Student"));
}

#[tokio::test]
async fn mail_failure_does_not_abort_registration() {
    let mut state = test_state().await;
    state.mailer = Arc::new(FailingMailer);

    let user = register(&state, &form("undeterred")).await.unwrap();
    assert!(User::by_id(&state.pool, user.id).await.is_ok());
}

#[tokio::test]
async fn sessions_round_trip_and_expire() {
    let state = test_state().await;
    let user = register(&state, &form("sessioner")).await.unwrap();

    let session = Session::create(&state.pool, user.id, 3600).await.unwrap();
    assert_eq!(
        Session::resolve(&state.pool, &session.token).await.unwrap(),
        Some(user.id)
    );

    // an already-expired session resolves to anonymous and is purged
    let expired = Session::create(&state.pool, user.id, -10).await.unwrap();
    assert_eq!(
        Session::resolve(&state.pool, &expired.token).await.unwrap(),
        None
    );

    Session::delete(&state.pool, &session.token).await.unwrap();
    assert_eq!(
        Session::resolve(&state.pool, &session.token).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn preference_replacement_removes_unselected_and_upserts() {
    let state = test_state().await;
    let a = make_facet(&state.pool, "A", 0).await;
    let b = make_facet(&state.pool, "B", 1).await;
    let user = register(&state, &form("chooser")).await.unwrap();

    UserFacetPreference::replace_for_user(
        &state.pool,
        user.id,
        &[
            PreferenceEntry { facet_id: a.id, priority: 0 },
            PreferenceEntry { facet_id: b.id, priority: 1 },
        ],
    )
    .await
    .unwrap();

    // drop A, bump B's priority
    UserFacetPreference::replace_for_user(
        &state.pool,
        user.id,
        &[PreferenceEntry { facet_id: b.id, priority: 0 }],
    )
    .await
    .unwrap();

    let prefs = UserFacetPreference::for_user(&state.pool, user.id)
        .await
        .unwrap();
    assert_eq!(prefs.len(), 1);
    assert_eq!(prefs[0].facet_id, b.id);
    assert_eq!(prefs[0].priority, 0);

    // an empty submission clears everything
    UserFacetPreference::replace_for_user(&state.pool, user.id, &[])
        .await
        .unwrap();
    let prefs = UserFacetPreference::for_user(&state.pool, user.id)
        .await
        .unwrap();
    assert!(prefs.is_empty());
}

#[tokio::test]
async fn deleting_a_user_cascades_to_profile_preferences_and_sessions() {
    let state = test_state().await;
    let facet = make_facet(&state.pool, "F", 0).await;
    let mut submitted = form("goner");
    submitted.facets = vec![PreferenceEntry { facet_id: facet.id, priority: 0 }];
    let user = register(&state, &submitted).await.unwrap();
    Session::create(&state.pool, user.id, 3600).await.unwrap();

    User::delete(&state.pool, user.id).await.unwrap();

    let profiles: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_profiles WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(&state.pool)
            .await
            .unwrap();
    let prefs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_facet_preferences WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(&state.pool)
            .await
            .unwrap();
    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ?")
        .bind(user.id)
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!((profiles, prefs, sessions), (0, 0, 0));
}

// Account registration: validation, the single transaction creating the
// user, its profile, and any facet preferences, and the best-effort welcome
// notification.

use chrono::Utc;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::infrastructure::mailer::welcome_email;
use crate::infrastructure::password::hash_password;
use crate::models::user::{filter_active_facets, PreferenceEntry, Role, User};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 150;
pub const PASSWORD_MIN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub city: String,
    /// Facets the registrant opted into, with their chosen priorities.
    #[serde(default)]
    pub facets: Vec<PreferenceEntry>,
}

fn valid_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

pub fn validate(form: &RegistrationForm) -> AppResult<()> {
    let username = form.username.trim();
    let len = username.chars().count();
    if len < USERNAME_MIN || len > USERNAME_MAX {
        return Err(AppError::Validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username.chars().all(valid_username_char) {
        return Err(AppError::Validation(
            "Username may only contain letters, digits and @ . + - _".to_string(),
        ));
    }
    let email = form.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "A valid email address is required".to_string(),
        ));
    }
    if form.password.chars().count() < PASSWORD_MIN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN
        )));
    }
    if form.password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password must not be entirely numeric".to_string(),
        ));
    }
    if form.password != form.password_confirm {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}

/// Create the account. User, profile, and preference rows land in one
/// transaction, so a mid-sequence failure leaves nothing behind. Preference
/// entries whose facet is missing or inactive are skipped silently. The
/// welcome notification is sent after commit and its failure is logged and
/// swallowed.
pub async fn register(state: &AppState, form: &RegistrationForm) -> AppResult<User> {
    validate(form)?;

    let username = form.username.trim();
    let email = form.email.trim();
    if User::username_taken(&state.pool, username).await? {
        return Err(AppError::Validation(
            "This username is already in use".to_string(),
        ));
    }
    if User::email_taken(&state.pool, email).await? {
        return Err(AppError::Validation(
            "This email address is already registered".to_string(),
        ));
    }

    let preferences = filter_active_facets(&state.pool, &form.facets).await?;
    let password_hash = hash_password(&form.password)?;
    let now = Utc::now();

    let mut tx = state.pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, is_staff, is_superuser, created_at) VALUES (?, ?, ?, 0, 0, ?)",
    )
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    let user_id = result.last_insert_rowid();

    sqlx::query(
        "INSERT INTO user_profiles (user_id, role, display_name, external_id, city) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(form.role)
    .bind(form.display_name.trim())
    .bind(form.external_id.trim())
    .bind(form.city.trim())
    .execute(&mut *tx)
    .await?;

    for entry in &preferences {
        sqlx::query(
            "INSERT INTO user_facet_preferences (user_id, facet_id, priority, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(entry.facet_id)
        .bind(entry.priority)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let user = User::by_id(&state.pool, user_id).await?;
    send_welcome(state, &user, form).await;
    Ok(user)
}

async fn send_welcome(state: &AppState, user: &User, form: &RegistrationForm) {
    let settings = state.settings.get().await;
    let display_name = if form.display_name.trim().is_empty() {
        user.username.as_str()
    } else {
        form.display_name.trim()
    };
    let email = welcome_email(
        &user.email,
        display_name,
        form.role,
        &settings,
        &state.config.server.site_url,
    );
    if let Err(err) = state.mailer.send(email).await {
        tracing::warn!("Welcome email for {} failed: {}", user.username, err);
    }
}

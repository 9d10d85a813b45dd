// Accounts, profiles, and per-user facet preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppError, AppResult};

/// Account role. Students get the gated class-material section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Visitor,
    Student,
}

impl Default for Role {
    fn default() -> Self {
        Role::Visitor
    }
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Visitor => "Visitor",
            Role::Student => "Student",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub role: Role,
    pub display_name: String,
    pub external_id: String,
    pub city: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserFacetPreference {
    pub user_id: i64,
    pub facet_id: i64,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
}

/// One entry of a submitted preference set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub facet_id: i64,
    pub priority: i64,
}

impl User {
    pub async fn by_id(pool: &SqlitePool, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn username_taken(pool: &SqlitePool, username: &str) -> AppResult<bool> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(existing.is_some())
    }

    pub async fn email_taken(pool: &SqlitePool, email: &str) -> AppResult<bool> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(existing.is_some())
    }

    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
            .fetch_all(pool)
            .await?;
        Ok(users)
    }

    pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Update the staff flag, and the superuser flag only when the acting user
    /// is a superuser. A non-superuser submitting the field is silently
    /// ignored rather than rejected.
    pub async fn apply_permissions(
        pool: &SqlitePool,
        id: i64,
        is_staff: bool,
        is_superuser: Option<bool>,
        actor_is_superuser: bool,
    ) -> AppResult<User> {
        User::by_id(pool, id).await?;
        sqlx::query("UPDATE users SET is_staff = ? WHERE id = ?")
            .bind(is_staff)
            .bind(id)
            .execute(pool)
            .await?;
        if actor_is_superuser {
            if let Some(flag) = is_superuser {
                sqlx::query("UPDATE users SET is_superuser = ? WHERE id = ?")
                    .bind(flag)
                    .bind(id)
                    .execute(pool)
                    .await?;
            }
        }
        User::by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }
}

impl UserProfile {
    /// The profile is created in the registration transaction, so for any
    /// existing user a missing row is a data-integrity error, not a state to
    /// repair at read time.
    pub async fn for_user(pool: &SqlitePool, user_id: i64) -> AppResult<UserProfile> {
        sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("User {} has no profile row", user_id))
            })
    }

    pub async fn update(
        pool: &SqlitePool,
        user_id: i64,
        role: Role,
        display_name: &str,
        external_id: &str,
        city: &str,
    ) -> AppResult<UserProfile> {
        let result = sqlx::query(
            "UPDATE user_profiles SET role = ?, display_name = ?, external_id = ?, city = ? WHERE user_id = ?",
        )
        .bind(role)
        .bind(display_name)
        .bind(external_id)
        .bind(city)
        .bind(user_id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Profile for user {} not found",
                user_id
            )));
        }
        UserProfile::for_user(pool, user_id).await
    }
}

impl UserFacetPreference {
    /// The user's preferences ordered by priority, then the facet's own order.
    pub async fn for_user(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<UserFacetPreference>> {
        let rows = sqlx::query_as::<_, UserFacetPreference>(
            r#"
            SELECT p.* FROM user_facet_preferences p
            JOIN facets f ON f.id = p.facet_id
            WHERE p.user_id = ?
            ORDER BY p.priority, f.sort_order
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Replace the user's preference set with the submitted one: preferences
    /// absent from the submission are removed, the rest created or updated in
    /// place. Entries whose facet is missing or inactive are skipped. Runs in
    /// one transaction.
    pub async fn replace_for_user(
        pool: &SqlitePool,
        user_id: i64,
        entries: &[PreferenceEntry],
    ) -> AppResult<usize> {
        let valid = filter_active_facets(pool, entries).await?;

        let mut tx = pool.begin().await?;

        if valid.is_empty() {
            sqlx::query("DELETE FROM user_facet_preferences WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        } else {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM user_facet_preferences WHERE user_id = ");
            builder.push_bind(user_id);
            builder.push(" AND facet_id NOT IN (");
            let mut separated = builder.separated(", ");
            for entry in &valid {
                separated.push_bind(entry.facet_id);
            }
            separated.push_unseparated(")");
            builder.build().execute(&mut *tx).await?;

            for entry in &valid {
                sqlx::query(
                    r#"
                    INSERT INTO user_facet_preferences (user_id, facet_id, priority, created_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT (user_id, facet_id) DO UPDATE SET priority = excluded.priority
                    "#,
                )
                .bind(user_id)
                .bind(entry.facet_id)
                .bind(entry.priority)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(valid.len())
    }
}

/// Drop submitted entries whose facet id does not resolve to an active facet.
pub(crate) async fn filter_active_facets(
    pool: &SqlitePool,
    entries: &[PreferenceEntry],
) -> AppResult<Vec<PreferenceEntry>> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id FROM facets WHERE active = 1 AND id IN (");
    let mut separated = builder.separated(", ");
    for entry in entries {
        separated.push_bind(entry.facet_id);
    }
    separated.push_unseparated(")");

    let active_ids: Vec<i64> = builder.build_query_scalar().fetch_all(pool).await?;

    Ok(entries
        .iter()
        .filter(|e| active_ids.contains(&e.facet_id))
        .cloned()
        .collect())
}

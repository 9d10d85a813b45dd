// Contact messages submitted from the public site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, AppResult};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 200;
pub const EMAIL_MAX: usize = 254;
pub const BODY_MIN: usize = 10;
pub const BODY_MAX: usize = 5000;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub body: String,
}

/// Field checks applied before anything touches the store.
pub fn validate(fields: &ContactFields) -> AppResult<()> {
    let name = fields.name.trim();
    if name.chars().count() < NAME_MIN || name.chars().count() > NAME_MAX {
        return Err(AppError::Validation(format!(
            "Name must be between {} and {} characters",
            NAME_MIN, NAME_MAX
        )));
    }
    let email = fields.email.trim();
    if email.is_empty() || !email.contains('@') || email.chars().count() > EMAIL_MAX {
        return Err(AppError::Validation(
            "A valid email address is required".to_string(),
        ));
    }
    let body = fields.body.trim();
    if body.chars().count() < BODY_MIN || body.chars().count() > BODY_MAX {
        return Err(AppError::Validation(format!(
            "Message must be between {} and {} characters",
            BODY_MIN, BODY_MAX
        )));
    }
    Ok(())
}

impl ContactMessage {
    pub async fn by_id(pool: &SqlitePool, id: i64) -> AppResult<ContactMessage> {
        sqlx::query_as::<_, ContactMessage>("SELECT * FROM contact_messages WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))
    }

    pub async fn create(pool: &SqlitePool, fields: &ContactFields) -> AppResult<ContactMessage> {
        validate(fields)?;
        let result = sqlx::query(
            "INSERT INTO contact_messages (name, email, body, created_at, read) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(fields.name.trim())
        .bind(fields.email.trim())
        .bind(fields.body.trim())
        .bind(Utc::now())
        .execute(pool)
        .await?;

        ContactMessage::by_id(pool, result.last_insert_rowid()).await
    }

    /// Newest first.
    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<ContactMessage>> {
        let rows = sqlx::query_as::<_, ContactMessage>(
            "SELECT * FROM contact_messages ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent(pool: &SqlitePool, limit: i64) -> AppResult<Vec<ContactMessage>> {
        let rows = sqlx::query_as::<_, ContactMessage>(
            "SELECT * FROM contact_messages ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn unread_count(pool: &SqlitePool) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE read = 0")
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    pub async fn mark_read(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("UPDATE contact_messages SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }
        Ok(())
    }

    /// Record a reply. Replying also marks the message read.
    pub async fn reply(pool: &SqlitePool, id: i64, reply: &str) -> AppResult<ContactMessage> {
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(AppError::Validation("Reply must not be empty".to_string()));
        }
        let result = sqlx::query(
            "UPDATE contact_messages SET reply = ?, replied_at = ?, read = 1 WHERE id = ?",
        )
        .bind(reply)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }
        ContactMessage::by_id(pool, id).await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str, email: &str, body: &str) -> ContactFields {
        ContactFields {
            name: name.to_string(),
            email: email.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn rejects_one_char_name() {
        let result = validate(&fields("a", "a@example.com", "a message long enough"));
        assert!(result.is_err());
    }

    #[test]
    fn accepts_200_char_name_rejects_201() {
        let ok = "x".repeat(200);
        assert!(validate(&fields(&ok, "a@example.com", "a message long enough")).is_ok());

        let too_long = "x".repeat(201);
        assert!(validate(&fields(&too_long, "a@example.com", "a message long enough")).is_err());
    }

    #[test]
    fn rejects_bad_email() {
        assert!(validate(&fields("name", "not-an-email", "a message long enough")).is_err());
        assert!(validate(&fields("name", "", "a message long enough")).is_err());
        let oversized = format!("{}@example.com", "x".repeat(250));
        assert!(validate(&fields("name", &oversized, "a message long enough")).is_err());
    }

    #[test]
    fn enforces_body_bounds() {
        assert!(validate(&fields("name", "a@example.com", "too short")).is_err());
        assert!(validate(&fields("name", "a@example.com", &"x".repeat(5001))).is_err());
        assert!(validate(&fields("name", "a@example.com", &"x".repeat(10))).is_ok());
    }
}

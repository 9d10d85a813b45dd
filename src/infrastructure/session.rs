// Cookie-backed sessions persisted in the store. Tokens are random bytes,
// URL-safe base64 encoded; lookups ignore expired rows and purge them
// opportunistically.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::{FromRow, SqlitePool};

use crate::error::AppResult;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub fn mint_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl Session {
    pub async fn create(pool: &SqlitePool, user_id: i64, ttl_secs: i64) -> AppResult<Session> {
        let now = Utc::now();
        let session = Session {
            token: mint_token(),
            user_id,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
        };
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(pool)
        .await?;
        Ok(session)
    }

    /// Resolve a token to its user id, ignoring expired rows.
    pub async fn resolve(pool: &SqlitePool, token: &str) -> AppResult<Option<i64>> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await?;

        match session {
            Some(s) if s.expires_at > Utc::now() => Ok(Some(s.user_id)),
            Some(s) => {
                sqlx::query("DELETE FROM sessions WHERE token = ?")
                    .bind(&s.token)
                    .execute(pool)
                    .await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn delete(pool: &SqlitePool, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// Pull a named cookie out of a `Cookie` request header value.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

pub fn session_cookie(token: &str, ttl_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, ttl_secs
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Short-lived, client-readable notice carried across a redirect. The text is
/// base64 encoded so it stays a valid cookie value.
pub fn flash_cookie(message: &str) -> String {
    format!(
        "{}={}; Path=/; SameSite=Lax; Max-Age=60",
        FLASH_COOKIE,
        URL_SAFE_NO_PAD.encode(message.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_token_is_unique_and_url_safe() {
        let a = mint_token();
        let b = mint_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let header = "theme=dark; session=abc123; other=1";
        assert_eq!(cookie_value(header, "session"), Some("abc123"));
        assert_eq!(cookie_value(header, "theme"), Some("dark"));
        assert_eq!(cookie_value(header, "missing"), None);
    }

    #[test]
    fn flash_cookie_value_stays_cookie_safe() {
        let cookie = flash_cookie("No permission for this section");
        let value = cookie
            .strip_prefix("flash=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert!(!value.is_empty());
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}

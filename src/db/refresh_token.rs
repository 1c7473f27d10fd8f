//! Refresh tokens backing the `/auth/refresh` rotation flow.

use chrono::{Duration, Utc};

use super::DbPool;
use crate::{MailroomError, Result};

/// Expiry timestamps use SQLite's own format so they compare with `datetime('now')`.
const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TOKEN_COLUMNS: &str = "id, user_id, token, expires_at, created_at, revoked_at";

/// Refresh token entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: String,
    pub created_at: String,
    /// Revocation timestamp (None if not revoked).
    pub revoked_at: Option<String>,
}

/// New refresh token for creation.
pub struct NewRefreshToken {
    pub user_id: i64,
    pub token: String,
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    pub expires_at: String,
}

impl NewRefreshToken {
    /// A token for `user_id` that expires `ttl_days` from now.
    pub fn expiring_in_days(user_id: i64, token: impl Into<String>, ttl_days: u64) -> Self {
        let expires_at = Utc::now() + Duration::days(ttl_days as i64);
        Self {
            user_id,
            token: token.into(),
            expires_at: expires_at.format(EXPIRY_FORMAT).to_string(),
        }
    }
}

/// Repository for refresh token operations.
pub struct RefreshTokenRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RefreshTokenRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a new refresh token.
    pub async fn create(&self, new_token: &NewRefreshToken) -> Result<RefreshToken> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(new_token.user_id)
        .bind(&new_token.token)
        .bind(&new_token.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        let sql = format!("SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE id = ?");
        sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// Look up a token regardless of state.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token = ?");
        sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// Look up a token that is neither expired nor revoked.
    pub async fn get_valid_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens
             WHERE token = ? AND revoked_at IS NULL AND expires_at > datetime('now')"
        );
        sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// Revoke a token. Returns false if it was unknown or already revoked.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(token)
        .execute(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke every live token of a user.
    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = datetime('now')
             WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Delete expired and revoked tokens.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens
             WHERE expires_at < datetime('now') OR revoked_at IS NOT NULL",
        )
        .execute(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, Role, UserRepository};
    use crate::Database;

    async fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("tokenuser", "hash", Role::RdDepartment))
            .await
            .unwrap();
        (db, user.id)
    }

    fn token(user_id: i64, value: &str, expires_at: &str) -> NewRefreshToken {
        NewRefreshToken {
            user_id,
            token: value.to_string(),
            expires_at: expires_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (db, user_id) = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());

        let created = repo
            .create(&NewRefreshToken::expiring_in_days(user_id, "abc", 7))
            .await
            .unwrap();
        assert_eq!(created.user_id, user_id);
        assert!(created.revoked_at.is_none());

        assert!(repo.get_by_token("abc").await.unwrap().is_some());
        assert!(repo.get_valid_token("abc").await.unwrap().is_some());
        assert!(repo.get_by_token("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_not_valid() {
        let (db, user_id) = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());
        repo.create(&token(user_id, "old", "2000-01-01 00:00:00"))
            .await
            .unwrap();

        assert!(repo.get_valid_token("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_token() {
        let (db, user_id) = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());
        repo.create(&token(user_id, "revoke-me", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        assert!(repo.revoke("revoke-me").await.unwrap());
        assert!(!repo.revoke("revoke-me").await.unwrap());
        assert!(repo.get_valid_token("revoke-me").await.unwrap().is_none());

        let stored = repo.get_by_token("revoke-me").await.unwrap().unwrap();
        assert!(stored.revoked_at.is_some());
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let (db, user_id) = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());
        for i in 0..3 {
            repo.create(&token(user_id, &format!("t{i}"), "2099-12-31 23:59:59"))
                .await
                .unwrap();
        }

        assert_eq!(repo.revoke_all_for_user(user_id).await.unwrap(), 3);
        assert!(repo.get_valid_token("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let (db, user_id) = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());
        repo.create(&token(user_id, "expired", "2000-01-01 00:00:00"))
            .await
            .unwrap();
        repo.create(&token(user_id, "revoked", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.create(&token(user_id, "live", "2099-12-31 23:59:59"))
            .await
            .unwrap();
        repo.revoke("revoked").await.unwrap();

        assert_eq!(repo.cleanup_expired().await.unwrap(), 2);
        assert!(repo.get_by_token("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tokens_removed_with_user() {
        let (db, user_id) = setup_db().await;
        let repo = RefreshTokenRepository::new(db.pool());
        repo.create(&token(user_id, "cascade", "2099-12-31 23:59:59"))
            .await
            .unwrap();

        UserRepository::new(db.pool())
            .delete(user_id)
            .await
            .unwrap();
        assert!(repo.get_by_token("cascade").await.unwrap().is_none());
    }
}

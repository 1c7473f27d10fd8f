//! User repository for mailroom.

use sqlx::{Executor, Sqlite, SqlitePool};

use super::user::{NewUser, Role, User};
use crate::datetime::now_timestamp;
use crate::{MailroomError, Result};

/// Users joined with the department that links to them.
const USER_SELECT: &str = "SELECT u.id, u.username, u.password, u.role, d.id AS department_id,
        u.created_at, u.last_login
 FROM users u LEFT JOIN departments d ON d.user_id = u.id";

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user row on any executor (pool or open transaction).
    ///
    /// Returns the new user id.
    pub async fn insert<'e, E>(executor: E, new_user: &NewUser) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO users (username, password, role, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(new_user.role)
        .bind(now_timestamp())
        .execute(executor)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Create a new user and return it.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id = Self::insert(self.pool, new_user).await?;
        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.id = ?");
        let result = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.username = ? COLLATE NOCASE");
        let result = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Record a successful login.
    pub async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user on any executor. Returns true if a row was removed.
    pub async fn delete_with<'e, E>(executor: E, id: i64) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        Self::delete_with(self.pool, id).await
    }

    /// List every user, oldest first.
    pub async fn list_all(&self) -> Result<Vec<User>> {
        let sql = format!("{USER_SELECT} ORDER BY u.id");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(users)
    }

    /// Count users with the given role.
    pub async fn count_by_role(&self, role: Role) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(count)
    }

    /// Check if a username is already taken (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(exists)
    }
}

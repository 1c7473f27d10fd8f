//! Courier repository.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use super::types::{Courier, CourierUpdate, NewCourier};
use crate::datetime::now_timestamp;
use crate::db::{ActiveStatus, PageParams, PaginatedResult};
use crate::{MailroomError, Result};

const COURIER_COLUMNS: &str =
    "id, service_name, code, contact_person, email, phone, address, status, created_at";

/// Repository for courier operations.
pub struct CourierRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CourierRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a courier. Codes are unique.
    pub async fn create(&self, new_courier: &NewCourier) -> Result<Courier> {
        if self.code_exists(&new_courier.code, None).await? {
            return Err(MailroomError::Conflict(format!(
                "courier code '{}' already exists",
                new_courier.code
            )));
        }

        let result = sqlx::query(
            "INSERT INTO couriers
                (service_name, code, contact_person, email, phone, address, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_courier.service_name)
        .bind(&new_courier.code)
        .bind(&new_courier.contact_person)
        .bind(&new_courier.email)
        .bind(&new_courier.phone)
        .bind(&new_courier.address)
        .bind(new_courier.status)
        .bind(now_timestamp())
        .execute(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        info!("Created courier {} ({})", new_courier.code, id);
        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("courier".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Courier>> {
        let sql = format!("SELECT {COURIER_COLUMNS} FROM couriers WHERE id = ?");
        sqlx::query_as::<_, Courier>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    pub async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM couriers WHERE id = ?)")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// Check whether a code is taken, optionally ignoring one courier.
    pub async fn code_exists(&self, code: &str, exclude_id: Option<i64>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM couriers
             WHERE code = ? COLLATE NOCASE AND (? IS NULL OR id != ?))",
        )
        .bind(code)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// List couriers, newest first.
    pub async fn list(
        &self,
        status: Option<ActiveStatus>,
        page: PageParams,
    ) -> Result<PaginatedResult<Courier>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM couriers WHERE (? IS NULL OR status = ?)")
                .bind(status)
                .bind(status)
                .fetch_one(self.pool)
                .await
                .map_err(|e| MailroomError::Database(e.to_string()))?;

        let sql = format!(
            "SELECT {COURIER_COLUMNS} FROM couriers WHERE (? IS NULL OR status = ?)
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let items = sqlx::query_as::<_, Courier>(&sql)
            .bind(status)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(PaginatedResult::new(items, total, page))
    }

    /// Update a courier.
    pub async fn update(&self, id: i64, update: &CourierUpdate) -> Result<Courier> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("courier".to_string()))?;
        if update.is_empty() {
            return Ok(existing);
        }
        if let Some(ref code) = update.code {
            if self.code_exists(code, Some(id)).await? {
                return Err(MailroomError::Conflict(format!(
                    "courier code '{code}' already exists"
                )));
            }
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE couriers SET ");
        let mut separated = query.separated(", ");
        let text_fields = [
            ("service_name = ", &update.service_name),
            ("code = ", &update.code),
            ("contact_person = ", &update.contact_person),
            ("email = ", &update.email),
            ("phone = ", &update.phone),
            ("address = ", &update.address),
        ];
        for (column, value) in text_fields {
            if let Some(value) = value {
                separated.push(column);
                separated.push_bind_unseparated(value);
            }
        }
        if let Some(status) = update.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status);
        }
        query.push(" WHERE id = ");
        query.push_bind(id);

        query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("courier".to_string()))
    }

    /// Delete a courier. Refused while outgoing letters reference it.
    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.exists(id).await? {
            return Err(MailroomError::NotFound("courier".to_string()));
        }

        let letters: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM outgoing_letters WHERE courier_id = ?")
                .bind(id)
                .fetch_one(self.pool)
                .await
                .map_err(|e| MailroomError::Database(e.to_string()))?;
        if letters > 0 {
            return Err(MailroomError::Validation(format!(
                "Cannot delete courier: it has {letters} associated outgoing letter(s)"
            )));
        }

        sqlx::query("DELETE FROM couriers WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        info!("Deleted courier {}", id);
        Ok(())
    }
}

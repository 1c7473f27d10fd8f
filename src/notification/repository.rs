//! Notification repository.

use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use super::types::{NewNotification, Notification, NotificationScope};
use crate::datetime::now_timestamp;
use crate::db::{PageParams, PaginatedResult};
use crate::letter::LetterKind;
use crate::{MailroomError, Result};

const NOTIFICATION_SELECT: &str = "SELECT n.id, n.message, n.incoming_id, n.outgoing_id,
        COALESCE(i.qr_code, o.qr_code) AS qr_code, n.department_id, n.user_id,
        n.is_read, n.created_at
 FROM notifications n
 LEFT JOIN incoming_letters i ON i.id = n.incoming_id
 LEFT JOIN outgoing_letters o ON o.id = n.outgoing_id";

fn push_scope(query: &mut QueryBuilder<'_, Sqlite>, scope: NotificationScope) {
    let (user_id, department_id) = match scope {
        NotificationScope::All => return,
        NotificationScope::Department {
            user_id,
            department_id,
        } => (user_id, department_id),
    };
    query.push(" AND n.user_id = ");
    query.push_bind(user_id);
    match department_id {
        Some(department_id) => {
            query.push(" AND (n.department_id IS NULL OR n.department_id = ");
            query.push_bind(department_id);
            query.push(")");
        }
        None => {
            query.push(" AND n.department_id IS NULL");
        }
    }
}

/// Repository for notification operations.
pub struct NotificationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert all rows with a single statement. Returns the number inserted.
    pub async fn create_many(&self, rows: &[NewNotification]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let now = now_timestamp();
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO notifications
                (message, incoming_id, outgoing_id, department_id, user_id, is_read, created_at) ",
        );
        query.push_values(rows, |mut b, row| {
            b.push_bind(&row.message)
                .push_bind(row.incoming_id)
                .push_bind(row.outgoing_id)
                .push_bind(row.department_id)
                .push_bind(row.user_id)
                .push_bind(false)
                .push_bind(now.clone());
        });

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Page through the reader's notifications, newest first.
    pub async fn list(
        &self,
        scope: NotificationScope,
        unread_only: bool,
        page: PageParams,
    ) -> Result<PaginatedResult<Notification>> {
        let mut count: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM notifications n WHERE 1 = 1");
        push_scope(&mut count, scope);
        if unread_only {
            count.push(" AND n.is_read = 0");
        }
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(NOTIFICATION_SELECT);
        query.push(" WHERE 1 = 1");
        push_scope(&mut query, scope);
        if unread_only {
            query.push(" AND n.is_read = 0");
        }
        query.push(" ORDER BY n.created_at DESC, n.id DESC LIMIT ");
        query.push_bind(page.limit);
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        let items = query
            .build_query_as::<Notification>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(PaginatedResult::new(items, total, page))
    }

    pub async fn count_unread(&self, scope: NotificationScope) -> Result<i64> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM notifications n WHERE n.is_read = 0");
        push_scope(&mut query, scope);
        query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// Mark one notification read. Returns false if it is not visible.
    pub async fn mark_read(&self, id: i64, scope: NotificationScope) -> Result<bool> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE notifications AS n SET is_read = 1 WHERE n.id = ");
        query.push_bind(id);
        push_scope(&mut query, scope);
        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark every visible unread notification read.
    pub async fn mark_all_read(&self, scope: NotificationScope) -> Result<u64> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE notifications AS n SET is_read = 1 WHERE n.is_read = 0");
        push_scope(&mut query, scope);
        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Delete one notification. Returns false if it is not visible.
    pub async fn delete(&self, id: i64, scope: NotificationScope) -> Result<bool> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM notifications AS n WHERE n.id = ");
        query.push_bind(id);
        push_scope(&mut query, scope);
        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every notification about a department, on any executor.
    pub async fn delete_for_department<'e, E>(executor: E, department_id: i64) -> Result<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM notifications WHERE department_id = ?")
            .bind(department_id)
            .execute(executor)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Number of notifications referencing a letter.
    pub async fn count_for_letter(&self, kind: LetterKind, letter_id: i64) -> Result<i64> {
        let sql = match kind {
            LetterKind::Incoming => "SELECT COUNT(*) FROM notifications WHERE incoming_id = ?",
            LetterKind::Outgoing => "SELECT COUNT(*) FROM notifications WHERE outgoing_id = ?",
        };
        sqlx::query_scalar(sql)
            .bind(letter_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }
}

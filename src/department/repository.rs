//! Department repository.

use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};

use super::types::{Department, DepartmentUpdate, NewDepartment};
use crate::datetime::now_timestamp;
use crate::db::{ActiveStatus, PageParams, PaginatedResult};
use crate::{MailroomError, Result};

const DEPARTMENT_SELECT: &str = "SELECT d.id, d.name, d.code, d.head, d.contact, d.status,
        d.user_id, u.username, d.created_at
 FROM departments d LEFT JOIN users u ON u.id = d.user_id";

/// Repository for department operations.
pub struct DepartmentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DepartmentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a department on any executor. Returns the new id.
    pub async fn insert<'e, E>(
        executor: E,
        new_department: &NewDepartment,
        user_id: Option<i64>,
    ) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO departments (name, code, head, contact, status, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_department.name)
        .bind(&new_department.code)
        .bind(&new_department.head)
        .bind(&new_department.contact)
        .bind(new_department.status)
        .bind(user_id)
        .bind(now_timestamp())
        .execute(executor)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Get a department by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Department>> {
        let sql = format!("{DEPARTMENT_SELECT} WHERE d.id = ?");
        sqlx::query_as::<_, Department>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// Check whether a department exists.
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE id = ?)")
                .bind(id)
                .fetch_one(self.pool)
                .await
                .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// Check whether a code is taken, optionally ignoring one department.
    pub async fn code_exists(&self, code: &str, exclude_id: Option<i64>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM departments
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

    /// List departments, newest first.
    pub async fn list(
        &self,
        status: Option<ActiveStatus>,
        page: PageParams,
    ) -> Result<PaginatedResult<Department>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM departments WHERE (? IS NULL OR status = ?)")
                .bind(status)
                .bind(status)
                .fetch_one(self.pool)
                .await
                .map_err(|e| MailroomError::Database(e.to_string()))?;

        let sql = format!(
            "{DEPARTMENT_SELECT} WHERE (? IS NULL OR d.status = ?)
             ORDER BY d.created_at DESC, d.id DESC LIMIT ? OFFSET ?"
        );
        let items = sqlx::query_as::<_, Department>(&sql)
            .bind(status)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;

        Ok(PaginatedResult::new(items, total, page))
    }

    /// Update a department. Returns None if it does not exist.
    pub async fn update(&self, id: i64, update: &DepartmentUpdate) -> Result<Option<Department>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE departments SET ");
        let mut separated = query.separated(", ");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }
        if let Some(ref code) = update.code {
            separated.push("code = ");
            separated.push_bind_unseparated(code);
        }
        if let Some(ref head) = update.head {
            separated.push("head = ");
            separated.push_bind_unseparated(head);
        }
        if let Some(ref contact) = update.contact {
            separated.push("contact = ");
            separated.push_bind_unseparated(contact);
        }
        if let Some(status) = update.status {
            separated.push("status = ");
            separated.push_bind_unseparated(status);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Link a user to a department that has none. Returns false if the
    /// department is missing or already linked.
    pub async fn link_user<'e, E>(executor: E, department_id: i64, user_id: i64) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE departments SET user_id = ? WHERE id = ? AND user_id IS NULL")
                .bind(user_id)
                .bind(department_id)
                .execute(executor)
                .await
                .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a department row on any executor.
    pub async fn delete_with<'e, E>(executor: E, id: i64) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM departments WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of incoming letters addressed to the department.
    pub async fn count_incoming(&self, id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM incoming_letters WHERE department_id = ?")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// Number of outgoing letters sent from the department.
    pub async fn count_outgoing(&self, id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM outgoing_letters WHERE department_id = ?")
            .bind(id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn insert(db: &Database, name: &str, code: &str) -> i64 {
        DepartmentRepository::insert(db.pool(), &NewDepartment::new(name, code), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert(&db, "Finance", "FIN").await;

        let repo = DepartmentRepository::new(db.pool());
        let dept = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(dept.name, "Finance");
        assert_eq!(dept.status, ActiveStatus::Active);
        assert!(dept.user_id.is_none());
        assert!(repo.exists(id).await.unwrap());
        assert!(!repo.exists(id + 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_code_exists() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert(&db, "Finance", "FIN").await;
        let repo = DepartmentRepository::new(db.pool());

        assert!(repo.code_exists("fin", None).await.unwrap());
        assert!(!repo.code_exists("FIN", Some(id)).await.unwrap());
        assert!(!repo.code_exists("HR", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_with_status_filter() {
        let db = Database::open_in_memory().await.unwrap();
        insert(&db, "Finance", "FIN").await;
        insert(&db, "Legal", "LEG").await;
        DepartmentRepository::insert(
            db.pool(),
            &NewDepartment::new("Archive", "ARC").with_status(ActiveStatus::Inactive),
            None,
        )
        .await
        .unwrap();

        let repo = DepartmentRepository::new(db.pool());
        let all = repo.list(None, PageParams::default()).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].code, "ARC");

        let active = repo
            .list(Some(ActiveStatus::Active), PageParams::default())
            .await
            .unwrap();
        assert_eq!(active.total, 2);

        let page = repo
            .list(None, PageParams::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_update() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert(&db, "Finance", "FIN").await;
        let repo = DepartmentRepository::new(db.pool());

        let updated = repo
            .update(
                id,
                &DepartmentUpdate::new()
                    .name("Treasury")
                    .status(ActiveStatus::Inactive),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Treasury");
        assert_eq!(updated.code, "FIN");
        assert_eq!(updated.status, ActiveStatus::Inactive);

        let missing = repo
            .update(999, &DepartmentUpdate::new().name("x"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_link_user_only_once() {
        let db = Database::open_in_memory().await.unwrap();
        let id = insert(&db, "Finance", "FIN").await;
        let users = crate::db::UserRepository::new(db.pool());
        let a = users
            .create(&crate::db::NewUser::new("a_user", "h", crate::db::Role::OtherDepartment))
            .await
            .unwrap();
        let b = users
            .create(&crate::db::NewUser::new("b_user", "h", crate::db::Role::OtherDepartment))
            .await
            .unwrap();

        assert!(DepartmentRepository::link_user(db.pool(), id, a.id).await.unwrap());
        assert!(!DepartmentRepository::link_user(db.pool(), id, b.id).await.unwrap());

        let dept = DepartmentRepository::new(db.pool())
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dept.username.as_deref(), Some("a_user"));
    }
}

//! Department operations spanning several tables.

use tracing::info;

use super::repository::DepartmentRepository;
use super::types::{Department, DepartmentUpdate, NewDepartment};
use crate::auth::validation::{validate_password_not_username, validate_username};
use crate::auth::{hash_password, PasswordError};
use crate::db::{DbPool, NewUser, Role, UserRepository};
use crate::notification::NotificationRepository;
use crate::{MailroomError, Result};

/// Service for department writes that must stay consistent with users and
/// notifications.
pub struct DepartmentService<'a> {
    pool: &'a DbPool,
}

impl<'a> DepartmentService<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a department together with its `other_department` account.
    ///
    /// Both rows are written in one transaction.
    pub async fn create_with_account(
        &self,
        new_department: &NewDepartment,
        username: &str,
        password: &str,
    ) -> Result<Department> {
        let repo = DepartmentRepository::new(self.pool);
        if repo.code_exists(&new_department.code, None).await? {
            return Err(MailroomError::Conflict(format!(
                "department code '{}' already exists",
                new_department.code
            )));
        }

        let username = username.trim();
        validate_username(username).map_err(|e| MailroomError::Validation(e.to_string()))?;
        validate_password_not_username(password, username)
            .map_err(|e| MailroomError::Validation(e.to_string()))?;
        if UserRepository::new(self.pool)
            .username_exists(username)
            .await?
        {
            return Err(MailroomError::Conflict(format!(
                "username '{username}' already exists"
            )));
        }

        let password_hash = hash_password(password).map_err(|e| match e {
            PasswordError::TooShort | PasswordError::TooLong => {
                MailroomError::Validation(e.to_string())
            }
            other => MailroomError::Auth(other.to_string()),
        })?;

        let mut tx = self.pool.begin().await?;
        let user_id = UserRepository::insert(
            &mut *tx,
            &NewUser::new(username, password_hash, Role::OtherDepartment),
        )
        .await?;
        let department_id =
            DepartmentRepository::insert(&mut *tx, new_department, Some(user_id)).await?;
        tx.commit().await?;

        info!(
            "Created department {} ({}) with account {}",
            new_department.code, department_id, username
        );

        repo.get_by_id(department_id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("department".to_string()))
    }

    /// Update a department, keeping codes unique.
    pub async fn update(&self, id: i64, update: &DepartmentUpdate) -> Result<Department> {
        let repo = DepartmentRepository::new(self.pool);
        if let Some(ref code) = update.code {
            if repo.code_exists(code, Some(id)).await? {
                return Err(MailroomError::Conflict(format!(
                    "department code '{code}' already exists"
                )));
            }
        }

        repo.update(id, update)
            .await?
            .ok_or_else(|| MailroomError::NotFound("department".to_string()))
    }

    /// Delete a department with its notifications and linked account.
    ///
    /// Refused while letters still reference the department.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let repo = DepartmentRepository::new(self.pool);
        let department = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("department".to_string()))?;

        let incoming = repo.count_incoming(id).await?;
        if incoming > 0 {
            return Err(MailroomError::Validation(format!(
                "Cannot delete department: it has {incoming} associated incoming letter(s)"
            )));
        }
        let outgoing = repo.count_outgoing(id).await?;
        if outgoing > 0 {
            return Err(MailroomError::Validation(format!(
                "Cannot delete department: it has {outgoing} associated outgoing letter(s)"
            )));
        }

        let mut tx = self.pool.begin().await?;
        let removed = NotificationRepository::delete_for_department(&mut *tx, id).await?;
        if let Some(user_id) = department.user_id {
            UserRepository::delete_with(&mut *tx, user_id).await?;
        }
        DepartmentRepository::delete_with(&mut *tx, id).await?;
        tx.commit().await?;

        info!(
            "Deleted department {} ({}), {} notification(s) removed",
            department.code, id, removed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn finance() -> NewDepartment {
        NewDepartment::new("Finance", "FIN").with_head("J. Doe")
    }

    #[tokio::test]
    async fn test_create_with_account() {
        let db = Database::open_in_memory().await.unwrap();
        let service = DepartmentService::new(db.pool());

        let dept = service
            .create_with_account(&finance(), "finance", "password123")
            .await
            .unwrap();
        assert_eq!(dept.code, "FIN");
        assert_eq!(dept.username.as_deref(), Some("finance"));

        let user = UserRepository::new(db.pool())
            .get_by_username("finance")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, Role::OtherDepartment);
        assert_eq!(user.department_id, Some(dept.id));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let db = Database::open_in_memory().await.unwrap();
        let service = DepartmentService::new(db.pool());
        service
            .create_with_account(&finance(), "finance", "password123")
            .await
            .unwrap();

        let dup_code = service
            .create_with_account(&finance(), "other", "password123")
            .await;
        assert!(matches!(dup_code, Err(MailroomError::Conflict(_))));

        let dup_user = service
            .create_with_account(&NewDepartment::new("Legal", "LEG"), "finance", "password123")
            .await;
        assert!(matches!(dup_user, Err(MailroomError::Conflict(_))));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_update_code_conflict() {
        let db = Database::open_in_memory().await.unwrap();
        let service = DepartmentService::new(db.pool());
        service
            .create_with_account(&finance(), "finance", "password123")
            .await
            .unwrap();
        let legal = service
            .create_with_account(&NewDepartment::new("Legal", "LEG"), "legal", "password123")
            .await
            .unwrap();

        let result = service
            .update(legal.id, &DepartmentUpdate::new().code("fin"))
            .await;
        assert!(matches!(result, Err(MailroomError::Conflict(_))));

        let result = service
            .update(999, &DepartmentUpdate::new().name("x"))
            .await;
        assert!(matches!(result, Err(MailroomError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_account() {
        let db = Database::open_in_memory().await.unwrap();
        let service = DepartmentService::new(db.pool());
        let dept = service
            .create_with_account(&finance(), "finance", "password123")
            .await
            .unwrap();

        service.delete(dept.id).await.unwrap();

        assert!(DepartmentRepository::new(db.pool())
            .get_by_id(dept.id)
            .await
            .unwrap()
            .is_none());
        assert!(!UserRepository::new(db.pool())
            .username_exists("finance")
            .await
            .unwrap());
        assert!(matches!(
            service.delete(dept.id).await,
            Err(MailroomError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_refused_with_incoming_letters() {
        let db = Database::open_in_memory().await.unwrap();
        let service = DepartmentService::new(db.pool());
        let dept = service
            .create_with_account(&finance(), "finance", "password123")
            .await
            .unwrap();

        for qr in ["IN-1", "IN-2"] {
            sqlx::query(
                "INSERT INTO incoming_letters
                    (qr_code, sender, department_id, received_date, created_at)
                 VALUES (?, 'Ministry', ?, '2024-01-01T00:00:00.000000Z',
                         '2024-01-01T00:00:00.000000Z')",
            )
            .bind(qr)
            .bind(dept.id)
            .execute(db.pool())
            .await
            .unwrap();
        }

        let err = service.delete(dept.id).await.unwrap_err();
        assert!(matches!(err, MailroomError::Validation(_)));
        assert!(err
            .to_string()
            .contains("Cannot delete department: it has 2 associated incoming letter(s)"));
    }
}

//! Incoming letter storage.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::status::{IncomingStatus, Priority};
use super::{generate_qr_code, push_scope, push_search, LetterKind, LetterScope};
use crate::datetime::now_timestamp;
use crate::db::{PageParams, PaginatedResult};
use crate::{MailroomError, Result};

const INCOMING_SELECT: &str = "SELECT l.id, l.qr_code, l.sender, l.department_id,
        d.name AS department_name, l.priority, l.subject, l.description, l.filing,
        l.status, l.image, l.received_date, l.created_by, l.created_at
 FROM incoming_letters l LEFT JOIN departments d ON d.id = l.department_id";

const SEARCH_COLUMNS: &[&str] = &["l.qr_code", "l.subject", "l.sender"];

/// A letter received from outside and addressed to a department.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IncomingLetter {
    pub id: i64,
    pub qr_code: String,
    /// Free-text sender.
    pub sender: String,
    /// Addressee department.
    pub department_id: i64,
    pub department_name: Option<String>,
    pub priority: Priority,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub filing: Option<String>,
    pub status: IncomingStatus,
    /// Public URL of the scanned image.
    pub image: Option<String>,
    pub received_date: String,
    pub created_by: Option<i64>,
    pub created_at: String,
}

/// Data for recording an incoming letter.
///
/// A missing QR code is generated; a missing received date is now.
#[derive(Debug, Clone, Default)]
pub struct NewIncomingLetter {
    pub qr_code: Option<String>,
    pub sender: String,
    pub department_id: i64,
    pub priority: Priority,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub filing: Option<String>,
    pub status: IncomingStatus,
    pub image: Option<String>,
    pub received_date: Option<String>,
}

/// Partial update of an incoming letter. Unset fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct IncomingLetterUpdate {
    pub sender: Option<String>,
    pub department_id: Option<i64>,
    pub priority: Option<Priority>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub filing: Option<String>,
    pub status: Option<IncomingStatus>,
    pub image: Option<String>,
    pub received_date: Option<String>,
}

impl IncomingLetterUpdate {
    pub fn is_empty(&self) -> bool {
        self.sender.is_none()
            && self.department_id.is_none()
            && self.priority.is_none()
            && self.subject.is_none()
            && self.description.is_none()
            && self.filing.is_none()
            && self.status.is_none()
            && self.image.is_none()
            && self.received_date.is_none()
    }
}

/// List filters.
#[derive(Debug, Clone, Default)]
pub struct IncomingFilter {
    pub status: Option<IncomingStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

/// Repository for incoming letters.
pub struct IncomingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> IncomingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a letter and return it.
    pub async fn create(
        &self,
        letter: &NewIncomingLetter,
        created_by: Option<i64>,
    ) -> Result<IncomingLetter> {
        let now = now_timestamp();
        let qr_code = letter
            .qr_code
            .clone()
            .unwrap_or_else(|| generate_qr_code(LetterKind::Incoming));

        let result = sqlx::query(
            "INSERT INTO incoming_letters
                (qr_code, sender, department_id, priority, subject, description, filing,
                 status, image, received_date, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&qr_code)
        .bind(&letter.sender)
        .bind(letter.department_id)
        .bind(letter.priority)
        .bind(&letter.subject)
        .bind(&letter.description)
        .bind(&letter.filing)
        .bind(letter.status)
        .bind(&letter.image)
        .bind(letter.received_date.as_deref().unwrap_or(&now))
        .bind(created_by)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| MailroomError::NotFound("incoming letter".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<IncomingLetter>> {
        let sql = format!("{INCOMING_SELECT} WHERE l.id = ?");
        sqlx::query_as::<_, IncomingLetter>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    pub async fn get_by_qr(&self, qr_code: &str) -> Result<Option<IncomingLetter>> {
        let sql = format!("{INCOMING_SELECT} WHERE l.qr_code = ?");
        sqlx::query_as::<_, IncomingLetter>(&sql)
            .bind(qr_code)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// Check whether a QR code is taken, optionally ignoring one letter.
    pub async fn qr_exists(&self, qr_code: &str, exclude_id: Option<i64>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM incoming_letters
             WHERE qr_code = ? AND (? IS NULL OR id != ?))",
        )
        .bind(qr_code)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(exists)
    }

    fn push_filters(
        query: &mut QueryBuilder<'_, Sqlite>,
        scope: LetterScope,
        filter: &IncomingFilter,
    ) {
        push_scope(query, scope);
        if let Some(status) = filter.status {
            query.push(" AND l.status = ");
            query.push_bind(status);
        }
        if let Some(priority) = filter.priority {
            query.push(" AND l.priority = ");
            query.push_bind(priority);
        }
        push_search(query, filter.search.as_deref(), SEARCH_COLUMNS);
    }

    /// Count letters matching the scope and filters.
    pub async fn count(&self, scope: LetterScope, filter: &IncomingFilter) -> Result<i64> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM incoming_letters l WHERE 1 = 1");
        Self::push_filters(&mut query, scope, filter);
        query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// Fetch a window of matching letters, newest first.
    pub async fn fetch(
        &self,
        scope: LetterScope,
        filter: &IncomingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<IncomingLetter>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(INCOMING_SELECT);
        query.push(" WHERE 1 = 1");
        Self::push_filters(&mut query, scope, filter);
        query.push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        query
            .build_query_as::<IncomingLetter>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    /// One page of matching letters with the total count.
    pub async fn list(
        &self,
        scope: LetterScope,
        filter: &IncomingFilter,
        page: PageParams,
    ) -> Result<PaginatedResult<IncomingLetter>> {
        let total = self.count(scope, filter).await?;
        let items = self.fetch(scope, filter, page.limit, page.offset()).await?;
        Ok(PaginatedResult::new(items, total, page))
    }

    /// Apply a partial update. Returns false if the letter does not exist.
    pub async fn update(&self, id: i64, update: &IncomingLetterUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(self.get_by_id(id).await?.is_some());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE incoming_letters SET ");
        let mut separated = query.separated(", ");
        let text_fields = [
            ("sender = ", &update.sender),
            ("subject = ", &update.subject),
            ("description = ", &update.description),
            ("filing = ", &update.filing),
            ("image = ", &update.image),
            ("received_date = ", &update.received_date),
        ];
        for (column, value) in text_fields {
            if let Some(value) = value {
                separated.push(column);
                separated.push_bind_unseparated(value);
            }
        }
        if let Some(department_id) = update.department_id {
            separated.push("department_id = ");
            separated.push_bind_unseparated(department_id);
        }
        if let Some(priority) = update.priority {
            separated.push("priority = ");
            separated.push_bind_unseparated(priority);
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
        Ok(result.rows_affected() > 0)
    }

    /// Set the status of a letter.
    pub async fn set_status(&self, id: i64, status: IncomingStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE incoming_letters SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a letter. Its notifications go with it.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM incoming_letters WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::department::{DepartmentRepository, NewDepartment};
    use crate::Database;

    async fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let fin = DepartmentRepository::insert(
            db.pool(),
            &NewDepartment::new("Finance", "FIN"),
            None,
        )
            .await
            .unwrap();
        let hr = DepartmentRepository::insert(db.pool(), &NewDepartment::new("HR", "HR"), None)
            .await
            .unwrap();
        (db, fin, hr)
    }

    fn letter(department_id: i64, subject: &str) -> NewIncomingLetter {
        NewIncomingLetter {
            sender: "Ministry of Works".to_string(),
            department_id,
            subject: Some(subject.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let (db, fin, _) = setup().await;
        let repo = IncomingRepository::new(db.pool());

        let created = repo.create(&letter(fin, "Budget"), None).await.unwrap();
        assert!(created.qr_code.starts_with("IN-"));
        assert_eq!(created.status, IncomingStatus::Received);
        assert_eq!(created.priority, Priority::Medium);
        assert_eq!(created.department_name.as_deref(), Some("Finance"));
        assert_eq!(created.received_date, created.created_at);
    }

    #[tokio::test]
    async fn test_get_by_qr_and_exists() {
        let (db, fin, _) = setup().await;
        let repo = IncomingRepository::new(db.pool());
        let mut new = letter(fin, "Budget");
        new.qr_code = Some("IN-CUSTOM".to_string());
        let created = repo.create(&new, None).await.unwrap();

        assert_eq!(repo.get_by_qr("IN-CUSTOM").await.unwrap().unwrap().id, created.id);
        assert!(repo.qr_exists("IN-CUSTOM", None).await.unwrap());
        assert!(!repo.qr_exists("IN-CUSTOM", Some(created.id)).await.unwrap());
        assert!(repo.get_by_qr("IN-NONE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_scope_and_filters() {
        let (db, fin, hr) = setup().await;
        let repo = IncomingRepository::new(db.pool());
        repo.create(&letter(fin, "Budget 2024"), None).await.unwrap();
        repo.create(&letter(fin, "Audit"), None).await.unwrap();
        let mut urgent = letter(hr, "Hiring");
        urgent.priority = Priority::High;
        repo.create(&urgent, None).await.unwrap();

        let all = repo
            .list(LetterScope::All, &IncomingFilter::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].subject.as_deref(), Some("Hiring"));

        let fin_only = repo
            .list(LetterScope::Department(fin), &IncomingFilter::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(fin_only.total, 2);
        assert!(fin_only.items.iter().all(|l| l.department_id == fin));

        let nothing = repo
            .list(LetterScope::Nothing, &IncomingFilter::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(nothing.total, 0);
        assert!(nothing.items.is_empty());

        let high = IncomingFilter {
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert_eq!(repo.count(LetterScope::All, &high).await.unwrap(), 1);

        let search = IncomingFilter {
            search: Some("budget".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.count(LetterScope::All, &search).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_status_and_delete() {
        let (db, fin, hr) = setup().await;
        let repo = IncomingRepository::new(db.pool());
        let created = repo.create(&letter(fin, "Budget"), None).await.unwrap();

        let update = IncomingLetterUpdate {
            department_id: Some(hr),
            filing: Some("Cabinet 4".to_string()),
            ..Default::default()
        };
        assert!(repo.update(created.id, &update).await.unwrap());
        assert!(!repo.update(999, &update).await.unwrap());

        assert!(repo.set_status(created.id, IncomingStatus::Archived).await.unwrap());
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.department_id, hr);
        assert_eq!(fetched.filing.as_deref(), Some("Cabinet 4"));
        assert_eq!(fetched.status, IncomingStatus::Archived);

        let by_status = IncomingFilter {
            status: Some(IncomingStatus::Archived),
            ..Default::default()
        };
        assert_eq!(repo.count(LetterScope::All, &by_status).await.unwrap(), 1);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }
}

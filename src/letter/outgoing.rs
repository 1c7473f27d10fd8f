//! Outgoing letter storage.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::status::{OutgoingStatus, Priority};
use super::{generate_qr_code, push_scope, push_search, LetterKind, LetterScope};
use crate::datetime::now_timestamp;
use crate::db::{PageParams, PaginatedResult};
use crate::{MailroomError, Result};

const OUTGOING_SELECT: &str = "SELECT l.id, l.qr_code, l.department_id,
        d.name AS department_name, l.recipient, l.priority, l.subject, l.description,
        l.status, l.image, l.courier_id, c.service_name AS courier_name,
        l.dispatched_date, l.delivered_date, l.created_by, l.created_at
 FROM outgoing_letters l
 LEFT JOIN departments d ON d.id = l.department_id
 LEFT JOIN couriers c ON c.id = l.courier_id";

const SEARCH_COLUMNS: &[&str] = &["l.qr_code", "l.subject", "l.recipient"];

/// A letter sent from a department to an outside recipient.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutgoingLetter {
    pub id: i64,
    pub qr_code: String,
    /// Sending department.
    pub department_id: i64,
    pub department_name: Option<String>,
    /// Free-text recipient.
    pub recipient: String,
    pub priority: Priority,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: OutgoingStatus,
    pub image: Option<String>,
    pub courier_id: Option<i64>,
    pub courier_name: Option<String>,
    /// Stamped when the letter becomes DISPATCHED.
    pub dispatched_date: Option<String>,
    /// Stamped when the letter becomes DELIVERED.
    pub delivered_date: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: String,
}

/// Data for recording an outgoing letter. A missing QR code is generated.
#[derive(Debug, Clone, Default)]
pub struct NewOutgoingLetter {
    pub qr_code: Option<String>,
    pub department_id: i64,
    pub recipient: String,
    pub priority: Priority,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: OutgoingStatus,
    pub image: Option<String>,
    pub courier_id: Option<i64>,
    pub dispatched_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OutgoingLetterUpdate {
    pub department_id: Option<i64>,
    pub recipient: Option<String>,
    pub priority: Option<Priority>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: Option<OutgoingStatus>,
    pub image: Option<String>,
    pub courier_id: Option<i64>,
    pub dispatched_date: Option<String>,
    pub delivered_date: Option<String>,
}

impl OutgoingLetterUpdate {
    pub fn is_empty(&self) -> bool {
        self.department_id.is_none()
            && self.recipient.is_none()
            && self.priority.is_none()
            && self.subject.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.image.is_none()
            && self.courier_id.is_none()
            && self.dispatched_date.is_none()
            && self.delivered_date.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutgoingFilter {
    pub status: Option<OutgoingStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

/// Repository for outgoing letters.
pub struct OutgoingRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OutgoingRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        letter: &NewOutgoingLetter,
        created_by: Option<i64>,
    ) -> Result<OutgoingLetter> {
        let qr_code = letter
            .qr_code
            .clone()
            .unwrap_or_else(|| generate_qr_code(LetterKind::Outgoing));

        let result = sqlx::query(
            "INSERT INTO outgoing_letters
                (qr_code, department_id, recipient, priority, subject, description, status,
                 image, courier_id, dispatched_date, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&qr_code)
        .bind(letter.department_id)
        .bind(&letter.recipient)
        .bind(letter.priority)
        .bind(&letter.subject)
        .bind(&letter.description)
        .bind(letter.status)
        .bind(&letter.image)
        .bind(letter.courier_id)
        .bind(&letter.dispatched_date)
        .bind(created_by)
        .bind(now_timestamp())
        .execute(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| MailroomError::NotFound("outgoing letter".to_string()))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<OutgoingLetter>> {
        let sql = format!("{OUTGOING_SELECT} WHERE l.id = ?");
        sqlx::query_as::<_, OutgoingLetter>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    pub async fn get_by_qr(&self, qr_code: &str) -> Result<Option<OutgoingLetter>> {
        let sql = format!("{OUTGOING_SELECT} WHERE l.qr_code = ?");
        sqlx::query_as::<_, OutgoingLetter>(&sql)
            .bind(qr_code)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    pub async fn qr_exists(&self, qr_code: &str, exclude_id: Option<i64>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM outgoing_letters
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
        filter: &OutgoingFilter,
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

    pub async fn count(&self, scope: LetterScope, filter: &OutgoingFilter) -> Result<i64> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM outgoing_letters l WHERE 1 = 1");
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
        filter: &OutgoingFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OutgoingLetter>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(OUTGOING_SELECT);
        query.push(" WHERE 1 = 1");
        Self::push_filters(&mut query, scope, filter);
        query.push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        query
            .build_query_as::<OutgoingLetter>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| MailroomError::Database(e.to_string()))
    }

    pub async fn list(
        &self,
        scope: LetterScope,
        filter: &OutgoingFilter,
        page: PageParams,
    ) -> Result<PaginatedResult<OutgoingLetter>> {
        let total = self.count(scope, filter).await?;
        let items = self.fetch(scope, filter, page.limit, page.offset()).await?;
        Ok(PaginatedResult::new(items, total, page))
    }

    /// Apply a partial update. Returns false if the letter does not exist.
    pub async fn update(&self, id: i64, update: &OutgoingLetterUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(self.get_by_id(id).await?.is_some());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE outgoing_letters SET ");
        let mut separated = query.separated(", ");
        let text_fields = [
            ("recipient = ", &update.recipient),
            ("subject = ", &update.subject),
            ("description = ", &update.description),
            ("image = ", &update.image),
            ("dispatched_date = ", &update.dispatched_date),
            ("delivered_date = ", &update.delivered_date),
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
        if let Some(courier_id) = update.courier_id {
            separated.push("courier_id = ");
            separated.push_bind_unseparated(courier_id);
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

    /// Set the status, stamping the dispatch or delivery date when the
    /// letter enters DISPATCHED or DELIVERED.
    pub async fn set_status(&self, id: i64, status: OutgoingStatus) -> Result<bool> {
        let now = now_timestamp();
        let result = sqlx::query(
            "UPDATE outgoing_letters SET
                status = ?,
                dispatched_date = CASE WHEN ? = 'DISPATCHED' THEN ? ELSE dispatched_date END,
                delivered_date = CASE WHEN ? = 'DELIVERED' THEN ? ELSE delivered_date END
             WHERE id = ?",
        )
        .bind(status)
        .bind(status)
        .bind(&now)
        .bind(status)
        .bind(&now)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| MailroomError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM outgoing_letters WHERE id = ?")
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
    use crate::courier::{CourierRepository, NewCourier};
    use crate::department::{DepartmentRepository, NewDepartment};
    use crate::Database;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let fin = DepartmentRepository::insert(
            db.pool(),
            &NewDepartment::new("Finance", "FIN"),
            None,
        )
            .await
            .unwrap();
        (db, fin)
    }

    fn letter(department_id: i64) -> NewOutgoingLetter {
        NewOutgoingLetter {
            department_id,
            recipient: "Tax Authority".to_string(),
            subject: Some("Quarterly return".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_with_courier() {
        let (db, fin) = setup().await;
        let courier = CourierRepository::new(db.pool())
            .create(&NewCourier::new("DHL Express", "DHL"))
            .await
            .unwrap();
        let repo = OutgoingRepository::new(db.pool());

        let mut new = letter(fin);
        new.courier_id = Some(courier.id);
        let created = repo.create(&new, None).await.unwrap();

        assert!(created.qr_code.starts_with("OUT-"));
        assert_eq!(created.status, OutgoingStatus::PendingDispatch);
        assert_eq!(created.courier_name.as_deref(), Some("DHL Express"));
        assert_eq!(created.department_name.as_deref(), Some("Finance"));
        assert!(created.dispatched_date.is_none());
    }

    #[tokio::test]
    async fn test_set_status_stamps_dates() {
        let (db, fin) = setup().await;
        let repo = OutgoingRepository::new(db.pool());
        let created = repo.create(&letter(fin), None).await.unwrap();

        repo.set_status(created.id, OutgoingStatus::Dispatched)
            .await
            .unwrap();
        let dispatched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(dispatched.status, OutgoingStatus::Dispatched);
        assert!(dispatched.dispatched_date.is_some());
        assert!(dispatched.delivered_date.is_none());

        repo.set_status(created.id, OutgoingStatus::Delivered)
            .await
            .unwrap();
        let delivered = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(delivered.dispatched_date, dispatched.dispatched_date);
        assert!(delivered.delivered_date.is_some());

        // Any status may follow any other.
        assert!(repo
            .set_status(created.id, OutgoingStatus::PendingDispatch)
            .await
            .unwrap());
        assert!(!repo.set_status(999, OutgoingStatus::Returned).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let (db, fin) = setup().await;
        let repo = OutgoingRepository::new(db.pool());
        repo.create(&letter(fin), None).await.unwrap();
        let mut other = letter(fin);
        other.recipient = "City Council".to_string();
        other.subject = None;
        repo.create(&other, None).await.unwrap();

        let filter = OutgoingFilter {
            search: Some("council".to_string()),
            ..Default::default()
        };
        let found = repo
            .list(LetterScope::All, &filter, PageParams::default())
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].recipient, "City Council");

        let scoped = repo
            .list(
                LetterScope::Department(fin + 1),
                &OutgoingFilter::default(),
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(scoped.total, 0);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (db, fin) = setup().await;
        let repo = OutgoingRepository::new(db.pool());
        let created = repo.create(&letter(fin), None).await.unwrap();

        let update = OutgoingLetterUpdate {
            recipient: Some("Revenue Office".to_string()),
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert!(repo.update(created.id, &update).await.unwrap());
        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.recipient, "Revenue Office");
        assert_eq!(fetched.priority, Priority::High);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
    }
}

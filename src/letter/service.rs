//! Letter operations with access checks and notification fan-out.

use tracing::info;

use super::access::Viewer;
use super::incoming::{
    IncomingFilter, IncomingLetter, IncomingLetterUpdate, IncomingRepository, NewIncomingLetter,
};
use super::outgoing::{
    NewOutgoingLetter, OutgoingFilter, OutgoingLetter, OutgoingLetterUpdate, OutgoingRepository,
};
use super::status::{IncomingStatus, OutgoingStatus};
use super::LetterKind;
use crate::courier::CourierRepository;
use crate::db::{DbPool, PageParams, PaginatedResult};
use crate::department::DepartmentRepository;
use crate::notification::{self, LetterEvent, LetterNotice};
use crate::{MailroomError, Result};

/// Outcome of a status update by QR code.
#[derive(Debug, Clone)]
pub struct StatusChange<T> {
    pub letter: T,
    /// False when the letter already had the requested status.
    pub changed: bool,
    pub message: String,
}

impl IncomingLetter {
    fn notice(&self, event: LetterEvent) -> LetterNotice {
        LetterNotice {
            kind: LetterKind::Incoming,
            letter_id: self.id,
            qr_code: self.qr_code.clone(),
            department_id: self.department_id,
            department_name: self.department_name.clone(),
            counterparty: self.sender.clone(),
            event,
        }
    }
}

impl OutgoingLetter {
    fn notice(&self, event: LetterEvent) -> LetterNotice {
        LetterNotice {
            kind: LetterKind::Outgoing,
            letter_id: self.id,
            qr_code: self.qr_code.clone(),
            department_id: self.department_id,
            department_name: self.department_name.clone(),
            counterparty: self.recipient.clone(),
            event,
        }
    }
}

/// Trim a client-supplied QR code; blank means "generate one".
fn clean_qr(qr_code: &Option<String>) -> Option<String> {
    qr_code
        .as_deref()
        .map(str::trim)
        .filter(|qr| !qr.is_empty())
        .map(str::to_string)
}

fn qr_conflict(qr_code: &str) -> MailroomError {
    MailroomError::Conflict(format!("QR code '{qr_code}' already exists"))
}

/// Service for letter reads and writes on behalf of one caller.
pub struct LetterService<'a> {
    pool: &'a DbPool,
    viewer: Viewer,
}

impl<'a> LetterService<'a> {
    pub fn new(pool: &'a DbPool, viewer: Viewer) -> Self {
        Self { pool, viewer }
    }

    async fn ensure_department(&self, department_id: i64) -> Result<()> {
        if DepartmentRepository::new(self.pool).exists(department_id).await? {
            Ok(())
        } else {
            Err(MailroomError::NotFound("department".to_string()))
        }
    }

    /// QR codes are unique across both letter kinds.
    async fn ensure_qr_available(&self, qr_code: &str) -> Result<()> {
        if IncomingRepository::new(self.pool)
            .qr_exists(qr_code, None)
            .await?
            || OutgoingRepository::new(self.pool)
                .qr_exists(qr_code, None)
                .await?
        {
            return Err(qr_conflict(qr_code));
        }
        Ok(())
    }

    async fn ensure_courier(&self, courier_id: i64) -> Result<()> {
        if CourierRepository::new(self.pool).exists(courier_id).await? {
            Ok(())
        } else {
            Err(MailroomError::NotFound("courier".to_string()))
        }
    }

    // ---- incoming -------------------------------------------------------

    /// Record an incoming letter and notify the interested users.
    pub async fn create_incoming(&self, letter: &NewIncomingLetter) -> Result<IncomingLetter> {
        self.viewer.ensure_can_manage_incoming()?;
        self.ensure_department(letter.department_id).await?;

        let repo = IncomingRepository::new(self.pool);
        let mut letter = letter.clone();
        letter.qr_code = clean_qr(&letter.qr_code);
        if let Some(qr) = &letter.qr_code {
            self.ensure_qr_available(qr).await?;
        }

        let created = repo.create(&letter, Some(self.viewer.user_id)).await?;
        info!(
            id = created.id,
            qr_code = %created.qr_code,
            department_id = created.department_id,
            "Incoming letter recorded"
        );

        notification::notify(
            self.pool,
            &created.notice(LetterEvent::Created),
            self.viewer.user_id,
        )
        .await;
        Ok(created)
    }

    pub async fn list_incoming(
        &self,
        filter: &IncomingFilter,
        page: PageParams,
    ) -> Result<PaginatedResult<IncomingLetter>> {
        IncomingRepository::new(self.pool)
            .list(self.viewer.scope(), filter, page)
            .await
    }

    pub async fn get_incoming(&self, id: i64) -> Result<IncomingLetter> {
        let letter = IncomingRepository::new(self.pool)
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("incoming letter".to_string()))?;
        self.viewer.ensure_covers(letter.department_id)?;
        Ok(letter)
    }

    pub async fn get_incoming_by_qr(&self, qr_code: &str) -> Result<IncomingLetter> {
        let letter = IncomingRepository::new(self.pool)
            .get_by_qr(qr_code.trim())
            .await?
            .ok_or_else(|| MailroomError::NotFound("incoming letter".to_string()))?;
        self.viewer.ensure_covers(letter.department_id)?;
        Ok(letter)
    }

    /// Partially update an incoming letter.
    ///
    /// A status change made this way notifies like a status update.
    pub async fn update_incoming(
        &self,
        id: i64,
        update: &IncomingLetterUpdate,
    ) -> Result<IncomingLetter> {
        self.viewer.ensure_can_manage_incoming()?;
        let before = self.get_incoming(id).await?;
        if let Some(department_id) = update.department_id {
            self.ensure_department(department_id).await?;
        }

        let repo = IncomingRepository::new(self.pool);
        repo.update(id, update).await?;
        let after = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("incoming letter".to_string()))?;
        info!(id, "Incoming letter updated");

        if after.status != before.status {
            self.notify_incoming_status(&after, before.status).await;
        }
        Ok(after)
    }

    /// Delete an incoming letter and return what was deleted.
    ///
    /// Notifications go with the row; the caller removes the stored image.
    pub async fn delete_incoming(&self, id: i64) -> Result<IncomingLetter> {
        self.viewer.ensure_can_manage_incoming()?;
        let letter = self.get_incoming(id).await?;
        if !IncomingRepository::new(self.pool).delete(id).await? {
            return Err(MailroomError::NotFound("incoming letter".to_string()));
        }
        info!(id, qr_code = %letter.qr_code, "Incoming letter deleted");
        Ok(letter)
    }

    pub async fn update_incoming_status(
        &self,
        id: i64,
        status: IncomingStatus,
    ) -> Result<IncomingLetter> {
        let letter = self.get_incoming(id).await?;
        self.set_incoming_status(letter, status).await
    }

    /// Set the status of the letter with this QR code, doing nothing when it
    /// already has that status.
    pub async fn update_incoming_status_by_qr(
        &self,
        qr_code: &str,
        status: IncomingStatus,
    ) -> Result<StatusChange<IncomingLetter>> {
        let letter = self.get_incoming_by_qr(qr_code).await?;
        if letter.status == status {
            return Ok(StatusChange {
                message: format!("Letter status is already {}", status.display_label()),
                letter,
                changed: false,
            });
        }

        let letter = self.set_incoming_status(letter, status).await?;
        Ok(StatusChange {
            message: format!("Letter status updated to {}", status.display_label()),
            letter,
            changed: true,
        })
    }

    async fn set_incoming_status(
        &self,
        letter: IncomingLetter,
        status: IncomingStatus,
    ) -> Result<IncomingLetter> {
        let repo = IncomingRepository::new(self.pool);
        repo.set_status(letter.id, status).await?;
        let updated = repo
            .get_by_id(letter.id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("incoming letter".to_string()))?;
        info!(
            id = letter.id,
            from = %letter.status,
            to = %status,
            "Incoming letter status changed"
        );

        self.notify_incoming_status(&updated, letter.status).await;
        Ok(updated)
    }

    async fn notify_incoming_status(&self, letter: &IncomingLetter, previous: IncomingStatus) {
        let event = LetterEvent::StatusChanged {
            from: previous.display_label(),
            to: letter.status.display_label(),
        };
        notification::notify(self.pool, &letter.notice(event), self.viewer.user_id).await;
    }

    // ---- outgoing -------------------------------------------------------

    /// Record an outgoing letter and notify the interested users.
    pub async fn create_outgoing(&self, letter: &NewOutgoingLetter) -> Result<OutgoingLetter> {
        self.viewer.ensure_can_send_from(letter.department_id)?;
        self.ensure_department(letter.department_id).await?;
        if let Some(courier_id) = letter.courier_id {
            self.ensure_courier(courier_id).await?;
        }

        let repo = OutgoingRepository::new(self.pool);
        let mut letter = letter.clone();
        letter.qr_code = clean_qr(&letter.qr_code);
        if let Some(qr) = &letter.qr_code {
            self.ensure_qr_available(qr).await?;
        }

        let created = repo.create(&letter, Some(self.viewer.user_id)).await?;
        info!(
            id = created.id,
            qr_code = %created.qr_code,
            department_id = created.department_id,
            "Outgoing letter recorded"
        );

        notification::notify(
            self.pool,
            &created.notice(LetterEvent::Created),
            self.viewer.user_id,
        )
        .await;
        Ok(created)
    }

    pub async fn list_outgoing(
        &self,
        filter: &OutgoingFilter,
        page: PageParams,
    ) -> Result<PaginatedResult<OutgoingLetter>> {
        OutgoingRepository::new(self.pool)
            .list(self.viewer.scope(), filter, page)
            .await
    }

    pub async fn get_outgoing(&self, id: i64) -> Result<OutgoingLetter> {
        let letter = OutgoingRepository::new(self.pool)
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("outgoing letter".to_string()))?;
        self.viewer.ensure_covers(letter.department_id)?;
        Ok(letter)
    }

    pub async fn get_outgoing_by_qr(&self, qr_code: &str) -> Result<OutgoingLetter> {
        let letter = OutgoingRepository::new(self.pool)
            .get_by_qr(qr_code.trim())
            .await?
            .ok_or_else(|| MailroomError::NotFound("outgoing letter".to_string()))?;
        self.viewer.ensure_covers(letter.department_id)?;
        Ok(letter)
    }

    /// Partially update an outgoing letter.
    ///
    /// A status given here is applied like a status update, including the
    /// dispatch and delivery date stamps.
    pub async fn update_outgoing(
        &self,
        id: i64,
        update: &OutgoingLetterUpdate,
    ) -> Result<OutgoingLetter> {
        let before = self.get_outgoing(id).await?;
        if let Some(department_id) = update.department_id {
            self.viewer.ensure_can_send_from(department_id)?;
            self.ensure_department(department_id).await?;
        }
        if let Some(courier_id) = update.courier_id {
            self.ensure_courier(courier_id).await?;
        }

        let repo = OutgoingRepository::new(self.pool);
        let mut fields = update.clone();
        let status = fields.status.take();
        repo.update(id, &fields).await?;
        if let Some(status) = status.filter(|s| *s != before.status) {
            repo.set_status(id, status).await?;
        }
        let after = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("outgoing letter".to_string()))?;
        info!(id, "Outgoing letter updated");

        if after.status != before.status {
            self.notify_outgoing_status(&after, before.status).await;
        }
        Ok(after)
    }

    /// Delete an outgoing letter and return what was deleted.
    pub async fn delete_outgoing(&self, id: i64) -> Result<OutgoingLetter> {
        let letter = self.get_outgoing(id).await?;
        if !OutgoingRepository::new(self.pool).delete(id).await? {
            return Err(MailroomError::NotFound("outgoing letter".to_string()));
        }
        info!(id, qr_code = %letter.qr_code, "Outgoing letter deleted");
        Ok(letter)
    }

    pub async fn update_outgoing_status(
        &self,
        id: i64,
        status: OutgoingStatus,
    ) -> Result<OutgoingLetter> {
        let letter = self.get_outgoing(id).await?;
        self.set_outgoing_status(letter, status).await
    }

    pub async fn update_outgoing_status_by_qr(
        &self,
        qr_code: &str,
        status: OutgoingStatus,
    ) -> Result<StatusChange<OutgoingLetter>> {
        let letter = self.get_outgoing_by_qr(qr_code).await?;
        if letter.status == status {
            return Ok(StatusChange {
                message: format!("Letter status is already {}", status.display_label()),
                letter,
                changed: false,
            });
        }

        let letter = self.set_outgoing_status(letter, status).await?;
        Ok(StatusChange {
            message: format!("Letter status updated to {}", status.display_label()),
            letter,
            changed: true,
        })
    }

    async fn set_outgoing_status(
        &self,
        letter: OutgoingLetter,
        status: OutgoingStatus,
    ) -> Result<OutgoingLetter> {
        let repo = OutgoingRepository::new(self.pool);
        repo.set_status(letter.id, status).await?;
        let updated = repo
            .get_by_id(letter.id)
            .await?
            .ok_or_else(|| MailroomError::NotFound("outgoing letter".to_string()))?;
        info!(
            id = letter.id,
            from = %letter.status,
            to = %status,
            "Outgoing letter status changed"
        );

        self.notify_outgoing_status(&updated, letter.status).await;
        Ok(updated)
    }

    async fn notify_outgoing_status(&self, letter: &OutgoingLetter, previous: OutgoingStatus) {
        let event = LetterEvent::StatusChanged {
            from: previous.display_label(),
            to: letter.status.display_label(),
        };
        notification::notify(self.pool, &letter.notice(event), self.viewer.user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, Role, UserRepository};
    use crate::department::NewDepartment;
    use crate::notification::NotificationRepository;
    use crate::Database;

    struct Fixture {
        db: Database,
        admin: Viewer,
        rd: Viewer,
        fin_user: Viewer,
        fin: i64,
        hr: i64,
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let admin = users
            .create(&NewUser::new("admin", "hash", Role::SuperAdmin))
            .await
            .unwrap();
        let rd = users
            .create(&NewUser::new("registry", "hash", Role::RdDepartment))
            .await
            .unwrap();
        let fin_account = users
            .create(&NewUser::new("finance", "hash", Role::OtherDepartment))
            .await
            .unwrap();
        let fin = DepartmentRepository::insert(
            db.pool(),
            &NewDepartment::new("Finance", "FIN"),
            Some(fin_account.id),
        )
        .await
        .unwrap();
        let hr = DepartmentRepository::insert(db.pool(), &NewDepartment::new("HR", "HR"), None)
            .await
            .unwrap();

        Fixture {
            admin: Viewer::new(admin.id, Role::SuperAdmin, None),
            rd: Viewer::new(rd.id, Role::RdDepartment, None),
            fin_user: Viewer::new(fin_account.id, Role::OtherDepartment, Some(fin)),
            db,
            fin,
            hr,
        }
    }

    fn incoming(department_id: i64) -> NewIncomingLetter {
        NewIncomingLetter {
            sender: "Ministry".to_string(),
            department_id,
            subject: Some("Budget".to_string()),
            ..Default::default()
        }
    }

    fn outgoing(department_id: i64) -> NewOutgoingLetter {
        NewOutgoingLetter {
            department_id,
            recipient: "Tax Office".to_string(),
            ..Default::default()
        }
    }

    /// Notifications addressed to the viewer.
    async fn notifications_for(db: &Database, viewer: &Viewer) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?")
            .bind(viewer.user_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_incoming_fans_out_except_actor() {
        let f = setup().await;
        let service = LetterService::new(f.db.pool(), f.rd);

        let letter = service.create_incoming(&incoming(f.fin)).await.unwrap();
        assert!(letter.qr_code.starts_with("IN-"));
        assert_eq!(letter.department_name.as_deref(), Some("Finance"));

        assert_eq!(notifications_for(&f.db, &f.admin).await, 1);
        assert_eq!(notifications_for(&f.db, &f.fin_user).await, 1);
        assert_eq!(notifications_for(&f.db, &f.rd).await, 0);
    }

    #[tokio::test]
    async fn test_other_department_not_notified_for_other_departments() {
        let f = setup().await;
        let service = LetterService::new(f.db.pool(), f.admin);
        service.create_incoming(&incoming(f.hr)).await.unwrap();

        assert_eq!(notifications_for(&f.db, &f.fin_user).await, 0);
        assert_eq!(notifications_for(&f.db, &f.rd).await, 1);
    }

    #[tokio::test]
    async fn test_incoming_create_requires_manager() {
        let f = setup().await;
        let service = LetterService::new(f.db.pool(), f.fin_user);
        let err = service.create_incoming(&incoming(f.fin)).await.unwrap_err();
        assert!(matches!(err, MailroomError::Permission(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_qr_and_missing_department() {
        let f = setup().await;
        let service = LetterService::new(f.db.pool(), f.admin);

        let mut letter = incoming(f.fin);
        letter.qr_code = Some("IN-FIXED".to_string());
        service.create_incoming(&letter).await.unwrap();
        let err = service.create_incoming(&letter).await.unwrap_err();
        assert!(matches!(err, MailroomError::Conflict(_)));

        let err = service.create_incoming(&incoming(9999)).await.unwrap_err();
        assert!(matches!(err, MailroomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_qr_code_unique_across_kinds() {
        let f = setup().await;
        let service = LetterService::new(f.db.pool(), f.admin);

        let mut inbound = incoming(f.hr);
        inbound.qr_code = Some("SAME-QR".to_string());
        service.create_incoming(&inbound).await.unwrap();

        let mut reply = outgoing(f.fin);
        reply.qr_code = Some("SAME-QR".to_string());
        let err = service.create_outgoing(&reply).await.unwrap_err();
        assert!(matches!(err, MailroomError::Conflict(_)));

        reply.qr_code = Some("OTHER-QR".to_string());
        service.create_outgoing(&reply).await.unwrap();
        inbound.qr_code = Some("OTHER-QR".to_string());
        let err = service.create_incoming(&inbound).await.unwrap_err();
        assert!(matches!(err, MailroomError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_scope_on_reads() {
        let f = setup().await;
        let admin = LetterService::new(f.db.pool(), f.admin);
        let own = admin.create_incoming(&incoming(f.fin)).await.unwrap();
        let other = admin.create_incoming(&incoming(f.hr)).await.unwrap();

        let service = LetterService::new(f.db.pool(), f.fin_user);
        let page = service
            .list_incoming(&IncomingFilter::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items.iter().all(|l| l.department_id == f.fin));

        assert!(service.get_incoming(own.id).await.is_ok());
        let err = service.get_incoming(other.id).await.unwrap_err();
        assert!(matches!(err, MailroomError::Permission(_)));
        let err = service.get_incoming_by_qr(&other.qr_code).await.unwrap_err();
        assert!(matches!(err, MailroomError::Permission(_)));
        let err = service.get_incoming(424242).await.unwrap_err();
        assert!(matches!(err, MailroomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_status_by_qr_is_idempotent() {
        let f = setup().await;
        let admin = LetterService::new(f.db.pool(), f.admin);
        let letter = admin.create_incoming(&incoming(f.fin)).await.unwrap();

        let service = LetterService::new(f.db.pool(), f.fin_user);
        let first = service
            .update_incoming_status_by_qr(&letter.qr_code, IncomingStatus::Collected)
            .await
            .unwrap();
        assert!(first.changed);
        assert_eq!(first.letter.status, IncomingStatus::Collected);

        let notifications = NotificationRepository::new(f.db.pool());
        let after_first = notifications
            .count_for_letter(LetterKind::Incoming, letter.id)
            .await
            .unwrap();

        let second = service
            .update_incoming_status_by_qr(&letter.qr_code, IncomingStatus::Collected)
            .await
            .unwrap();
        assert!(!second.changed);
        assert_eq!(second.message, "Letter status is already Collected");
        assert_eq!(
            notifications
                .count_for_letter(LetterKind::Incoming, letter.id)
                .await
                .unwrap(),
            after_first
        );
    }

    #[tokio::test]
    async fn test_outgoing_send_from_own_department_only() {
        let f = setup().await;
        let service = LetterService::new(f.db.pool(), f.fin_user);

        let letter = service.create_outgoing(&outgoing(f.fin)).await.unwrap();
        assert!(letter.qr_code.starts_with("OUT-"));

        let err = service.create_outgoing(&outgoing(f.hr)).await.unwrap_err();
        assert!(matches!(err, MailroomError::Permission(_)));

        let mut with_courier = outgoing(f.fin);
        with_courier.courier_id = Some(77);
        let err = service.create_outgoing(&with_courier).await.unwrap_err();
        assert!(matches!(err, MailroomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_outgoing_status_stamps_dates() {
        let f = setup().await;
        let service = LetterService::new(f.db.pool(), f.fin_user);
        let letter = service.create_outgoing(&outgoing(f.fin)).await.unwrap();
        assert!(letter.dispatched_date.is_none());

        let dispatched = service
            .update_outgoing_status(letter.id, OutgoingStatus::Dispatched)
            .await
            .unwrap();
        assert!(dispatched.dispatched_date.is_some());
        assert!(dispatched.delivered_date.is_none());

        let update = OutgoingLetterUpdate {
            status: Some(OutgoingStatus::Delivered),
            ..Default::default()
        };
        let delivered = service.update_outgoing(letter.id, &update).await.unwrap();
        assert_eq!(delivered.status, OutgoingStatus::Delivered);
        assert!(delivered.delivered_date.is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_notifications() {
        let f = setup().await;
        let service = LetterService::new(f.db.pool(), f.admin);
        let letter = service.create_incoming(&incoming(f.fin)).await.unwrap();
        assert_eq!(notifications_for(&f.db, &f.rd).await, 1);

        let deleted = service.delete_incoming(letter.id).await.unwrap();
        assert_eq!(deleted.id, letter.id);
        assert_eq!(notifications_for(&f.db, &f.rd).await, 0);

        let err = service.delete_incoming(letter.id).await.unwrap_err();
        assert!(matches!(err, MailroomError::NotFound(_)));
    }
}

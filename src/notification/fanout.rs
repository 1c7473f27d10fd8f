//! Notification fan-out.
//!
//! Every letter event is broadcast to each user who should hear about it:
//! `super_admin` and `rd_department` accounts always, `other_department`
//! accounts only when the letter's counterparty department is theirs. The
//! actor never notifies themselves.

use tracing::{debug, warn};

use super::repository::NotificationRepository;
use super::types::LetterNotice;
use crate::db::{DbPool, User, UserRepository};
use crate::Result;

/// Pick the recipients of an event about a letter for `department_id`.
pub fn select_recipients(users: &[User], actor_id: i64, department_id: i64) -> Vec<i64> {
    users
        .iter()
        .filter(|user| user.id != actor_id)
        .filter(|user| {
            user.role.sees_all_departments() || user.department_id == Some(department_id)
        })
        .map(|user| user.id)
        .collect()
}

/// Insert one notification per recipient. Returns the number created.
pub async fn fan_out(pool: &DbPool, notice: &LetterNotice, actor_id: i64) -> Result<u64> {
    let users = UserRepository::new(pool).list_all().await?;
    let recipients = select_recipients(&users, actor_id, notice.department_id);
    if recipients.is_empty() {
        return Ok(0);
    }

    let message = notice.message();
    let rows: Vec<_> = recipients
        .into_iter()
        .map(|user_id| notice.to_row(&message, user_id))
        .collect();
    NotificationRepository::new(pool).create_many(&rows).await
}

/// Fan out, logging instead of failing.
///
/// The letter write has already committed; a failed notification batch
/// must not turn into a failed request.
pub async fn notify(pool: &DbPool, notice: &LetterNotice, actor_id: i64) {
    match fan_out(pool, notice, actor_id).await {
        Ok(count) => debug!(
            kind = %notice.kind,
            letter_id = notice.letter_id,
            count,
            "Notifications created"
        ),
        Err(e) => warn!(
            kind = %notice.kind,
            letter_id = notice.letter_id,
            error = %e,
            "Failed to create notifications"
        ),
    }
}

//! Unified tracking view over incoming and outgoing letters.
//!
//! Both letter kinds are presented as one [`TrackedLetter`] with a shared
//! display status. Listing merges the two sources so that pagination is
//! ordered by creation date across kinds.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::db::{DbPool, PageParams, PaginatedResult};
use crate::letter::{
    IncomingFilter, IncomingLetter, IncomingRepository, IncomingStatus, LetterKind,
    OutgoingFilter, OutgoingLetter, OutgoingRepository, OutgoingStatus, Priority, StatusFilter,
    Viewer,
};
use crate::{MailroomError, Result};

/// Which letter kinds a tracking query covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackingType {
    #[default]
    All,
    Incoming,
    Outgoing,
}

impl TrackingType {
    fn includes(&self, kind: LetterKind) -> bool {
        match self {
            TrackingType::All => true,
            TrackingType::Incoming => kind == LetterKind::Incoming,
            TrackingType::Outgoing => kind == LetterKind::Outgoing,
        }
    }
}

impl FromStr for TrackingType {
    type Err = MailroomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(TrackingType::All),
            "incoming" => Ok(TrackingType::Incoming),
            "outgoing" => Ok(TrackingType::Outgoing),
            _ => Err(MailroomError::Validation(format!(
                "unknown letter type '{s}' (expected incoming, outgoing or all)"
            ))),
        }
    }
}

/// Tracking list filters.
#[derive(Debug, Clone, Default)]
pub struct TrackingQuery {
    pub kind: TrackingType,
    pub status: Option<StatusFilter>,
    pub priority: Option<Priority>,
}

impl TrackingQuery {
    fn incoming_filter(&self) -> Option<IncomingFilter> {
        if !self.kind.includes(LetterKind::Incoming) {
            return None;
        }
        let status = match &self.status {
            None => None,
            // The status names only outgoing letters.
            Some(StatusFilter { incoming: None, .. }) => return None,
            Some(filter) => filter.incoming,
        };
        Some(IncomingFilter {
            status,
            priority: self.priority,
            search: None,
        })
    }

    fn outgoing_filter(&self) -> Option<OutgoingFilter> {
        if !self.kind.includes(LetterKind::Outgoing) {
            return None;
        }
        let status = match &self.status {
            None => None,
            Some(StatusFilter { outgoing: None, .. }) => return None,
            Some(filter) => filter.outgoing,
        };
        Some(OutgoingFilter {
            status,
            priority: self.priority,
            search: None,
        })
    }
}

/// A letter of either kind.
#[derive(Debug, Clone)]
pub enum TrackedLetter {
    Incoming(IncomingLetter),
    Outgoing(OutgoingLetter),
}

impl TrackedLetter {
    pub fn kind(&self) -> LetterKind {
        match self {
            TrackedLetter::Incoming(_) => LetterKind::Incoming,
            TrackedLetter::Outgoing(_) => LetterKind::Outgoing,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            TrackedLetter::Incoming(l) => l.id,
            TrackedLetter::Outgoing(l) => l.id,
        }
    }

    pub fn qr_code(&self) -> &str {
        match self {
            TrackedLetter::Incoming(l) => &l.qr_code,
            TrackedLetter::Outgoing(l) => &l.qr_code,
        }
    }

    /// Sender: free text for incoming, department name for outgoing.
    pub fn from(&self) -> &str {
        match self {
            TrackedLetter::Incoming(l) => &l.sender,
            TrackedLetter::Outgoing(l) => l.department_name.as_deref().unwrap_or_default(),
        }
    }

    /// Recipient: department name for incoming, free text for outgoing.
    pub fn to(&self) -> &str {
        match self {
            TrackedLetter::Incoming(l) => l.department_name.as_deref().unwrap_or_default(),
            TrackedLetter::Outgoing(l) => &l.recipient,
        }
    }

    /// The counterparty department.
    pub fn department(&self) -> (i64, Option<&str>) {
        match self {
            TrackedLetter::Incoming(l) => (l.department_id, l.department_name.as_deref()),
            TrackedLetter::Outgoing(l) => (l.department_id, l.department_name.as_deref()),
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            TrackedLetter::Incoming(l) => l.priority,
            TrackedLetter::Outgoing(l) => l.priority,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            TrackedLetter::Incoming(l) => l.subject.as_deref(),
            TrackedLetter::Outgoing(l) => l.subject.as_deref(),
        }
    }

    /// Shared display status.
    pub fn display_status(&self) -> &'static str {
        match self {
            TrackedLetter::Incoming(l) => l.status.display_label(),
            TrackedLetter::Outgoing(l) => l.status.display_label(),
        }
    }

    /// Status enum name of the letter's own kind.
    pub fn raw_status(&self) -> &'static str {
        match self {
            TrackedLetter::Incoming(l) => l.status.as_str(),
            TrackedLetter::Outgoing(l) => l.status.as_str(),
        }
    }

    pub fn image(&self) -> Option<&str> {
        match self {
            TrackedLetter::Incoming(l) => l.image.as_deref(),
            TrackedLetter::Outgoing(l) => l.image.as_deref(),
        }
    }

    /// Received date for incoming, dispatch date for outgoing.
    pub fn date(&self) -> Option<&str> {
        match self {
            TrackedLetter::Incoming(l) => Some(l.received_date.as_str()),
            TrackedLetter::Outgoing(l) => l.dispatched_date.as_deref(),
        }
    }

    pub fn created_at(&self) -> &str {
        match self {
            TrackedLetter::Incoming(l) => &l.created_at,
            TrackedLetter::Outgoing(l) => &l.created_at,
        }
    }

    /// Newest first; equal timestamps put incoming before outgoing, then
    /// higher ids first.
    fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.created_at()
            .cmp(a.created_at())
            .then_with(|| kind_rank(a.kind()).cmp(&kind_rank(b.kind())))
            .then_with(|| b.id().cmp(&a.id()))
    }
}

fn kind_rank(kind: LetterKind) -> u8 {
    match kind {
        LetterKind::Incoming => 0,
        LetterKind::Outgoing => 1,
    }
}

/// Letter count for one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: &'static str,
    pub raw_status: &'static str,
    pub count: i64,
}

/// Counts for one letter kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindStats {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

impl KindStats {
    fn push(&mut self, status: &'static str, raw_status: &'static str, count: i64) {
        self.total += count;
        self.by_status.push(StatusCount {
            status,
            raw_status,
            count,
        });
    }
}

/// Dashboard counts for the caller's scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingStats {
    pub incoming: KindStats,
    pub outgoing: KindStats,
}

impl TrackingStats {
    pub fn total(&self) -> i64 {
        self.incoming.total + self.outgoing.total
    }
}

/// Service for the tracking view on behalf of one caller.
pub struct TrackingService<'a> {
    pool: &'a DbPool,
    viewer: Viewer,
}

impl<'a> TrackingService<'a> {
    pub fn new(pool: &'a DbPool, viewer: Viewer) -> Self {
        Self { pool, viewer }
    }

    /// One page of letters of both kinds, newest first.
    ///
    /// Each source contributes at most `offset + limit` rows, which is enough
    /// to cut any window out of the merged order.
    pub async fn list(
        &self,
        query: &TrackingQuery,
        page: PageParams,
    ) -> Result<PaginatedResult<TrackedLetter>> {
        let scope = self.viewer.scope();
        let prefix = page.prefix_len();
        let mut total = 0;
        let mut merged = Vec::new();

        if let Some(filter) = query.incoming_filter() {
            let repo = IncomingRepository::new(self.pool);
            total += repo.count(scope, &filter).await?;
            merged.extend(
                repo.fetch(scope, &filter, prefix, 0)
                    .await?
                    .into_iter()
                    .map(TrackedLetter::Incoming),
            );
        }
        if let Some(filter) = query.outgoing_filter() {
            let repo = OutgoingRepository::new(self.pool);
            total += repo.count(scope, &filter).await?;
            merged.extend(
                repo.fetch(scope, &filter, prefix, 0)
                    .await?
                    .into_iter()
                    .map(TrackedLetter::Outgoing),
            );
        }

        merged.sort_by(TrackedLetter::newest_first);
        let items = merged
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(PaginatedResult::new(items, total, page))
    }

    /// Find a letter of either kind by QR code.
    pub async fn find_by_qr(&self, qr_code: &str) -> Result<TrackedLetter> {
        let qr_code = qr_code.trim();
        let letter = match IncomingRepository::new(self.pool).get_by_qr(qr_code).await? {
            Some(letter) => TrackedLetter::Incoming(letter),
            None => OutgoingRepository::new(self.pool)
                .get_by_qr(qr_code)
                .await?
                .map(TrackedLetter::Outgoing)
                .ok_or_else(|| MailroomError::NotFound("letter".to_string()))?,
        };
        self.viewer.ensure_covers(letter.department().0)?;
        Ok(letter)
    }

    /// Per-status counts for both kinds.
    pub async fn stats(&self) -> Result<TrackingStats> {
        let scope = self.viewer.scope();
        let mut stats = TrackingStats::default();

        let incoming = IncomingRepository::new(self.pool);
        for status in IncomingStatus::ALL {
            let filter = IncomingFilter {
                status: Some(status),
                ..Default::default()
            };
            let count = incoming.count(scope, &filter).await?;
            stats
                .incoming
                .push(status.display_label(), status.as_str(), count);
        }

        let outgoing = OutgoingRepository::new(self.pool);
        for status in OutgoingStatus::ALL {
            let filter = OutgoingFilter {
                status: Some(status),
                ..Default::default()
            };
            let count = outgoing.count(scope, &filter).await?;
            stats
                .outgoing
                .push(status.display_label(), status.as_str(), count);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Role;
    use crate::department::{DepartmentRepository, NewDepartment};
    use crate::letter::{NewIncomingLetter, NewOutgoingLetter};
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

    async fn add_incoming(db: &Database, department_id: i64, status: IncomingStatus) -> i64 {
        let letter = NewIncomingLetter {
            sender: "Ministry".to_string(),
            department_id,
            status,
            ..Default::default()
        };
        IncomingRepository::new(db.pool())
            .create(&letter, None)
            .await
            .unwrap()
            .id
    }

    async fn add_outgoing(db: &Database, department_id: i64, status: OutgoingStatus) -> i64 {
        let letter = NewOutgoingLetter {
            department_id,
            recipient: "Tax Office".to_string(),
            status,
            ..Default::default()
        };
        OutgoingRepository::new(db.pool())
            .create(&letter, None)
            .await
            .unwrap()
            .id
    }

    fn admin() -> Viewer {
        Viewer::new(1, Role::SuperAdmin, None)
    }

    #[test]
    fn test_tracking_type_parse() {
        assert_eq!("all".parse::<TrackingType>().unwrap(), TrackingType::All);
        assert_eq!("Incoming".parse::<TrackingType>().unwrap(), TrackingType::Incoming);
        assert_eq!("outgoing".parse::<TrackingType>().unwrap(), TrackingType::Outgoing);
        assert!("both".parse::<TrackingType>().is_err());
    }

    #[tokio::test]
    async fn test_pages_are_globally_ordered() {
        let (db, fin, _) = setup().await;
        // Alternate kinds so that both sources interleave in time.
        for i in 0..6 {
            if i % 2 == 0 {
                add_incoming(&db, fin, IncomingStatus::Received).await;
            } else {
                add_outgoing(&db, fin, OutgoingStatus::PendingDispatch).await;
            }
        }

        let service = TrackingService::new(db.pool(), admin());
        let query = TrackingQuery::default();
        let everything = service
            .list(&query, PageParams::new(Some(1), Some(100)))
            .await
            .unwrap();
        assert_eq!(everything.total, 6);

        let mut paged = Vec::new();
        for page in 1..=3 {
            let result = service
                .list(&query, PageParams::new(Some(page), Some(2)))
                .await
                .unwrap();
            assert_eq!(result.total, 6);
            assert_eq!(result.items.len(), 2);
            paged.extend(result.items);
        }

        let keys = |letters: &[TrackedLetter]| {
            letters
                .iter()
                .map(|l| (l.kind(), l.id()))
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&paged), keys(&everything.items));
        for pair in paged.windows(2) {
            assert!(pair[0].created_at() >= pair[1].created_at());
        }
    }

    #[tokio::test]
    async fn test_status_filter_selects_kinds() {
        let (db, fin, _) = setup().await;
        add_incoming(&db, fin, IncomingStatus::Transferred).await;
        add_incoming(&db, fin, IncomingStatus::Received).await;
        add_outgoing(&db, fin, OutgoingStatus::Dispatched).await;
        add_outgoing(&db, fin, OutgoingStatus::PendingDispatch).await;

        let service = TrackingService::new(db.pool(), admin());

        let pending = TrackingQuery {
            status: Some(StatusFilter::parse("Pending").unwrap()),
            ..Default::default()
        };
        let result = service.list(&pending, PageParams::default()).await.unwrap();
        assert_eq!(result.total, 2);
        assert!(result.items.iter().all(|l| l.display_status() == "Pending"));

        let courier = TrackingQuery {
            status: Some(StatusFilter::parse("handled to courier").unwrap()),
            ..Default::default()
        };
        let result = service.list(&courier, PageParams::default()).await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].kind(), LetterKind::Outgoing);
        assert_eq!(result.items[0].raw_status(), "DISPATCHED");

        let incoming_only = TrackingQuery {
            kind: TrackingType::Incoming,
            ..Default::default()
        };
        let result = service
            .list(&incoming_only, PageParams::default())
            .await
            .unwrap();
        assert_eq!(result.total, 2);
        assert!(result.items.iter().all(|l| l.kind() == LetterKind::Incoming));
    }

    #[tokio::test]
    async fn test_scope_applies_to_both_sources() {
        let (db, fin, hr) = setup().await;
        add_incoming(&db, fin, IncomingStatus::Received).await;
        add_incoming(&db, hr, IncomingStatus::Received).await;
        add_outgoing(&db, fin, OutgoingStatus::PendingDispatch).await;
        add_outgoing(&db, hr, OutgoingStatus::PendingDispatch).await;

        let viewer = Viewer::new(2, Role::OtherDepartment, Some(fin));
        let service = TrackingService::new(db.pool(), viewer);
        let result = service
            .list(&TrackingQuery::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(result.total, 2);
        assert!(result.items.iter().all(|l| l.department().0 == fin));

        let nothing = Viewer::new(3, Role::OtherDepartment, None);
        let result = TrackingService::new(db.pool(), nothing)
            .list(&TrackingQuery::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(result.total, 0);
    }

    #[tokio::test]
    async fn test_find_by_qr() {
        let (db, fin, hr) = setup().await;
        add_outgoing(&db, hr, OutgoingStatus::PendingDispatch).await;
        let letter = OutgoingRepository::new(db.pool())
            .get_by_id(1)
            .await
            .unwrap()
            .unwrap();

        let found = TrackingService::new(db.pool(), admin())
            .find_by_qr(&letter.qr_code)
            .await
            .unwrap();
        assert_eq!(found.kind(), LetterKind::Outgoing);
        assert_eq!(found.from(), "HR");
        assert_eq!(found.to(), "Tax Office");

        let viewer = Viewer::new(2, Role::OtherDepartment, Some(fin));
        let err = TrackingService::new(db.pool(), viewer)
            .find_by_qr(&letter.qr_code)
            .await
            .unwrap_err();
        assert!(matches!(err, MailroomError::Permission(_)));

        let err = TrackingService::new(db.pool(), admin())
            .find_by_qr("NOPE")
            .await
            .unwrap_err();
        assert!(matches!(err, MailroomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stats() {
        let (db, fin, _) = setup().await;
        add_incoming(&db, fin, IncomingStatus::Received).await;
        add_incoming(&db, fin, IncomingStatus::Received).await;
        add_incoming(&db, fin, IncomingStatus::Archived).await;
        add_outgoing(&db, fin, OutgoingStatus::Returned).await;

        let stats = TrackingService::new(db.pool(), admin()).stats().await.unwrap();
        assert_eq!(stats.incoming.total, 3);
        assert_eq!(stats.outgoing.total, 1);
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.incoming.by_status[0].status, "Pending");
        assert_eq!(stats.incoming.by_status[0].count, 2);
        assert_eq!(stats.outgoing.by_status[3].status, "Returned");
        assert_eq!(stats.outgoing.by_status[3].count, 1);
    }
}

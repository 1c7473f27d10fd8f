//! Courier types.

use crate::db::ActiveStatus;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Courier {
    pub id: i64,
    pub service_name: String,
    /// Unique short code (case-insensitive).
    pub code: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: ActiveStatus,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewCourier {
    pub service_name: String,
    pub code: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: ActiveStatus,
}

impl NewCourier {
    pub fn new(service_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            code: code.into(),
            contact_person: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            status: ActiveStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourierUpdate {
    pub service_name: Option<String>,
    pub code: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<ActiveStatus>,
}

impl CourierUpdate {
    pub fn is_empty(&self) -> bool {
        self.service_name.is_none()
            && self.code.is_none()
            && self.contact_person.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.status.is_none()
    }
}

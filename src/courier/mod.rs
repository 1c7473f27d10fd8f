//! Courier services that carry outgoing letters.

mod repository;
mod types;

pub use repository::CourierRepository;
pub use types::{Courier, CourierUpdate, NewCourier};

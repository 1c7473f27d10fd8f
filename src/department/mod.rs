//! Departments: the organizational units letters are addressed to and sent
//! from. Each department may own one `other_department` account.

mod repository;
mod service;
mod types;

pub use repository::DepartmentRepository;
pub use service::DepartmentService;
pub use types::{Department, DepartmentUpdate, NewDepartment};

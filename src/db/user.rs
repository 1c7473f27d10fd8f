//! User model for mailroom.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role.
///
/// Roles are fixed at account creation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    /// Full administrator; manages departments and couriers.
    SuperAdmin,
    /// Records and registry staff; sees every letter.
    RdDepartment,
    /// Staff of a single department.
    OtherDepartment,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 3] = [Role::SuperAdmin, Role::RdDepartment, Role::OtherDepartment];

    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::RdDepartment => "rd_department",
            Role::OtherDepartment => "other_department",
        }
    }

    /// Whether the role sees letters of every department.
    pub fn sees_all_departments(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::RdDepartment)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "super_admin" => Ok(Role::SuperAdmin),
            "rd_department" => Ok(Role::RdDepartment),
            "other_department" => Ok(Role::OtherDepartment),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// User entity.
///
/// `department_id` is not a users column: it is the id of the department
/// whose `user_id` points at this user, filled in by the repository join.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Password hash (Argon2).
    pub password: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub created_at: String,
    pub last_login: Option<String>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }
    }

    #[test]
    fn test_role_from_str_case_insensitive() {
        assert_eq!("SUPER_ADMIN".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!(" rd_department ".parse::<Role>().unwrap(), Role::RdDepartment);
        assert!("admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_sees_all_departments() {
        assert!(Role::SuperAdmin.sees_all_departments());
        assert!(Role::RdDepartment.sees_all_departments());
        assert!(!Role::OtherDepartment.sees_all_departments());
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(
            serde_json::to_string(&Role::OtherDepartment).unwrap(),
            "\"other_department\""
        );
        let role: Role = serde_json::from_str("\"rd_department\"").unwrap();
        assert_eq!(role, Role::RdDepartment);
    }

    #[test]
    fn test_new_user() {
        let user = NewUser::new("registry", "hash", Role::RdDepartment);
        assert_eq!(user.username, "registry");
        assert_eq!(user.role, Role::RdDepartment);
    }
}

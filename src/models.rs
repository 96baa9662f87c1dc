// Entities persisted by the database collaborator. The HTTP-facing shapes
// live in `api`; these carry the internal ids the API never exposes.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closed set of roles. The storage layer writes the lowercase form and
/// call sites match exhaustively, so a new role cannot slip in as a bare
/// string.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    /// Case-insensitive, matching how the original data was compared.
    pub fn parse(s: &str) -> Option<Role> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dish {
    pub id: i64,
    pub name: String,
}

/// The published offer for one calendar date.
///
/// `token` is the only identifier that ever leaves the server: order links
/// embed it, so they can be shared without leaking or depending on the
/// date. `id` stays internal.
#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub id: i64,
    pub token: String,
    pub date: NaiveDate,
    pub detail: String,
    pub dishes: Vec<Dish>,
    pub notification_sent: bool,
}

/// One employee's dish pick for one calendar day. Amendments overwrite this
/// row; a second row for the same (employee, day) is a constraint violation.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub employee_id: i64,
    pub dish_id: i64,
    /// Stored exactly as submitted; trimming is a display concern.
    pub customizations: String,
    pub created_at: NaiveDate,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Admin"), Some(Role::Admin));
        assert_eq!(Role::parse("EMPLOYEE"), Some(Role::Employee));
        assert_eq!(Role::parse("manager"), None);
    }

    #[test]
    fn test_role_round_trips_through_storage_form() {
        for role in [Role::Admin, Role::Employee] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"employee\"").unwrap(),
            Role::Employee
        );
    }
}

//! Who is calling.
//!
//! Authentication proper is a fronting proxy's job; it forwards the
//! authenticated username in a trusted header. This module resolves that
//! header against the user store and enforces the admin gate. The domain
//! functions themselves stay role-agnostic.

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::http::Request;
use crate::models::{Role, User};

/// Header a fronting proxy sets after authenticating the caller.
pub const USER_HEADER: &str = "X-Username";

/// The authenticated caller, or `Unauthenticated` when the header is
/// absent, blank, or names nobody we know.
pub fn current_user(db: &dyn Database, request: &Request) -> Result<User> {
    let username = request
        .header_value(USER_HEADER)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(Error::Unauthenticated)?;
    db.user_by_username(username)?.ok_or(Error::Unauthenticated)
}

/// Gate for the administrative endpoints.
pub fn require_admin(user: &User) -> Result<()> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Employee => Err(Error::Forbidden),
    }
}

/// Make sure the configured administrator account exists, first boot
/// included. An existing user is returned as-is; if someone registered
/// that name as an employee, that is worth shouting about rather than
/// silently promoting them.
pub fn ensure_admin(db: &mut dyn Database, username: &str) -> Result<User> {
    if let Some(user) = db.user_by_username(username)? {
        if user.role != Role::Admin {
            log::warn!(
                "Configured administrator '{}' exists but is not an admin",
                username
            );
        }
        return Ok(user);
    }
    log::info!("Seeding administrator account '{}'", username);
    db.insert_user(username, username, Role::Admin)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::mock::MockDb;

    fn db_with_users() -> MockDb {
        let mut db = MockDb::new();
        db.insert_user("nora", "Nora", Role::Admin).unwrap();
        db.insert_user("zoe", "Zoe", Role::Employee).unwrap();
        db
    }

    #[test]
    fn test_resolves_the_trusted_header() {
        let db = db_with_users();
        let request = Request::get("/menu").with_header(USER_HEADER, "zoe");

        let user = current_user(&db, &request).unwrap();
        assert_eq!(user.username, "zoe");
        assert_eq!(user.role, Role::Employee);
    }

    #[test]
    fn test_header_name_and_padding_are_forgiven() {
        let db = db_with_users();
        let request = Request::get("/menu").with_header("x-username", " nora ");

        let user = current_user(&db, &request).unwrap();
        assert_eq!(user.username, "nora");
    }

    #[test]
    fn test_missing_blank_or_unknown_callers_are_rejected() {
        let db = db_with_users();

        for request in [
            Request::get("/menu"),
            Request::get("/menu").with_header(USER_HEADER, "  "),
            Request::get("/menu").with_header(USER_HEADER, "stranger"),
        ] {
            assert!(matches!(
                current_user(&db, &request),
                Err(Error::Unauthenticated)
            ));
        }
    }

    #[test]
    fn test_admin_gate() {
        let db = db_with_users();

        let nora = db.user_by_username("nora").unwrap().unwrap();
        let zoe = db.user_by_username("zoe").unwrap().unwrap();

        assert!(require_admin(&nora).is_ok());
        assert!(matches!(require_admin(&zoe), Err(Error::Forbidden)));
    }

    #[test]
    fn test_ensure_admin_seeds_once_and_never_promotes() {
        let mut db = MockDb::new();

        let seeded = ensure_admin(&mut db, "nora").unwrap();
        assert_eq!(seeded.role, Role::Admin);
        assert_eq!(seeded.display_name, "nora");

        // Idempotent across restarts.
        let again = ensure_admin(&mut db, "nora").unwrap();
        assert_eq!(again.id, seeded.id);

        // A same-named employee keeps their role.
        db.insert_user("zoe", "Zoe", Role::Employee).unwrap();
        let zoe = ensure_admin(&mut db, "zoe").unwrap();
        assert_eq!(zoe.role, Role::Employee);
    }
}

use chrono::{NaiveDate, NaiveTime};

use crate::notify::NotifyError;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while serving a request, grouped by what the
/// caller can do about it: fix the input, retry, or call an administrator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Validation: the caller corrects the input and resubmits.
    #[error("Please choose a dish")]
    NoDishSelected,
    #[error("A menu needs at least one dish")]
    EmptyDishSet,
    #[error("There is no dish with id {0}")]
    UnknownDish(i64),
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid request body: {0}")]
    Json(#[from] serde_json::Error),

    // The cutoff gate for first orders of the day.
    #[error("Too late to order, it is {}", .0.format("%H:%M"))]
    TooLate(NaiveTime),

    // Conflicts: a storage uniqueness rule rejected a write.
    #[error("A menu already exists for {0}")]
    DuplicateDate(NaiveDate),
    #[error("A dish named '{0}' already exists")]
    DuplicateDish(String),
    #[error("The username '{0}' is already taken")]
    DuplicateUser(String),
    #[error("{0}, please try again")]
    Conflict(String),

    // At-most-one invariants broken in storage. Raised only by
    // `at_most_one`; a request cannot recover from this.
    #[error("{0}, please contact an administrator")]
    Integrity(String),

    #[error("{0}")]
    NotFound(String),

    // Collaborators.
    #[error("{0}")]
    Notification(#[from] NotifyError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Session.
    #[error("Not signed in")]
    Unauthenticated,
    #[error("Only administrators can do that")]
    Forbidden,

    // Startup.
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Route registration failed: {0}")]
    Route(#[from] matchit::InsertError),

    // HTTP plumbing.
    #[error("Connection reset by peer")]
    ConnectionReset,
}

impl Error {
    /// HTTP status this error is rendered with at the request boundary.
    pub fn status(&self) -> u16 {
        match self {
            Error::NoDishSelected
            | Error::EmptyDishSet
            | Error::UnknownDish(_)
            | Error::BadRequest(_)
            | Error::Json(_) => 400,
            Error::Unauthenticated => 401,
            Error::TooLate(_) | Error::Forbidden => 403,
            Error::NotFound(_) => 404,
            Error::DuplicateDate(_)
            | Error::DuplicateDish(_)
            | Error::DuplicateUser(_)
            | Error::Conflict(_) => 409,
            Error::Notification(_) => 502,
            Error::Integrity(_)
            | Error::Database(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Route(_)
            | Error::ConnectionReset => 500,
        }
    }
}

/// Reduce a lookup to the at-most-one row the storage invariants promise.
///
/// Zero rows is a normal miss and one row a normal hit. More than one means
/// a uniqueness constraint failed to do its job; that is never resolved by
/// quietly picking a row, it is surfaced so an administrator hears about it.
pub fn at_most_one<T>(
    mut rows: Vec<T>,
    violation: impl FnOnce(usize) -> String,
) -> Result<Option<T>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        n => Err(Error::Integrity(violation(n))),
    }
}

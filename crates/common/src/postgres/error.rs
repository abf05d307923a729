use crate::domain::DomainError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const NOT_NULL_VIOLATION: &str = "23502";

/// SQLSTATE of a constraint violation, if this error is one
pub(crate) fn constraint_violation(e: &tokio_postgres::Error) -> Option<&'static str> {
    let code = e.as_db_error()?.code().code();
    [
        UNIQUE_VIOLATION,
        FOREIGN_KEY_VIOLATION,
        CHECK_VIOLATION,
        NOT_NULL_VIOLATION,
    ]
    .into_iter()
    .find(|c| *c == code)
}

pub(crate) fn is_unique_violation(e: &tokio_postgres::Error) -> bool {
    constraint_violation(e) == Some(UNIQUE_VIOLATION)
}

pub(crate) fn is_foreign_key_violation(e: &tokio_postgres::Error) -> bool {
    constraint_violation(e) == Some(FOREIGN_KEY_VIOLATION)
}

/// Name of the constraint a database error reports, if any
pub(crate) fn violated_constraint(e: &tokio_postgres::Error) -> Option<&str> {
    e.as_db_error()?.constraint()
}

/// Classify a failed write: constraint violations become IntegrityViolation,
/// everything else stays a RepositoryError
pub(crate) fn write_error(e: tokio_postgres::Error) -> DomainError {
    match constraint_violation(&e) {
        Some(code) => {
            let detail = e
                .as_db_error()
                .map(|db| db.message().to_string())
                .unwrap_or_else(|| e.to_string());
            DomainError::IntegrityViolation(format!("[{}] {}", code, detail))
        }
        None => DomainError::RepositoryError(e.into()),
    }
}

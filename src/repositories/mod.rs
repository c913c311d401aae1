pub(crate) mod assignments;
pub(crate) mod health;
pub(crate) mod problems;
pub(crate) mod stats;
pub(crate) mod submissions;
pub(crate) mod testcases;
pub(crate) mod users;

/// True when `err` is a PostgreSQL unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True when `err` is a PostgreSQL foreign-key violation.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

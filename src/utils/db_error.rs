//! Classification of database constraint violations.

/// Returns `true` if `e` is a unique violation on the given constraint.
///
/// `constraint = None` matches any unique violation.
pub fn is_unique_violation(e: &sqlx::Error, constraint: Option<&str>) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    if !db_err.is_unique_violation() {
        return false;
    }

    constraint.is_none_or(|name| db_err.constraint() == Some(name))
}

/// Returns `true` if `e` is a foreign key violation, e.g. a click for a deleted slug.
pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_foreign_key_violation())
}

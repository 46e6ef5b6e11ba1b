pub mod activity;
pub mod comments;
pub mod documents;
pub mod notifications;
pub mod signatories;
pub mod subscriptions;
pub mod users;

use super::DbError;

/// Map `QueryReturnedNoRows` to a typed not-found error.
pub(crate) fn not_found(what: &'static str) -> impl FnOnce(rusqlite::Error) -> DbError {
    move |err| match err {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(what.into()),
        other => DbError::Sqlite(other),
    }
}

pub(crate) fn invalid_column(index: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        format!("unexpected value '{raw}'").into(),
    )
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::users::{self, NewUser};
    use crate::types::model::{Role, User};
    use rusqlite::Connection;

    pub(crate) fn user(conn: &Connection, name: &str, role: Role) -> User {
        users::insert(
            conn,
            &NewUser {
                email: format!("{}@club.example", name.to_ascii_lowercase()),
                display_name: name.to_string(),
                role,
                password_hash: "hash".to_string(),
            },
        )
        .expect("insert user")
    }
}

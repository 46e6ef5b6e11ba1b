use rusqlite::{Connection, OptionalExtension, Row};

use super::{invalid_column, not_found};
use crate::db::{self, DbError, Result};
use crate::types::model::{Role, User};

const COLUMNS: &str = "id, email, display_name, role, created_at";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub password_hash: String,
}

pub fn insert(conn: &Connection, user: &NewUser) -> Result<User> {
    let id = db::new_id();
    let created_at = db::now();
    let email = user.email.trim().to_ascii_lowercase();
    conn.execute(
        "INSERT INTO users (id, email, display_name, role, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            id,
            email,
            user.display_name,
            user.role.as_str(),
            user.password_hash,
            db::to_millis(created_at),
        ],
    )
    .map_err(|err| match err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::Constraint(format!("user {email} already exists"))
        }
        other => DbError::Sqlite(other),
    })?;
    Ok(User {
        id,
        email,
        display_name: user.display_name.clone(),
        role: user.role,
        created_at,
    })
}

pub fn get(conn: &Connection, id: &str) -> Result<User> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        [id],
        user_from_row,
    )
    .map_err(not_found("user"))
}

/// Look up a user and its password hash for login.
pub fn credentials_by_email(conn: &Connection, email: &str) -> Result<Option<(User, String)>> {
    let email = email.trim().to_ascii_lowercase();
    let found = conn
        .query_row(
            &format!("SELECT {COLUMNS}, password_hash FROM users WHERE email = ?1"),
            [email],
            |row| Ok((user_from_row(row)?, row.get::<_, String>(5)?)),
        )
        .optional()?;
    Ok(found)
}

pub fn list(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM users ORDER BY display_name, created_at"
    ))?;
    let rows = stmt
        .query_map([], user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every user id except `except`, in creation order.
pub fn ids_except(conn: &Connection, except: Option<&str>) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM users WHERE ?1 IS NULL OR id <> ?1 ORDER BY created_at, rowid",
    )?;
    let ids = stmt
        .query_map([except], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub fn admin_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT id FROM users WHERE role = 'admin' ORDER BY created_at, rowid")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        role: Role::parse(&role).ok_or_else(|| invalid_column(3, &role))?,
        created_at: db::from_millis(row.get(4)?),
    })
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::db::queries::fixtures;

    #[test]
    fn insert__should_reject_duplicate_email() {
        // Given
        let conn = db::open_memory().expect("open");
        fixtures::user(&conn, "Ada", Role::Member);

        // When
        let result = insert(
            &conn,
            &NewUser {
                email: "ADA@club.example".to_string(),
                display_name: "Other Ada".to_string(),
                role: Role::Admin,
                password_hash: "hash".to_string(),
            },
        );

        // Then
        assert!(matches!(result, Err(DbError::Constraint(_))));
    }

    #[test]
    fn ids_except__should_skip_the_excluded_user() {
        // Given
        let conn = db::open_memory().expect("open");
        let ada = fixtures::user(&conn, "Ada", Role::Member);
        let bob = fixtures::user(&conn, "Bob", Role::Admin);

        // When
        let ids = ids_except(&conn, Some(&ada.id)).expect("ids");
        let all = ids_except(&conn, None).expect("all ids");

        // Then
        assert_eq!(ids, vec![bob.id.clone()]);
        assert_eq!(all, vec![ada.id, bob.id]);
    }

    #[test]
    fn credentials_by_email__should_match_case_insensitively() {
        let conn = db::open_memory().expect("open");
        let ada = fixtures::user(&conn, "Ada", Role::Member);

        let (user, hash) = credentials_by_email(&conn, " Ada@Club.Example ")
            .expect("query")
            .expect("credentials");

        assert_eq!(user.id, ada.id);
        assert_eq!(hash, "hash");
    }
}

use rusqlite::{Connection, Row};

use crate::db::{self, Result};
use crate::types::push::Subscription;

const COLUMNS: &str = "id, user_id, endpoint, p256dh, auth, created_at, updated_at";

/// Insert or refresh the keys of the (user, endpoint) registration.
pub fn upsert(
    conn: &Connection,
    user_id: &str,
    endpoint: &str,
    p256dh: &str,
    auth: &str,
) -> Result<Subscription> {
    let now = db::to_millis(db::now());
    let subscription = conn.query_row(
        &format!(
            "INSERT INTO push_subscriptions (id, user_id, endpoint, p256dh, auth, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT (user_id, endpoint)
             DO UPDATE SET p256dh = excluded.p256dh, auth = excluded.auth, updated_at = excluded.updated_at
             RETURNING {COLUMNS}"
        ),
        rusqlite::params![db::new_id(), user_id, endpoint, p256dh, auth, now],
        subscription_from_row,
    )?;
    Ok(subscription)
}

pub fn list_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM push_subscriptions WHERE user_id = ?1 ORDER BY created_at, rowid"
    ))?;
    let rows = stmt
        .query_map([user_id], subscription_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete(conn: &Connection, user_id: &str, endpoint: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM push_subscriptions WHERE user_id = ?1 AND endpoint = ?2",
        [user_id, endpoint],
    )?;
    Ok(deleted > 0)
}

/// Drop a registration the push service reported as gone.
pub fn delete_by_id(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM push_subscriptions WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        endpoint: row.get(2)?,
        p256dh: row.get(3)?,
        auth: row.get(4)?,
        created_at: db::from_millis(row.get(5)?),
        updated_at: db::from_millis(row.get(6)?),
    })
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::db::queries::fixtures;
    use crate::types::model::Role;

    #[test]
    fn upsert__should_keep_one_row_with_latest_keys() {
        // Given
        let conn = db::open_memory().expect("open");
        let ada = fixtures::user(&conn, "Ada", Role::Member);

        // When
        let first = upsert(&conn, &ada.id, "https://push.example/1", "p256-a", "auth-a")
            .expect("first upsert");
        let second = upsert(&conn, &ada.id, "https://push.example/1", "p256-b", "auth-b")
            .expect("second upsert");

        // Then
        let stored = list_for_user(&conn, &ada.id).expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(stored[0].p256dh, "p256-b");
        assert_eq!(stored[0].auth, "auth-b");
    }

    #[test]
    fn delete__should_only_remove_own_endpoint() {
        // Given
        let conn = db::open_memory().expect("open");
        let ada = fixtures::user(&conn, "Ada", Role::Member);
        let bob = fixtures::user(&conn, "Bob", Role::Member);
        upsert(&conn, &ada.id, "https://push.example/shared", "p", "a").expect("ada");
        upsert(&conn, &bob.id, "https://push.example/shared", "p", "a").expect("bob");

        // When
        let deleted = delete(&conn, &ada.id, "https://push.example/shared").expect("delete");

        // Then
        assert!(deleted);
        assert!(list_for_user(&conn, &ada.id).expect("ada list").is_empty());
        assert_eq!(list_for_user(&conn, &bob.id).expect("bob list").len(), 1);
    }
}

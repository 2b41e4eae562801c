use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::calculation::{Calculation, CalculationKind};
use crate::user::User;

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // SQLite leaves foreign keys off per connection; cascade delete from
    // users to calculations depends on this pragma.
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Users Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Calculations Table (polymorphic on the kind discriminator)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS calculations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            inputs TEXT NOT NULL,
            result REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_calculations_user ON calculations(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_calculations_kind ON calculations(kind)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// USERS
// ============================================================================

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (
            id, first_name, last_name, email, username, password_hash,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.first_name,
            user.last_name,
            user.email,
            user.username,
            user.password_hash,
            user.created_at.to_rfc3339(),
            user.updated_at.to_rfc3339(),
        ],
    )
    .context("Failed to insert user")?;

    Ok(())
}

pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, first_name, last_name, email, username, password_hash,
                    created_at, updated_at
             FROM users
             WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    email: row.get(3)?,
                    username: row.get(4)?,
                    password_hash: row.get(5)?,
                    created_at: parse_timestamp(row.get::<_, String>(6)?)?,
                    updated_at: parse_timestamp(row.get::<_, String>(7)?)?,
                })
            },
        )
        .optional()?;

    Ok(user)
}

/// Delete a user; the schema cascades the delete to their calculations.
pub fn delete_user(conn: &Connection, user_id: &str) -> Result<usize> {
    let deleted = conn
        .execute("DELETE FROM users WHERE id = ?1", params![user_id])
        .context("Failed to delete user")?;

    Ok(deleted)
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// CALCULATIONS
// ============================================================================

pub fn insert_calculation(conn: &Connection, calc: &Calculation) -> Result<()> {
    let inputs_json = serde_json::to_string(&calc.inputs)?;

    conn.execute(
        "INSERT INTO calculations (
            id, user_id, kind, inputs, result, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            calc.id,
            calc.user_id,
            calc.kind.as_str(),
            inputs_json,
            calc.result,
            calc.created_at.to_rfc3339(),
            calc.updated_at.to_rfc3339(),
        ],
    )
    .context("Failed to insert calculation")?;

    Ok(())
}

pub fn get_calculation(conn: &Connection, id: &str) -> Result<Option<Calculation>> {
    let calc = conn
        .query_row(
            "SELECT id, user_id, kind, inputs, result, created_at, updated_at
             FROM calculations
             WHERE id = ?1",
            params![id],
            map_calculation_row,
        )
        .optional()?;

    Ok(calc)
}

pub fn get_calculations_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Calculation>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, inputs, result, created_at, updated_at
         FROM calculations
         WHERE user_id = ?1
         ORDER BY created_at",
    )?;

    let calculations = stmt
        .query_map(params![user_id], map_calculation_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(calculations)
}

/// Bump `updated_at` on a calculation, leaving everything else untouched.
pub fn touch_calculation(conn: &Connection, id: &str) -> Result<usize> {
    let updated = conn
        .execute(
            "UPDATE calculations SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )
        .context("Failed to touch calculation")?;

    Ok(updated)
}

pub fn count_calculations(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM calculations", [], |row| row.get(0))?;

    Ok(count)
}

pub fn count_calculations_for_user(conn: &Connection, user_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM calculations WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

// ============================================================================
// ROW MAPPING
// ============================================================================

/// Rebuild a Calculation from a row. A stored discriminator outside the
/// four known kinds is corrupt data and surfaces as an error, never a
/// default variant.
fn map_calculation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Calculation> {
    let kind_str: String = row.get(2)?;
    let kind = CalculationKind::parse(&kind_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let inputs_json: String = row.get(3)?;
    let inputs = serde_json::from_str(&inputs_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Calculation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind,
        inputs,
        result: row.get(4)?,
        created_at: parse_timestamp(row.get::<_, String>(5)?)?,
        updated_at: parse_timestamp(row.get::<_, String>(6)?)?,
    })
}

fn parse_timestamp(raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn test_user() -> User {
        User::new("Dummy", "User", "duser@njit.edu", "dummy_user", "hashed")
    }

    #[test]
    fn test_insert_and_read_back_calculation() {
        let conn = test_db();
        let user = test_user();
        insert_user(&conn, &user).unwrap();

        let calc = Calculation::create("Addition", &user.id, json!([1, 2, 3]))
            .unwrap()
            .with_result()
            .unwrap();
        insert_calculation(&conn, &calc).unwrap();

        let loaded = get_calculation(&conn, &calc.id).unwrap().unwrap();
        assert_eq!(loaded.kind, CalculationKind::Addition);
        assert_eq!(loaded.inputs, json!([1, 2, 3]));
        assert_eq!(loaded.result, Some(6.0));
        assert_eq!(loaded.user_id, user.id);
        assert_eq!(loaded.compute_result().unwrap(), 6.0);
    }

    #[test]
    fn test_result_column_is_nullable() {
        let conn = test_db();
        let user = test_user();
        insert_user(&conn, &user).unwrap();

        let calc = Calculation::division(&user.id, json!([42, 3, 2]));
        insert_calculation(&conn, &calc).unwrap();

        let loaded = get_calculation(&conn, &calc.id).unwrap().unwrap();
        assert_eq!(loaded.result, None);
        assert_eq!(loaded.compute_result().unwrap(), 7.0);
    }

    #[test]
    fn test_list_calculations_for_user_in_creation_order() {
        let conn = test_db();
        let user = test_user();
        insert_user(&conn, &user).unwrap();

        let other = User::new("Other", "User", "other@njit.edu", "other_user", "hashed");
        insert_user(&conn, &other).unwrap();

        let kinds = ["addition", "subtraction", "multiplication", "division"];
        for kind in kinds {
            let calc = Calculation::create(kind, &user.id, json!([8, 2])).unwrap();
            insert_calculation(&conn, &calc).unwrap();
        }
        let stray = Calculation::addition(&other.id, json!([1, 1]));
        insert_calculation(&conn, &stray).unwrap();

        let calcs = get_calculations_for_user(&conn, &user.id).unwrap();
        assert_eq!(calcs.len(), 4);
        for (calc, kind) in calcs.iter().zip(kinds) {
            assert_eq!(calc.kind.as_str(), kind);
            assert_eq!(calc.user_id, user.id);
        }
    }

    #[test]
    fn test_unknown_stored_discriminator_is_an_error() {
        let conn = test_db();
        let user = test_user();
        insert_user(&conn, &user).unwrap();

        let calc = Calculation::addition(&user.id, json!([1, 2]));
        insert_calculation(&conn, &calc).unwrap();

        // Corrupt the discriminator behind the library's back.
        conn.execute(
            "UPDATE calculations SET kind = 'power' WHERE id = ?1",
            params![calc.id],
        )
        .unwrap();

        assert!(get_calculation(&conn, &calc.id).is_err());
    }

    #[test]
    fn test_deleting_user_cascades_to_calculations() {
        let conn = test_db();
        let user = test_user();
        insert_user(&conn, &user).unwrap();

        for _ in 0..3 {
            let calc = Calculation::addition(&user.id, json!([1, 2]));
            insert_calculation(&conn, &calc).unwrap();
        }
        assert_eq!(count_calculations(&conn).unwrap(), 3);

        let deleted = delete_user(&conn, &user.id).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(count_users(&conn).unwrap(), 0);
        assert_eq!(count_calculations(&conn).unwrap(), 0);
    }

    #[test]
    fn test_insert_calculation_requires_existing_user() {
        let conn = test_db();

        let calc = Calculation::addition("no-such-user", json!([1, 2]));
        assert!(insert_calculation(&conn, &calc).is_err());
    }

    #[test]
    fn test_touch_updates_only_updated_at() {
        let conn = test_db();
        let user = test_user();
        insert_user(&conn, &user).unwrap();

        let calc = Calculation::multiplication(&user.id, json!([2, 5]));
        insert_calculation(&conn, &calc).unwrap();

        touch_calculation(&conn, &calc.id).unwrap();

        let loaded = get_calculation(&conn, &calc.id).unwrap().unwrap();
        assert!(loaded.updated_at >= loaded.created_at);
        assert_eq!(loaded.inputs, calc.inputs);
        assert_eq!(loaded.kind, calc.kind);
        assert_eq!(loaded.result, None);
    }

    #[test]
    fn test_touch_missing_calculation_updates_nothing() {
        let conn = test_db();
        assert_eq!(touch_calculation(&conn, "missing").unwrap(), 0);
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let conn = test_db();
        insert_user(&conn, &test_user()).unwrap();

        let dup = User::new("Second", "User", "duser@njit.edu", "second_user", "hashed");
        assert!(insert_user(&conn, &dup).is_err());
        assert_eq!(count_users(&conn).unwrap(), 1);
    }

    #[test]
    fn test_get_missing_rows_return_none() {
        let conn = test_db();
        assert!(get_user(&conn, "missing").unwrap().is_none());
        assert!(get_calculation(&conn, "missing").unwrap().is_none());
        assert_eq!(count_calculations_for_user(&conn, "missing").unwrap(), 0);
    }
}

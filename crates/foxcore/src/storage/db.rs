//! SQLite-backed user store: balances, energy and referral attribution.

use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::config::GameConfig;
use crate::core::error::AppResult;
use crate::storage::migrations;

/// A player row from the database.
#[derive(Debug, Clone)]
pub struct User {
    /// Telegram user id (primary key)
    pub user_id: i64,
    /// Telegram username, if the account has one
    pub username: Option<String>,
    /// Soft-currency balance
    pub fur: i64,
    /// Current tap energy; one tap costs one energy
    pub energy: i64,
    /// Energy cap this player was created with
    pub max_energy: i64,
    /// RFC 3339 timestamp of the last /start or tap
    pub last_active: Option<String>,
    /// Who invited this player (never the player themselves)
    pub referrer_id: Option<i64>,
    /// How many players this one has referred
    pub invited_count: i64,
    /// Reserved for the daily bonus; not written yet
    pub last_bonus_date: Option<String>,
}

/// What a `/start` registration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    /// A new row was inserted (false for a returning player)
    pub created: bool,
    /// The referral bonus was paid to both sides
    pub bonus_granted: bool,
}

/// Result of a single tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// No row for this user id
    NotFound,
    /// The player exists but has no energy left; nothing changed
    NoEnergy,
    /// The tap was applied; fresh balances after the update
    Tapped { fur: i64, energy: i64 },
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a pool with up to 10 connections, applies embedded schema
/// migrations and the additive column check for databases created by
/// older builds.
///
/// # Example
///
/// ```no_run
/// use foxcore::storage::db;
///
/// # fn main() -> anyhow::Result<()> {
/// let pool = db::create_pool("fox_fury.db")?;
/// let conn = db::get_connection(&pool)?;
/// # Ok(())
/// # }
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    // Bring the schema up to date before handing the pool out. Unlike a
    // bad column or a locked file at request time, a failure here means
    // the store is unusable, so it propagates instead of being logged.
    let mut conn = pool.get()?;
    migrations::run_migrations(&mut conn)?;
    migrate_schema(&conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Add columns that predate the embedded migrations to an existing table.
///
/// Databases created by early builds lack `invited_count` and
/// `last_bonus_date`. Refinery only tracks its own versions, so those
/// files are patched here with an explicit `PRAGMA table_info` check —
/// re-running is always safe.
pub fn migrate_schema(conn: &Connection) -> AppResult<()> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='users'",
        [],
        |row| Ok(row.get::<_, i32>(0)? > 0),
    )?;

    if !table_exists {
        // Nothing to patch; the baseline migration creates the full table.
        return Ok(());
    }

    let mut stmt = conn.prepare("PRAGMA table_info(users)")?;
    let rows = stmt.query_map([], |row| {
        row.get::<_, String>(1) // column name
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }

    if !columns.contains(&"invited_count".to_string()) {
        log::info!("Adding missing column: invited_count to users table");
        conn.execute(
            "ALTER TABLE users ADD COLUMN invited_count INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }

    if !columns.contains(&"last_bonus_date".to_string()) {
        log::info!("Adding missing column: last_bonus_date to users table");
        conn.execute(
            "ALTER TABLE users ADD COLUMN last_bonus_date DATE DEFAULT NULL",
            [],
        )?;
    }

    Ok(())
}

fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        fur: row.get(2)?,
        energy: row.get(3)?,
        max_energy: row.get(4)?,
        last_active: row.get(5)?,
        referrer_id: row.get(6)?,
        invited_count: row.get(7)?,
        last_bonus_date: row.get(8)?,
    })
}

/// Fetch a player by Telegram user id.
pub fn get_user(conn: &Connection, user_id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT user_id, username, fur, energy, max_energy, last_active,
                    referrer_id, invited_count, last_bonus_date
             FROM users WHERE user_id = ?1",
            params![user_id],
            parse_row,
        )
        .optional()?;
    Ok(user)
}

fn user_exists(conn: &Connection, user_id: i64) -> AppResult<bool> {
    let row: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(row.is_some())
}

/// Register a `/start`: create the player on first contact, refresh
/// `last_active` on every later one.
///
/// Referral rules, all inside one transaction:
/// - a self-referral is silently treated as no referrer at all;
/// - the referrer id is stored as attribution even when unknown;
/// - the bonus is paid to both sides only when the referrer exists,
///   and the referrer's `invited_count` grows in the same step.
///
/// A repeated `/start` never re-credits a bonus, resets balances or
/// attaches a late referrer.
pub fn register_start(
    conn: &Connection,
    user_id: i64,
    username: Option<&str>,
    referrer_id: Option<i64>,
    game: &GameConfig,
) -> AppResult<StartOutcome> {
    let referrer_id = referrer_id.filter(|&id| id != user_id);

    conn.execute_batch("BEGIN IMMEDIATE")?;
    match register_start_inner(conn, user_id, username, referrer_id, game) {
        Ok(outcome) => {
            conn.execute_batch("COMMIT")?;
            Ok(outcome)
        }
        Err(err) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(err)
        }
    }
}

fn register_start_inner(
    conn: &Connection,
    user_id: i64,
    username: Option<&str>,
    referrer_id: Option<i64>,
    game: &GameConfig,
) -> AppResult<StartOutcome> {
    let now = Utc::now().to_rfc3339();

    if user_exists(conn, user_id)? {
        conn.execute(
            "UPDATE users SET last_active = ?1 WHERE user_id = ?2",
            params![now, user_id],
        )?;
        return Ok(StartOutcome {
            created: false,
            bonus_granted: false,
        });
    }

    let credited_referrer = match referrer_id {
        Some(id) => {
            if user_exists(conn, id)? {
                Some(id)
            } else {
                None
            }
        }
        None => None,
    };
    let bonus = if credited_referrer.is_some() {
        game.referral_bonus
    } else {
        0
    };

    conn.execute(
        "INSERT INTO users (user_id, username, fur, energy, max_energy, last_active, referrer_id, invited_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
        params![
            user_id,
            username,
            game.starting_fur + bonus,
            game.max_energy,
            game.max_energy,
            now,
            referrer_id
        ],
    )?;

    if let Some(referrer) = credited_referrer {
        conn.execute(
            "UPDATE users SET fur = fur + ?1, invited_count = invited_count + 1 WHERE user_id = ?2",
            params![game.referral_bonus, referrer],
        )?;
    }

    Ok(StartOutcome {
        created: true,
        bonus_granted: credited_referrer.is_some(),
    })
}

/// Apply one tap: +1 FUR, -1 energy, refresh `last_active`.
///
/// The energy check lives in the UPDATE's WHERE clause, so two requests
/// racing over the last point of energy cannot both spend it.
pub fn apply_tap(conn: &Connection, user_id: i64) -> AppResult<TapOutcome> {
    let now = Utc::now().to_rfc3339();
    let updated = conn.execute(
        "UPDATE users SET fur = fur + 1, energy = energy - 1, last_active = ?1
         WHERE user_id = ?2 AND energy >= 1",
        params![now, user_id],
    )?;

    if updated == 1 {
        let (fur, energy) = conn.query_row(
            "SELECT fur, energy FROM users WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        return Ok(TapOutcome::Tapped { fur, energy });
    }

    if user_exists(conn, user_id)? {
        Ok(TapOutcome::NoEnergy)
    } else {
        Ok(TapOutcome::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rusqlite::Connection;

    fn make_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        migrations::run_migrations_for_test(&mut conn).unwrap();
        conn
    }

    fn game() -> GameConfig {
        GameConfig::default()
    }

    // ── register_start ───────────────────────────────────────────────────────

    #[test]
    fn start_creates_user_with_starting_values() {
        let conn = make_conn();
        let outcome = register_start(&conn, 100, Some("foxplayer"), None, &game()).unwrap();
        assert!(outcome.created);
        assert!(!outcome.bonus_granted);

        let user = get_user(&conn, 100).unwrap().expect("user must exist after start");
        assert_eq!(user.fur, 500);
        assert_eq!(user.energy, 1000);
        assert_eq!(user.max_energy, 1000);
        assert_eq!(user.invited_count, 0);
        assert_eq!(user.username.as_deref(), Some("foxplayer"));
        assert!(user.referrer_id.is_none());
        assert!(user.last_active.is_some(), "last_active must be set on start");
    }

    #[test]
    fn repeated_start_touches_only_last_active() {
        let conn = make_conn();
        register_start(&conn, 100, Some("fox"), None, &game()).unwrap();
        // Spend one energy so a balance reset would be visible.
        apply_tap(&conn, 100).unwrap();

        let outcome = register_start(&conn, 100, Some("renamed"), Some(42), &game()).unwrap();
        assert!(!outcome.created, "second start must not create a new row");
        assert!(!outcome.bonus_granted);

        let user = get_user(&conn, 100).unwrap().unwrap();
        assert_eq!(user.fur, 501, "balance must survive a repeated start");
        assert_eq!(user.energy, 999, "energy must survive a repeated start");
        assert_eq!(user.username.as_deref(), Some("fox"), "username is written once");
        assert!(user.referrer_id.is_none(), "a late referrer must not attach");
    }

    #[test]
    fn referral_credits_both_sides() {
        let conn = make_conn();
        register_start(&conn, 1, Some("referrer"), None, &game()).unwrap();
        let outcome = register_start(&conn, 2, Some("invited"), Some(1), &game()).unwrap();
        assert!(outcome.created);
        assert!(outcome.bonus_granted);

        let invited = get_user(&conn, 2).unwrap().unwrap();
        assert_eq!(invited.fur, 1000, "new player gets starting FUR plus the bonus");
        assert_eq!(invited.referrer_id, Some(1));

        let referrer = get_user(&conn, 1).unwrap().unwrap();
        assert_eq!(referrer.fur, 1000, "referrer gets the bonus too");
        assert_eq!(referrer.invited_count, 1);
    }

    #[test]
    fn self_referral_is_silently_ignored() {
        let conn = make_conn();
        let outcome = register_start(&conn, 7, Some("loner"), Some(7), &game()).unwrap();
        assert!(outcome.created);
        assert!(!outcome.bonus_granted);

        let user = get_user(&conn, 7).unwrap().unwrap();
        assert_eq!(user.fur, 500, "no bonus for referring yourself");
        assert!(user.referrer_id.is_none(), "self-referral must not be stored");
        assert_eq!(user.invited_count, 0);
    }

    #[test]
    fn unknown_referrer_is_stored_without_credit() {
        let conn = make_conn();
        let outcome = register_start(&conn, 5, None, Some(99999), &game()).unwrap();
        assert!(outcome.created);
        assert!(!outcome.bonus_granted, "bonus requires an existing referrer");

        let user = get_user(&conn, 5).unwrap().unwrap();
        assert_eq!(user.fur, 500);
        assert_eq!(
            user.referrer_id,
            Some(99999),
            "attribution is kept even without credit"
        );
    }

    #[test]
    fn referral_chain_counts_each_invite() {
        let conn = make_conn();
        register_start(&conn, 1, Some("root"), None, &game()).unwrap();
        register_start(&conn, 2, None, Some(1), &game()).unwrap();
        register_start(&conn, 3, None, Some(1), &game()).unwrap();

        let root = get_user(&conn, 1).unwrap().unwrap();
        assert_eq!(root.invited_count, 2);
        assert_eq!(root.fur, 500 + 2 * 500);
    }

    // ── apply_tap ────────────────────────────────────────────────────────────

    #[test]
    fn tap_moves_one_energy_into_one_fur() {
        let conn = make_conn();
        register_start(&conn, 10, None, None, &game()).unwrap();

        let outcome = apply_tap(&conn, 10).unwrap();
        assert_eq!(outcome, TapOutcome::Tapped { fur: 501, energy: 999 });

        let user = get_user(&conn, 10).unwrap().unwrap();
        assert_eq!(user.fur, 501);
        assert_eq!(user.energy, 999);
    }

    #[test]
    fn tap_with_no_energy_changes_nothing() {
        let conn = make_conn();
        register_start(&conn, 3, None, None, &game()).unwrap();
        conn.execute("UPDATE users SET energy = 0 WHERE user_id = 3", [])
            .unwrap();

        let outcome = apply_tap(&conn, 3).unwrap();
        assert_eq!(outcome, TapOutcome::NoEnergy);

        let user = get_user(&conn, 3).unwrap().unwrap();
        assert_eq!(user.fur, 500, "a refused tap must not change fur");
        assert_eq!(user.energy, 0, "energy must not go negative");
    }

    #[test]
    fn tap_for_unknown_user_reports_not_found() {
        let conn = make_conn();
        assert_eq!(apply_tap(&conn, 12345).unwrap(), TapOutcome::NotFound);
    }

    // ── get_user ─────────────────────────────────────────────────────────────

    #[test]
    fn get_user_missing_returns_none() {
        let conn = make_conn();
        let user = get_user(&conn, 404).unwrap();
        assert!(user.is_none());
    }

    // ── migrate_schema ───────────────────────────────────────────────────────

    #[test]
    fn migrate_schema_adds_columns_to_legacy_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (
                user_id INTEGER PRIMARY KEY,
                username TEXT,
                fur INTEGER NOT NULL DEFAULT 0,
                energy INTEGER NOT NULL DEFAULT 1000,
                max_energy INTEGER NOT NULL DEFAULT 1000,
                last_active DATETIME DEFAULT NULL,
                referrer_id INTEGER DEFAULT NULL
            );",
        )
        .unwrap();

        migrate_schema(&conn).unwrap();

        conn.execute("INSERT INTO users (user_id) VALUES (1)", [])
            .unwrap();
        let user = get_user(&conn, 1).unwrap().unwrap();
        assert_eq!(user.invited_count, 0, "patched column must default to 0");
        assert!(user.last_bonus_date.is_none());
    }

    #[test]
    fn migrate_schema_is_idempotent() {
        let conn = make_conn();
        migrate_schema(&conn).unwrap();
        migrate_schema(&conn).unwrap();
    }

    #[test]
    fn migrate_schema_without_users_table_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_schema(&conn).unwrap();
    }
}

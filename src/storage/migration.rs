//! Versioned schema migration keyed on `PRAGMA user_version`.
//!
//! Each entry of [`MIGRATIONS`] moves the schema one version forward. Applied
//! versions are skipped, so running the migration on every start is a no-op
//! once the database is current.

use rusqlite::{params, Connection};

use crate::error::Result;

use super::{DELETED_USER_ID, DELETED_USER_NAME};

const MIGRATIONS: &[&str] = &[
    // v1: accounts, decks, cards, subscriptions, progress
    r#"
    CREATE TABLE account (
        acc_id        INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT NOT NULL UNIQUE,
        email         TEXT NOT NULL UNIQUE,
        name          TEXT NOT NULL DEFAULT '',
        passwd        TEXT NOT NULL,
        token         TEXT UNIQUE,
        token_expire  TEXT NOT NULL,
        last_seen     TEXT NOT NULL,
        since         TEXT NOT NULL
    );

    CREATE TABLE deck (
        deck_id      INTEGER PRIMARY KEY AUTOINCREMENT,
        acc_id       INTEGER NOT NULL REFERENCES account(acc_id) ON DELETE CASCADE,
        title        TEXT NOT NULL,
        description  TEXT NOT NULL DEFAULT '',
        visible      INTEGER NOT NULL DEFAULT 0,
        updated_at   TEXT NOT NULL,
        created_at   TEXT NOT NULL
    );

    CREATE TABLE card (
        card_id   INTEGER PRIMARY KEY AUTOINCREMENT,
        deck_id   INTEGER NOT NULL REFERENCES deck(deck_id) ON DELETE CASCADE,
        front     TEXT NOT NULL,
        back      TEXT NOT NULL,
        question  TEXT NOT NULL,
        answer    TEXT NOT NULL
    );

    CREATE TABLE distractor (
        wrong_id  INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id   INTEGER NOT NULL REFERENCES card(card_id) ON DELETE CASCADE,
        answer    TEXT NOT NULL
    );

    CREATE TABLE acc_deck (
        acc_id   INTEGER NOT NULL REFERENCES account(acc_id) ON DELETE CASCADE,
        deck_id  INTEGER NOT NULL REFERENCES deck(deck_id) ON DELETE CASCADE,
        PRIMARY KEY (acc_id, deck_id)
    );

    CREATE TABLE progress (
        progress_id       INTEGER PRIMARY KEY AUTOINCREMENT,
        acc_id            INTEGER NOT NULL REFERENCES account(acc_id) ON DELETE CASCADE,
        card_id           INTEGER NOT NULL REFERENCES card(card_id) ON DELETE CASCADE,
        ease              REAL NOT NULL DEFAULT 2.5,
        interval          INTEGER NOT NULL DEFAULT 0,
        priority          INTEGER NOT NULL DEFAULT 0,
        days_hidden       INTEGER NOT NULL DEFAULT 0,
        watch_count       INTEGER NOT NULL DEFAULT 0,
        priority_exam     INTEGER NOT NULL DEFAULT 0,
        days_hidden_exam  INTEGER NOT NULL DEFAULT 0,
        answer_count      INTEGER NOT NULL DEFAULT 0,
        correct_count     INTEGER NOT NULL DEFAULT 0,
        is_relearning     INTEGER NOT NULL DEFAULT 0,
        is_buried         INTEGER NOT NULL DEFAULT 0,
        created_at        TEXT NOT NULL,
        updated_at        TEXT NOT NULL,
        UNIQUE (acc_id, card_id)
    );

    CREATE INDEX idx_deck_acc_id ON deck(acc_id);
    CREATE INDEX idx_card_deck_id ON card(deck_id);
    CREATE INDEX idx_distractor_card_id ON distractor(card_id);
    CREATE INDEX idx_acc_deck_deck_id ON acc_deck(deck_id);
    CREATE INDEX idx_progress_card_id ON progress(card_id);
    "#,
    // v2: deck ratings
    r#"
    CREATE TABLE deck_rating (
        acc_id   INTEGER NOT NULL REFERENCES account(acc_id) ON DELETE CASCADE,
        deck_id  INTEGER NOT NULL REFERENCES deck(deck_id) ON DELETE CASCADE,
        rating   INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        PRIMARY KEY (acc_id, deck_id)
    );
    "#,
];

/// Bring the schema up to date and make sure the deleted-user sentinel exists.
pub fn migrate(conn: &Connection) -> Result<()> {
    let current: usize = conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))? as usize;

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
        let version = index + 1;
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version as i64)?;
        tx.commit()?;
        log::info!("Migration: schema upgraded to v{}", version);
    }

    seed_sentinel(conn)
}

/// The sentinel has no token and an unusable password hash, so it can never
/// be resolved or logged into.
fn seed_sentinel(conn: &Connection) -> Result<()> {
    let now = chrono::Utc::now();
    conn.execute(
        "INSERT OR IGNORE INTO account (acc_id, username, email, name, passwd, token, token_expire, last_seen, since)
         VALUES (?1, ?2, ?3, 'Deleted user', '!', NULL, ?4, ?4, ?4)",
        params![
            DELETED_USER_ID,
            DELETED_USER_NAME,
            format!("{}@localhost", DELETED_USER_NAME),
            now
        ],
    )?;
    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}

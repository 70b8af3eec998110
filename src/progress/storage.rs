//! Progress ledger: per-account review state of individual cards

use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use super::algorithm::{format_interval, next_schedule, rating_to_quality};
use super::models::*;
use crate::accounts::AccountId;
use crate::cards::CardId;
use crate::error::{constraint_violation, Constraint, Result, ServiceError};
use crate::storage::Assignments;

const PROGRESS_COLUMNS: &str = "progress_id, acc_id, card_id, ease, interval, priority, days_hidden, \
     watch_count, priority_exam, days_hidden_exam, answer_count, correct_count, \
     is_relearning, is_buried, created_at, updated_at";

/// Cards account `?1` may read, narrowed to card `?2`. Same rule as `decks::access::can_read`.
const READABLE_CARD: &str = "FROM card c JOIN deck d ON d.deck_id = c.deck_id \
     WHERE c.card_id = ?2 AND (d.visible = 1 OR d.acc_id = ?1)";

fn progress_from_row(row: &Row) -> rusqlite::Result<Progress> {
    Ok(Progress {
        id: row.get(0)?,
        account_id: row.get(1)?,
        card_id: row.get(2)?,
        ease: row.get(3)?,
        interval: row.get(4)?,
        priority: row.get(5)?,
        days_hidden: row.get(6)?,
        watch_count: row.get(7)?,
        priority_exam: row.get(8)?,
        days_hidden_exam: row.get(9)?,
        answer_count: row.get(10)?,
        correct_count: row.get(11)?,
        is_relearning: row.get(12)?,
        is_buried: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn find(conn: &Connection, account: AccountId, card: CardId) -> Result<Option<Progress>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM progress WHERE acc_id = ?1 AND card_id = ?2",
                PROGRESS_COLUMNS
            ),
            params![account, card],
            progress_from_row,
        )
        .optional()?)
}

fn ensure_readable(conn: &Connection, account: AccountId, card: CardId) -> Result<()> {
    let readable: bool = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 {})", READABLE_CARD),
        params![account, card],
        |row| row.get(0),
    )?;
    if readable {
        Ok(())
    } else {
        Err(ServiceError::NotFound("card"))
    }
}

/// A failed account reference means the credential points at nobody
fn map_write_error(err: rusqlite::Error) -> ServiceError {
    match constraint_violation(&err) {
        Some(Constraint::ForeignKey) => ServiceError::InvalidCredential,
        Some(Constraint::Unique) => ServiceError::Conflict("progress"),
        None => err.into(),
    }
}

pub struct ProgressLedger<'c> {
    conn: &'c Connection,
}

impl<'c> ProgressLedger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, account: AccountId, card: CardId) -> Result<Progress> {
        find(self.conn, account, card)?.ok_or(ServiceError::NotFound("progress"))
    }

    /// Create a progress row with every field at its default
    pub fn create(&self, account: AccountId, card: CardId) -> Result<Progress> {
        let now = Utc::now();
        let inserted = self
            .conn
            .execute(
                &format!(
                    "INSERT INTO progress (acc_id, card_id, created_at, updated_at)
                     SELECT ?1, c.card_id, ?3, ?3 {}",
                    READABLE_CARD
                ),
                params![account, card, now],
            )
            .map_err(map_write_error)?;
        if inserted == 0 {
            return Err(ServiceError::NotFound("card"));
        }
        self.get(account, card)
    }

    /// Write only the supplied fields, creating the row on first use.
    ///
    /// Runs as one `INSERT ... ON CONFLICT DO UPDATE`, so concurrent callers
    /// never see a half-applied patch and untouched columns keep their values.
    pub fn upsert(&self, account: AccountId, card: CardId, patch: ProgressPatch) -> Result<Progress> {
        if patch.is_empty() {
            return Err(ServiceError::bad_request("no progress fields supplied"));
        }

        let mut assignments = Assignments::new();
        assignments
            .set("ease", patch.ease)
            .set("interval", patch.interval)
            .set("priority", patch.priority)
            .set("days_hidden", patch.days_hidden)
            .set("watch_count", patch.watch_count)
            .set("priority_exam", patch.priority_exam)
            .set("days_hidden_exam", patch.days_hidden_exam)
            .set("answer_count", patch.answer_count)
            .set("correct_count", patch.correct_count)
            .set("is_relearning", patch.is_relearning)
            .set("is_buried", patch.is_buried);

        let columns = assignments.columns();
        let placeholders: Vec<String> = (0..columns.len()).map(|i| format!("?{}", i + 4)).collect();
        let updates: Vec<String> = columns
            .iter()
            .map(|column| format!("{0} = excluded.{0}", column))
            .collect();
        let sql = format!(
            "INSERT INTO progress (acc_id, card_id, created_at, updated_at, {})
             SELECT ?1, c.card_id, ?3, ?3, {} {}
             ON CONFLICT(acc_id, card_id) DO UPDATE SET updated_at = excluded.updated_at, {}",
            columns.join(", "),
            placeholders.join(", "),
            READABLE_CARD,
            updates.join(", ")
        );

        let now = Utc::now();
        let mut values: Vec<&dyn ToSql> = vec![&account, &card, &now];
        values.extend(assignments.values());

        let written = self
            .conn
            .execute(&sql, values.as_slice())
            .map_err(map_write_error)?;
        if written == 0 {
            return Err(ServiceError::NotFound("card"));
        }
        self.get(account, card)
    }

    pub fn delete(&self, account: AccountId, card: CardId) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM progress WHERE acc_id = ?1 AND card_id = ?2",
            params![account, card],
        )?;
        if affected == 0 {
            return Err(ServiceError::NotFound("progress"));
        }
        Ok(())
    }

    /// Apply an SM-2 review and hide the card until its next interval.
    ///
    /// The read of the current ease and interval and the write of the new
    /// schedule share one immediate transaction.
    pub fn record_review(&self, account: AccountId, card: CardId, rating: ReviewRating) -> Result<ReviewOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_readable(&tx, account, card)?;

        let (ease, interval, is_relearning) = match find(&tx, account, card)? {
            Some(p) => (p.ease, p.interval, p.is_relearning),
            None => (DEFAULT_EASE, 0, false),
        };
        let schedule = next_schedule(ease, interval, is_relearning, rating_to_quality(rating));

        tx.execute(
            "INSERT INTO progress (acc_id, card_id, ease, interval, days_hidden, is_relearning,
                                   watch_count, answer_count, correct_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4, ?5, 1, 1, ?6, ?7, ?7)
             ON CONFLICT(acc_id, card_id) DO UPDATE SET
                ease = excluded.ease,
                interval = excluded.interval,
                days_hidden = excluded.days_hidden,
                is_relearning = excluded.is_relearning,
                watch_count = watch_count + 1,
                answer_count = answer_count + 1,
                correct_count = correct_count + excluded.correct_count,
                updated_at = excluded.updated_at",
            params![
                account,
                card,
                schedule.ease,
                schedule.interval,
                schedule.is_relearning,
                schedule.correct as i64,
                Utc::now()
            ],
        )
        .map_err(map_write_error)?;

        let progress = find(&tx, account, card)?.ok_or(ServiceError::NotFound("progress"))?;
        tx.commit()?;

        log::debug!(
            "Account {} reviewed card {} ({:?}), next in {} days",
            account,
            card,
            rating,
            schedule.interval
        );
        Ok(ReviewOutcome {
            next_review: format_interval(progress.days_hidden),
            progress,
        })
    }

    /// Move every hidden card `days` closer to being due again
    pub fn advance_days(&self, days: u32) -> Result<usize> {
        if days == 0 {
            return Ok(0);
        }
        let affected = self.conn.execute(
            "UPDATE progress SET
                days_hidden = MAX(days_hidden - ?1, 0),
                days_hidden_exam = MAX(days_hidden_exam - ?1, 0)
             WHERE days_hidden > 0 OR days_hidden_exam > 0",
            params![days],
        )?;
        log::info!("Advanced {} progress rows by {} days", affected, days);
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::storage::tests::register;
    use crate::cards::storage::tests::create_card;
    use crate::decks::storage::tests::create_deck;
    use crate::storage::testing::create_test_db;

    fn progress_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM progress", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_upsert_creates_with_defaults() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", false);
        let card = create_card(&conn, deck.id, ana.id, "France");
        let ledger = ProgressLedger::new(&conn);

        let progress = ledger
            .upsert(
                ana.id,
                card.id,
                ProgressPatch {
                    priority: Some(3),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(progress.priority, 3);
        assert_eq!(progress.ease, DEFAULT_EASE);
        assert_eq!(progress.days_hidden, 0);
        assert_eq!(progress.watch_count, 0);
        assert!(!progress.is_buried);
        assert!(!progress.is_relearning);
    }

    #[test]
    fn test_empty_upsert_rejected_without_writing() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", false);
        let card = create_card(&conn, deck.id, ana.id, "France");

        assert!(matches!(
            ProgressLedger::new(&conn).upsert(ana.id, card.id, ProgressPatch::default()),
            Err(ServiceError::BadRequest(_))
        ));
        assert_eq!(progress_count(&conn), 0);
    }

    #[test]
    fn test_upsert_only_touches_supplied_fields() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", false);
        let card = create_card(&conn, deck.id, ana.id, "France");
        let ledger = ProgressLedger::new(&conn);

        ledger
            .upsert(
                ana.id,
                card.id,
                ProgressPatch {
                    days_hidden: Some(4),
                    is_buried: Some(true),
                    watch_count: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();
        let updated = ledger
            .upsert(
                ana.id,
                card.id,
                ProgressPatch {
                    priority: Some(5),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.priority, 5);
        assert_eq!(updated.days_hidden, 4);
        assert!(updated.is_buried);
        assert_eq!(updated.watch_count, 2);
        assert_eq!(progress_count(&conn), 1);
    }

    #[test]
    fn test_upserts_from_two_connections_keep_both_fields() {
        let (db, _temp) = create_test_db();
        let first = db.connect().unwrap();
        let second = db.connect().unwrap();
        let ana = register(&first, "ana");
        let deck = create_deck(&first, ana.id, "Capitals", false);
        let card = create_card(&first, deck.id, ana.id, "France");

        ProgressLedger::new(&first)
            .upsert(
                ana.id,
                card.id,
                ProgressPatch {
                    priority: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();
        ProgressLedger::new(&second)
            .upsert(
                ana.id,
                card.id,
                ProgressPatch {
                    is_buried: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let progress = ProgressLedger::new(&first).get(ana.id, card.id).unwrap();
        assert_eq!(progress.priority, 7);
        assert!(progress.is_buried);
    }

    #[test]
    fn test_no_progress_for_unreadable_cards() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let deck = create_deck(&conn, ana.id, "Private", false);
        let card = create_card(&conn, deck.id, ana.id, "France");
        let ledger = ProgressLedger::new(&conn);

        assert!(matches!(
            ledger.upsert(
                bea.id,
                card.id,
                ProgressPatch {
                    priority: Some(1),
                    ..Default::default()
                }
            ),
            Err(ServiceError::NotFound("card"))
        ));
        assert!(matches!(
            ledger.create(bea.id, card.id),
            Err(ServiceError::NotFound("card"))
        ));
        assert!(matches!(
            ledger.record_review(bea.id, card.id, ReviewRating::Good),
            Err(ServiceError::NotFound("card"))
        ));
        assert!(matches!(
            ledger.create(ana.id, 9999),
            Err(ServiceError::NotFound("card"))
        ));
        assert_eq!(progress_count(&conn), 0);
    }

    #[test]
    fn test_create_then_duplicate() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let card = create_card(&conn, deck.id, ana.id, "France");
        let ledger = ProgressLedger::new(&conn);

        let progress = ledger.create(ana.id, card.id).unwrap();
        assert_eq!(progress.interval, 0);
        assert!(matches!(
            ledger.create(ana.id, card.id),
            Err(ServiceError::Conflict("progress"))
        ));
    }

    #[test]
    fn test_get_and_delete() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let card = create_card(&conn, deck.id, ana.id, "France");
        let ledger = ProgressLedger::new(&conn);

        assert!(matches!(
            ledger.get(ana.id, card.id),
            Err(ServiceError::NotFound("progress"))
        ));
        assert!(matches!(
            ledger.delete(ana.id, card.id),
            Err(ServiceError::NotFound("progress"))
        ));

        ledger.create(ana.id, card.id).unwrap();
        ledger.delete(ana.id, card.id).unwrap();
        assert_eq!(progress_count(&conn), 0);
    }

    #[test]
    fn test_record_review_schedules_and_counts() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let card = create_card(&conn, deck.id, ana.id, "France");
        let ledger = ProgressLedger::new(&conn);

        let first = ledger.record_review(ana.id, card.id, ReviewRating::Good).unwrap();
        assert_eq!(first.progress.interval, 1);
        assert_eq!(first.progress.days_hidden, 1);
        assert_eq!(first.progress.answer_count, 1);
        assert_eq!(first.progress.correct_count, 1);
        assert_eq!(first.next_review, "1d");

        let second = ledger.record_review(ana.id, card.id, ReviewRating::Good).unwrap();
        assert_eq!(second.progress.interval, 6);
        assert_eq!(second.progress.watch_count, 2);

        let failed = ledger.record_review(ana.id, card.id, ReviewRating::Again).unwrap();
        assert_eq!(failed.progress.interval, 1);
        assert!(failed.progress.is_relearning);
        assert_eq!(failed.progress.answer_count, 3);
        assert_eq!(failed.progress.correct_count, 2);
        assert!(failed.progress.ease < DEFAULT_EASE);
    }

    #[test]
    fn test_advance_days_floors_at_zero() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let france = create_card(&conn, deck.id, ana.id, "France");
        let spain = create_card(&conn, deck.id, ana.id, "Spain");
        let ledger = ProgressLedger::new(&conn);

        ledger
            .upsert(
                ana.id,
                france.id,
                ProgressPatch {
                    days_hidden: Some(5),
                    days_hidden_exam: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        ledger
            .upsert(
                ana.id,
                spain.id,
                ProgressPatch {
                    priority: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(ledger.advance_days(0).unwrap(), 0);
        assert_eq!(ledger.advance_days(3).unwrap(), 1);

        let france = ledger.get(ana.id, france.id).unwrap();
        assert_eq!(france.days_hidden, 2);
        assert_eq!(france.days_hidden_exam, 0);

        ledger.advance_days(10).unwrap();
        assert_eq!(ledger.get(ana.id, france.id).unwrap().days_hidden, 0);
    }
}

//! Due-card selection and per-deck progress summaries

use std::collections::HashMap;

use rusqlite::{params, Connection};

use super::models::ProgressSummary;
use crate::accounts::AccountId;
use crate::cards::{Card, Distractor};
use crate::decks::storage::load_readable;
use crate::decks::DeckId;
use crate::error::Result;

pub struct DueCardSelector<'c> {
    conn: &'c Connection,
}

impl<'c> DueCardSelector<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Cards of a deck that are due for an account.
    ///
    /// A card is due when the account never touched it, or its progress row
    /// is neither hidden nor buried. Higher priority comes first. No due
    /// cards is an empty list; a deck the account cannot read is `NotFound`.
    pub fn due_cards(&self, account: AccountId, deck: DeckId) -> Result<Vec<Card>> {
        load_readable(self.conn, deck, Some(account))?;

        let mut stmt = self.conn.prepare(
            "SELECT c.card_id, c.deck_id, c.front, c.back, c.question, c.answer
             FROM card c
             LEFT JOIN progress p ON p.card_id = c.card_id AND p.acc_id = ?1
             WHERE c.deck_id = ?2
               AND (p.progress_id IS NULL OR (p.days_hidden <= 0 AND p.is_buried = 0))
             ORDER BY COALESCE(p.priority, 0) DESC, c.card_id",
        )?;
        let mut cards = stmt
            .query_map(params![account, deck], |row| {
                Ok(Card {
                    id: row.get(0)?,
                    deck_id: row.get(1)?,
                    front: row.get(2)?,
                    back: row.get(3)?,
                    question: row.get(4)?,
                    answer: row.get(5)?,
                    distractors: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if cards.is_empty() {
            return Ok(cards);
        }

        let mut distractors = self.deck_distractors(deck)?;
        for card in &mut cards {
            card.distractors = distractors.remove(&card.id).unwrap_or_default();
        }
        Ok(cards)
    }

    fn deck_distractors(&self, deck: DeckId) -> Result<HashMap<i64, Vec<Distractor>>> {
        let mut stmt = self.conn.prepare(
            "SELECT w.card_id, w.wrong_id, w.answer
             FROM distractor w JOIN card c ON c.card_id = w.card_id
             WHERE c.deck_id = ?1
             ORDER BY w.wrong_id",
        )?;
        let rows = stmt.query_map(params![deck], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Distractor {
                    id: row.get(1)?,
                    answer: row.get(2)?,
                },
            ))
        })?;

        let mut by_card: HashMap<i64, Vec<Distractor>> = HashMap::new();
        for row in rows {
            let (card_id, distractor) = row?;
            by_card.entry(card_id).or_default().push(distractor);
        }
        Ok(by_card)
    }

    /// How many of a deck's cards the account has reviewed
    pub fn progress_summary(&self, account: AccountId, deck: DeckId) -> Result<ProgressSummary> {
        load_readable(self.conn, deck, Some(account))?;

        let (total, reviewed): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(p.progress_id)
             FROM card c
             LEFT JOIN progress p ON p.card_id = c.card_id AND p.acc_id = ?1
             WHERE c.deck_id = ?2",
            params![account, deck],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(ProgressSummary::new(total, reviewed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::storage::tests::register;
    use crate::cards::storage::tests::create_card;
    use crate::decks::storage::tests::create_deck;
    use crate::error::ServiceError;
    use crate::progress::{ProgressLedger, ProgressPatch};
    use crate::storage::testing::create_test_db;

    #[test]
    fn test_buried_card_excluded_unreviewed_included() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", false);
        let buried = create_card(&conn, deck.id, ana.id, "France");
        let fresh = create_card(&conn, deck.id, ana.id, "Spain");

        ProgressLedger::new(&conn)
            .upsert(
                ana.id,
                buried.id,
                ProgressPatch {
                    is_buried: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let due = DueCardSelector::new(&conn).due_cards(ana.id, deck.id).unwrap();
        let ids: Vec<_> = due.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![fresh.id]);
        assert_eq!(due[0].distractors.len(), 3);
    }

    #[test]
    fn test_hidden_cards_return_after_advancing_days() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let card = create_card(&conn, deck.id, ana.id, "France");
        let ledger = ProgressLedger::new(&conn);
        let selector = DueCardSelector::new(&conn);

        ledger
            .upsert(
                ana.id,
                card.id,
                ProgressPatch {
                    days_hidden: Some(2),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(selector.due_cards(ana.id, deck.id).unwrap().is_empty());

        ledger.advance_days(2).unwrap();
        assert_eq!(selector.due_cards(ana.id, deck.id).unwrap().len(), 1);
    }

    #[test]
    fn test_progress_of_other_accounts_ignored() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let card = create_card(&conn, deck.id, ana.id, "France");

        ProgressLedger::new(&conn)
            .upsert(
                ana.id,
                card.id,
                ProgressPatch {
                    is_buried: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let selector = DueCardSelector::new(&conn);
        assert!(selector.due_cards(ana.id, deck.id).unwrap().is_empty());
        assert_eq!(selector.due_cards(bea.id, deck.id).unwrap().len(), 1);
    }

    #[test]
    fn test_priority_orders_due_cards() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let first = create_card(&conn, deck.id, ana.id, "France");
        let urgent = create_card(&conn, deck.id, ana.id, "Spain");

        ProgressLedger::new(&conn)
            .upsert(
                ana.id,
                urgent.id,
                ProgressPatch {
                    priority: Some(9),
                    ..Default::default()
                },
            )
            .unwrap();

        let ids: Vec<_> = DueCardSelector::new(&conn)
            .due_cards(ana.id, deck.id)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![urgent.id, first.id]);
    }

    #[test]
    fn test_empty_and_private_decks() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let empty = create_deck(&conn, ana.id, "Empty", true);
        let private = create_deck(&conn, ana.id, "Private", false);
        let selector = DueCardSelector::new(&conn);

        assert!(selector.due_cards(bea.id, empty.id).unwrap().is_empty());
        assert!(matches!(
            selector.due_cards(bea.id, private.id),
            Err(ServiceError::NotFound("deck"))
        ));
    }

    #[test]
    fn test_progress_summary() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let selector = DueCardSelector::new(&conn);

        let empty = selector.progress_summary(ana.id, deck.id).unwrap();
        assert_eq!(empty.total_cards, 0);
        assert_eq!(empty.percent_complete, 0.0);

        let france = create_card(&conn, deck.id, ana.id, "France");
        create_card(&conn, deck.id, ana.id, "Spain");
        ProgressLedger::new(&conn).create(ana.id, france.id).unwrap();

        let summary = selector.progress_summary(ana.id, deck.id).unwrap();
        assert_eq!(summary.total_cards, 2);
        assert_eq!(summary.reviewed_count, 1);
        assert_eq!(summary.remaining_count, 1);
        assert!((summary.percent_complete - 50.0).abs() < f64::EPSILON);
    }
}

//! Card persistence; writes are owner-only, reads follow deck visibility

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::*;
use crate::accounts::AccountId;
use crate::decks::storage::{load_readable, load_writable};
use crate::decks::DeckId;
use crate::error::{Result, ServiceError};
use crate::storage::Assignments;

const CARD_COLUMNS: &str = "card_id, deck_id, front, back, question, answer";

fn card_from_row(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        question: row.get(4)?,
        answer: row.get(5)?,
        distractors: Vec::new(),
    })
}

pub struct CardStore<'c> {
    conn: &'c Connection,
}

impl<'c> CardStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Create a card and its wrong answers in one transaction
    pub fn create(&self, deck: DeckId, requester: Option<AccountId>, new_card: NewCard) -> Result<Card> {
        new_card.validate().map_err(ServiceError::BadRequest)?;
        load_writable(self.conn, deck, requester)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO card (deck_id, front, back, question, answer) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                deck,
                new_card.front,
                new_card.back,
                new_card.question,
                new_card.answer
            ],
        )?;
        let card_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare("INSERT INTO distractor (card_id, answer) VALUES (?1, ?2)")?;
            for answer in &new_card.distractors {
                stmt.execute(params![card_id, answer])?;
            }
        }
        tx.commit()?;

        log::debug!("Created card {} in deck {}", card_id, deck);
        self.load(deck, card_id)
    }

    /// Get a card with its wrong answers
    pub fn get(&self, deck: DeckId, card: CardId, requester: Option<AccountId>) -> Result<Card> {
        load_readable(self.conn, deck, requester)?;
        self.load(deck, card)
    }

    /// Cards of a deck, without their wrong answers
    pub fn list(&self, deck: DeckId, requester: Option<AccountId>) -> Result<Vec<Card>> {
        load_readable(self.conn, deck, requester)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM card WHERE deck_id = ?1 ORDER BY card_id",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map(params![deck], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Update text fields and individual wrong answers in one transaction.
    ///
    /// An edit naming a wrong answer of another card fails the whole update.
    pub fn update(
        &self,
        deck: DeckId,
        card: CardId,
        requester: Option<AccountId>,
        update: CardUpdate,
    ) -> Result<Card> {
        if update.is_empty() {
            return Err(ServiceError::bad_request("no fields to update"));
        }
        update.validate().map_err(ServiceError::BadRequest)?;
        load_writable(self.conn, deck, requester)?;
        self.ensure_in_deck(deck, card)?;

        let tx = self.conn.unchecked_transaction()?;

        let mut assignments = Assignments::new();
        assignments
            .set("front", update.front)
            .set("back", update.back)
            .set("question", update.question)
            .set("answer", update.answer);
        if !assignments.is_empty() {
            assignments.execute_update(&tx, "card", "card_id", card)?;
        }

        for edit in &update.distractors {
            let affected = tx.execute(
                "UPDATE distractor SET answer = ?1 WHERE wrong_id = ?2 AND card_id = ?3",
                params![edit.answer, edit.id, card],
            )?;
            if affected == 0 {
                // dropping tx rolls back the edits already applied
                return Err(ServiceError::NotFound("wrong answer"));
            }
        }
        tx.commit()?;

        self.load(deck, card)
    }

    /// Delete a card; wrong answers and progress go with it
    pub fn delete(&self, deck: DeckId, card: CardId, requester: Option<AccountId>) -> Result<()> {
        load_writable(self.conn, deck, requester)?;

        let affected = self.conn.execute(
            "DELETE FROM card WHERE card_id = ?1 AND deck_id = ?2",
            params![card, deck],
        )?;
        if affected == 0 {
            return Err(ServiceError::NotFound("card"));
        }
        Ok(())
    }

    fn ensure_in_deck(&self, deck: DeckId, card: CardId) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM card WHERE card_id = ?1 AND deck_id = ?2)",
            params![card, deck],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(ServiceError::NotFound("card"))
        }
    }

    fn load(&self, deck: DeckId, card: CardId) -> Result<Card> {
        let mut found = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM card WHERE card_id = ?1 AND deck_id = ?2",
                    CARD_COLUMNS
                ),
                params![card, deck],
                card_from_row,
            )
            .optional()?
            .ok_or(ServiceError::NotFound("card"))?;

        let mut stmt = self
            .conn
            .prepare("SELECT wrong_id, answer FROM distractor WHERE card_id = ?1 ORDER BY wrong_id")?;
        found.distractors = stmt
            .query_map(params![card], |row| {
                Ok(Distractor {
                    id: row.get(0)?,
                    answer: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(found)
    }
}

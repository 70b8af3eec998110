//! Star ratings accounts leave on decks they can read

use rusqlite::{params, Connection, OptionalExtension};

use super::models::{DeckId, RatingSummary};
use super::storage::load_readable;
use crate::accounts::AccountId;
use crate::error::{Result, ServiceError};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

pub struct DeckRatings<'c> {
    conn: &'c Connection,
}

impl<'c> DeckRatings<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Rate a deck, replacing any earlier rating by the same account
    pub fn rate(&self, account: AccountId, deck: DeckId, rating: u8) -> Result<RatingSummary> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ServiceError::bad_request(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        load_readable(self.conn, deck, Some(account))?;

        self.conn.execute(
            "INSERT INTO deck_rating (acc_id, deck_id, rating) VALUES (?1, ?2, ?3)
             ON CONFLICT(acc_id, deck_id) DO UPDATE SET rating = excluded.rating",
            params![account, deck, rating],
        )?;
        log::debug!("Account {} rated deck {} with {}", account, deck, rating);

        self.summary_of(deck)
    }

    /// The account's own rating of a deck, if any
    pub fn rating_of(&self, account: AccountId, deck: DeckId) -> Result<Option<u8>> {
        load_readable(self.conn, deck, Some(account))?;
        Ok(self
            .conn
            .query_row(
                "SELECT rating FROM deck_rating WHERE acc_id = ?1 AND deck_id = ?2",
                params![account, deck],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn remove(&self, account: AccountId, deck: DeckId) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM deck_rating WHERE acc_id = ?1 AND deck_id = ?2",
            params![account, deck],
        )?;
        if affected == 0 {
            return Err(ServiceError::NotFound("rating"));
        }
        Ok(())
    }

    /// Rating summary of a deck the requester may read
    pub fn summary(&self, deck: DeckId, requester: Option<AccountId>) -> Result<RatingSummary> {
        load_readable(self.conn, deck, requester)?;
        self.summary_of(deck)
    }

    pub(crate) fn summary_of(&self, deck: DeckId) -> Result<RatingSummary> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*), COALESCE(AVG(rating), 0.0) FROM deck_rating WHERE deck_id = ?1",
            params![deck],
            |row| {
                Ok(RatingSummary {
                    rating_count: row.get(0)?,
                    average: row.get(1)?,
                })
            },
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::storage::tests::register;
    use crate::decks::storage::tests::create_deck;
    use crate::storage::testing::create_test_db;

    #[test]
    fn test_rating_replaces_previous_vote() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let ratings = DeckRatings::new(&conn);

        ratings.rate(ana.id, deck.id, 5).unwrap();
        ratings.rate(bea.id, deck.id, 2).unwrap();
        let summary = ratings.rate(bea.id, deck.id, 4).unwrap();

        assert_eq!(summary.rating_count, 2);
        assert!((summary.average - 4.5).abs() < f64::EPSILON);
        assert_eq!(ratings.rating_of(bea.id, deck.id).unwrap(), Some(4));
    }

    #[test]
    fn test_rating_bounds_and_visibility() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let private = create_deck(&conn, ana.id, "Private", false);
        let ratings = DeckRatings::new(&conn);

        assert!(matches!(
            ratings.rate(ana.id, private.id, 0),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            ratings.rate(ana.id, private.id, 6),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            ratings.rate(bea.id, private.id, 3),
            Err(ServiceError::NotFound("deck"))
        ));
        assert!(matches!(
            ratings.summary(private.id, None),
            Err(ServiceError::NotFound("deck"))
        ));
        assert_eq!(ratings.summary(private.id, Some(ana.id)).unwrap().rating_count, 0);
    }

    #[test]
    fn test_remove_rating() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let ratings = DeckRatings::new(&conn);

        ratings.rate(ana.id, deck.id, 3).unwrap();
        ratings.remove(ana.id, deck.id).unwrap();

        assert_eq!(ratings.rating_of(ana.id, deck.id).unwrap(), None);
        assert_eq!(ratings.summary_of(deck.id).unwrap(), RatingSummary::default());
        assert!(matches!(
            ratings.remove(ana.id, deck.id),
            Err(ServiceError::NotFound("rating"))
        ));
    }
}

use rusqlite::{params, Connection};

use crate::accounts::{AccountId, AccountRef, AccountStore};
use crate::decks::access::can_read;
use crate::decks::storage::{deck_from_row, load_deck, load_readable, DECK_COLUMNS};
use crate::decks::{Deck, DeckId};
use crate::error::{constraint_violation, Constraint, Result, ServiceError};

/// Account-to-deck follow relations.
///
/// One row per (account, deck) pair; the pair is the primary key, so a second
/// subscribe surfaces as `AlreadySubscribed` straight from the store.
pub struct SubscriptionRegistry<'c> {
    conn: &'c Connection,
}

impl<'c> SubscriptionRegistry<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Subscribe an account to a deck it can read
    pub fn subscribe(&self, account: AccountId, deck: DeckId) -> Result<()> {
        load_readable(self.conn, deck, Some(account))?;

        self.conn
            .execute(
                "INSERT INTO acc_deck (acc_id, deck_id) VALUES (?1, ?2)",
                params![account, deck],
            )
            .map_err(|e| match constraint_violation(&e) {
                Some(Constraint::Unique) => ServiceError::AlreadySubscribed,
                Some(Constraint::ForeignKey) => ServiceError::InvalidCredential,
                None => e.into(),
            })?;

        log::debug!("Account {} subscribed to deck {}", account, deck);
        Ok(())
    }

    pub fn unsubscribe(&self, account: AccountId, deck: DeckId) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM acc_deck WHERE acc_id = ?1 AND deck_id = ?2",
            params![account, deck],
        )?;
        if affected > 0 {
            log::debug!("Account {} unsubscribed from deck {}", account, deck);
            return Ok(());
        }

        // Nothing removed: tell an unknown account apart from a missing row
        match AccountStore::new(self.conn).get(account) {
            Ok(_) => Err(ServiceError::NotSubscribed),
            Err(ServiceError::NotFound(_)) => Err(ServiceError::InvalidCredential),
            Err(e) => Err(e),
        }
    }

    pub fn is_subscribed(&self, account: AccountId, deck: DeckId) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM acc_deck WHERE acc_id = ?1 AND deck_id = ?2)",
            params![account, deck],
            |row| row.get(0),
        )?)
    }

    pub fn subscriber_count(&self, deck: DeckId) -> Result<i64> {
        load_deck(self.conn, deck)?;
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM acc_deck WHERE deck_id = ?1",
            params![deck],
            |row| row.get(0),
        )?)
    }

    /// Decks an account follows, restricted to those the requester may read.
    ///
    /// A deck that went private after the subscription was made drops out of
    /// the list for everyone but its owner.
    pub fn subscribed_decks(&self, account: &AccountRef, requester: Option<AccountId>) -> Result<Vec<Deck>> {
        let account_id = AccountStore::new(self.conn).id_of(account)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM acc_deck s
             JOIN deck d ON d.deck_id = s.deck_id
             WHERE s.acc_id = ?1
             ORDER BY d.title, d.deck_id",
            DECK_COLUMNS
        ))?;
        let decks = stmt
            .query_map(params![account_id], deck_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(decks
            .into_iter()
            .filter(|deck| can_read(deck, requester))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::storage::tests::register;
    use crate::decks::storage::tests::create_deck;
    use crate::decks::{DeckStore, DeckUpdate};
    use crate::storage::testing::create_test_db;

    #[test]
    fn test_double_subscribe_fails() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let registry = SubscriptionRegistry::new(&conn);

        registry.subscribe(bea.id, deck.id).unwrap();
        assert!(matches!(
            registry.subscribe(bea.id, deck.id),
            Err(ServiceError::AlreadySubscribed)
        ));
        // owner was subscribed at creation
        assert!(matches!(
            registry.subscribe(ana.id, deck.id),
            Err(ServiceError::AlreadySubscribed)
        ));
        assert_eq!(registry.subscriber_count(deck.id).unwrap(), 2);
    }

    #[test]
    fn test_unsubscribe_when_absent() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let registry = SubscriptionRegistry::new(&conn);

        assert!(matches!(
            registry.unsubscribe(bea.id, deck.id),
            Err(ServiceError::NotSubscribed)
        ));

        registry.subscribe(bea.id, deck.id).unwrap();
        registry.unsubscribe(bea.id, deck.id).unwrap();
        assert!(!registry.is_subscribed(bea.id, deck.id).unwrap());
        assert!(matches!(
            registry.unsubscribe(bea.id, deck.id),
            Err(ServiceError::NotSubscribed)
        ));
    }

    #[test]
    fn test_unknown_account_is_invalid_credential() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let deck = create_deck(&conn, ana.id, "Capitals", true);
        let registry = SubscriptionRegistry::new(&conn);

        assert!(matches!(
            registry.subscribe(4242, deck.id),
            Err(ServiceError::InvalidCredential)
        ));
        assert!(matches!(
            registry.unsubscribe(4242, deck.id),
            Err(ServiceError::InvalidCredential)
        ));
    }

    #[test]
    fn test_cannot_subscribe_to_private_deck() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let deck = create_deck(&conn, ana.id, "Private", false);

        assert!(matches!(
            SubscriptionRegistry::new(&conn).subscribe(bea.id, deck.id),
            Err(ServiceError::NotFound("deck"))
        ));
    }

    #[test]
    fn test_subscribed_decks_drop_decks_gone_private() {
        let (db, _temp) = create_test_db();
        let conn = db.connect().unwrap();
        let ana = register(&conn, "ana");
        let bea = register(&conn, "bea");
        let capitals = create_deck(&conn, ana.id, "Capitals", true);
        let rivers = create_deck(&conn, ana.id, "Rivers", true);
        let registry = SubscriptionRegistry::new(&conn);
        registry.subscribe(bea.id, capitals.id).unwrap();
        registry.subscribe(bea.id, rivers.id).unwrap();

        DeckStore::new(&conn)
            .update(
                rivers.id,
                Some(ana.id),
                DeckUpdate {
                    visible: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        let for_bea = registry
            .subscribed_decks(&AccountRef::from("bea"), Some(bea.id))
            .unwrap();
        assert_eq!(for_bea.len(), 1);
        assert_eq!(for_bea[0].id, capitals.id);

        // the owner still sees the private deck in their own list
        let for_ana = registry
            .subscribed_decks(&AccountRef::Id(ana.id), Some(ana.id))
            .unwrap();
        assert_eq!(for_ana.len(), 2);

        let anonymous = registry
            .subscribed_decks(&AccountRef::from("ana"), None)
            .unwrap();
        assert_eq!(anonymous.len(), 1);
    }
}

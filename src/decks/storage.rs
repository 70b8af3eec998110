//! Deck persistence and aggregate views

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::access::{authorize_read, authorize_write, can_read};
use super::models::*;
use super::ratings::DeckRatings;
use crate::accounts::{AccountId, AccountRef, AccountStore};
use crate::error::{constraint_violation, Constraint, Result, ServiceError};
use crate::progress::DueCardSelector;
use crate::storage::Assignments;
use crate::subscriptions::SubscriptionRegistry;

/// Deck columns, selected from `deck` aliased as `d`
pub(crate) const DECK_COLUMNS: &str =
    "d.deck_id, d.acc_id, d.title, d.description, d.visible, d.updated_at, d.created_at";

/// How many times the owner auto-subscription is attempted
const OWNER_SUBSCRIBE_ATTEMPTS: usize = 2;

pub(crate) fn deck_from_row(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        visible: row.get(4)?,
        updated_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Fetch a deck with no access check
pub(crate) fn load_deck(conn: &Connection, id: DeckId) -> Result<Deck> {
    conn.query_row(
        &format!("SELECT {} FROM deck d WHERE d.deck_id = ?1", DECK_COLUMNS),
        params![id],
        deck_from_row,
    )
    .optional()?
    .ok_or(ServiceError::NotFound("deck"))
}

/// Fetch a deck the requester may read
pub(crate) fn load_readable(conn: &Connection, id: DeckId, requester: Option<AccountId>) -> Result<Deck> {
    authorize_read(load_deck(conn, id)?, requester)
}

/// Fetch a deck the requester may write
pub(crate) fn load_writable(conn: &Connection, id: DeckId, requester: Option<AccountId>) -> Result<Deck> {
    authorize_write(load_deck(conn, id)?, requester)
}

pub struct DeckStore<'c> {
    conn: &'c Connection,
}

impl<'c> DeckStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    // ==================== Deck Operations ====================

    /// Create a deck and subscribe its owner to it
    pub fn create(&self, owner: AccountId, new_deck: NewDeck) -> Result<CreatedDeck> {
        let title = new_deck.title.trim();
        if title.is_empty() {
            return Err(ServiceError::bad_request("title is required"));
        }

        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO deck (acc_id, title, description, visible, updated_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![owner, title, new_deck.description, new_deck.visible, now],
            )
            .map_err(|e| match constraint_violation(&e) {
                Some(Constraint::ForeignKey) => ServiceError::InvalidCredential,
                _ => e.into(),
            })?;
        let deck = load_deck(self.conn, self.conn.last_insert_rowid())?;
        log::info!("Account {} created deck {}", owner, deck.id);

        let owner_subscribed = self.subscribe_owner(&deck);
        Ok(CreatedDeck {
            deck,
            owner_subscribed,
        })
    }

    fn subscribe_owner(&self, deck: &Deck) -> bool {
        let registry = SubscriptionRegistry::new(self.conn);
        for attempt in 1..=OWNER_SUBSCRIBE_ATTEMPTS {
            match registry.subscribe(deck.owner_id, deck.id) {
                Ok(()) | Err(ServiceError::AlreadySubscribed) => return true,
                Err(e) => log::warn!(
                    "Owner subscription to deck {} failed (attempt {}/{}): {}",
                    deck.id,
                    attempt,
                    OWNER_SUBSCRIBE_ATTEMPTS,
                    e
                ),
            }
        }
        log::error!(
            "Deck {} created without its owner subscribed",
            deck.id
        );
        false
    }

    /// Get a deck the requester may read
    pub fn get(&self, id: DeckId, requester: Option<AccountId>) -> Result<Deck> {
        load_readable(self.conn, id, requester)
    }

    /// Update a deck (owner only); absent fields keep their values
    pub fn update(&self, id: DeckId, requester: Option<AccountId>, update: DeckUpdate) -> Result<Deck> {
        if update.is_empty() {
            return Err(ServiceError::bad_request("no fields to update"));
        }
        if matches!(update.title.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(ServiceError::bad_request("title cannot be empty"));
        }

        load_writable(self.conn, id, requester)?;

        let mut assignments = Assignments::new();
        assignments
            .set("title", update.title.map(|t| t.trim().to_string()))
            .set("description", update.description)
            .set("visible", update.visible)
            .set("updated_at", Some(Utc::now()));

        if assignments.execute_update(self.conn, "deck", "deck_id", id)? == 0 {
            return Err(ServiceError::NotFound("deck"));
        }
        load_deck(self.conn, id)
    }

    /// Delete a deck (owner only); cards, subscriptions and progress cascade
    pub fn delete(&self, id: DeckId, requester: Option<AccountId>) -> Result<()> {
        load_writable(self.conn, id, requester)?;

        let affected = self
            .conn
            .execute("DELETE FROM deck WHERE deck_id = ?1", params![id])?;
        if affected == 0 {
            return Err(ServiceError::NotFound("deck"));
        }
        Ok(())
    }

    /// Decks owned by an account, restricted to those the requester may read
    pub fn owned_by(&self, owner: &AccountRef, requester: Option<AccountId>) -> Result<Vec<Deck>> {
        let owner_id = AccountStore::new(self.conn).id_of(owner)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM deck d WHERE d.acc_id = ?1 ORDER BY d.created_at, d.deck_id",
            DECK_COLUMNS
        ))?;
        let decks = stmt
            .query_map(params![owner_id], deck_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(decks
            .into_iter()
            .filter(|deck| can_read(deck, requester))
            .collect())
    }

    // ==================== Aggregate Views ====================

    /// Build the aggregate view of a deck the caller asked for.
    ///
    /// Owner and subscriber views need a credential; the shop view works for
    /// anonymous callers on public decks.
    pub fn details(&self, id: DeckId, requester: Option<AccountId>, view: DeckView) -> Result<DeckDetails> {
        match view {
            DeckView::Owner => {
                let account = requester.ok_or(ServiceError::InvalidCredential)?;
                let deck = load_writable(self.conn, id, Some(account))?;
                let registry = SubscriptionRegistry::new(self.conn);
                Ok(DeckDetails::Owner(OwnerDetails {
                    subscriptions: registry.subscriber_count(id)?,
                    is_subscribed: registry.is_subscribed(account, id)?,
                    title: deck.title,
                    description: deck.description,
                    visible: deck.visible,
                    updated_at: deck.updated_at,
                    created_at: deck.created_at,
                }))
            }
            DeckView::Subscriber => {
                let account = requester.ok_or(ServiceError::InvalidCredential)?;
                let deck = load_readable(self.conn, id, Some(account))?;
                let progress = DueCardSelector::new(self.conn).progress_summary(account, id)?;
                Ok(DeckDetails::Subscriber(SubscriberDetails {
                    title: deck.title,
                    description: deck.description,
                    progress,
                    updated_at: deck.updated_at,
                    created_at: deck.created_at,
                }))
            }
            DeckView::Shop => {
                let deck = load_readable(self.conn, id, requester)?;
                let owner = AccountStore::new(self.conn).get(deck.owner_id)?;
                let cards: i64 = self.conn.query_row(
                    "SELECT COUNT(*) FROM card WHERE deck_id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(DeckDetails::Shop(ShopDetails {
                    subscriptions: SubscriptionRegistry::new(self.conn).subscriber_count(id)?,
                    cards,
                    owner_id: owner.id,
                    owner: owner.username,
                    rating: DeckRatings::new(self.conn).summary_of(id)?,
                    title: deck.title,
                    description: deck.description,
                    updated_at: deck.updated_at,
                    created_at: deck.created_at,
                }))
            }
        }
    }
}

//! Data models for decks and their aggregate views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::AccountId;
use crate::progress::ProgressSummary;

pub type DeckId = i64;

/// A deck is a collection of cards owned by exactly one account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub owner_id: AccountId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Public decks are readable by anyone; private ones only by the owner
    #[serde(default)]
    pub visible: bool,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeck {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Decks start private unless asked otherwise
    #[serde(default)]
    pub visible: bool,
}

/// Partial deck update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}

impl DeckUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.visible.is_none()
    }
}

/// Outcome of deck creation.
///
/// Creation is two explicit steps: insert the deck, then subscribe its owner.
/// The second step's outcome is reported rather than swallowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDeck {
    #[serde(flatten)]
    pub deck: Deck,
    pub owner_subscribed: bool,
}

/// Which aggregate a caller wants for a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeckView {
    /// Owner dashboard: subscriptions and visibility
    Owner,
    /// A subscriber's review progress through the deck
    Subscriber,
    /// Public listing, possibly for anonymous callers
    Shop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum DeckDetails {
    Owner(OwnerDetails),
    Subscriber(SubscriberDetails),
    Shop(ShopDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerDetails {
    pub title: String,
    pub description: String,
    pub subscriptions: i64,
    pub is_subscribed: bool,
    pub visible: bool,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberDetails {
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub progress: ProgressSummary,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDetails {
    pub title: String,
    pub description: String,
    pub subscriptions: i64,
    pub cards: i64,
    pub owner_id: AccountId,
    pub owner: String,
    pub rating: RatingSummary,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate of all ratings a deck received
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub rating_count: i64,
    pub average: f64,
}

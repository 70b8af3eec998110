//! Deck access evaluation.
//!
//! Owners always read and write their decks. Everyone else, anonymous callers
//! included, may only read visible decks. A caller that may not read a deck is
//! told the deck does not exist: access is denied as `NotFound`, never as a
//! distinct "forbidden", so private decks stay undiscoverable.

use crate::accounts::AccountId;
use crate::error::{Result, ServiceError};

use super::models::Deck;

fn is_owner(deck: &Deck, requester: Option<AccountId>) -> bool {
    requester == Some(deck.owner_id)
}

/// True if the deck is public or the requester owns it
pub fn can_read(deck: &Deck, requester: Option<AccountId>) -> bool {
    deck.visible || is_owner(deck, requester)
}

/// True only for the owner
pub fn can_write(deck: &Deck, requester: Option<AccountId>) -> bool {
    is_owner(deck, requester)
}

/// Pass a readable deck through; otherwise report it as missing
pub fn authorize_read(deck: Deck, requester: Option<AccountId>) -> Result<Deck> {
    if can_read(&deck, requester) {
        Ok(deck)
    } else {
        Err(ServiceError::NotFound("deck"))
    }
}

/// Pass a writable deck through.
///
/// A caller who can see the deck but does not own it gets `InvalidCredential`;
/// one who cannot even see it gets `NotFound`.
pub fn authorize_write(deck: Deck, requester: Option<AccountId>) -> Result<Deck> {
    if can_write(&deck, requester) {
        Ok(deck)
    } else if can_read(&deck, requester) {
        Err(ServiceError::InvalidCredential)
    } else {
        Err(ServiceError::NotFound("deck"))
    }
}

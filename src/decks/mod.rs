//! Decks, their access rules and aggregate views

pub mod access;
pub mod models;
pub mod ratings;
pub mod storage;

pub use models::*;
pub use ratings::DeckRatings;
pub use storage::DeckStore;

//! Subscription registry: which accounts follow which decks

pub mod storage;

pub use storage::SubscriptionRegistry;

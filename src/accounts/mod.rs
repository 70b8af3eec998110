//! Accounts and the credential resolver
//!
//! This module provides:
//! - Registration, login and logout (token rotation)
//! - Resolution of bearer credentials to live accounts
//! - Account deletion that hands public decks to the deleted-user sentinel

pub mod credentials;
pub mod models;
pub mod storage;

pub use models::*;
pub use storage::AccountStore;

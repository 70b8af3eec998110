//! Review progress and spaced repetition
//!
//! This module provides:
//! - The progress ledger (sparse upserts, reviews, day advancement)
//! - SM-2 scheduling
//! - Due-card selection and per-deck summaries

pub mod algorithm;
pub mod models;
pub mod selector;
pub mod storage;

pub use models::*;
pub use selector::DueCardSelector;
pub use storage::ProgressLedger;

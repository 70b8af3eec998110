//! Cards: prompt, answer and exactly three wrong answers

pub mod models;
pub mod storage;

pub use models::*;
pub use storage::CardStore;

//! Data models for per-account review progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::AccountId;
use crate::cards::CardId;

pub const DEFAULT_EASE: f64 = 2.5;

/// Review state of one card for one account.
///
/// A row only exists once the account has interacted with the card; cards
/// without one are treated as never reviewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: i64,
    pub account_id: AccountId,
    pub card_id: CardId,
    /// SM-2 ease factor
    pub ease: f64,
    /// Current interval in days
    pub interval: i64,
    pub priority: i64,
    /// The card stays out of the due set while this is positive
    pub days_hidden: i64,
    pub watch_count: i64,
    pub priority_exam: i64,
    pub days_hidden_exam: i64,
    pub answer_count: i64,
    pub correct_count: i64,
    pub is_relearning: bool,
    /// Manually suppressed
    pub is_buried: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sparse progress write. `None` means "leave as is", never "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(default)]
    pub ease: Option<f64>,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub days_hidden: Option<i64>,
    #[serde(default)]
    pub watch_count: Option<i64>,
    #[serde(default)]
    pub priority_exam: Option<i64>,
    #[serde(default)]
    pub days_hidden_exam: Option<i64>,
    #[serde(default)]
    pub answer_count: Option<i64>,
    #[serde(default)]
    pub correct_count: Option<i64>,
    #[serde(default)]
    pub is_relearning: Option<bool>,
    #[serde(default)]
    pub is_buried: Option<bool>,
}

impl ProgressPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How far an account got through a deck
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_cards: i64,
    pub reviewed_count: i64,
    pub remaining_count: i64,
    pub percent_complete: f64,
}

impl ProgressSummary {
    pub fn new(total_cards: i64, reviewed_count: i64) -> Self {
        let percent_complete = if total_cards == 0 {
            0.0
        } else {
            reviewed_count as f64 / total_cards as f64 * 100.0
        };
        Self {
            total_cards,
            reviewed_count,
            remaining_count: (total_cards - reviewed_count).max(0),
            percent_complete,
        }
    }
}

/// Answer buttons shown after a card is revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewRating {
    Again,
    Hard,
    Good,
    Easy,
}

impl ReviewRating {
    /// Map a 1-4 button index to a rating
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }
}

/// Progress after a review, plus when the card comes back
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    #[serde(flatten)]
    pub progress: Progress,
    pub next_review: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_emptiness() {
        assert!(ProgressPatch::default().is_empty());
        assert!(!ProgressPatch {
            is_buried: Some(false),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_summary_of_empty_deck() {
        let summary = ProgressSummary::new(0, 0);
        assert_eq!(summary.percent_complete, 0.0);
        assert_eq!(summary.remaining_count, 0);
    }

    #[test]
    fn test_summary_percent() {
        let summary = ProgressSummary::new(4, 1);
        assert_eq!(summary.remaining_count, 3);
        assert!((summary.percent_complete - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rating_index() {
        assert_eq!(ReviewRating::from_index(1), Some(ReviewRating::Again));
        assert_eq!(ReviewRating::from_index(4), Some(ReviewRating::Easy));
        assert_eq!(ReviewRating::from_index(0), None);
        assert_eq!(ReviewRating::from_index(5), None);
    }
}

//! SM-2 Spaced Repetition Algorithm
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation
//!
//! The scheduled interval doubles as the number of days the card stays hidden.

use super::models::ReviewRating;

/// Minimum ease factor allowed
const MIN_EASE: f64 = 1.3;

/// Scheduling state after a review
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub interval: i64,
    pub ease: f64,
    pub is_relearning: bool,
    pub correct: bool,
}

/// Map a review rating to SM-2 quality
pub fn rating_to_quality(rating: ReviewRating) -> i32 {
    match rating {
        ReviewRating::Again => 1, // incorrect but recognized
        ReviewRating::Hard => 3,  // correct with difficulty
        ReviewRating::Good => 4,  // correct with hesitation
        ReviewRating::Easy => 5,  // perfect
    }
}

/// Calculate the next interval and ease factor
pub fn next_schedule(ease: f64, interval: i64, is_relearning: bool, quality: i32) -> Schedule {
    let quality = quality.clamp(0, 5);

    if quality < 3 {
        return Schedule {
            interval: 1,
            ease: (ease - 0.2).max(MIN_EASE),
            is_relearning: true,
            correct: false,
        };
    }

    let interval = match interval {
        _ if is_relearning => 1,
        0 => 1,
        1 => 6,
        n => (n as f64 * ease).round() as i64,
    };

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let q = (5 - quality) as f64;
    let ease = (ease + (0.1 - q * (0.08 + q * 0.02))).max(MIN_EASE);

    Schedule {
        interval,
        ease,
        is_relearning: false,
        correct: true,
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: i64) -> String {
    match days {
        d if d <= 0 => "now".to_string(),
        d if d < 7 => format!("{}d", d),
        d if d < 30 => format!("{}w", d / 7),
        d if d < 365 => format!("{}mo", d / 30),
        d => format!("{}y", d / 365),
    }
}

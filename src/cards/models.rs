//! Data models for cards and their wrong answers

use serde::{Deserialize, Serialize};

use crate::decks::DeckId;

pub type CardId = i64;
pub type DistractorId = i64;

/// Every card carries exactly this many wrong answers
pub const DISTRACTOR_COUNT: usize = 3;

/// A card with its prompt, its answer and the wrong answers shown next to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub question: String,
    pub answer: String,
    /// Left empty in listings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distractors: Vec<Distractor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distractor {
    pub id: DistractorId,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub front: String,
    pub back: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub distractors: Vec<String>,
}

impl NewCard {
    pub(crate) fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("front", &self.front),
            ("back", &self.back),
            ("question", &self.question),
            ("answer", &self.answer),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} is required", field));
            }
        }
        if self.distractors.len() != DISTRACTOR_COUNT {
            return Err(format!(
                "a card needs exactly {} wrong answers, got {}",
                DISTRACTOR_COUNT,
                self.distractors.len()
            ));
        }
        if self.distractors.iter().any(|d| d.trim().is_empty()) {
            return Err("wrong answers cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Partial card update; wrong answers are edited one by one by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub distractors: Vec<DistractorEdit>,
}

impl CardUpdate {
    pub fn is_empty(&self) -> bool {
        self.front.is_none()
            && self.back.is_none()
            && self.question.is_none()
            && self.answer.is_none()
            && self.distractors.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let fields = [
            ("front", &self.front),
            ("back", &self.back),
            ("question", &self.question),
            ("answer", &self.answer),
        ];
        for (field, value) in fields {
            if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
                return Err(format!("{} cannot be empty", field));
            }
        }
        if self.distractors.iter().any(|d| d.answer.trim().is_empty()) {
            return Err("wrong answers cannot be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistractorEdit {
    pub id: DistractorId,
    pub answer: String,
}

use serde::{Deserialize, Serialize};

use crate::domain::{RecallClassification, UserId, WordId, WordlistId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

/// One flashcard as served by `/learning/current` and `/learning/proceed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub word: Word,
    pub word_known_type: RecallClassification,
}

impl ReviewItem {
    pub fn id(&self) -> WordId {
        self.word.id
    }

    pub fn name(&self) -> &str {
        &self.word.name
    }

    pub fn hint(&self) -> Option<&str> {
        self.word.hint.as_deref()
    }

    pub fn definition(&self) -> Option<&str> {
        self.word.definition.as_deref()
    }

    pub fn classification(&self) -> RecallClassification {
        self.word_known_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub current_wordlist_id: WordlistId,
    pub daily_new_word_count: u32,
    pub daily_revising_word_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings: Option<UserSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wordlist {
    pub id: WordlistId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub remaining: u32,
    pub learning: u32,
    pub finished: u32,
}

impl DailyProgress {
    pub fn total(&self) -> u32 {
        self.remaining
            .saturating_add(self.learning)
            .saturating_add(self.finished)
    }

    /// Share of today's words already finished, in `0.0..=1.0`.
    pub fn completion_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => f64::from(self.finished) / f64::from(total),
        }
    }
}

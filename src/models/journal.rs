use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validation::{require_id, ValidationError};

/// A dated personal reflection.
///
/// Clients usually keep one entry per day, but nothing here or in the store
/// enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub date: NaiveDate,
    /// Gratitude statements, in the order the user wrote them.
    pub gratitude: Vec<String>,
    pub thoughts: String,
    pub mood: Mood,
    pub created_at: DateTime<Utc>,
}

/// How the user felt, from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Amazing,
    Good,
    Neutral,
    Low,
    Struggling,
}

impl Mood {
    pub const ALL: [Self; 5] = [
        Self::Amazing,
        Self::Good,
        Self::Neutral,
        Self::Low,
        Self::Struggling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amazing => "amazing",
            Self::Good => "good",
            Self::Neutral => "neutral",
            Self::Low => "low",
            Self::Struggling => "struggling",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "amazing" => Some(Self::Amazing),
            "good" => Some(Self::Good),
            "neutral" => Some(Self::Neutral),
            "low" => Some(Self::Low),
            "struggling" => Some(Self::Struggling),
            _ => None,
        }
    }
}

impl JournalEntry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("journal entry", &self.id)?;
        if let Some(position) = self.gratitude.iter().position(|g| g.trim().is_empty()) {
            return Err(ValidationError::BlankGratitude { position });
        }
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validation::{require_id, ValidationError};

/// A progress-tracked task that pays out a [`QuestReward`].
///
/// Progress and completion are driven by the client. A quest may overshoot its
/// target, but it may not be marked completed before reaching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuest {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub quest_type: QuestType,
    pub target_value: u32,
    pub current_value: u32,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub reward: QuestReward,
    pub expires_at: DateTime<Utc>,
}

/// What finishing a quest pays. Gems are always paid; energy only sometimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestReward {
    pub gems: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<u32>,
}

/// The garden action a quest counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    Nurture,
    Plant,
    Harvest,
    Share,
    Streak,
}

impl QuestType {
    pub const ALL: [Self; 5] = [
        Self::Nurture,
        Self::Plant,
        Self::Harvest,
        Self::Share,
        Self::Streak,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nurture => "nurture",
            Self::Plant => "plant",
            Self::Harvest => "harvest",
            Self::Share => "share",
            Self::Streak => "streak",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "nurture" => Some(Self::Nurture),
            "plant" => Some(Self::Plant),
            "harvest" => Some(Self::Harvest),
            "share" => Some(Self::Share),
            "streak" => Some(Self::Streak),
            _ => None,
        }
    }
}

impl DailyQuest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("quest", &self.id)?;

        if self.completed && self.current_value < self.target_value {
            return Err(ValidationError::CompletedBelowTarget {
                current: self.current_value,
                target: self.target_value,
            });
        }
        if !self.completed && self.completed_at.is_some() {
            return Err(ValidationError::CompletedAtWithoutCompletion);
        }

        Ok(())
    }

    /// Whether `now` is at or past the quest's expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::inventory::SeedRarity;
use super::validation::{require_id, ValidationError};

/// A manifestation posted to the community feed.
///
/// `liked_by_user` is relative to whoever is viewing the feed, so two viewers
/// can see the same post with different values. `likes` is the global count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedManifestation {
    pub id: String,
    pub username: String,
    pub intention: String,
    pub category: ManifestationCategory,
    pub color: String,
    pub likes: u32,
    pub shared_at: DateTime<Utc>,
    pub liked_by_user: bool,
    pub rarity: SeedRarity,
}

/// Life area an intention is about. Shared by feed posts and inventory items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ManifestationCategory {
    Abundance,
    Love,
    Health,
    Success,
    Peace,
}

impl ManifestationCategory {
    pub const ALL: [Self; 5] = [
        Self::Abundance,
        Self::Love,
        Self::Health,
        Self::Success,
        Self::Peace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abundance => "abundance",
            Self::Love => "love",
            Self::Health => "health",
            Self::Success => "success",
            Self::Peace => "peace",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "abundance" => Some(Self::Abundance),
            "love" => Some(Self::Love),
            "health" => Some(Self::Health),
            "success" => Some(Self::Success),
            "peace" => Some(Self::Peace),
            _ => None,
        }
    }
}

impl SharedManifestation {
    /// A post the viewer has liked must carry at least that one like.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("shared manifestation", &self.id)?;
        if self.liked_by_user && self.likes == 0 {
            return Err(ValidationError::LikedWithoutLikes);
        }
        Ok(())
    }
}

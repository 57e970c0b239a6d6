use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::community::ManifestationCategory;
use super::validation::{require_id, ValidationError};

/// A collected intention sitting in the user's garden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub intention: String,
    pub category: ManifestationCategory,
    pub stage: GrowthStage,
    pub collected_at: DateTime<Utc>,
    pub color: String,
}

/// Growth phase of an inventory item.
///
/// Variants are declared in progression order, so `Sprout < Growing < Blooming`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Sprout,
    Growing,
    Blooming,
}

impl GrowthStage {
    pub const ALL: [Self; 3] = [Self::Sprout, Self::Growing, Self::Blooming];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sprout => "sprout",
            Self::Growing => "growing",
            Self::Blooming => "blooming",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sprout" => Some(Self::Sprout),
            "growing" => Some(Self::Growing),
            "blooming" => Some(Self::Blooming),
            _ => None,
        }
    }
}

/// A collectible seed. Distinct from an [`InventoryItem`]; how one becomes the
/// other is up to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    pub id: String,
    pub rarity: SeedRarity,
    pub acquired_at: DateTime<Utc>,
}

/// Four-tier rarity shared by seeds and shared manifestations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SeedRarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl SeedRarity {
    pub const ALL: [Self; 4] = [Self::Common, Self::Rare, Self::Epic, Self::Legendary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "common" => Some(Self::Common),
            "rare" => Some(Self::Rare),
            "epic" => Some(Self::Epic),
            "legendary" => Some(Self::Legendary),
            _ => None,
        }
    }
}

impl InventoryItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("inventory item", &self.id)
    }
}

impl Seed {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("seed", &self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stages_are_ordered_by_growth() {
        assert!(GrowthStage::Sprout < GrowthStage::Growing);
        assert!(GrowthStage::Growing < GrowthStage::Blooming);

        let mut shuffled = vec![GrowthStage::Blooming, GrowthStage::Sprout, GrowthStage::Growing];
        shuffled.sort();
        assert_eq!(shuffled, GrowthStage::ALL.to_vec());
    }

    #[test]
    fn stage_only_accepts_known_literals() {
        for stage in GrowthStage::ALL {
            let decoded: GrowthStage =
                serde_json::from_value(serde_json::json!(stage.as_str())).unwrap();
            assert_eq!(decoded, stage);
        }
        assert!(serde_json::from_str::<GrowthStage>("\"wilting\"").is_err());
        assert!(serde_json::from_str::<GrowthStage>("\"Sprout\"").is_err());
    }

    #[test]
    fn rarity_only_accepts_known_literals() {
        for rarity in SeedRarity::ALL {
            assert_eq!(SeedRarity::from_str(rarity.as_str()), Some(rarity));
            assert_eq!(serde_json::to_value(rarity).unwrap(), rarity.as_str());
        }
        assert!(serde_json::from_str::<SeedRarity>("\"mythic\"").is_err());
    }

    #[test]
    fn inventory_item_uses_wire_names() {
        let item = InventoryItem {
            id: "inv-1".to_string(),
            intention: "I welcome calm mornings".to_string(),
            category: ManifestationCategory::Peace,
            stage: GrowthStage::Growing,
            collected_at: Utc.with_ymd_and_hms(2024, 3, 4, 8, 30, 0).unwrap(),
            color: "#A7C4A0".to_string(),
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["collectedAt"], "2024-03-04T08:30:00Z");
        assert_eq!(json["stage"], "growing");
        assert_eq!(json["category"], "peace");

        let decoded: InventoryItem = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, item);
    }

    #[test]
    fn seed_requires_an_id() {
        let seed = Seed {
            id: " ".to_string(),
            rarity: SeedRarity::Epic,
            acquired_at: Utc::now(),
        };
        assert_eq!(
            seed.validate(),
            Err(ValidationError::MissingId { entity: "seed" })
        );
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validation::require_unique_ids;
use super::{
    Book, DailyQuest, InventoryItem, JournalEntry, Seed, SeedRanking, SharedManifestation,
    StreakRanking, ValidationError, WeeklyManifestationState,
};

/// Every stored record in one value, used for export and import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub shared_manifestations: Vec<SharedManifestation>,
    #[serde(default)]
    pub weekly: Option<WeeklyManifestationState>,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    #[serde(default)]
    pub seeds: Vec<Seed>,
    #[serde(default)]
    pub journal: Vec<JournalEntry>,
    #[serde(default)]
    pub quests: Vec<DailyQuest>,
    #[serde(default)]
    pub seed_rankings: Vec<SeedRanking>,
    #[serde(default)]
    pub streak_rankings: Vec<StreakRanking>,
}

impl Snapshot {
    /// Validates every record, stopping at the first violation.
    ///
    /// Ids must also be unique within each collection, since import writes
    /// records by id and a repeat would overwrite the earlier one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_unique_ids("book", self.books.iter().map(|b| b.id.as_str()))?;
        require_unique_ids(
            "shared manifestation",
            self.shared_manifestations.iter().map(|m| m.id.as_str()),
        )?;
        require_unique_ids("inventory item", self.inventory.iter().map(|i| i.id.as_str()))?;
        require_unique_ids("seed", self.seeds.iter().map(|s| s.id.as_str()))?;
        require_unique_ids("journal entry", self.journal.iter().map(|e| e.id.as_str()))?;
        require_unique_ids("quest", self.quests.iter().map(|q| q.id.as_str()))?;
        require_unique_ids(
            "seed ranking",
            self.seed_rankings.iter().map(|r| r.entry.id.as_str()),
        )?;
        require_unique_ids(
            "streak ranking",
            self.streak_rankings.iter().map(|r| r.entry.id.as_str()),
        )?;

        self.books.iter().try_for_each(Book::validate)?;
        self.shared_manifestations
            .iter()
            .try_for_each(SharedManifestation::validate)?;
        if let Some(weekly) = &self.weekly {
            weekly.validate()?;
        }
        self.inventory.iter().try_for_each(InventoryItem::validate)?;
        self.seeds.iter().try_for_each(Seed::validate)?;
        self.journal.iter().try_for_each(JournalEntry::validate)?;
        self.quests.iter().try_for_each(DailyQuest::validate)?;
        self.seed_rankings.iter().try_for_each(SeedRanking::validate)?;
        self.streak_rankings
            .iter()
            .try_for_each(StreakRanking::validate)?;
        Ok(())
    }

    /// Total number of top-level records, counting the weekly rotation as one.
    pub fn record_count(&self) -> usize {
        self.books.len()
            + self.shared_manifestations.len()
            + usize::from(self.weekly.is_some())
            + self.inventory.len()
            + self.seeds.len()
            + self.journal.len()
            + self.quests.len()
            + self.seed_rankings.len()
            + self.streak_rankings.len()
    }
}

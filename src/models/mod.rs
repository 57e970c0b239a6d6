//! Domain models for Bloomwell.
//!
//! # Core Concepts
//!
//! Every record here is a plain value shape shared by the mobile client, the
//! SQLite store and the HTTP API. Field names travel as camelCase and
//! enumerated domains as lowercase literals.
//!
//! ## Library
//!
//! - [`Book`]: A purchasable reading item with ordered [`BookPage`]s.
//!
//! ## Garden
//!
//! - [`Seed`]: A rarity-tiered collectible, precursor to an inventory item.
//! - [`InventoryItem`]: A collected intention at some [`GrowthStage`].
//!
//! ## Manifestations
//!
//! - [`SharedManifestation`]: A community-feed post with likes and a rarity tag.
//! - [`WeeklyManifestationState`]: The current week's rotation of suggested affirmations.
//!
//! ## Reflection and play
//!
//! - [`JournalEntry`]: A dated reflection with a [`Mood`] and gratitude list.
//! - [`DailyQuest`]: A progress-tracked task with a [`QuestReward`].
//! - [`SeedRanking`] / [`StreakRanking`]: Leaderboard rows built on [`RankingEntry`].
//!
//! None of these types reference each other. Invariants the shapes imply are
//! checked on demand by each record's `validate()`, see [`ValidationError`].

mod book;
mod community;
mod inventory;
mod journal;
mod quest;
mod ranking;
mod snapshot;
mod validation;
mod weekly;

pub use book::*;
pub use community::*;
pub use inventory::*;
pub use journal::*;
pub use quest::*;
pub use ranking::*;
pub use snapshot::*;
pub use validation::*;
pub use weekly::*;

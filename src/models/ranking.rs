use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validation::{require_id, ValidationError};

/// A leaderboard row. Rank 1 is the top of the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub id: String,
    pub username: String,
    pub score: f64,
    pub rank: u32,
}

/// A row on the seed-collection leaderboard.
///
/// The [`RankingEntry`] fields are flattened into the JSON object, so the wire
/// shape is one flat record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedRanking {
    #[serde(flatten)]
    pub entry: RankingEntry,
    pub total_seeds: u32,
    pub blooming_seeds: u32,
}

/// A row on the streak leaderboard. Flattened like [`SeedRanking`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreakRanking {
    #[serde(flatten)]
    pub entry: RankingEntry,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl RankingEntry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("ranking", &self.id)?;
        if self.rank == 0 {
            return Err(ValidationError::InvalidRank);
        }
        if !self.score.is_finite() {
            return Err(ValidationError::InvalidScore(self.score));
        }
        Ok(())
    }
}

impl SeedRanking {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.entry.validate()?;
        if self.blooming_seeds > self.total_seeds {
            return Err(ValidationError::BloomingExceedsTotal {
                blooming: self.blooming_seeds,
                total: self.total_seeds,
            });
        }
        Ok(())
    }
}

impl StreakRanking {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.entry.validate()?;
        if self.current_streak > self.longest_streak {
            return Err(ValidationError::StreakExceedsLongest {
                current: self.current_streak,
                longest: self.longest_streak,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(rank: u32) -> RankingEntry {
        RankingEntry {
            id: format!("r-{rank}"),
            username: "moss".to_string(),
            score: 1250.5,
            rank,
        }
    }

    #[test]
    fn seed_ranking_is_flat_on_the_wire() {
        let ranking = SeedRanking {
            entry: entry(1),
            total_seeds: 40,
            blooming_seeds: 12,
        };

        let json = serde_json::to_value(&ranking).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "r-1",
                "username": "moss",
                "score": 1250.5,
                "rank": 1,
                "totalSeeds": 40,
                "bloomingSeeds": 12
            })
        );

        let decoded: SeedRanking = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, ranking);
    }

    #[test]
    fn streak_ranking_reads_flat_json() {
        let ranking: StreakRanking = serde_json::from_value(json!({
            "id": "r-3",
            "username": "fern",
            "score": 30,
            "rank": 3,
            "currentStreak": 9,
            "longestStreak": 30
        }))
        .unwrap();

        assert_eq!(ranking.entry.rank, 3);
        assert_eq!(ranking.entry.score, 30.0);
        assert_eq!(ranking.current_streak, 9);
        assert!(ranking.validate().is_ok());
    }

    #[test]
    fn rank_must_be_positive() {
        assert_eq!(entry(0).validate(), Err(ValidationError::InvalidRank));
        assert!(entry(1).validate().is_ok());
    }

    #[test]
    fn blooming_cannot_exceed_total() {
        let ranking = SeedRanking {
            entry: entry(2),
            total_seeds: 3,
            blooming_seeds: 4,
        };
        assert_eq!(
            ranking.validate(),
            Err(ValidationError::BloomingExceedsTotal { blooming: 4, total: 3 })
        );
    }

    #[test]
    fn current_streak_cannot_exceed_longest() {
        let ranking = StreakRanking {
            entry: entry(2),
            current_streak: 8,
            longest_streak: 5,
        };
        assert_eq!(
            ranking.validate(),
            Err(ValidationError::StreakExceedsLongest { current: 8, longest: 5 })
        );
    }
}

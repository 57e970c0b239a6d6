use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;

/// A record that deserialized fine but breaks an invariant its shape implies.
///
/// Deserialization already rejects unknown enum literals and missing fields;
/// these are the cross-field rules serde cannot express.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{entity} id must not be empty")]
    MissingId { entity: &'static str },

    #[error("{entity} id {id} appears more than once")]
    DuplicateId { entity: &'static str, id: String },

    #[error("page {position} has page number {page_number}, expected more than {previous}")]
    PageOutOfOrder {
        position: usize,
        page_number: u32,
        previous: u32,
    },

    #[error("reading progress {0} is outside 0..=100")]
    ProgressOutOfRange(f64),

    #[error("price {0} must be a finite, non-negative amount")]
    InvalidPrice(f64),

    #[error("manifestation is liked by the viewer but has no likes")]
    LikedWithoutLikes,

    #[error("quest is completed at {current} of {target}")]
    CompletedBelowTarget { current: u32, target: u32 },

    #[error("quest has a completion time but is not completed")]
    CompletedAtWithoutCompletion,

    #[error("rank must be positive")]
    InvalidRank,

    #[error("score {0} must be finite")]
    InvalidScore(f64),

    #[error("blooming seeds ({blooming}) exceed total seeds ({total})")]
    BloomingExceedsTotal { blooming: u32, total: u32 },

    #[error("current streak ({current}) exceeds longest streak ({longest})")]
    StreakExceedsLongest { current: u32, longest: u32 },

    #[error("gratitude statement {position} is blank")]
    BlankGratitude { position: usize },

    #[error("manifestation {id} belongs to week {week_start}, rotation is for {expected}")]
    WeekMismatch {
        id: String,
        week_start: NaiveDate,
        expected: NaiveDate,
    },
}

pub(crate) fn require_id(entity: &'static str, id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        Err(ValidationError::MissingId { entity })
    } else {
        Ok(())
    }
}

/// Rejects the first id that repeats within one collection.
pub(crate) fn require_unique_ids<'a>(
    entity: &'static str,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateId {
                entity,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_ids_pass() {
        assert!(require_unique_ids("seed", ["s-1", "s-2", "s-3"]).is_ok());
        assert!(require_unique_ids("seed", Vec::<&str>::new()).is_ok());
    }

    #[test]
    fn first_repeated_id_is_reported() {
        assert_eq!(
            require_unique_ids("seed", ["s-1", "s-2", "s-2", "s-1"]),
            Err(ValidationError::DuplicateId {
                entity: "seed",
                id: "s-2".to_string(),
            })
        );
    }
}

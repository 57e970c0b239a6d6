use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validation::{require_id, require_unique_ids, ValidationError};

/// A suggested affirmation for one calendar week.
///
/// `category` is free text here, unlike the closed category sets elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyManifestation {
    pub id: String,
    pub text: String,
    pub category: String,
    pub week_start: NaiveDate,
    pub used: bool,
}

/// The rotation of weekly manifestations the client is currently showing.
///
/// The client regenerates it when the week changes; `last_generated_week`
/// records which week that was. `extra_slots` counts bonus manifestations
/// unlocked on top of the regular rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyManifestationState {
    pub manifestations: Vec<WeeklyManifestation>,
    pub last_generated_week: NaiveDate,
    pub extra_slots: u32,
}

impl WeeklyManifestationState {
    /// Every manifestation in the rotation has its own id and belongs to the
    /// week the rotation was generated for.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_unique_ids(
            "weekly manifestation",
            self.manifestations.iter().map(|m| m.id.as_str()),
        )?;
        for m in &self.manifestations {
            require_id("weekly manifestation", &m.id)?;
            if m.week_start != self.last_generated_week {
                return Err(ValidationError::WeekMismatch {
                    id: m.id.clone(),
                    week_start: m.week_start,
                    expected: self.last_generated_week,
                });
            }
        }
        Ok(())
    }

    /// Manifestations the user has not used yet this week.
    pub fn unused(&self) -> impl Iterator<Item = &WeeklyManifestation> {
        self.manifestations.iter().filter(|m| !m.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn manifestation(id: &str, used: bool) -> WeeklyManifestation {
        WeeklyManifestation {
            id: id.to_string(),
            text: "I am exactly where I need to be".to_string(),
            category: "self-trust".to_string(),
            week_start: week(),
            used,
        }
    }

    #[test]
    fn dates_travel_as_plain_iso_strings() {
        let state = WeeklyManifestationState {
            manifestations: vec![manifestation("wm-1", false)],
            last_generated_week: week(),
            extra_slots: 2,
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["lastGeneratedWeek"], "2024-06-03");
        assert_eq!(json["extraSlots"], 2);
        assert_eq!(json["manifestations"][0]["weekStart"], "2024-06-03");

        let decoded: WeeklyManifestationState = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn validate_rejects_manifestations_from_another_week() {
        let mut stale = manifestation("wm-2", false);
        stale.week_start = NaiveDate::from_ymd_opt(2024, 5, 27).unwrap();

        let state = WeeklyManifestationState {
            manifestations: vec![manifestation("wm-1", false), stale],
            last_generated_week: week(),
            extra_slots: 0,
        };

        assert!(matches!(
            state.validate(),
            Err(ValidationError::WeekMismatch { ref id, .. }) if id == "wm-2"
        ));
    }

    #[test]
    fn validate_rejects_repeated_ids() {
        let state = WeeklyManifestationState {
            manifestations: vec![manifestation("wm-1", false), manifestation("wm-1", true)],
            last_generated_week: week(),
            extra_slots: 0,
        };

        assert_eq!(
            state.validate(),
            Err(ValidationError::DuplicateId {
                entity: "weekly manifestation",
                id: "wm-1".to_string(),
            })
        );
    }

    #[test]
    fn unused_skips_used_manifestations() {
        let state = WeeklyManifestationState {
            manifestations: vec![
                manifestation("wm-1", true),
                manifestation("wm-2", false),
                manifestation("wm-3", false),
            ],
            last_generated_week: week(),
            extra_slots: 0,
        };

        let ids: Vec<_> = state.unused().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["wm-2", "wm-3"]);
    }
}

//! JSON Schema export of the record shapes.

use schemars::schema_for;
use serde_json::{json, Value};

use crate::models::*;

/// One JSON object mapping each entity name to its JSON Schema.
pub fn document() -> Value {
    json!({
        "Book": schema_for!(Book),
        "BookPage": schema_for!(BookPage),
        "SharedManifestation": schema_for!(SharedManifestation),
        "WeeklyManifestation": schema_for!(WeeklyManifestation),
        "WeeklyManifestationState": schema_for!(WeeklyManifestationState),
        "InventoryItem": schema_for!(InventoryItem),
        "Seed": schema_for!(Seed),
        "JournalEntry": schema_for!(JournalEntry),
        "DailyQuest": schema_for!(DailyQuest),
        "RankingEntry": schema_for!(RankingEntry),
        "SeedRanking": schema_for!(SeedRanking),
        "StreakRanking": schema_for!(StreakRanking),
        "Snapshot": schema_for!(Snapshot),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(schema: &Value) -> Vec<&str> {
        schema["required"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn covers_every_entity() {
        let doc = document();
        let names: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
        assert_eq!(names.len(), 13);
        assert!(names.contains(&"StreakRanking".to_string()));
    }

    #[test]
    fn uses_wire_field_names() {
        let doc = document();
        let book = &doc["Book"];
        assert!(book["properties"].get("coverUrl").is_some());
        assert!(book["properties"].get("cover_url").is_none());
        assert!(required(book).contains(&"readingProgress"));
    }

    #[test]
    fn quest_completion_time_is_optional() {
        let doc = document();
        let quest = &doc["DailyQuest"];
        assert!(quest["properties"].get("type").is_some());
        assert!(!required(quest).contains(&"completedAt"));
    }

    #[test]
    fn rankings_are_flattened() {
        let doc = document();
        let ranking = &doc["SeedRanking"];
        for field in ["id", "username", "score", "rank", "totalSeeds", "bloomingSeeds"] {
            assert!(ranking["properties"].get(field).is_some(), "missing {field}");
        }
    }
}

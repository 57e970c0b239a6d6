use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{Database, StoreError};
use crate::models::*;

type ApiError = (StatusCode, String);

// ============================================================
// Error Handling
// ============================================================

/// Maps a store failure to a response.
///
/// Validation failures are the caller's fault and are returned verbatim.
/// Storage failures are logged in full but reach the client as a generic
/// message so internals stay server-side.
fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Invalid(e) => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        StoreError::Storage(e) => {
            tracing::error!("Internal error: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn not_found(what: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

/// Decodes a record body, taking its id from the path when there is one and
/// generating one when the client left it out.
fn record_from_body<T: DeserializeOwned>(
    mut body: Value,
    path_id: Option<String>,
) -> Result<T, ApiError> {
    let Some(fields) = body.as_object_mut() else {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Expected a JSON object".to_string(),
        ));
    };

    match path_id {
        Some(id) => {
            fields.insert("id".to_string(), Value::String(id));
        }
        None => {
            let missing = fields
                .get("id")
                .is_none_or(|v| v.is_null() || v.as_str().is_some_and(str::is_empty));
            if missing {
                fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            }
        }
    }

    serde_json::from_value(body).map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Books
// ============================================================

#[derive(Debug, Deserialize)]
pub struct BookQuery {
    pub category: Option<BookCategory>,
}

pub async fn list_books(
    State(db): State<Database>,
    Query(query): Query<BookQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    db.list_books(query.category).map(Json).map_err(store_error)
}

pub async fn get_book(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
    db.get_book(&id)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found("Book"))
}

pub async fn create_book(
    State(db): State<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = record_from_body(body, None)?;
    db.put_book(book)
        .map(|b| (StatusCode::CREATED, Json(b)))
        .map_err(store_error)
}

pub async fn put_book(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Book>, ApiError> {
    let book = record_from_body(body, Some(id))?;
    db.put_book(book).map(Json).map_err(store_error)
}

pub async fn delete_book(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if db.delete_book(&id).map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Book"))
    }
}

// ============================================================
// Community feed
// ============================================================

#[derive(Debug, Deserialize)]
pub struct CommunityQuery {
    pub category: Option<ManifestationCategory>,
}

pub async fn list_shared_manifestations(
    State(db): State<Database>,
    Query(query): Query<CommunityQuery>,
) -> Result<Json<Vec<SharedManifestation>>, ApiError> {
    db.list_shared_manifestations(query.category)
        .map(Json)
        .map_err(store_error)
}

pub async fn get_shared_manifestation(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<SharedManifestation>, ApiError> {
    db.get_shared_manifestation(&id)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found("Shared manifestation"))
}

pub async fn create_shared_manifestation(
    State(db): State<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SharedManifestation>), ApiError> {
    let manifestation = record_from_body(body, None)?;
    db.put_shared_manifestation(manifestation)
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(store_error)
}

pub async fn put_shared_manifestation(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<SharedManifestation>, ApiError> {
    let manifestation = record_from_body(body, Some(id))?;
    db.put_shared_manifestation(manifestation)
        .map(Json)
        .map_err(store_error)
}

pub async fn delete_shared_manifestation(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if db.delete_shared_manifestation(&id).map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Shared manifestation"))
    }
}

// ============================================================
// Weekly rotation
// ============================================================

pub async fn get_weekly_state(
    State(db): State<Database>,
) -> Result<Json<WeeklyManifestationState>, ApiError> {
    db.get_weekly_state()
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found("Weekly manifestation state"))
}

pub async fn put_weekly_state(
    State(db): State<Database>,
    Json(state): Json<WeeklyManifestationState>,
) -> Result<Json<WeeklyManifestationState>, ApiError> {
    db.put_weekly_state(state).map(Json).map_err(store_error)
}

// ============================================================
// Inventory
// ============================================================

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub stage: Option<GrowthStage>,
}

pub async fn list_inventory(
    State(db): State<Database>,
    Query(query): Query<InventoryQuery>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    db.list_inventory(query.stage).map(Json).map_err(store_error)
}

pub async fn get_inventory_item(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<InventoryItem>, ApiError> {
    db.get_inventory_item(&id)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found("Inventory item"))
}

pub async fn create_inventory_item(
    State(db): State<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let item = record_from_body(body, None)?;
    db.put_inventory_item(item)
        .map(|i| (StatusCode::CREATED, Json(i)))
        .map_err(store_error)
}

pub async fn put_inventory_item(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<InventoryItem>, ApiError> {
    let item = record_from_body(body, Some(id))?;
    db.put_inventory_item(item).map(Json).map_err(store_error)
}

pub async fn delete_inventory_item(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if db.delete_inventory_item(&id).map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Inventory item"))
    }
}

// ============================================================
// Seeds
// ============================================================

#[derive(Debug, Deserialize)]
pub struct SeedQuery {
    pub rarity: Option<SeedRarity>,
}

pub async fn list_seeds(
    State(db): State<Database>,
    Query(query): Query<SeedQuery>,
) -> Result<Json<Vec<Seed>>, ApiError> {
    db.list_seeds(query.rarity).map(Json).map_err(store_error)
}

pub async fn get_seed(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<Seed>, ApiError> {
    db.get_seed(&id)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found("Seed"))
}

pub async fn create_seed(
    State(db): State<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Seed>), ApiError> {
    let seed = record_from_body(body, None)?;
    db.put_seed(seed)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(store_error)
}

pub async fn put_seed(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Seed>, ApiError> {
    let seed = record_from_body(body, Some(id))?;
    db.put_seed(seed).map(Json).map_err(store_error)
}

pub async fn delete_seed(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if db.delete_seed(&id).map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Seed"))
    }
}

// ============================================================
// Journal
// ============================================================

#[derive(Debug, Deserialize)]
pub struct JournalQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub async fn list_journal_entries(
    State(db): State<Database>,
    Query(query): Query<JournalQuery>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    db.list_journal_entries(query.from, query.to)
        .map(Json)
        .map_err(store_error)
}

pub async fn get_journal_entry(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<JournalEntry>, ApiError> {
    db.get_journal_entry(&id)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found("Journal entry"))
}

pub async fn create_journal_entry(
    State(db): State<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<JournalEntry>), ApiError> {
    let entry = record_from_body(body, None)?;
    db.put_journal_entry(entry)
        .map(|e| (StatusCode::CREATED, Json(e)))
        .map_err(store_error)
}

pub async fn put_journal_entry(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<JournalEntry>, ApiError> {
    let entry = record_from_body(body, Some(id))?;
    db.put_journal_entry(entry).map(Json).map_err(store_error)
}

pub async fn delete_journal_entry(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if db.delete_journal_entry(&id).map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Journal entry"))
    }
}

// ============================================================
// Quests
// ============================================================

pub async fn list_quests(State(db): State<Database>) -> Result<Json<Vec<DailyQuest>>, ApiError> {
    db.list_quests().map(Json).map_err(store_error)
}

pub async fn get_quest(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<Json<DailyQuest>, ApiError> {
    db.get_quest(&id)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| not_found("Quest"))
}

pub async fn create_quest(
    State(db): State<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<DailyQuest>), ApiError> {
    let quest = record_from_body(body, None)?;
    db.put_quest(quest)
        .map(|q| (StatusCode::CREATED, Json(q)))
        .map_err(store_error)
}

pub async fn put_quest(
    State(db): State<Database>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<DailyQuest>, ApiError> {
    let quest = record_from_body(body, Some(id))?;
    db.put_quest(quest).map(Json).map_err(store_error)
}

pub async fn delete_quest(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if db.delete_quest(&id).map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Quest"))
    }
}

// ============================================================
// Leaderboards
// ============================================================

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub limit: Option<u32>,
}

pub async fn list_seed_rankings(
    State(db): State<Database>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<SeedRanking>>, ApiError> {
    db.list_seed_rankings(query.limit)
        .map(Json)
        .map_err(store_error)
}

pub async fn create_seed_ranking(
    State(db): State<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SeedRanking>), ApiError> {
    let ranking = record_from_body(body, None)?;
    db.put_seed_ranking(ranking)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(store_error)
}

pub async fn clear_seed_rankings(State(db): State<Database>) -> Result<StatusCode, ApiError> {
    db.clear_seed_rankings().map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_streak_rankings(
    State(db): State<Database>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<StreakRanking>>, ApiError> {
    db.list_streak_rankings(query.limit)
        .map(Json)
        .map_err(store_error)
}

pub async fn create_streak_ranking(
    State(db): State<Database>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<StreakRanking>), ApiError> {
    let ranking = record_from_body(body, None)?;
    db.put_streak_ranking(ranking)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(store_error)
}

pub async fn clear_streak_rankings(State(db): State<Database>) -> Result<StatusCode, ApiError> {
    db.clear_streak_rankings().map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Snapshot
// ============================================================

pub async fn export_snapshot(State(db): State<Database>) -> Result<Json<Snapshot>, ApiError> {
    db.export_snapshot().map(Json).map_err(store_error)
}

pub async fn import_snapshot(
    State(db): State<Database>,
    Json(snapshot): Json<Snapshot>,
) -> Result<Json<Value>, ApiError> {
    let imported = db.import_snapshot(snapshot).map_err(store_error)?;
    Ok(Json(serde_json::json!({ "imported": imported })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed_body() -> Value {
        json!({ "rarity": "rare", "acquiredAt": "2024-04-01T10:00:00Z" })
    }

    #[test]
    fn record_from_body_generates_missing_id() {
        let seed: Seed = record_from_body(seed_body(), None).unwrap();
        assert!(Uuid::parse_str(&seed.id).is_ok());
    }

    #[test]
    fn record_from_body_keeps_client_id() {
        let mut body = seed_body();
        body["id"] = "seed-from-phone".into();
        let seed: Seed = record_from_body(body, None).unwrap();
        assert_eq!(seed.id, "seed-from-phone");
    }

    #[test]
    fn record_from_body_prefers_path_id() {
        let mut body = seed_body();
        body["id"] = "other".into();
        let seed: Seed = record_from_body(body, Some("s-9".to_string())).unwrap();
        assert_eq!(seed.id, "s-9");
    }

    #[test]
    fn record_from_body_rejects_bad_shapes() {
        let err = record_from_body::<Seed>(json!([1, 2]), None).unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);

        let err = record_from_body::<Seed>(json!({ "rarity": "mythic" }), None).unwrap_err();
        assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let (status, message) = store_error(StoreError::Invalid(ValidationError::InvalidRank));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "rank must be positive");
    }

    #[test]
    fn storage_errors_are_sanitized() {
        let (status, message) =
            store_error(StoreError::Storage(anyhow::anyhow!("disk I/O error at /var/db")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }
}

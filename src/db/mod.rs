mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::models::*;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Why a store operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record breaks one of its shape's invariants and was not written.
    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.into())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// SQLite-backed store for every Bloomwell record.
///
/// Records are written whole: a `put_*` call inserts the record or replaces
/// the stored one with the same id, including owned children such as book
/// pages. Every write is validated first.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens the database in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::default_database_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        schema::run_migrations(&conn)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage(anyhow!("database lock poisoned")))
    }

    // ============================================================
    // Books
    // ============================================================

    pub fn put_book(&self, book: Book) -> Result<Book> {
        reject_invalid("book", &book.id, book.validate())?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        write_book(&tx, &book)?;
        tx.commit()?;

        Ok(book)
    }

    pub fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let conn = self.lock()?;
        let book = conn
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"),
                [id],
                book_from_row,
            )
            .optional()?;

        match book {
            Some(mut book) => {
                book.pages = read_pages(&conn, &book.id)?;
                Ok(Some(book))
            }
            None => Ok(None),
        }
    }

    /// Books ordered by title, optionally limited to one category.
    pub fn list_books(&self, category: Option<BookCategory>) -> Result<Vec<Book>> {
        let conn = self.lock()?;
        read_books(&conn, category)
    }

    /// Deletes the book together with its pages.
    pub fn delete_book(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM book_pages WHERE book_id = ?", [id])?;
        let rows = tx.execute("DELETE FROM books WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // ============================================================
    // Shared manifestations
    // ============================================================

    pub fn put_shared_manifestation(
        &self,
        manifestation: SharedManifestation,
    ) -> Result<SharedManifestation> {
        reject_invalid(
            "shared manifestation",
            &manifestation.id,
            manifestation.validate(),
        )?;

        let conn = self.lock()?;
        write_shared_manifestation(&conn, &manifestation)?;
        Ok(manifestation)
    }

    pub fn get_shared_manifestation(&self, id: &str) -> Result<Option<SharedManifestation>> {
        let conn = self.lock()?;
        let manifestation = conn
            .query_row(
                &format!("SELECT {SHARED_COLUMNS} FROM shared_manifestations WHERE id = ?"),
                [id],
                shared_manifestation_from_row,
            )
            .optional()?;
        Ok(manifestation)
    }

    /// The community feed, newest post first.
    pub fn list_shared_manifestations(
        &self,
        category: Option<ManifestationCategory>,
    ) -> Result<Vec<SharedManifestation>> {
        let conn = self.lock()?;
        read_shared_manifestations(&conn, category)
    }

    pub fn delete_shared_manifestation(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM shared_manifestations WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Weekly manifestations
    // ============================================================

    /// The current weekly rotation, or `None` if none has been stored yet.
    pub fn get_weekly_state(&self) -> Result<Option<WeeklyManifestationState>> {
        let conn = self.lock()?;
        read_weekly_state(&conn)
    }

    /// Replaces the whole weekly rotation in one transaction.
    pub fn put_weekly_state(
        &self,
        state: WeeklyManifestationState,
    ) -> Result<WeeklyManifestationState> {
        reject_invalid(
            "weekly state",
            &state.last_generated_week.to_string(),
            state.validate(),
        )?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        write_weekly_state(&tx, &state)?;
        tx.commit()?;

        Ok(state)
    }

    // ============================================================
    // Inventory
    // ============================================================

    pub fn put_inventory_item(&self, item: InventoryItem) -> Result<InventoryItem> {
        reject_invalid("inventory item", &item.id, item.validate())?;

        let conn = self.lock()?;
        write_inventory_item(&conn, &item)?;
        Ok(item)
    }

    pub fn get_inventory_item(&self, id: &str) -> Result<Option<InventoryItem>> {
        let conn = self.lock()?;
        let item = conn
            .query_row(
                &format!("SELECT {INVENTORY_COLUMNS} FROM inventory_items WHERE id = ?"),
                [id],
                inventory_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Inventory in collection order, optionally limited to one growth stage.
    pub fn list_inventory(&self, stage: Option<GrowthStage>) -> Result<Vec<InventoryItem>> {
        let conn = self.lock()?;
        read_inventory(&conn, stage)
    }

    pub fn delete_inventory_item(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM inventory_items WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Seeds
    // ============================================================

    pub fn put_seed(&self, seed: Seed) -> Result<Seed> {
        reject_invalid("seed", &seed.id, seed.validate())?;

        let conn = self.lock()?;
        write_seed(&conn, &seed)?;
        Ok(seed)
    }

    pub fn get_seed(&self, id: &str) -> Result<Option<Seed>> {
        let conn = self.lock()?;
        let seed = conn
            .query_row(
                "SELECT id, rarity, acquired_at FROM seeds WHERE id = ?",
                [id],
                seed_from_row,
            )
            .optional()?;
        Ok(seed)
    }

    /// Seeds in acquisition order, optionally limited to one rarity.
    pub fn list_seeds(&self, rarity: Option<SeedRarity>) -> Result<Vec<Seed>> {
        let conn = self.lock()?;
        read_seeds(&conn, rarity)
    }

    pub fn delete_seed(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM seeds WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Journal
    // ============================================================

    pub fn put_journal_entry(&self, entry: JournalEntry) -> Result<JournalEntry> {
        reject_invalid("journal entry", &entry.id, entry.validate())?;

        let conn = self.lock()?;
        write_journal_entry(&conn, &entry)?;
        Ok(entry)
    }

    pub fn get_journal_entry(&self, id: &str) -> Result<Option<JournalEntry>> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                &format!("SELECT {JOURNAL_COLUMNS} FROM journal_entries WHERE id = ?"),
                [id],
                journal_entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Entries dated within `from..=to` (either bound optional), newest date first.
    pub fn list_journal_entries(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<JournalEntry>> {
        let conn = self.lock()?;
        read_journal_entries(&conn, from, to)
    }

    pub fn delete_journal_entry(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM journal_entries WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Quests
    // ============================================================

    pub fn put_quest(&self, quest: DailyQuest) -> Result<DailyQuest> {
        reject_invalid("quest", &quest.id, quest.validate())?;

        let conn = self.lock()?;
        write_quest(&conn, &quest)?;
        Ok(quest)
    }

    pub fn get_quest(&self, id: &str) -> Result<Option<DailyQuest>> {
        let conn = self.lock()?;
        let quest = conn
            .query_row(
                &format!("SELECT {QUEST_COLUMNS} FROM daily_quests WHERE id = ?"),
                [id],
                quest_from_row,
            )
            .optional()?;
        Ok(quest)
    }

    /// Quests ordered by expiry, soonest first.
    pub fn list_quests(&self) -> Result<Vec<DailyQuest>> {
        let conn = self.lock()?;
        read_quests(&conn)
    }

    pub fn delete_quest(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM daily_quests WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Rankings
    // ============================================================

    pub fn put_seed_ranking(&self, ranking: SeedRanking) -> Result<SeedRanking> {
        reject_invalid("seed ranking", &ranking.entry.id, ranking.validate())?;

        let conn = self.lock()?;
        write_seed_ranking(&conn, &ranking)?;
        Ok(ranking)
    }

    /// Seed leaderboard from rank 1 down, at most `limit` rows.
    pub fn list_seed_rankings(&self, limit: Option<u32>) -> Result<Vec<SeedRanking>> {
        let conn = self.lock()?;
        read_seed_rankings(&conn, limit)
    }

    /// Empties the seed leaderboard, returning how many rows were removed.
    pub fn clear_seed_rankings(&self) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM seed_rankings", [])?)
    }

    pub fn put_streak_ranking(&self, ranking: StreakRanking) -> Result<StreakRanking> {
        reject_invalid("streak ranking", &ranking.entry.id, ranking.validate())?;

        let conn = self.lock()?;
        write_streak_ranking(&conn, &ranking)?;
        Ok(ranking)
    }

    /// Streak leaderboard from rank 1 down, at most `limit` rows.
    pub fn list_streak_rankings(&self, limit: Option<u32>) -> Result<Vec<StreakRanking>> {
        let conn = self.lock()?;
        read_streak_rankings(&conn, limit)
    }

    pub fn clear_streak_rankings(&self) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM streak_rankings", [])?)
    }

    // ============================================================
    // Snapshots
    // ============================================================

    /// Reads every stored record under a single lock.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        let conn = self.lock()?;
        Ok(Snapshot {
            books: read_books(&conn, None)?,
            shared_manifestations: read_shared_manifestations(&conn, None)?,
            weekly: read_weekly_state(&conn)?,
            inventory: read_inventory(&conn, None)?,
            seeds: read_seeds(&conn, None)?,
            journal: read_journal_entries(&conn, None, None)?,
            quests: read_quests(&conn)?,
            seed_rankings: read_seed_rankings(&conn, None)?,
            streak_rankings: read_streak_rankings(&conn, None)?,
        })
    }

    /// Replaces all stored records with the snapshot's contents.
    ///
    /// The snapshot is validated up front; nothing is written if any record
    /// is invalid. Returns the number of records imported.
    pub fn import_snapshot(&self, snapshot: Snapshot) -> Result<usize> {
        reject_invalid("snapshot", "import", snapshot.validate())?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute_batch(
            "DELETE FROM book_pages;
             DELETE FROM books;
             DELETE FROM shared_manifestations;
             DELETE FROM weekly_manifestations;
             DELETE FROM weekly_state;
             DELETE FROM inventory_items;
             DELETE FROM seeds;
             DELETE FROM journal_entries;
             DELETE FROM daily_quests;
             DELETE FROM seed_rankings;
             DELETE FROM streak_rankings;",
        )?;

        for book in &snapshot.books {
            write_book(&tx, book)?;
        }
        for manifestation in &snapshot.shared_manifestations {
            write_shared_manifestation(&tx, manifestation)?;
        }
        if let Some(weekly) = &snapshot.weekly {
            write_weekly_state(&tx, weekly)?;
        }
        for item in &snapshot.inventory {
            write_inventory_item(&tx, item)?;
        }
        for seed in &snapshot.seeds {
            write_seed(&tx, seed)?;
        }
        for entry in &snapshot.journal {
            write_journal_entry(&tx, entry)?;
        }
        for quest in &snapshot.quests {
            write_quest(&tx, quest)?;
        }
        for ranking in &snapshot.seed_rankings {
            write_seed_ranking(&tx, ranking)?;
        }
        for ranking in &snapshot.streak_rankings {
            write_streak_ranking(&tx, ranking)?;
        }

        tx.commit()?;

        let count = snapshot.record_count();
        tracing::info!("Imported snapshot with {} records", count);
        Ok(count)
    }
}

fn reject_invalid(
    entity: &str,
    id: &str,
    result: std::result::Result<(), ValidationError>,
) -> Result<()> {
    result.map_err(|e| {
        tracing::warn!("Rejected {} {}: {}", entity, id, e);
        StoreError::Invalid(e)
    })
}

// ============================================================
// Books
// ============================================================

const BOOK_COLUMNS: &str =
    "id, title, author, description, cover_url, price, is_purchased, reading_progress, category";

fn book_from_row(row: &Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        description: row.get(3)?,
        cover_url: row.get(4)?,
        price: row.get(5)?,
        is_purchased: row.get(6)?,
        reading_progress: row.get(7)?,
        category: parse_literal(row, 8, BookCategory::from_str)?,
        pages: Vec::new(),
    })
}

fn read_pages(conn: &Connection, book_id: &str) -> Result<Vec<BookPage>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, page_number FROM book_pages WHERE book_id = ? ORDER BY position",
    )?;
    let pages = stmt
        .query_map([book_id], |row| {
            Ok(BookPage {
                id: row.get(0)?,
                content: row.get(1)?,
                page_number: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(pages)
}

fn read_books(conn: &Connection, category: Option<BookCategory>) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE (?1 IS NULL OR category = ?1) ORDER BY title, id"
    ))?;
    let mut books = stmt
        .query_map([category.map(|c| c.as_str())], book_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for book in &mut books {
        book.pages = read_pages(conn, &book.id)?;
    }
    Ok(books)
}

fn write_book(conn: &Connection, book: &Book) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO books (id, title, author, description, cover_url, price, is_purchased, reading_progress, category)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            author = excluded.author,
            description = excluded.description,
            cover_url = excluded.cover_url,
            price = excluded.price,
            is_purchased = excluded.is_purchased,
            reading_progress = excluded.reading_progress,
            category = excluded.category",
        (
            &book.id,
            &book.title,
            &book.author,
            &book.description,
            &book.cover_url,
            book.price,
            book.is_purchased,
            book.reading_progress,
            book.category.as_str(),
        ),
    )?;

    conn.execute("DELETE FROM book_pages WHERE book_id = ?", [&book.id])?;
    for (position, page) in book.pages.iter().enumerate() {
        conn.execute(
            "INSERT INTO book_pages (book_id, position, id, content, page_number) VALUES (?, ?, ?, ?, ?)",
            (
                &book.id,
                position as i64,
                &page.id,
                &page.content,
                page.page_number,
            ),
        )?;
    }
    Ok(())
}

// ============================================================
// Shared manifestations
// ============================================================

const SHARED_COLUMNS: &str =
    "id, username, intention, category, color, likes, shared_at, liked_by_user, rarity";

fn shared_manifestation_from_row(row: &Row) -> rusqlite::Result<SharedManifestation> {
    Ok(SharedManifestation {
        id: row.get(0)?,
        username: row.get(1)?,
        intention: row.get(2)?,
        category: parse_literal(row, 3, ManifestationCategory::from_str)?,
        color: row.get(4)?,
        likes: row.get(5)?,
        shared_at: parse_datetime(row, 6)?,
        liked_by_user: row.get(7)?,
        rarity: parse_literal(row, 8, SeedRarity::from_str)?,
    })
}

fn read_shared_manifestations(
    conn: &Connection,
    category: Option<ManifestationCategory>,
) -> Result<Vec<SharedManifestation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHARED_COLUMNS} FROM shared_manifestations
         WHERE (?1 IS NULL OR category = ?1)
         ORDER BY shared_at DESC, id"
    ))?;
    let manifestations = stmt
        .query_map([category.map(|c| c.as_str())], shared_manifestation_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(manifestations)
}

fn write_shared_manifestation(
    conn: &Connection,
    m: &SharedManifestation,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO shared_manifestations (id, username, intention, category, color, likes, shared_at, liked_by_user, rarity)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            intention = excluded.intention,
            category = excluded.category,
            color = excluded.color,
            likes = excluded.likes,
            shared_at = excluded.shared_at,
            liked_by_user = excluded.liked_by_user,
            rarity = excluded.rarity",
        (
            &m.id,
            &m.username,
            &m.intention,
            m.category.as_str(),
            &m.color,
            m.likes,
            m.shared_at.to_rfc3339(),
            m.liked_by_user,
            m.rarity.as_str(),
        ),
    )?;
    Ok(())
}

// ============================================================
// Weekly manifestations
// ============================================================

fn read_weekly_state(conn: &Connection) -> Result<Option<WeeklyManifestationState>> {
    let header = conn
        .query_row(
            "SELECT last_generated_week, extra_slots FROM weekly_state WHERE singleton = 1",
            [],
            |row| Ok((parse_date(row, 0)?, row.get::<_, u32>(1)?)),
        )
        .optional()?;

    let Some((last_generated_week, extra_slots)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, text, category, week_start, used FROM weekly_manifestations ORDER BY position",
    )?;
    let manifestations = stmt
        .query_map([], |row| {
            Ok(WeeklyManifestation {
                id: row.get(0)?,
                text: row.get(1)?,
                category: row.get(2)?,
                week_start: parse_date(row, 3)?,
                used: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(WeeklyManifestationState {
        manifestations,
        last_generated_week,
        extra_slots,
    }))
}

fn write_weekly_state(conn: &Connection, state: &WeeklyManifestationState) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO weekly_state (singleton, last_generated_week, extra_slots) VALUES (1, ?, ?)
         ON CONFLICT(singleton) DO UPDATE SET
            last_generated_week = excluded.last_generated_week,
            extra_slots = excluded.extra_slots",
        (
            state.last_generated_week.format(DATE_FORMAT).to_string(),
            state.extra_slots,
        ),
    )?;

    conn.execute("DELETE FROM weekly_manifestations", [])?;
    for (position, m) in state.manifestations.iter().enumerate() {
        conn.execute(
            "INSERT INTO weekly_manifestations (id, position, text, category, week_start, used)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                &m.id,
                position as i64,
                &m.text,
                &m.category,
                m.week_start.format(DATE_FORMAT).to_string(),
                m.used,
            ),
        )?;
    }
    Ok(())
}

// ============================================================
// Inventory and seeds
// ============================================================

const INVENTORY_COLUMNS: &str = "id, intention, category, stage, collected_at, color";

fn inventory_item_from_row(row: &Row) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        intention: row.get(1)?,
        category: parse_literal(row, 2, ManifestationCategory::from_str)?,
        stage: parse_literal(row, 3, GrowthStage::from_str)?,
        collected_at: parse_datetime(row, 4)?,
        color: row.get(5)?,
    })
}

fn read_inventory(conn: &Connection, stage: Option<GrowthStage>) -> Result<Vec<InventoryItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVENTORY_COLUMNS} FROM inventory_items
         WHERE (?1 IS NULL OR stage = ?1)
         ORDER BY collected_at, id"
    ))?;
    let items = stmt
        .query_map([stage.map(|s| s.as_str())], inventory_item_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

fn write_inventory_item(conn: &Connection, item: &InventoryItem) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO inventory_items (id, intention, category, stage, collected_at, color)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            intention = excluded.intention,
            category = excluded.category,
            stage = excluded.stage,
            collected_at = excluded.collected_at,
            color = excluded.color",
        (
            &item.id,
            &item.intention,
            item.category.as_str(),
            item.stage.as_str(),
            item.collected_at.to_rfc3339(),
            &item.color,
        ),
    )?;
    Ok(())
}

fn seed_from_row(row: &Row) -> rusqlite::Result<Seed> {
    Ok(Seed {
        id: row.get(0)?,
        rarity: parse_literal(row, 1, SeedRarity::from_str)?,
        acquired_at: parse_datetime(row, 2)?,
    })
}

fn read_seeds(conn: &Connection, rarity: Option<SeedRarity>) -> Result<Vec<Seed>> {
    let mut stmt = conn.prepare(
        "SELECT id, rarity, acquired_at FROM seeds
         WHERE (?1 IS NULL OR rarity = ?1)
         ORDER BY acquired_at, id",
    )?;
    let seeds = stmt
        .query_map([rarity.map(|r| r.as_str())], seed_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(seeds)
}

fn write_seed(conn: &Connection, seed: &Seed) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO seeds (id, rarity, acquired_at) VALUES (?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            rarity = excluded.rarity,
            acquired_at = excluded.acquired_at",
        (&seed.id, seed.rarity.as_str(), seed.acquired_at.to_rfc3339()),
    )?;
    Ok(())
}

// ============================================================
// Journal
// ============================================================

const JOURNAL_COLUMNS: &str = "id, date, gratitude, thoughts, mood, created_at";

fn journal_entry_from_row(row: &Row) -> rusqlite::Result<JournalEntry> {
    let gratitude: String = row.get(2)?;
    let gratitude = serde_json::from_str(&gratitude)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    Ok(JournalEntry {
        id: row.get(0)?,
        date: parse_date(row, 1)?,
        gratitude,
        thoughts: row.get(3)?,
        mood: parse_literal(row, 4, Mood::from_str)?,
        created_at: parse_datetime(row, 5)?,
    })
}

fn read_journal_entries(
    conn: &Connection,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<JournalEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOURNAL_COLUMNS} FROM journal_entries
         WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
         ORDER BY date DESC, created_at DESC, id"
    ))?;
    let entries = stmt
        .query_map(
            [
                from.map(|d| d.format(DATE_FORMAT).to_string()),
                to.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
            journal_entry_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

fn write_journal_entry(conn: &Connection, entry: &JournalEntry) -> Result<()> {
    let gratitude =
        serde_json::to_string(&entry.gratitude).context("Failed to encode gratitude list")?;

    conn.execute(
        "INSERT INTO journal_entries (id, date, gratitude, thoughts, mood, created_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            date = excluded.date,
            gratitude = excluded.gratitude,
            thoughts = excluded.thoughts,
            mood = excluded.mood,
            created_at = excluded.created_at",
        (
            &entry.id,
            entry.date.format(DATE_FORMAT).to_string(),
            gratitude,
            &entry.thoughts,
            entry.mood.as_str(),
            entry.created_at.to_rfc3339(),
        ),
    )?;
    Ok(())
}

// ============================================================
// Quests
// ============================================================

const QUEST_COLUMNS: &str = "id, title, description, quest_type, target_value, current_value, \
     completed, completed_at, reward_gems, reward_energy, expires_at";

fn quest_from_row(row: &Row) -> rusqlite::Result<DailyQuest> {
    let completed_at = match row.get::<_, Option<String>>(7)? {
        Some(s) => Some(datetime_from_str(7, &s)?),
        None => None,
    };

    Ok(DailyQuest {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        quest_type: parse_literal(row, 3, QuestType::from_str)?,
        target_value: row.get(4)?,
        current_value: row.get(5)?,
        completed: row.get(6)?,
        completed_at,
        reward: QuestReward {
            gems: row.get(8)?,
            energy: row.get(9)?,
        },
        expires_at: parse_datetime(row, 10)?,
    })
}

fn read_quests(conn: &Connection) -> Result<Vec<DailyQuest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUEST_COLUMNS} FROM daily_quests ORDER BY expires_at, id"
    ))?;
    let quests = stmt
        .query_map([], quest_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(quests)
}

fn write_quest(conn: &Connection, quest: &DailyQuest) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO daily_quests (id, title, description, quest_type, target_value, current_value,
                                   completed, completed_at, reward_gems, reward_energy, expires_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            quest_type = excluded.quest_type,
            target_value = excluded.target_value,
            current_value = excluded.current_value,
            completed = excluded.completed,
            completed_at = excluded.completed_at,
            reward_gems = excluded.reward_gems,
            reward_energy = excluded.reward_energy,
            expires_at = excluded.expires_at",
        (
            &quest.id,
            &quest.title,
            &quest.description,
            quest.quest_type.as_str(),
            quest.target_value,
            quest.current_value,
            quest.completed,
            quest.completed_at.map(|t| t.to_rfc3339()),
            quest.reward.gems,
            quest.reward.energy,
            quest.expires_at.to_rfc3339(),
        ),
    )?;
    Ok(())
}

// ============================================================
// Rankings
// ============================================================

fn ranking_entry_from_row(row: &Row) -> rusqlite::Result<RankingEntry> {
    Ok(RankingEntry {
        id: row.get(0)?,
        username: row.get(1)?,
        score: row.get(2)?,
        rank: row.get(3)?,
    })
}

/// SQLite treats a negative LIMIT as no limit.
fn sql_limit(limit: Option<u32>) -> i64 {
    limit.map(i64::from).unwrap_or(-1)
}

fn read_seed_rankings(conn: &Connection, limit: Option<u32>) -> Result<Vec<SeedRanking>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, score, rank, total_seeds, blooming_seeds FROM seed_rankings
         ORDER BY rank, username, id LIMIT ?",
    )?;
    let rankings = stmt
        .query_map([sql_limit(limit)], |row| {
            Ok(SeedRanking {
                entry: ranking_entry_from_row(row)?,
                total_seeds: row.get(4)?,
                blooming_seeds: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rankings)
}

fn write_seed_ranking(conn: &Connection, ranking: &SeedRanking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO seed_rankings (id, username, score, rank, total_seeds, blooming_seeds)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            score = excluded.score,
            rank = excluded.rank,
            total_seeds = excluded.total_seeds,
            blooming_seeds = excluded.blooming_seeds",
        (
            &ranking.entry.id,
            &ranking.entry.username,
            ranking.entry.score,
            ranking.entry.rank,
            ranking.total_seeds,
            ranking.blooming_seeds,
        ),
    )?;
    Ok(())
}

fn read_streak_rankings(conn: &Connection, limit: Option<u32>) -> Result<Vec<StreakRanking>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, score, rank, current_streak, longest_streak FROM streak_rankings
         ORDER BY rank, username, id LIMIT ?",
    )?;
    let rankings = stmt
        .query_map([sql_limit(limit)], |row| {
            Ok(StreakRanking {
                entry: ranking_entry_from_row(row)?,
                current_streak: row.get(4)?,
                longest_streak: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rankings)
}

fn write_streak_ranking(conn: &Connection, ranking: &StreakRanking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO streak_rankings (id, username, score, rank, current_streak, longest_streak)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            score = excluded.score,
            rank = excluded.rank,
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak",
        (
            &ranking.entry.id,
            &ranking.entry.username,
            ranking.entry.score,
            ranking.entry.rank,
            ranking.current_streak,
            ranking.longest_streak,
        ),
    )?;
    Ok(())
}

// ============================================================
// Column parsing
// ============================================================

fn conversion_error(
    idx: usize,
    e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}

fn parse_literal<T>(row: &Row, idx: usize, from_str: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    from_str(&s).ok_or_else(|| conversion_error(idx, format!("unknown value '{}'", s)))
}

fn datetime_from_str(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    datetime_from_str(idx, &s)
}

fn parse_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn unknown_literal_in_storage_is_a_read_error() {
        let db = db();
        {
            let conn = db.lock().unwrap();
            conn.execute(
                "INSERT INTO seeds (id, rarity, acquired_at) VALUES ('s-1', 'mythic', '2024-01-01T00:00:00+00:00')",
                [],
            )
            .unwrap();
        }

        let err = db.get_seed("s-1").unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("mythic"));
    }

    #[test]
    fn sql_limit_maps_none_to_unbounded() {
        assert_eq!(sql_limit(None), -1);
        assert_eq!(sql_limit(Some(10)), 10);
    }
}

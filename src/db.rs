// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;
use std::time::Duration;

use recall_core::Date;
use recall_core::DueCards;
use recall_core::ErrorReport;
use recall_core::Fallible;
use recall_core::ReviewActivity;
use recall_core::Schedule;
use recall_core::ScheduleStore;
use recall_core::ScheduledCard;
use recall_core::Scope;
use recall_core::SrsStats;
use recall_core::Timestamp;
use recall_core::Versioned;
use recall_core::WeakMaterial;
use recall_core::activity;
use recall_core::project;
use recall_core::types::ids::CardId;
use recall_core::types::ids::MaterialId;
use recall_core::types::ids::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS materials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    material_id INTEGER NOT NULL REFERENCES materials(id) ON DELETE CASCADE,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    created_at TEXT NOT NULL,
    ease_factor REAL NOT NULL CHECK (ease_factor >= 1.3),
    interval_days INTEGER NOT NULL CHECK (interval_days BETWEEN 0 AND 365),
    repetitions INTEGER NOT NULL CHECK (repetitions >= 0),
    next_review_date TEXT NOT NULL,
    last_reviewed_at TEXT,
    version INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS daily_activity (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    reviews INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, date)
);

CREATE INDEX IF NOT EXISTS idx_materials_user ON materials(user_id);
CREATE INDEX IF NOT EXISTS idx_cards_material ON cards(material_id);
CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(next_review_date, ease_factor);
"#;

const SCHEDULE_COLUMNS: &str = "c.id, c.material_id, c.ease_factor, c.interval_days, \
     c.repetitions, c.next_review_date, c.last_reviewed_at, c.version";

/// How long a writer waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn storage(e: rusqlite::Error) -> ErrorReport {
    ErrorReport::storage(format!("database error: {e}"))
}

/// A schedule row as SQLite hands it back, before date parsing.
struct ScheduleRow {
    card_id: i64,
    material_id: i64,
    ease_factor: f64,
    interval_days: u32,
    repetitions: u32,
    next_review_date: String,
    last_reviewed_at: Option<String>,
    version: i64,
}

impl ScheduleRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            card_id: row.get(0)?,
            material_id: row.get(1)?,
            ease_factor: row.get(2)?,
            interval_days: row.get(3)?,
            repetitions: row.get(4)?,
            next_review_date: row.get(5)?,
            last_reviewed_at: row.get(6)?,
            version: row.get(7)?,
        })
    }

    fn into_scheduled(self) -> Fallible<(ScheduledCard, u64)> {
        let last_reviewed_at = match self.last_reviewed_at {
            Some(ts) => Some(Timestamp::try_from(ts)?),
            None => None,
        };
        let card = ScheduledCard {
            card_id: CardId::new(self.card_id),
            material_id: MaterialId::new(self.material_id),
            schedule: Schedule {
                ease_factor: self.ease_factor,
                interval_days: self.interval_days,
                repetitions: self.repetitions,
                next_review_date: Date::try_from(self.next_review_date)?,
                last_reviewed_at,
            },
        };
        Ok((card, self.version as u64))
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Fallible<Self> {
        log::debug!("Opening database at {}", path.display());
        let conn = Connection::open(path).map_err(storage)?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Fallible<Self> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Fallible<Self> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(storage)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(storage)?;
        conn.execute_batch(SCHEMA).map_err(storage)?;
        log::debug!("Database schema ready");
        Ok(Self { conn })
    }

    pub fn insert_user(&self, name: &str) -> Fallible<UserId> {
        self.conn
            .execute("INSERT INTO users (name) VALUES (?1)", params![name])
            .map_err(storage)?;
        Ok(UserId::new(self.conn.last_insert_rowid()))
    }

    pub fn insert_material(&self, user: UserId, title: &str) -> Fallible<MaterialId> {
        let exists: bool = self
            .conn
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM users WHERE id = ?1)",
                params![user.get()],
                |row| row.get(0),
            )
            .map_err(storage)?;
        if !exists {
            return Err(ErrorReport::not_found(format!("user {user} not found.")));
        }
        self.conn
            .execute(
                "INSERT INTO materials (user_id, title) VALUES (?1, ?2)",
                params![user.get(), title],
            )
            .map_err(storage)?;
        Ok(MaterialId::new(self.conn.last_insert_rowid()))
    }

    /// Creates a card together with its initial schedule. The card is due on
    /// the day it is created.
    pub fn insert_card(
        &self,
        material: MaterialId,
        question: &str,
        answer: &str,
        created_at: Timestamp,
    ) -> Fallible<CardId> {
        if self.material_owner(material)?.is_none() {
            return Err(ErrorReport::not_found(format!(
                "material {material} not found."
            )));
        }
        let schedule = Schedule::new(created_at.date());
        self.conn
            .execute(
                "INSERT INTO cards (material_id, question, answer, created_at, ease_factor, \
                 interval_days, repetitions, next_review_date, last_reviewed_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
                params![
                    material.get(),
                    question,
                    answer,
                    created_at.to_string(),
                    schedule.ease_factor,
                    schedule.interval_days,
                    schedule.repetitions,
                    schedule.next_review_date.to_string(),
                ],
            )
            .map_err(storage)?;
        Ok(CardId::new(self.conn.last_insert_rowid()))
    }

    /// Deletes a card, and its schedule with it.
    pub fn delete_card(&self, card: CardId) -> Fallible<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM cards WHERE id = ?1", params![card.get()])
            .map_err(storage)?;
        Ok(deleted > 0)
    }

    pub fn material_owner(&self, material: MaterialId) -> Fallible<Option<UserId>> {
        let owner: Option<i64> = self
            .conn
            .query_row(
                "SELECT user_id FROM materials WHERE id = ?1",
                params![material.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        Ok(owner.map(UserId::new))
    }

    pub fn count_due(&self, scope: Scope, today: Date) -> Fallible<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM cards c JOIN materials m ON c.material_id = m.id \
                 WHERE m.user_id = ?1 AND (?2 IS NULL OR c.material_id = ?2) \
                 AND c.next_review_date <= ?3",
                params![
                    scope.user().get(),
                    scope.material().map(MaterialId::get),
                    today.to_string()
                ],
                |row| row.get(0),
            )
            .map_err(storage)?;
        Ok(count as usize)
    }

    fn fetch_due(&self, scope: Scope, today: Date, limit: usize) -> Fallible<Vec<ScheduledCard>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM cards c JOIN materials m ON c.material_id = m.id \
             WHERE m.user_id = ?1 AND (?2 IS NULL OR c.material_id = ?2) \
             AND c.next_review_date <= ?3 \
             ORDER BY c.next_review_date ASC, c.ease_factor ASC, c.id ASC \
             LIMIT ?4"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let rows = stmt
            .query_map(
                params![
                    scope.user().get(),
                    scope.material().map(MaterialId::get),
                    today.to_string(),
                    i64::try_from(limit).unwrap_or(i64::MAX),
                ],
                ScheduleRow::read,
            )
            .map_err(storage)?;
        let mut cards = Vec::new();
        for row in rows {
            let (card, _) = row.map_err(storage)?.into_scheduled()?;
            cards.push(card);
        }
        Ok(cards)
    }

    /// Per-material ease and due counts for a user, struggling materials
    /// first.
    pub fn weak_materials(
        &self,
        user: UserId,
        today: Date,
        limit: usize,
    ) -> Fallible<Vec<WeakMaterial>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT m.id, m.title, AVG(c.ease_factor), \
                 SUM(CASE WHEN c.next_review_date <= ?2 THEN 1 ELSE 0 END) \
                 FROM materials m JOIN cards c ON c.material_id = m.id \
                 WHERE m.user_id = ?1 \
                 GROUP BY m.id, m.title \
                 ORDER BY AVG(c.ease_factor) ASC, m.id ASC",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![user.get(), today.to_string()], |row| {
                let due_cards: i64 = row.get(3)?;
                Ok(WeakMaterial {
                    material_id: MaterialId::new(row.get(0)?),
                    title: row.get(1)?,
                    average_ease: row.get(2)?,
                    due_cards: due_cards as usize,
                })
            })
            .map_err(storage)?;
        let mut weak = Vec::new();
        for row in rows {
            if weak.len() >= limit {
                break;
            }
            let material = row.map_err(storage)?;
            if WeakMaterial::is_weak(material.average_ease, material.due_cards) {
                weak.push(material);
            }
        }
        Ok(weak)
    }

    pub fn stats(&self, user: UserId, today: Date) -> Fallible<SrsStats> {
        let schedules = self.user_schedules(user)?;
        Ok(project(&schedules, today))
    }

    /// Reviews today and the current streak, from the daily review counts.
    pub fn activity(&self, user: UserId, today: Date) -> Fallible<ReviewActivity> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, reviews FROM daily_activity WHERE user_id = ?1 AND date <= ?2")
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![user.get(), today.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })
            .map_err(storage)?;
        let mut days = Vec::new();
        for row in rows {
            let (date, reviews) = row.map_err(storage)?;
            days.push((Date::try_from(date)?, reviews));
        }
        Ok(activity(days, today))
    }
}

impl ScheduleStore for Database {
    fn load_schedule(&self, card: CardId) -> Fallible<Option<Versioned>> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM cards c WHERE c.id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![card.get()], ScheduleRow::read)
            .optional()
            .map_err(storage)?;
        match row {
            Some(row) => {
                let (card, version) = row.into_scheduled()?;
                Ok(Some(Versioned {
                    schedule: card.schedule,
                    version,
                }))
            }
            None => Ok(None),
        }
    }

    /// A committed review also counts towards the owner's daily activity,
    /// in the same transaction as the schedule write.
    fn swap_schedule(&self, card: CardId, expected: u64, next: &Schedule) -> Fallible<bool> {
        let tx = self.conn.unchecked_transaction().map_err(storage)?;
        let updated = tx
            .execute(
                "UPDATE cards SET ease_factor = ?1, interval_days = ?2, repetitions = ?3, \
                 next_review_date = ?4, last_reviewed_at = ?5, version = version + 1 \
                 WHERE id = ?6 AND version = ?7",
                params![
                    next.ease_factor,
                    next.interval_days,
                    next.repetitions,
                    next.next_review_date.to_string(),
                    next.last_reviewed_at.map(|ts| ts.to_string()),
                    card.get(),
                    expected as i64,
                ],
            )
            .map_err(storage)?;
        if updated == 1 {
            if let Some(reviewed_at) = next.last_reviewed_at {
                tx.execute(
                    "INSERT INTO daily_activity (user_id, date, reviews) \
                     SELECT m.user_id, ?2, 1 FROM cards c JOIN materials m ON c.material_id = m.id \
                     WHERE c.id = ?1 \
                     ON CONFLICT (user_id, date) DO UPDATE SET reviews = daily_activity.reviews + 1",
                    params![card.get(), reviewed_at.date().to_string()],
                )
                .map_err(storage)?;
            }
            tx.commit().map_err(storage)?;
            return Ok(true);
        }
        drop(tx);
        let exists: bool = self
            .conn
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM cards WHERE id = ?1)",
                params![card.get()],
                |row| row.get(0),
            )
            .map_err(storage)?;
        if exists {
            Ok(false)
        } else {
            Err(ErrorReport::not_found(format!("card {card} not found.")))
        }
    }

    /// The page of cards and the total are read in one transaction, so they
    /// agree with each other.
    fn due_cards(&self, scope: Scope, today: Date, limit: usize) -> Fallible<DueCards> {
        let tx = self.conn.unchecked_transaction().map_err(storage)?;
        let cards = self.fetch_due(scope, today, limit)?;
        let total_due = self.count_due(scope, today)?;
        tx.commit().map_err(storage)?;
        Ok(DueCards {
            cards,
            total_due,
            material_id: scope.material(),
        })
    }

    fn user_schedules(&self, user: UserId) -> Fallible<Vec<Schedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM cards c JOIN materials m ON c.material_id = m.id \
             WHERE m.user_id = ?1"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(storage)?;
        let rows = stmt
            .query_map(params![user.get()], ScheduleRow::read)
            .map_err(storage)?;
        let mut schedules = Vec::new();
        for row in rows {
            let (card, _) = row.map_err(storage)?.into_scheduled()?;
            schedules.push(card.schedule);
        }
        Ok(schedules)
    }
}

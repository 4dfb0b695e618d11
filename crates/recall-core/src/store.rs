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

use std::collections::HashMap;
use std::sync::Mutex;

use crate::due::DueCards;
use crate::due::Scope;
use crate::due::select_due;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::date::Date;
use crate::types::ids::CardId;
use crate::types::ids::MaterialId;
use crate::types::ids::UserId;
use crate::types::schedule::Schedule;
use crate::types::schedule::ScheduledCard;

/// A schedule as loaded from storage, with the version it was read at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Versioned {
    pub schedule: Schedule,
    pub version: u64,
}

/// Where schedules live.
pub trait ScheduleStore {
    /// Loads a card's schedule, or `None` if there is no such card.
    fn load_schedule(&self, card: CardId) -> Fallible<Option<Versioned>>;

    /// Replaces all fields of the card's schedule in one write, but only if
    /// its version is still `expected`. Returns `false`, writing nothing, if
    /// the version moved on. A successful write bumps the version.
    fn swap_schedule(&self, card: CardId, expected: u64, next: &Schedule) -> Fallible<bool>;

    /// The due cards in `scope` on `today`, in study order, at most `limit`.
    fn due_cards(&self, scope: Scope, today: Date, limit: usize) -> Fallible<DueCards>;

    /// Every schedule owned by the user.
    fn user_schedules(&self, user: UserId) -> Fallible<Vec<Schedule>>;
}

struct Entry {
    user: UserId,
    material: MaterialId,
    schedule: Schedule,
    version: u64,
}

/// An in-process store behind a mutex.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CardId, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        card: CardId,
        user: UserId,
        material: MaterialId,
        schedule: Schedule,
    ) -> Fallible<()> {
        let mut entries = self.lock()?;
        entries.insert(
            card,
            Entry {
                user,
                material,
                schedule,
                version: 0,
            },
        );
        Ok(())
    }

    pub fn remove(&self, card: CardId) -> Fallible<bool> {
        Ok(self.lock()?.remove(&card).is_some())
    }

    fn lock(&self) -> Fallible<std::sync::MutexGuard<'_, HashMap<CardId, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| ErrorReport::storage("memory store lock poisoned"))
    }
}

impl ScheduleStore for MemoryStore {
    fn load_schedule(&self, card: CardId) -> Fallible<Option<Versioned>> {
        let entries = self.lock()?;
        Ok(entries.get(&card).map(|entry| Versioned {
            schedule: entry.schedule,
            version: entry.version,
        }))
    }

    fn swap_schedule(&self, card: CardId, expected: u64, next: &Schedule) -> Fallible<bool> {
        let mut entries = self.lock()?;
        match entries.get_mut(&card) {
            Some(entry) if entry.version == expected => {
                entry.schedule = *next;
                entry.version += 1;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(ErrorReport::not_found(format!("card {card} not found."))),
        }
    }

    fn due_cards(&self, scope: Scope, today: Date, limit: usize) -> Fallible<DueCards> {
        let entries = self.lock()?;
        let in_scope = entries
            .iter()
            .filter(|(_, entry)| entry.user == scope.user())
            .filter(|(_, entry)| scope.material().is_none_or(|m| entry.material == m))
            .map(|(card, entry)| ScheduledCard {
                card_id: *card,
                material_id: entry.material,
                schedule: entry.schedule,
            });
        Ok(select_due(in_scope, scope, today, limit))
    }

    fn user_schedules(&self, user: UserId) -> Fallible<Vec<Schedule>> {
        let entries = self.lock()?;
        Ok(entries
            .values()
            .filter(|entry| entry.user == user)
            .map(|entry| entry.schedule)
            .collect())
    }
}

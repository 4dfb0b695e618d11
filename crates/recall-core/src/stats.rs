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

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::sm2::INITIAL_EASE_FACTOR;
use crate::types::date::Date;
use crate::types::ids::MaterialId;
use crate::types::schedule::Schedule;

/// Review statistics over a user's cards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SrsStats {
    pub total_cards: usize,
    pub due_today: usize,
    /// Cards with no successful review since creation or the last lapse.
    pub new_cards: usize,
    pub learned_cards: usize,
    /// Cards with an interval above three weeks.
    pub mature_cards: usize,
    /// Mean ease factor, or the initial ease factor if there are no cards.
    pub average_ease: f64,
    pub reviewed_today: usize,
}

pub fn project<'a>(schedules: impl IntoIterator<Item = &'a Schedule>, today: Date) -> SrsStats {
    let mut stats = SrsStats {
        total_cards: 0,
        due_today: 0,
        new_cards: 0,
        learned_cards: 0,
        mature_cards: 0,
        average_ease: INITIAL_EASE_FACTOR,
        reviewed_today: 0,
    };
    let mut ease_sum = 0.0;
    for schedule in schedules {
        stats.total_cards += 1;
        ease_sum += schedule.ease_factor;
        if schedule.is_due(today) {
            stats.due_today += 1;
        }
        if schedule.is_new() {
            stats.new_cards += 1;
        } else {
            stats.learned_cards += 1;
        }
        if schedule.is_mature() {
            stats.mature_cards += 1;
        }
        if schedule.reviewed_on(today) {
            stats.reviewed_today += 1;
        }
    }
    if stats.total_cards > 0 {
        stats.average_ease = ease_sum / stats.total_cards as f64;
    }
    stats
}

/// A material the learner is struggling with: low average ease, or cards
/// waiting to be reviewed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeakMaterial {
    pub material_id: MaterialId,
    pub title: String,
    pub average_ease: f64,
    pub due_cards: usize,
}

impl WeakMaterial {
    /// Materials at or above the initial ease with nothing due are fine.
    pub fn is_weak(average_ease: f64, due_cards: usize) -> bool {
        average_ease < INITIAL_EASE_FACTOR || due_cards > 0
    }
}

/// Committed reviews per day, as opposed to distinct cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewActivity {
    pub reviews_today: u32,
    /// Consecutive days with at least one review, ending today. Zero if
    /// nothing has been reviewed today.
    pub current_streak: u32,
}

/// Builds the activity summary from per-day review counts, in any order.
pub fn activity(days: impl IntoIterator<Item = (Date, u32)>, today: Date) -> ReviewActivity {
    let mut reviews: BTreeMap<Date, u32> = BTreeMap::new();
    for (date, count) in days {
        *reviews.entry(date).or_default() += count;
    }
    let reviewed = |day: &Date| reviews.get(day).is_some_and(|count| *count > 0);
    let mut current_streak = 0;
    let mut day = today;
    while reviewed(&day) {
        current_streak += 1;
        day = day.previous();
    }
    ReviewActivity {
        reviews_today: reviews.get(&today).copied().unwrap_or(0),
        current_streak,
    }
}
